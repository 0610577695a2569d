//! StarCraft II replay subfile decoder CLI
//!
//! Works on a directory holding the archive members of one replay, extracted
//! under their archive names (`replay.details`, `replay.game.events`, ...).
//! The build number is not stored in those members and must be given with
//! `--build`.
//!
//! ## Commands
//!
//! - `info` - Display quick replay metadata
//! - `parse` - Decode every subfile with output format options
//! - `validate` - Check every subfile decodes (exit codes for scripting)
//! - `dialects` - List the readers and dispatch tables per build range

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sc2_parser::events::{DispatchTable, GameEvent};
use sc2_parser::readers::GameEventsReader;
use sc2_parser::{
    LoadOptions, ReaderRegistry, Replay, ReplayLoader, SubfileName, SubfileReader, SubfileSet,
};

/// StarCraft II replay subfile decoder
#[derive(Parser)]
#[command(name = "sc2-parser")]
#[command(about = "StarCraft II replay subfile decoder", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display replay information
    Info {
        /// Directory of extracted subfiles
        dir: PathBuf,
        /// Build number of the replay
        #[arg(short, long)]
        build: u32,
    },
    /// Decode a replay
    Parse {
        /// Directory of extracted subfiles
        dir: PathBuf,
        /// Build number of the replay
        #[arg(short, long)]
        build: u32,
        /// Output format: json, pretty
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
        /// Include all game events in output
        #[arg(long)]
        events: bool,
        /// Include chat messages
        #[arg(long)]
        chat: bool,
        /// Include lobby attributes
        #[arg(long)]
        attributes: bool,
        /// Show event statistics
        #[arg(long)]
        stats: bool,
        /// Decode independent subfiles concurrently
        #[arg(long)]
        parallel: bool,
    },
    /// Validate that every subfile decodes
    Validate {
        /// Directory of extracted subfiles
        dir: PathBuf,
        /// Build number of the replay
        #[arg(short, long)]
        build: u32,
        /// List the state of every subfile
        #[arg(long)]
        details: bool,
    },
    /// List readers and game-event dispatch tables
    Dialects {
        /// Only show the dialect selected for this build
        #[arg(short, long)]
        build: Option<u32>,
        /// Print every dispatch entry
        #[arg(long)]
        tables: bool,
    },
}

/// Output format options
#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

// ============================================================================
// Serializable Output Structures
// ============================================================================

#[derive(Serialize)]
struct ParseOutput {
    summary: Summary,
    players: Vec<PlayerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat: Option<Vec<ChatInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<Vec<AttributeInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<Vec<EventInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    statistics: Option<Statistics>,
}

#[derive(Serialize)]
struct Summary {
    build: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    map: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    realm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unix_timestamp: Option<i64>,
    duration_seconds: u32,
    duration: String,
    event_count: usize,
}

#[derive(Serialize)]
struct PlayerInfo {
    pid: u8,
    name: String,
    race: String,
    team: i64,
    color: String,
    outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Serialize)]
struct ChatInfo {
    time: String,
    player_id: u8,
    target: String,
    text: String,
}

#[derive(Serialize)]
struct AttributeInfo {
    id: u32,
    player: u8,
    value: String,
}

#[derive(Serialize)]
struct EventInfo {
    frame: u32,
    time: String,
    player_id: u8,
    category: u8,
    code: String,
    event_type: String,
    description: String,
    offset: usize,
    bytes: String,
}

#[derive(Serialize, Default)]
struct Statistics {
    total_events: u32,
    events_by_type: BTreeMap<String, u32>,
    apm_by_player: BTreeMap<u8, f64>,
}

struct DialectInfo {
    subfile: String,
    reader: String,
    builds: String,
}

// ============================================================================
// Validation Result Structure
// ============================================================================

struct ValidationResult {
    subfiles: Vec<(SubfileName, Option<String>)>,
    fatal: Option<String>,
}

impl ValidationResult {
    fn is_valid(&self) -> bool {
        self.fatal.is_none() && self.subfiles.iter().all(|(_, error)| error.is_none())
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { dir, build } => cmd_info(&dir, build),
        Commands::Parse {
            dir,
            build,
            output,
            events,
            chat,
            attributes,
            stats,
            parallel,
        } => {
            let include = Include {
                events,
                chat,
                attributes,
                stats,
            };
            cmd_parse(&dir, build, &output, include, parallel)
        }
        Commands::Validate {
            dir,
            build,
            details,
        } => cmd_validate(&dir, build, details),
        Commands::Dialects { build, tables } => cmd_dialects(build, tables),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load(dir: &Path, build: u32, options: LoadOptions) -> Result<Replay, String> {
    let files = SubfileSet::from_dir(dir).map_err(|e| format!("Reading subfiles failed: {e}"))?;
    let loader = ReplayLoader::standard()
        .map_err(|e| format!("Reader setup failed: {e}"))?
        .with_options(options);
    loader.load(&files, build).map_err(|e| e.to_string())
}

fn format_duration(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

// ============================================================================
// Info Command Implementation
// ============================================================================

fn cmd_info(dir: &Path, build: u32) -> ExitCode {
    let options = LoadOptions {
        parallel: false,
        load_events: false,
    };
    let replay = match load(dir, build, options) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("=== Replay Information ===\n");
    println!("Build: {}", replay.build);
    println!("Map: {}", replay.map_name().unwrap_or("Unknown"));
    println!("Realm: {}", replay.realm().unwrap_or("Unknown"));
    if let Some(details) = &replay.details {
        println!("Recorded: {} (unix)", details.unix_timestamp);
    }
    println!();

    println!("Players:");
    for player in replay.players() {
        println!(
            "  {}. {} ({}, team {}) - {}",
            player.pid,
            player.name,
            player.race,
            player.team,
            player.outcome()
        );
    }
    println!();

    println!("Lobby:");
    println!("  Slots: {}", replay.init_data.player_names.join(", "));
    println!("  Attributes: {}", replay.attributes.len());
    println!("  Chat messages: {}", replay.messages.messages.len());

    ExitCode::SUCCESS
}

// ============================================================================
// Parse Command Implementation
// ============================================================================

#[derive(Clone, Copy)]
#[allow(clippy::struct_excessive_bools)]
struct Include {
    events: bool,
    chat: bool,
    attributes: bool,
    stats: bool,
}

fn cmd_parse(
    dir: &Path,
    build: u32,
    output: &OutputFormat,
    include: Include,
    parallel: bool,
) -> ExitCode {
    let options = LoadOptions {
        parallel,
        load_events: true,
    };
    let replay = match load(dir, build, options) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let output_data = build_output(&replay, include);
    match output {
        OutputFormat::Json => print_json(&output_data),
        OutputFormat::Pretty => print_pretty(&output_data),
    }

    ExitCode::SUCCESS
}

fn build_output(replay: &Replay, include: Include) -> ParseOutput {
    let duration_seconds = replay.duration_seconds();
    let summary = Summary {
        build: replay.build,
        map: replay.map_name().map(str::to_string),
        realm: replay.realm().map(str::to_string),
        unix_timestamp: replay.details.as_ref().map(|d| d.unix_timestamp),
        duration_seconds,
        duration: format_duration(duration_seconds),
        event_count: replay.events.len(),
    };

    let players = replay
        .players()
        .iter()
        .map(|p| PlayerInfo {
            pid: p.pid,
            name: p.name.clone(),
            race: p.race.clone(),
            team: p.team,
            color: p.color.hex(),
            outcome: p.outcome().to_string(),
            url: p.url.clone(),
        })
        .collect();

    let chat = include.chat.then(|| {
        replay
            .messages
            .messages
            .iter()
            .map(|m| ChatInfo {
                time: m.time_string(),
                player_id: m.player_id,
                target: m.target.to_string(),
                text: m.text.clone(),
            })
            .collect()
    });

    let attributes = include.attributes.then(|| {
        replay
            .attributes
            .iter()
            .map(|a| AttributeInfo {
                id: a.id,
                player: a.player,
                value: a.value_str(),
            })
            .collect()
    });

    let events = include
        .events
        .then(|| replay.events.iter().map(event_info).collect());

    let statistics = include.stats.then(|| build_statistics(replay));

    ParseOutput {
        summary,
        players,
        chat,
        attributes,
        events,
        statistics,
    }
}

fn event_info(event: &GameEvent) -> EventInfo {
    EventInfo {
        frame: event.frame,
        time: event.time_string(),
        player_id: event.player_id,
        category: event.category,
        code: format!("0x{:02X}", event.code),
        event_type: event.kind.type_name().to_string(),
        description: event.kind.to_string(),
        offset: event.offset,
        bytes: hex::encode(&event.bytes),
    }
}

fn build_statistics(replay: &Replay) -> Statistics {
    let stats = replay.statistics();
    let mut events_by_type = BTreeMap::new();
    for event in &replay.events {
        *events_by_type
            .entry(event.kind.type_name().to_string())
            .or_insert(0) += 1;
    }
    let apm_by_player = stats
        .actions_per_player
        .keys()
        .map(|&pid| (pid, stats.actions_per_minute(pid)))
        .collect();

    Statistics {
        total_events: stats.total_events,
        events_by_type,
        apm_by_player,
    }
}

fn print_json(output: &ParseOutput) {
    match serde_json::to_string_pretty(output) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing to JSON: {e}"),
    }
}

fn print_pretty(output: &ParseOutput) {
    let summary = &output.summary;
    println!("=== Summary ===");
    println!("Build: {}", summary.build);
    if let Some(map) = &summary.map {
        println!("Map: {map}");
    }
    if let Some(realm) = &summary.realm {
        println!("Realm: {realm}");
    }
    println!("Duration: {}", summary.duration);
    println!("Events: {}", summary.event_count);
    println!();

    println!("=== Players ({}) ===", output.players.len());
    for player in &output.players {
        println!(
            "  {}. {} [{}] {} team {} - {}",
            player.pid, player.name, player.color, player.race, player.team, player.outcome
        );
    }
    println!();

    if let Some(chat) = &output.chat {
        println!("=== Chat Messages ({}) ===", chat.len());
        for msg in chat {
            println!("  [{}] P{} ({}): {}", msg.time, msg.player_id, msg.target, msg.text);
        }
        println!();
    }

    if let Some(attributes) = &output.attributes {
        println!("=== Attributes ({}) ===", attributes.len());
        for attr in attributes {
            println!("  {} player {}: {}", attr.id, attr.player, attr.value);
        }
        println!();
    }

    if let Some(stats) = &output.statistics {
        println!("=== Statistics ===");
        println!("Total Events: {}", stats.total_events);
        println!("\nEvents by Type:");
        let mut types: Vec<_> = stats.events_by_type.iter().collect();
        types.sort_by(|a, b| b.1.cmp(a.1));
        for (event_type, count) in types {
            println!("  {event_type}: {count}");
        }
        if !stats.apm_by_player.is_empty() {
            println!("\nAPM:");
            for (pid, apm) in &stats.apm_by_player {
                println!("  Player {pid}: {apm:.1}");
            }
        }
        println!();
    }

    if let Some(events) = &output.events {
        println!("=== Events ({}) ===", events.len());
        // Only show the first 50 events in pretty mode
        let display_count = events.len().min(50);
        for event in &events[..display_count] {
            println!(
                "  [{}] P{} {}/{}: {}",
                event.time, event.player_id, event.category, event.code, event.description
            );
        }
        if events.len() > 50 {
            println!("  ... and {} more events", events.len() - 50);
        }
    }
}

// ============================================================================
// Validate Command Implementation
// ============================================================================

fn cmd_validate(dir: &Path, build: u32, details: bool) -> ExitCode {
    let result = validate_replay(dir, build);

    if details {
        print_validation_details(&result, dir);
    } else {
        print_validation_summary(&result, dir);
    }

    if result.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn validate_replay(dir: &Path, build: u32) -> ValidationResult {
    let mut result = ValidationResult {
        subfiles: Vec::new(),
        fatal: None,
    };

    let files = match SubfileSet::from_dir(dir) {
        Ok(f) => f,
        Err(e) => {
            result.fatal = Some(format!("Reading subfiles failed: {e}"));
            return result;
        }
    };

    let loader = match ReplayLoader::standard() {
        Ok(l) => l,
        Err(e) => {
            result.fatal = Some(format!("Reader setup failed: {e}"));
            return result;
        }
    };

    let errors = match loader.load_partial(&files, build) {
        Ok((_, errors)) => errors,
        Err(e) => {
            result.fatal = Some(e.to_string());
            return result;
        }
    };

    for subfile in SubfileName::ALL {
        let error = errors
            .iter()
            .find(|e| e.subfile() == Some(subfile))
            .map(ToString::to_string);
        result.subfiles.push((subfile, error));
    }
    result
}

fn print_validation_summary(result: &ValidationResult, dir: &Path) {
    let status = if result.is_valid() { "VALID" } else { "INVALID" };
    println!("{}: {}", dir.display(), status);
}

fn print_validation_details(result: &ValidationResult, dir: &Path) {
    println!("Validating: {}\n", dir.display());

    if let Some(fatal) = &result.fatal {
        println!("Error: {fatal}");
        return;
    }

    println!("Subfiles:");
    for (subfile, error) in &result.subfiles {
        match error {
            None => println!("  {subfile:<26} OK"),
            Some(e) => println!("  {subfile:<26} FAIL: {e}"),
        }
    }

    println!(
        "\nResult: {}",
        if result.is_valid() { "VALID" } else { "INVALID" }
    );
}

// ============================================================================
// Dialects Command Implementation
// ============================================================================

fn cmd_dialects(build: Option<u32>, tables: bool) -> ExitCode {
    let registry = match ReaderRegistry::standard() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut rows = Vec::new();
    for subfile in registry.subfiles() {
        for reader in registry.readers(subfile).iter().rev() {
            if build.is_some_and(|b| !reader.applies(b)) {
                continue;
            }
            rows.push(DialectInfo {
                subfile: subfile.to_string(),
                reader: reader.name().to_string(),
                builds: reader.range().to_string(),
            });
        }
    }

    println!("=== Readers ===");
    for row in &rows {
        println!("  {:<26} {:<20} {}", row.subfile, row.reader, row.builds);
    }

    if tables {
        for reader in [
            GameEventsReader::legacy(),
            GameEventsReader::dialect_16561(),
            GameEventsReader::dialect_17326(),
        ] {
            if build.is_some_and(|b| !reader.applies(b)) {
                continue;
            }
            println!(
                "\n=== {} {} ({:?} header) ===",
                reader.name(),
                reader.range(),
                reader.layout()
            );
            print_table(reader.table());
        }
    }

    ExitCode::SUCCESS
}

fn print_table(table: &DispatchTable) {
    for category in table.categories() {
        println!("  Category {category:02X}:");
        for entry in table.entries(category) {
            println!(
                "    {:<16} {:<18} {:?}",
                entry.predicate.to_string(),
                entry.name,
                entry.leaf
            );
        }
    }
}
