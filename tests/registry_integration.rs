//! Integration tests for reader selection.
//!
//! These tests check that:
//! - Any set of ranges cut from the build line forms a valid registry
//! - Selection is total and unambiguous over such a registry
//! - Removing a reader from a partition is rejected
//! - The standard registry picks the expected dialect at each threshold

use proptest::prelude::*;
use sc2_parser::format::{BUILD_16561, BUILD_17326};
use sc2_parser::readers::{ReadContext, SubfileData};
use sc2_parser::{BuildRange, ParserError, ReaderRegistry, SubfileName, SubfileReader};

struct Stub {
    range: BuildRange,
}

impl SubfileReader for Stub {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn subfile(&self) -> SubfileName {
        SubfileName::MessageEvents
    }

    fn range(&self) -> BuildRange {
        self.range
    }

    fn read(&self, _data: &[u8], _ctx: &ReadContext<'_>) -> sc2_parser::Result<SubfileData> {
        Ok(SubfileData::Attributes(Vec::new()))
    }
}

/// Cuts the build line at the given points.
fn partition(mut cuts: Vec<u32>) -> Vec<BuildRange> {
    cuts.sort_unstable();
    cuts.dedup();

    let mut ranges = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for &cut in &cuts {
        ranges.push(BuildRange::between(start, cut));
        start = cut;
    }
    ranges.push(BuildRange::starting_at(start));
    ranges
}

fn stubs(ranges: &[BuildRange]) -> Vec<Box<dyn SubfileReader>> {
    ranges
        .iter()
        .rev()
        .map(|&range| Box::new(Stub { range }) as Box<dyn SubfileReader>)
        .collect()
}

fn cut_points() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1u32..=u32::MAX, 0..8)
}

// ========================
// Partition properties
// ========================

proptest! {
    #[test]
    fn partition_selects_exactly_one_reader(cuts in cut_points(), build in any::<u32>()) {
        let registry = ReaderRegistry::new(stubs(&partition(cuts))).unwrap();

        let claiming = registry
            .readers(SubfileName::MessageEvents)
            .iter()
            .filter(|r| r.applies(build))
            .count();
        prop_assert_eq!(claiming, 1);

        let selected = registry.select(SubfileName::MessageEvents, build).unwrap();
        prop_assert!(selected.range().contains(build));
    }

    #[test]
    fn removing_a_reader_breaks_the_partition(
        cuts in prop::collection::vec(1u32..=u32::MAX, 1..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut ranges = partition(cuts);
        ranges.remove(pick.index(ranges.len()));

        let result = ReaderRegistry::new(stubs(&ranges));
        prop_assert!(matches!(result, Err(ParserError::Configuration { .. })), "accepted {:?}", ranges);
    }

    #[test]
    fn standard_registry_is_total(build in any::<u32>()) {
        let registry = ReaderRegistry::standard().unwrap();
        for subfile in SubfileName::ALL {
            let reader = registry.select(subfile, build).unwrap();
            prop_assert_eq!(reader.subfile(), subfile);
            prop_assert!(reader.applies(build));
        }
    }
}

// ========================
// Standard dialects
// ========================

#[test]
fn test_thresholds_switch_readers() {
    let registry = ReaderRegistry::standard().unwrap();
    let pick = |subfile, build| registry.select(subfile, build).unwrap().name();

    assert_eq!(pick(SubfileName::GameEvents, BUILD_16561 - 1), "game_events_legacy");
    assert_eq!(pick(SubfileName::GameEvents, BUILD_16561), "game_events_16561");
    assert_eq!(pick(SubfileName::GameEvents, BUILD_17326 - 1), "game_events_16561");
    assert_eq!(pick(SubfileName::GameEvents, BUILD_17326), "game_events_17326");

    assert_eq!(pick(SubfileName::Attributes, BUILD_16561), "attributes_legacy");
    assert_eq!(pick(SubfileName::Attributes, BUILD_17326), "attributes_17326");

    for build in [0, BUILD_16561, BUILD_17326, u32::MAX] {
        assert_eq!(pick(SubfileName::Details, build), "details");
        assert_eq!(pick(SubfileName::MessageEvents, build), "message_events");
    }
}

#[test]
fn test_overlapping_standard_style_readers_rejected() {
    let readers = stubs(&[
        BuildRange::until(BUILD_17326),
        BuildRange::starting_at(BUILD_16561),
    ]);
    match ReaderRegistry::new(readers) {
        Err(ParserError::Configuration { reason }) => {
            assert!(reason.starts_with("replay.message.events"));
            assert!(reason.contains("overlap"));
        }
        other => panic!("Expected Configuration error, got {other:?}"),
    }
}
