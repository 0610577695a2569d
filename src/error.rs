//! Error types for the SC2 replay parser.
//!
//! Every fatal condition aborts the smallest independent unit of work: a
//! truncated or unknown event aborts its subfile, a build that no reader
//! claims aborts the whole replay. Errors raised inside a subfile decode are
//! wrapped by the loader in [`ParserError::Subfile`] so that the subfile name
//! and build number travel with the byte offset of the failure.

use thiserror::Error;

use crate::format::SubfileName;

/// The main error type for SC2 replay decoding.
///
/// # Example
///
/// ```
/// use sc2_parser::error::{ParserError, Result};
///
/// fn example_operation() -> Result<()> {
///     Err(ParserError::invalid_data(12, "unknown serialized tag 0x0A"))
/// }
///
/// assert!(example_operation().is_err());
/// ```
#[derive(Error, Debug)]
pub enum ParserError {
    /// An I/O error occurred while reading subfile blobs from disk.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The cursor ran out of data in the middle of a read.
    #[error(
        "Unexpected end of data at offset {offset}: expected {expected} bytes, but only {available} available"
    )]
    UnexpectedEof {
        /// Byte offset where the failed read started.
        offset: usize,
        /// The number of bytes the read needed.
        expected: usize,
        /// The number of bytes left in the buffer.
        available: usize,
    },

    /// A field held a value that cannot be decoded.
    #[error("Invalid data at offset {offset}: {reason}")]
    InvalidData {
        /// Byte offset of the offending field.
        offset: usize,
        /// A description of the problem.
        reason: String,
    },

    /// No registered reader claims this subfile for this build.
    #[error("No reader for {subfile} at build {build}")]
    UnknownDialect {
        /// The subfile that needed a reader.
        subfile: SubfileName,
        /// The replay's build number.
        build: u32,
    },

    /// No dispatch entry matches an event's category and code.
    #[error("Unknown event 0x{category:02X}/0x{code:02X} at offset {offset}")]
    UnknownEvent {
        /// The 3-bit event category from the header byte.
        category: u8,
        /// The event code byte.
        code: u8,
        /// Byte offset of the event's header.
        offset: usize,
    },

    /// The reader registry does not partition the build-number line.
    #[error("Invalid reader configuration: {reason}")]
    Configuration {
        /// A description of the gap or overlap.
        reason: String,
    },

    /// A subfile required for decoding was not supplied.
    #[error("Missing subfile {subfile}")]
    MissingSubfile {
        /// The subfile that is absent.
        subfile: SubfileName,
    },

    /// A failure inside one subfile decode, with its context attached.
    #[error("{subfile} (build {build}): {source}")]
    Subfile {
        /// The subfile being decoded.
        subfile: SubfileName,
        /// The replay's build number.
        build: u32,
        /// The underlying failure.
        #[source]
        source: Box<ParserError>,
    },
}

impl ParserError {
    /// Creates an `UnexpectedEof` error.
    ///
    /// # Arguments
    ///
    /// * `offset` - The byte offset where the read started
    /// * `expected` - The number of bytes that were needed
    /// * `available` - The number of bytes actually available
    #[must_use]
    pub fn unexpected_eof(offset: usize, expected: usize, available: usize) -> Self {
        ParserError::UnexpectedEof {
            offset,
            expected,
            available,
        }
    }

    /// Creates an `InvalidData` error.
    #[must_use]
    pub fn invalid_data(offset: usize, reason: impl Into<String>) -> Self {
        ParserError::InvalidData {
            offset,
            reason: reason.into(),
        }
    }

    /// Wraps this error with the subfile and build it was raised in.
    #[must_use]
    pub fn in_subfile(self, subfile: SubfileName, build: u32) -> Self {
        ParserError::Subfile {
            subfile,
            build,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, looking through `Subfile` wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &ParserError {
        match self {
            ParserError::Subfile { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns whether the root cause is truncated input.
    #[must_use]
    pub fn is_truncation(&self) -> bool {
        matches!(self.root_cause(), ParserError::UnexpectedEof { .. })
    }

    /// Returns the subfile this error was raised in, if known.
    #[must_use]
    pub fn subfile(&self) -> Option<SubfileName> {
        match self {
            ParserError::Subfile { subfile, .. }
            | ParserError::UnknownDialect { subfile, .. }
            | ParserError::MissingSubfile { subfile } => Some(*subfile),
            _ => None,
        }
    }
}

/// A specialized Result type for SC2 decoding operations.
pub type Result<T> = std::result::Result<T, ParserError>;
