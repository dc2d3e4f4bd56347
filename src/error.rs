use thiserror::Error;

/// Result type alias for flux operations
pub type Result<T> = std::result::Result<T, FluxError>;

/// Errors that abort a read, write or statistics run
///
/// Recoverable sector problems (encoding, numbering, id, checksum) are not
/// errors at this level; they are folded into
/// [`SectorQuality`](crate::image::SectorQuality) instead.
#[derive(Debug, Error)]
pub enum FluxError {
    /// I/O error occurred while reading or writing an image
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoded or decoded data exceeded the destination buffer
    #[error("data too long on track {track}")]
    DataTooLong {
        /// Track being processed
        track: usize,
    },

    /// A bit buffer was written past its limit
    #[error("buffer full: limit of {limit} bytes reached")]
    BufferFull {
        /// Buffer limit in bytes
        limit: usize,
    },

    /// A non-optional track could not be read from any source
    #[error("no data available for track {track}")]
    NoData {
        /// Track number
        track: usize,
    },

    /// Invalid track number specified
    #[error("invalid track {track} (max: {max})")]
    InvalidTrack {
        /// Track number
        track: usize,
        /// Maximum allowed track number
        max: usize,
    },

    /// Track window rejected because start > end or end is out of range
    #[error("invalid track range {start}..={end} (max: {max})")]
    InvalidTrackRange {
        /// Requested first track
        start: usize,
        /// Requested last track
        end: usize,
        /// Maximum allowed track number
        max: usize,
    },

    /// Option value outside its permitted range
    #[error("invalid value {value} for option '{name}' (allowed: {min}..={max})")]
    InvalidOption {
        /// Option name
        name: &'static str,
        /// Rejected value
        value: i64,
        /// Lowest allowed value
        min: i64,
        /// Highest allowed value
        max: i64,
    },

    /// Unknown format name
    #[error("unknown format: {0}")]
    UnknownFormat(String),

    /// Other configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed flux or image container
    #[error("parse error at offset {offset}: {message}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Error message
        message: String,
    },
}

impl FluxError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        FluxError::Config(message.into())
    }

    /// Create a parse error with context
    pub fn parse<S: Into<String>>(offset: usize, message: S) -> Self {
        FluxError::ParseError {
            offset,
            message: message.into(),
        }
    }

    /// Check an option value against an inclusive range
    pub fn check_option(name: &'static str, value: i64, min: i64, max: i64) -> Result<()> {
        if value < min || value > max {
            return Err(FluxError::InvalidOption {
                name,
                value,
                min,
                max,
            });
        }
        Ok(())
    }
}
