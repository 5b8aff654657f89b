use std::path::PathBuf;
use std::{fmt, io};

use crate::error::mongo::format_mongodb_error;

/// Crate-wide `Result` type using [`InteropError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, InteropError>;

/// Top-level error type for export runs.
///
/// Every failure of a run ends up here and travels to the process boundary,
/// where `main` decides the exit status.
#[derive(Debug)]
pub enum InteropError {
    /// Bad or missing command-line input.
    Argument(ArgumentError),

    /// Master file could not be opened or a record could not be read.
    Source(SourceError),

    /// Conversion table could not be loaded.
    ConversionTable(ConversionTableError),

    /// Destination rejected a document or could not be opened.
    Sink(SinkError),

    /// Configuration file errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// MongoDB driver errors.
    MongoDb(mongodb::error::Error),
}

/// Command-line errors.
#[derive(Debug)]
pub enum ArgumentError {
    /// Rejected by the flag parser (unknown flag, missing positional, bad number).
    Invalid(String),

    /// Flags parse but contradict each other.
    Inconsistent(String),

    /// Encoding label not known to `encoding_rs`.
    UnknownEncoding(String),

    /// `--help` or `--version` was given; carries the text to print.
    Help(String),
}

/// Record source errors.
#[derive(Debug)]
pub enum SourceError {
    /// Master file missing, unreadable or not an ISIS master file.
    Open { path: PathBuf, reason: String },

    /// Field bytes are not valid in the configured encoding.
    Decode { mfn: u32, tag: u32, encoding: String },

    /// Leader or directory of a record is inconsistent.
    CorruptRecord { mfn: u32, reason: String },
}

/// Conversion table errors.
#[derive(Debug)]
pub enum ConversionTableError {
    /// Table file could not be read.
    Unreadable { path: PathBuf, reason: String },

    /// A line is not of the form `<tag>=<name>`.
    Malformed { line: usize, content: String },
}

/// Record sink errors.
#[derive(Debug)]
pub enum SinkError {
    /// Destination could not be opened or prepared.
    Open(String),

    /// A document could not be persisted.
    Write(String),

    /// Text not representable in the output encoding.
    Encode { encoding: String, value: String },

    /// Sink options are unusable.
    InvalidOptions(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for InteropError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteropError::Argument(e) => write!(f, "Argument error: {e}"),
            InteropError::Source(e) => write!(f, "Source error: {e}"),
            InteropError::ConversionTable(e) => write!(f, "Conversion table error: {e}"),
            InteropError::Sink(e) => write!(f, "Sink error: {e}"),
            InteropError::Config(e) => write!(f, "Configuration error: {e}"),
            InteropError::Io(e) => write!(f, "I/O error: {e}"),
            InteropError::MongoDb(e) => format_mongodb_error(f, e),
        }
    }
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentError::Invalid(msg) => write!(f, "{msg}"),
            ArgumentError::Inconsistent(msg) => write!(f, "{msg}"),
            ArgumentError::UnknownEncoding(label) => write!(f, "Unknown encoding: {label}"),
            ArgumentError::Help(text) => write!(f, "{text}"),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Open { path, reason } => {
                write!(f, "Cannot open master file {}: {reason}", path.display())
            }
            SourceError::Decode { mfn, tag, encoding } => {
                write!(f, "Cannot decode field {tag} of record {mfn} as {encoding}")
            }
            SourceError::CorruptRecord { mfn, reason } => {
                write!(f, "Corrupt record {mfn}: {reason}")
            }
        }
    }
}

impl fmt::Display for ConversionTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionTableError::Unreadable { path, reason } => {
                write!(f, "Cannot read {}: {reason}", path.display())
            }
            ConversionTableError::Malformed { line, content } => {
                write!(f, "Malformed line {line}: '{content}' (expected <tag>=<name>)")
            }
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Open(msg) => write!(f, "Cannot open destination: {msg}"),
            SinkError::Write(msg) => write!(f, "Write failed: {msg}"),
            SinkError::Encode { encoding, value } => {
                write!(f, "Value '{value}' cannot be encoded as {encoding}")
            }
            SinkError::InvalidOptions(msg) => write!(f, "Invalid options: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for InteropError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InteropError::Io(e) => Some(e),
            InteropError::MongoDb(e) => Some(e),
            _ => None,
        }
    }
}
impl std::error::Error for ArgumentError {}
impl std::error::Error for SourceError {}
impl std::error::Error for ConversionTableError {}
impl std::error::Error for SinkError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to InteropError ========================= */

impl From<io::Error> for InteropError {
    fn from(err: io::Error) -> Self {
        InteropError::Io(err)
    }
}

impl From<mongodb::error::Error> for InteropError {
    fn from(err: mongodb::error::Error) -> Self {
        InteropError::MongoDb(err)
    }
}

impl From<ArgumentError> for InteropError {
    fn from(err: ArgumentError) -> Self {
        InteropError::Argument(err)
    }
}

impl From<SourceError> for InteropError {
    fn from(err: SourceError) -> Self {
        InteropError::Source(err)
    }
}

impl From<ConversionTableError> for InteropError {
    fn from(err: ConversionTableError) -> Self {
        InteropError::ConversionTable(err)
    }
}

impl From<SinkError> for InteropError {
    fn from(err: SinkError) -> Self {
        InteropError::Sink(err)
    }
}

impl From<ConfigError> for InteropError {
    fn from(err: ConfigError) -> Self {
        InteropError::Config(err)
    }
}

impl InteropError {
    /// Whether the error was caused by command-line input.
    pub fn is_argument(&self) -> bool {
        matches!(self, InteropError::Argument(_))
    }
}
