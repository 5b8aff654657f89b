//! Command-line interface for the exporters
//!
//! This module handles:
//! - Argument parsing for `isis2csv` and `isis2mongo` using clap
//! - Translation of parsed flags into source and sink options
//!
//! Parsing never exits the process; see [`app`] for the process boundary.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser};

use crate::error::{ArgumentError, Result};
use crate::export::{CsvSinkOptions, IsisSourceOptions, MfnRange, MongoSinkOptions};
use crate::isis::IsisEncoding;
use crate::isis::encoding::output_encoding;

pub mod app;

/// Comma separated list of ISIS tags; an empty value is an empty list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagList(Vec<u32>);

impl TagList {
    pub fn tags(&self) -> &[u32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u32> {
        self.0
    }
}

impl FromStr for TagList {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self(Vec::new()));
        }

        s.split(',')
            .map(|item| match item.trim().parse::<u32>() {
                Ok(tag) if tag > 0 => Ok(tag),
                _ => Err(format!("'{}' is not a positive tag number", item.trim())),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for TagList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", items.join(","))
    }
}

/// ISIS source flags shared by both programs
#[derive(Args, Debug, Clone)]
pub struct IsisArgs {
    /// Character encoding of the master file, or "guess"
    #[arg(long = "isisencoding", value_name = "ENCODING", default_value = "guess")]
    pub encoding: String,

    /// Tags to export, comma separated (all tags if omitted, none if empty)
    #[arg(long = "isistags", value_name = "TAG,...", value_parser = TagList::from_str)]
    pub tags: Option<TagList>,

    /// First MFN to export
    #[arg(
        long = "isisfrom",
        value_name = "MFN",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub from: u32,

    /// Last MFN to export (default: last record of the master file)
    #[arg(
        long = "isisto",
        value_name = "MFN",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub to: Option<u32>,

    /// File mapping tags to field names, one `tag=name` per line
    #[arg(long = "convtable", value_name = "FILE")]
    pub conv_table: Option<PathBuf>,
}

impl IsisArgs {
    /// Source options for the master file at `master`
    pub fn source_options(&self, master: PathBuf) -> Result<IsisSourceOptions> {
        Ok(IsisSourceOptions {
            master,
            encoding: IsisEncoding::from_label(&self.encoding)?,
            tags: self.tags.clone().map(TagList::into_inner),
            range: MfnRange::new(self.from, self.to)?,
            conversion_table: self.conv_table.clone(),
        })
    }
}

/// Run control flags shared by both programs
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Log a progress line every N exported records
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub tell: Option<u64>,

    /// Add to the existing output instead of replacing it
    #[arg(long)]
    pub append: bool,

    /// Configuration file path
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Verbose mode (debug logging)
    #[arg(short = 'v', long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet mode (warnings and errors only)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Show a live progress spinner
    #[arg(long)]
    pub progress: bool,
}

/// Export ISIS master file records to a CSV file
#[derive(Parser, Debug, Clone)]
#[command(
    name = "isis2csv",
    version,
    about = "Export ISIS master file records to a CSV file"
)]
pub struct CsvCli {
    /// ISIS master file, with or without the .mst extension
    #[arg(value_name = "ISISMST")]
    pub isis_mst: PathBuf,

    /// Output CSV file
    #[arg(value_name = "CSVFILE")]
    pub csv_file: PathBuf,

    #[command(flatten)]
    pub isis: IsisArgs,

    /// Character encoding of the CSV file
    #[arg(long = "csvencoding", value_name = "ENCODING", default_value = "UTF-8")]
    pub csv_encoding: String,

    /// Column delimiter
    #[arg(long = "csvdelimiter", value_name = "CHAR", default_value_t = ',')]
    pub csv_delimiter: char,

    /// Write the header as the last line instead of the first
    #[arg(long = "hasfooter")]
    pub has_footer: bool,

    #[command(flatten)]
    pub run: RunArgs,
}

impl CsvCli {
    pub fn source_options(&self) -> Result<IsisSourceOptions> {
        self.isis.source_options(self.isis_mst.clone())
    }

    pub fn sink_options(&self) -> Result<CsvSinkOptions> {
        if self.csv_delimiter == '"' {
            return Err(ArgumentError::Inconsistent(
                "the csv delimiter cannot be a double quote".to_string(),
            )
            .into());
        }

        Ok(CsvSinkOptions {
            path: self.csv_file.clone(),
            encoding: output_encoding(&self.csv_encoding)?,
            delimiter: self.csv_delimiter,
            has_footer: self.has_footer,
            append: self.run.append,
            columns: Vec::new(),
        })
    }
}

/// Export ISIS master file records to a MongoDB collection
#[derive(Parser, Debug, Clone)]
#[command(
    name = "isis2mongo",
    version,
    about = "Export ISIS master file records to a MongoDB collection"
)]
pub struct MongoCli {
    /// ISIS master file, with or without the .mst extension
    #[arg(value_name = "ISISMST")]
    pub isis_mst: PathBuf,

    /// MongoDB host name or connection URI
    #[arg(value_name = "MONGOHOST")]
    pub mongo_host: String,

    /// Target database
    #[arg(value_name = "MONGODB")]
    pub mongo_db: String,

    /// Target collection
    #[arg(value_name = "MONGOCOL")]
    pub mongo_col: String,

    #[command(flatten)]
    pub isis: IsisArgs,

    /// MongoDB server port
    #[arg(long = "mongoport", value_name = "PORT")]
    pub mongo_port: Option<u16>,

    /// Username for authentication
    #[arg(long = "mongouser", value_name = "USER")]
    pub mongo_user: Option<String>,

    /// Password for authentication
    #[arg(long = "mongopsw", value_name = "PASSWORD", requires = "mongo_user")]
    pub mongo_password: Option<String>,

    #[command(flatten)]
    pub run: RunArgs,
}

impl MongoCli {
    pub fn source_options(&self) -> Result<IsisSourceOptions> {
        self.isis.source_options(self.isis_mst.clone())
    }

    pub fn sink_options(&self) -> MongoSinkOptions {
        MongoSinkOptions {
            host: self.mongo_host.clone(),
            port: self.mongo_port,
            user: self.mongo_user.clone(),
            password: self.mongo_password.clone(),
            database: self.mongo_db.clone(),
            collection: self.mongo_col.clone(),
            append: self.run.append,
        }
    }
}

/// Parse a command line without exiting
///
/// # Arguments
/// * `args` - Full argument list, program name first
///
/// # Returns
/// * `Result<C, ArgumentError>` - Parsed arguments, `Help` for `--help` and
///   `--version`, or `Invalid` with the message and usage
pub fn parse_args<C, I, T>(args: I) -> std::result::Result<C, ArgumentError>
where
    C: Parser,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    C::try_parse_from(args).map_err(|e| match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            ArgumentError::Help(e.render().to_string())
        }
        _ => {
            let mut message = e.render().to_string();
            if !message.contains("Usage:") {
                message.push('\n');
                message.push_str(&C::command().render_usage().to_string());
                message.push('\n');
            }
            ArgumentError::Invalid(message)
        }
    })
}
