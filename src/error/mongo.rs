use std::fmt;

use serde::Serialize;

/// Structured summary of a MongoDB driver error.
///
/// Only the parts that help an operator fix a failed export are kept: the
/// error family, the server code and the message.
#[derive(Debug, Default, Clone, Serialize)]
pub struct MongoFailure {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub(crate) error_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<&'static str>,
    pub(crate) message: String,
}

impl MongoFailure {
    /// Compact JSON form, logged when an insert fails.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for MongoFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MongoDB {}", self.error_type.unwrap_or("error"))?;
        match (self.code, self.name) {
            (Some(code), Some(name)) => write!(f, " [{code} {name}]")?,
            (Some(code), None) => write!(f, " [{code}]")?,
            _ => {}
        }
        write!(f, ": {}", self.message)
    }
}

/// Format a MongoDB error on one line.
///
/// Used by the parent module's `Display` implementation for
/// `InteropError::MongoDb`.
pub fn format_mongodb_error(
    f: &mut fmt::Formatter<'_>,
    error: &mongodb::error::Error,
) -> fmt::Result {
    write!(f, "{}", extract_failure(error))
}

/// Extract code and message from a MongoDB error using the driver's typed
/// error kinds.
pub fn extract_failure(error: &mongodb::error::Error) -> MongoFailure {
    use mongodb::error::{ErrorKind, WriteFailure};

    let mut failure = MongoFailure::default();

    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            failure.error_type = Some("write error");
            failure.code = Some(write_error.code);
            failure.message = write_error.message.clone();
        }
        ErrorKind::Write(WriteFailure::WriteConcernError(wc_error)) => {
            failure.error_type = Some("write concern error");
            failure.code = Some(wc_error.code);
            failure.message = wc_error.message.clone();
        }
        ErrorKind::Command(command_error) => {
            failure.error_type = Some("command error");
            failure.code = Some(command_error.code);
            failure.message = command_error.message.clone();
        }
        ErrorKind::Authentication { message, .. } => {
            failure.error_type = Some("authentication error");
            failure.message = message.clone();
        }
        ErrorKind::InvalidArgument { message, .. } => {
            failure.error_type = Some("invalid argument");
            failure.message = message.clone();
        }
        ErrorKind::ServerSelection { message, .. } => {
            failure.error_type = Some("server selection error");
            failure.message = message.clone();
        }
        _ => {
            failure.message = error.to_string();
        }
    }

    failure.name = failure.code.and_then(error_name);
    failure
}

/// Human-readable name for the server codes an export is likely to hit.
fn error_name(code: i32) -> Option<&'static str> {
    let name = match code {
        11000 | 11001 => "DuplicateKey",
        13 => "Unauthorized",
        18 => "AuthenticationFailed",
        26 => "NamespaceNotFound",
        121 => "DocumentValidationFailure",
        10334 => "BSONObjectTooLarge",
        _ => return None,
    };

    Some(name)
}
