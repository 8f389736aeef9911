use std::fmt;
use thiserror::Error;

/// Error taxonomy shared across the service. Every kind carries a fixed
/// numeric code; the `package` on [`CdcError`] says which component raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Query,
    NoDecoder,
    Logger,
    Binlog,
    Param,
    Save,
    Marshal,
    Event,
    Parse,
    Publisher,
    File,
    NotFound,
}

impl ErrorKind {
    /// Numeric code for the kind, stable across packages.
    pub const fn code(self) -> u16 {
        match self {
            ErrorKind::Config => 1,
            ErrorKind::Query => 2,
            ErrorKind::NoDecoder => 3,
            ErrorKind::Logger => 4,
            ErrorKind::Binlog => 5,
            ErrorKind::Param => 6,
            ErrorKind::Save => 7,
            ErrorKind::Marshal => 8,
            ErrorKind::Event => 9,
            ErrorKind::Parse => 10,
            ErrorKind::Publisher => 11,
            ErrorKind::File => 12,
            ErrorKind::NotFound => 13,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Config => "ConfigError",
            ErrorKind::Query => "QueryError",
            ErrorKind::NoDecoder => "NoDecoderError",
            ErrorKind::Logger => "LoggerError",
            ErrorKind::Binlog => "BinlogError",
            ErrorKind::Param => "ParamError",
            ErrorKind::Save => "SaveError",
            ErrorKind::Marshal => "MarshalError",
            ErrorKind::Event => "EventError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::Publisher => "PublisherError",
            ErrorKind::File => "FileError",
            ErrorKind::NotFound => "NotFoundError",
        };
        f.write_str(name)
    }
}

/// A typed, wrappable error. `package` names the component that raised it
/// (e.g. `"core::worker"`), mirroring how the original service tagged every
/// error with its owning package and a numeric code.
#[derive(Debug, Error)]
#[error("[{package}:{}] {message}", kind.code())]
pub struct CdcError {
    pub kind: ErrorKind,
    pub package: &'static str,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

pub type CdcResult<T> = Result<T, CdcError>;

impl CdcError {
    pub fn new(kind: ErrorKind, package: &'static str, message: impl Into<String>) -> Self {
        CdcError {
            kind,
            package,
            message: message.into(),
            source: None,
        }
    }

    pub fn wrap(
        kind: ErrorKind,
        package: &'static str,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        CdcError {
            kind,
            package,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn code_is_stable_per_kind() {
        assert_eq!(ErrorKind::Config.code(), 1);
        assert_eq!(ErrorKind::NotFound.code(), 13);
    }

    #[test]
    fn display_includes_package_and_code() {
        let err = CdcError::new(ErrorKind::Param, "core::controller", "unknown id 7");
        let rendered = err.to_string();
        assert!(rendered.contains("core::controller"));
        assert!(rendered.contains("unknown id 7"));
    }
}
