use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "I/O error for {path_desc}: {source}",
        path_desc = PathDisplay(path)
    )]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} '{input}': {details} (position {position})")]
    Parse {
        format: &'static str,
        input: String,
        position: usize,
        details: String,
    },

    #[error("invalid {format} record on line {line_number}: {details}")]
    InvalidRecord {
        format: &'static str,
        line_number: usize,
        details: String,
    },
}

impl Error {
    pub fn from_io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { path, source }
    }

    pub fn parse(
        format: &'static str,
        input: impl Into<String>,
        position: usize,
        details: impl Into<String>,
    ) -> Self {
        Self::Parse {
            format,
            input: input.into(),
            position,
            details: details.into(),
        }
    }

    pub fn invalid_record(
        format: &'static str,
        line_number: usize,
        details: impl Into<String>,
    ) -> Self {
        Self::InvalidRecord {
            format,
            line_number,
            details: details.into(),
        }
    }
}

struct PathDisplay<'a>(&'a Option<PathBuf>);

impl<'a> fmt::Display for PathDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(p) => write!(f, "file '{}'", p.display()),
            None => write!(f, "stream source"),
        }
    }
}
