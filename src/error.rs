use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A record that could not be parsed. `line_number` is 1-based.
    #[error("invalid input at line {line_number}: {msg}\n{line}")]
    InvalidInput {
        line_number: usize,
        line: String,
        msg: String,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unable to parse fastx: {0}")]
    Fastx(#[from] needletail::errors::ParseError),
    #[error(transparent)]
    Htslib(#[from] rust_htslib::errors::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn invalid_input(line_number: usize, line: &str, msg: impl Into<String>) -> Error {
        Error::InvalidInput {
            line_number,
            line: line.to_string(),
            msg: msg.into(),
        }
    }
}
