use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NetworkError>;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error in {file:?}, line {line}: {msg}")]
    Parse { file: PathBuf, line: usize, msg: String },

    #[error("Node {0} does not exist")]
    NodeOutOfRange(usize),

    #[error("Link {0} does not exist")]
    LinkOutOfRange(usize),

    #[error("Invalid {name} {value}")]
    InvalidValue { name: &'static str, value: f64 },

    #[error("Links {0} and {1} do not run in opposite directions between the same nodes")]
    NotOppositeLinks(usize, usize),

    #[error("Node {node} is the origin of OD pairs {origin_of:?} and the destination of OD pairs \
             {destination_of:?}")]
    DemandConflict { node: usize, origin_of: Vec<usize>, destination_of: Vec<usize> },

    #[error("Invalid configuration: {0}")]
    Config(String),
}
