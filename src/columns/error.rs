use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColumnError {
    #[error("Unknown weather variable '{0}'")]
    UnknownVariable(String),
}
