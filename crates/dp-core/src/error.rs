use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DpError {
    #[error("Unknown {what}: {name}")]
    Unknown { what: &'static str, name: String },
}
