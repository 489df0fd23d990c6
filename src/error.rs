#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
