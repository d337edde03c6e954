//! simulation errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("clocked element error: {0}")]
    Clocked(anyhow::Error),
    #[error("clock error: {0}")]
    Clock(String),
}

impl Error {
    /// wrap an error raised by a clocked component
    pub fn clocked<E>(e: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Clocked(e.into())
    }
}
