use thiserror::Error;

use crate::{
    data::BenchmarkOutput,
    dates::{self, DateError},
};

/// Reasons a submitted run is rejected before it reaches the store.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot decode benchmark run: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Date(#[from] DateError),

    #[error("benchmark run has an empty commit")]
    EmptyCommit,

    #[error("commit '{0}' cannot be used in a file name")]
    InvalidCommit(String),
}

pub fn validate(output: &BenchmarkOutput) -> Result<(), IngestError> {
    if output.commit.trim().is_empty() {
        return Err(IngestError::EmptyCommit);
    }
    if output.commit.contains(['/', '\\']) || output.commit.starts_with('.') {
        return Err(IngestError::InvalidCommit(output.commit.clone()));
    }
    dates::resolve(&output.date)?;
    Ok(())
}

/// Decodes one JSON encoded run and checks it can be stored.
pub fn decode(body: &[u8]) -> Result<BenchmarkOutput, IngestError> {
    let output: BenchmarkOutput = serde_json::from_slice(body)?;
    validate(&output)?;
    Ok(output)
}
