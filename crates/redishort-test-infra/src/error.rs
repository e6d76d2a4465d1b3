use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestInfraError {
    /// The container could not be started or inspected.
    #[error("test container failed: {0}")]
    Container(#[from] testcontainers::TestcontainersError),
}

pub type Result<T> = std::result::Result<T, TestInfraError>;
