use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot is missing table `{0}`")]
    MissingTable(String),
    #[error("snapshot version `{found}` is newer than supported `{supported}`")]
    UnsupportedVersion { found: String, supported: String },
    #[error("snapshot version `{0}` is not a valid version tag")]
    InvalidVersion(String),
}
