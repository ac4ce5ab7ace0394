use crate::CoreError;

/// Expected reasons for an operation to produce nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absence {
    NoBackup,
    Cancelled,
}

/// Three-way result returned by every [`crate::BackupService`] operation.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Absent(Absence),
    Failed(CoreError),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Absent(Absence::Cancelled))
    }

    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&CoreError> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> From<Result<T, CoreError>> for Outcome<T> {
    fn from(result: Result<T, CoreError>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Failed(err),
        }
    }
}
