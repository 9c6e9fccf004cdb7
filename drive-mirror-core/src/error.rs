use crate::contract::ServiceError;

/// Error for core operations that fail as a whole.
///
/// Item-local failures (one file, one folder listing) never surface here; they
/// are logged and recorded in the operation's report instead.
#[derive(Debug)]
pub enum SyncError {
    Io(std::io::Error),
    Service(ServiceError),
    Config(String),
    Input(String),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Io(e) => write!(f, "I/O error: {e}"),
            SyncError::Service(e) => write!(f, "remote service error: {e}"),
            SyncError::Config(msg) => write!(f, "invalid configuration: {msg}"),
            SyncError::Input(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Io(e) => Some(e),
            SyncError::Service(e) => Some(e.as_ref()),
            SyncError::Config(_) | SyncError::Input(_) => None,
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(e: std::io::Error) -> Self {
        SyncError::Io(e)
    }
}

impl From<ServiceError> for SyncError {
    fn from(e: ServiceError) -> Self {
        SyncError::Service(e)
    }
}
