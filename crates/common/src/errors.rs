use std::path::PathBuf;

/// The typed error kinds from the error handling design: each is attached to a
/// human message and (where useful) to the file/subvolume/location that caused it.
#[derive(thiserror::Error, Debug)]
pub enum RefindBtrfsError {
    #[error("partition error: {message}")]
    PartitionError { message: String },

    #[error("subvolume error: {message}")]
    SubvolumeError { message: String },

    #[error("refind config error ({path}): {message}")]
    RefindConfigError { path: PathBuf, message: String },

    #[error("refind config syntax error at {path}:{line}:{column}: {message}")]
    RefindSyntaxError {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("package config error: {message}")]
    PackageConfigError { message: String },

    /// Root itself is a snapshot and the user opted out via `exit_if_root_is_snapshot`.
    #[error("unsupported configuration: {message}")]
    UnsupportedConfiguration { message: String },

    /// Nothing to do this run.
    #[error("unchanged configuration: {message}")]
    UnchangedConfiguration { message: String },
}

impl RefindBtrfsError {
    /// `Unchanged` and `Unsupported` are benign: the run exits 0 with a warning logged.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            RefindBtrfsError::UnchangedConfiguration { .. }
                | RefindBtrfsError::UnsupportedConfiguration { .. }
        )
    }

    pub fn partition(message: impl Into<String>) -> Self {
        RefindBtrfsError::PartitionError {
            message: message.into(),
        }
    }

    pub fn subvolume(message: impl Into<String>) -> Self {
        RefindBtrfsError::SubvolumeError {
            message: message.into(),
        }
    }

    pub fn refind_config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        RefindBtrfsError::RefindConfigError {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for RefindBtrfsError {
    fn from(err: std::io::Error) -> Self {
        RefindBtrfsError::PartitionError {
            message: err.to_string(),
        }
    }
}

pub type Result<T, E = RefindBtrfsError> = core::result::Result<T, E>;
