use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Unknown alias: @{name}\nNo such alias is registered. Run with --list-aliases to see what is available,\nor add it to the config file.")]
    UnknownAlias { name: String },

    #[error("Both endpoints are remote:\n  source:      {source}\n  destination: {dest}\nrsync cannot copy between two remote hosts directly.\nRun relay on one of the two hosts so that one side is local.")]
    RemoteToRemote { r#source: String, dest: String },

    // User declined the confirmation prompt. Not an error condition,
    // but the process still exits non-zero.
    #[error("aborted by user")]
    Aborted,

    #[error("Transfer failed: {source} -> {dest}\nrsync exited with status {status}.")]
    TransferFailed {
        r#source: String,
        dest: String,
        status: i32,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
