use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("rate limited by remote service (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication rejected by remote service: {0}")]
    Auth(String),

    #[error("malformed remote response: {0}")]
    MalformedResponse(String),

    #[error("remote API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("association references unknown {kind} {id}")]
    DanglingReference { kind: &'static str, id: String },

    #[error("library schema version {db} is newer than supported version {supported}")]
    SchemaTooNew { db: u32, supported: u32 },

    #[error("sync pass interrupted")]
    Interrupted,
}

impl Error {
    /// Errors worth retrying with backoff. Everything else either aborts
    /// the pass or fails the current item permanently.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransientNetwork(_) | Error::RateLimited { .. })
    }

    /// Errors that abort an entire sync pass, as opposed to failing a
    /// single item. The watermark must not advance past one of these.
    pub fn is_fatal_for_pass(&self) -> bool {
        matches!(
            self,
            Error::Auth(_)
                | Error::MalformedResponse(_)
                | Error::Database(_)
                | Error::Io(_)
                | Error::SchemaTooNew { .. }
                | Error::Interrupted
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
