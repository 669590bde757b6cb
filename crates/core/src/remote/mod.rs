pub mod flickr;

use std::thread;
use std::time::Duration;

use crate::domain::{AlbumRecord, CommentRecord, PhotoRecord};
use crate::error::{Error, Result};

/// Remote metadata source the sync engine pulls from.
///
/// Implementations paginate internally and return complete listings of
/// strongly-typed records; the engine never sees raw payloads or page
/// boundaries. Tests inject scripted fakes here.
pub trait MetadataSource {
    /// All albums owned by the user.
    fn list_albums(&self) -> Result<Vec<AlbumRecord>>;

    /// All photos uploaded at or after the watermark (unix seconds).
    fn list_photos_since(&self, watermark: i64) -> Result<Vec<PhotoRecord>>;

    /// Current album memberships of one photo.
    fn photo_albums(&self, photo_id: &str) -> Result<Vec<String>>;

    /// Current comments on one photo.
    fn photo_comments(&self, photo_id: &str) -> Result<Vec<CommentRecord>>;

    /// Raw thumbnail bytes for a photo's thumbnail URL.
    fn fetch_thumbnail(&self, url: &str) -> Result<Vec<u8>>;
}

/// Bounded exponential backoff for transient remote failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Zero-delay policy for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    /// Run `op`, retrying transient failures with exponential backoff.
    /// A rate-limit response sleeps for the server-indicated delay
    /// instead of the backoff schedule. Non-retryable errors and
    /// exhausted retries propagate to the caller.
    pub fn run<T>(&self, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 0u32;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt + 1 < self.max_attempts => {
                    let delay = match &e {
                        Error::RateLimited {
                            retry_after: Some(d),
                        } => *d,
                        _ => self.base_delay * 2u32.saturating_pow(attempt),
                    };
                    tracing::warn!(attempt = attempt + 1, ?delay, error = %e, "retrying remote call");
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_retry_succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::immediate(3);

        let result = policy.run(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(Error::TransientNetwork("flaky".to_string()))
            } else {
                Ok(42)
            }
        });

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_retry_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::immediate(3);

        let result: Result<()> = policy.run(|| {
            calls.set(calls.get() + 1);
            Err(Error::TransientNetwork("down".to_string()))
        });

        assert!(matches!(result, Err(Error::TransientNetwork(_))));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_retry_does_not_retry_fatal_errors() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::immediate(3);

        let result: Result<()> = policy.run(|| {
            calls.set(calls.get() + 1);
            Err(Error::Auth("bad key".to_string()))
        });

        assert!(matches!(result, Err(Error::Auth(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_retry_honours_rate_limit_delay() {
        let calls = Cell::new(0);
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
        };

        let result = policy.run(|| {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(Error::RateLimited {
                    retry_after: Some(Duration::from_millis(1)),
                })
            } else {
                Ok("ok")
            }
        });

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.get(), 2);
    }
}
