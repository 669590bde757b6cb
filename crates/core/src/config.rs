use std::fs;
use std::path::Path;

use crate::domain::Credentials;
use crate::error::{Error, Result};

impl Credentials {
    /// Load credentials from a JSON file:
    /// `{"api_key": "...", "user_id": "...", "api_secret": "..."}`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            Error::MalformedResponse(format!(
                "credentials file {}: {e}",
                path.display()
            ))
        })
    }
}
