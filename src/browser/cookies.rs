// src/browser/cookies.rs

//! Per-account cookie persistence.
//!
//! A missing or unparsable cookie file means "no saved session".

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Browser cookie in the shape the DevTools protocol reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Seconds since the epoch; negative for session cookies
    #[serde(default = "default_expires")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_path() -> String {
    "/".into()
}

fn default_expires() -> f64 {
    -1.0
}

/// Cookie file for one operator account.
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved cookies, or an empty list when none are usable.
    pub fn load(&self) -> Vec<StoredCookie> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::warn!("Cookie file {:?} unreadable: {}", self.path, e);
                return Vec::new();
            }
        };
        match serde_json::from_slice::<Vec<StoredCookie>>(&bytes) {
            Ok(cookies) => cookies,
            Err(e) => {
                log::warn!("Cookie file {:?} is corrupt, ignoring: {}", self.path, e);
                Vec::new()
            }
        }
    }

    /// Replace the cookie file atomically.
    pub fn save(&self, cookies: &[StoredCookie]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(cookies)?;
        let temp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp)?;
            file.write_all(&json)?;
            file.flush()?;
        }
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}
