// src/browser/mod.rs

//! Browser automation: the driver seam, the Chrome binding and the Session
//! that layers pacing, authentication and cookie persistence on top.
//!
//! Everything here is synchronous. Callers run sessions on blocking threads.

pub mod chrome;
pub mod cookies;
pub mod humanize;
pub mod scroll;
pub mod session;

#[cfg(test)]
pub mod testing;

use std::time::Duration;

use crate::error::Result;

pub use chrome::ChromeDriver;
pub use cookies::{CookieStore, StoredCookie};
pub use humanize::{ActionMechanism, Pacer};
pub use scroll::ScrollStrategy;
pub use session::{AuthState, Session};

/// Low-level page operations a Session needs from a browser.
///
/// Every method may fail with a transient driver fault. The Session decides
/// which faults are worth propagating.
pub trait PageDriver: Send {
    fn navigate(&mut self, url: &str) -> Result<()>;
    fn reload(&mut self) -> Result<()>;
    fn current_url(&self) -> String;

    /// Serialized DOM of the current page.
    fn html(&mut self) -> Result<String>;

    fn evaluate(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Block until `selector` matches or `timeout` elapses.
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Number of elements matching `selector`.
    fn count(&mut self, selector: &str) -> Result<usize>;

    fn scroll_by(&mut self, dy: i64) -> Result<()>;
    fn scroll_to_bottom(&mut self) -> Result<()>;

    /// Native click on the first element matching `selector`.
    fn click(&mut self, selector: &str) -> Result<()>;

    /// Viewport coordinates of the centre of the first match.
    fn element_center(&mut self, selector: &str) -> Result<(f64, f64)>;

    fn move_pointer(&mut self, x: f64, y: f64) -> Result<()>;
    fn click_at(&mut self, x: f64, y: f64) -> Result<()>;

    fn focus(&mut self, selector: &str) -> Result<()>;
    fn send_char(&mut self, c: char) -> Result<()>;
    fn press_enter(&mut self) -> Result<()>;

    fn cookies(&mut self) -> Result<Vec<StoredCookie>>;
    fn set_cookies(&mut self, cookies: &[StoredCookie]) -> Result<()>;

    /// Release the underlying browser. Must be idempotent.
    fn close(&mut self);
}

/// Operator login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read every credential pair from the process environment.
    pub fn all_from_env(prefix: &str) -> Vec<Self> {
        Self::all_from_lookup(prefix, |key| std::env::var(key).ok())
    }

    /// Read `<PREFIX>_USERNAME<n>`/`<PREFIX>_PASSWORD<n>` for n = 1.. until the
    /// first gap, then the unnumbered pair if its username is not already listed.
    pub fn all_from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Vec<Self> {
        let read = |suffix: &str| {
            let user = lookup(&format!("{prefix}_USERNAME{suffix}"))?;
            let pass = lookup(&format!("{prefix}_PASSWORD{suffix}"))?;
            (!user.trim().is_empty() && !pass.is_empty()).then(|| Self::new(user.trim(), pass))
        };

        let mut found = Vec::new();
        for n in 1.. {
            match read(&n.to_string()) {
                Some(creds) => found.push(creds),
                None => break,
            }
        }
        if let Some(creds) = read("")
            && !found.iter().any(|c| c.username == creds.username)
        {
            found.push(creds);
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_credentials_numbered_then_plain() {
        let vars = env(&[
            ("THREADS_USERNAME1", "alpha"),
            ("THREADS_PASSWORD1", "p1"),
            ("THREADS_USERNAME2", "beta"),
            ("THREADS_PASSWORD2", "p2"),
            ("THREADS_USERNAME4", "skipped"),
            ("THREADS_PASSWORD4", "p4"),
            ("THREADS_USERNAME", "gamma"),
            ("THREADS_PASSWORD", "p"),
        ]);
        let creds = Credentials::all_from_lookup("THREADS", |k| vars.get(k).cloned());
        let names: Vec<&str> = creds.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_credentials_plain_not_duplicated() {
        let vars = env(&[
            ("THREADS_USERNAME1", "alpha"),
            ("THREADS_PASSWORD1", "p1"),
            ("THREADS_USERNAME", "alpha"),
            ("THREADS_PASSWORD", "p1"),
        ]);
        let creds = Credentials::all_from_lookup("THREADS", |k| vars.get(k).cloned());
        assert_eq!(creds.len(), 1);
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("alpha", "secret");
        assert!(!format!("{creds:?}").contains("secret"));
    }
}
