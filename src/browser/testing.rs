// src/browser/testing.rs

//! In-memory `PageDriver` that replays HTML snapshots.
//!
//! Every forward scroll reveals the next snapshot; a jump to the bottom
//! reveals the last one. Navigation and reload return to the first.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use scraper::{Html, Selector};

use super::{PageDriver, StoredCookie};
use crate::error::{AppError, Result};

const BASE: &str = "https://www.threads.net/";
const LOGIN_URL: &str = "https://www.threads.net/login";
const SESSION_COOKIE: &str = "sessionid";

const LOGIN_FORM: &str = r#"<html><body><form>
    <input type="text" autocomplete="username">
    <input type="password">
    <div role="button" type="submit">ログイン</div>
</form></body></html>"#;

pub struct ScriptedDriver {
    snapshots: Vec<String>,
    after_reload: Option<Vec<String>>,
    position: usize,
    url: String,
    login_flow: Option<bool>,
    jar: Vec<StoredCookie>,
    pointed_at: Option<String>,
    events: Arc<Mutex<Vec<String>>>,
}

impl ScriptedDriver {
    pub fn new(snapshots: Vec<String>) -> Self {
        Self {
            snapshots,
            after_reload: None,
            position: 0,
            url: "about:blank".into(),
            login_flow: None,
            jar: Vec::new(),
            pointed_at: None,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Gate the home feed behind a login form that accepts or rejects submissions.
    pub fn with_login_flow(mut self, accept: bool) -> Self {
        self.login_flow = Some(accept);
        self
    }

    /// Snapshots served after the first reload.
    pub fn with_reload_snapshots(mut self, snapshots: Vec<String>) -> Self {
        self.after_reload = Some(snapshots);
        self
    }

    /// Shared event log: `navigate:<url>`, `reload`, `scroll:<dy>`, `char:<c>`, `close` ...
    pub fn events(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.events)
    }

    fn record(&self, event: impl Into<String>) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.into());
        }
    }

    fn on_login_page(&self) -> bool {
        self.login_flow.is_some() && self.url.contains("/login")
    }

    fn current_html(&self) -> &str {
        if self.on_login_page() {
            return LOGIN_FORM;
        }
        self.snapshots
            .get(self.position)
            .map(String::as_str)
            .unwrap_or("<html></html>")
    }

    fn targets_submit(selector: &str) -> bool {
        selector.contains("submit") || selector.contains("button")
    }

    fn submit(&mut self) {
        if self.on_login_page() && self.login_flow == Some(true) {
            self.jar.push(StoredCookie {
                name: SESSION_COOKIE.into(),
                value: "granted".into(),
                domain: ".threads.net".into(),
                path: "/".into(),
                expires: -1.0,
                http_only: true,
                secure: true,
                same_site: None,
            });
            self.url = BASE.into();
            self.position = 0;
        }
    }
}

impl PageDriver for ScriptedDriver {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.record(format!("navigate:{url}"));
        let gated = self.login_flow.is_some()
            && !url.contains("/login")
            && !self.jar.iter().any(|c| c.name == SESSION_COOKIE);
        self.url = if gated { LOGIN_URL.into() } else { url.into() };
        self.position = 0;
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        self.record("reload");
        if let Some(snapshots) = self.after_reload.take() {
            self.snapshots = snapshots;
        }
        self.position = 0;
        Ok(())
    }

    fn current_url(&self) -> String {
        self.url.clone()
    }

    fn html(&mut self) -> Result<String> {
        Ok(self.current_html().to_string())
    }

    fn evaluate(&mut self, script: &str) -> Result<serde_json::Value> {
        self.record("evaluate");
        if script.contains("new MouseEvent('click'") {
            if Self::targets_submit(script) {
                self.submit();
            }
            return Ok(serde_json::Value::Bool(true));
        }
        if script.contains("HTMLInputElement") {
            return Ok(serde_json::Value::Bool(true));
        }
        Ok(serde_json::Value::Null)
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        if self.count(selector)? > 0 {
            Ok(())
        } else {
            Err(AppError::timeout(format!(
                "'{selector}' absent after {timeout:?}"
            )))
        }
    }

    fn count(&mut self, selector: &str) -> Result<usize> {
        let parsed = Selector::parse(selector).map_err(|e| AppError::selector(selector, e))?;
        Ok(Html::parse_document(self.current_html()).select(&parsed).count())
    }

    fn scroll_by(&mut self, dy: i64) -> Result<()> {
        self.record(format!("scroll:{dy}"));
        if dy > 0 {
            self.position = (self.position + 1).min(self.snapshots.len().saturating_sub(1));
        }
        Ok(())
    }

    fn scroll_to_bottom(&mut self) -> Result<()> {
        self.record("bottom");
        self.position = self.snapshots.len().saturating_sub(1);
        Ok(())
    }

    fn click(&mut self, selector: &str) -> Result<()> {
        self.record(format!("click:{selector}"));
        if Self::targets_submit(selector) {
            self.submit();
        }
        Ok(())
    }

    fn element_center(&mut self, selector: &str) -> Result<(f64, f64)> {
        self.pointed_at = Some(selector.to_string());
        Ok((320.0, 240.0))
    }

    fn move_pointer(&mut self, _x: f64, _y: f64) -> Result<()> {
        Ok(())
    }

    fn click_at(&mut self, x: f64, y: f64) -> Result<()> {
        self.record(format!("click_at:{x},{y}"));
        if self.pointed_at.as_deref().is_some_and(Self::targets_submit) {
            self.submit();
        }
        Ok(())
    }

    fn focus(&mut self, selector: &str) -> Result<()> {
        self.record(format!("focus:{selector}"));
        Ok(())
    }

    fn send_char(&mut self, c: char) -> Result<()> {
        self.record(format!("char:{c}"));
        Ok(())
    }

    fn press_enter(&mut self) -> Result<()> {
        self.record("enter");
        self.submit();
        Ok(())
    }

    fn cookies(&mut self) -> Result<Vec<StoredCookie>> {
        Ok(self.jar.clone())
    }

    fn set_cookies(&mut self, cookies: &[StoredCookie]) -> Result<()> {
        self.record("set_cookies");
        self.jar = cookies.to_vec();
        Ok(())
    }

    fn close(&mut self) {
        self.record("close");
    }
}
