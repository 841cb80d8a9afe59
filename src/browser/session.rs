// src/browser/session.rs

//! Owned browser session with login, navigation, scrolling and cookie
//! primitives.
//!
//! Primitives report failure through their return value and log the cause;
//! only construction can fail the caller.

use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::chrome::ChromeDriver;
use super::cookies::CookieStore;
use super::humanize::{ActionMechanism, Pacer, pointer_path};
use super::scroll::{ScrollMove, ScrollStep, ScrollStrategy, StepPause};
use super::{Credentials, PageDriver};
use crate::error::{AppError, Result};
use crate::models::{Config, SelectorConfig, SessionConfig};
use crate::utils;

/// Authentication state of a Session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticating,
    Authenticated,
    Failed,
}

/// A browser driver plus the pacing and state that make it usable for harvesting.
pub struct Session<D: PageDriver> {
    driver: D,
    config: SessionConfig,
    selectors: SelectorConfig,
    pacer: Pacer,
    cookies: Option<CookieStore>,
    state: AuthState,
    pointer: (f64, f64),
    cancel: CancellationToken,
    closed: bool,
}

impl Session<ChromeDriver> {
    /// Launch Chrome and wrap it in a Session.
    pub fn open(config: &Config, headless: bool, cancel: CancellationToken) -> Result<Self> {
        let driver = ChromeDriver::launch(&config.session, headless)?;
        Ok(Self::with_driver(
            driver,
            config,
            Pacer::new(config.delays.clone()),
            cancel,
        ))
    }
}

impl<D: PageDriver> Session<D> {
    pub fn with_driver(driver: D, config: &Config, mut pacer: Pacer, cancel: CancellationToken) -> Self {
        pacer.watch(cancel.clone());
        Self {
            driver,
            config: config.session.clone(),
            selectors: config.extraction.selectors.clone(),
            pacer,
            cookies: None,
            state: AuthState::Anonymous,
            pointer: (0.0, 0.0),
            cancel,
            closed: false,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn current_url(&self) -> String {
        self.driver.current_url()
    }

    /// Bind the cookie file of an operator account.
    pub fn use_account(&mut self, account: &str) {
        self.cookies = Some(CookieStore::new(self.config.cookie_file(account)));
    }

    /// Authenticate, preferring saved cookies over the login form.
    pub fn login(&mut self, credentials: &Credentials) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.state = AuthState::Authenticating;
        self.use_account(&credentials.username);

        if self.load_cookies() && self.home_feed_loads() {
            log::info!("Session restored from cookies for {}", credentials.username);
            self.state = AuthState::Authenticated;
            return true;
        }

        match self.submit_login_form(credentials) {
            Ok(true) => {
                log::info!(
                    "Logged in as {} (now at {})",
                    credentials.username,
                    self.current_url()
                );
                self.state = AuthState::Authenticated;
                self.save_cookies();
                true
            }
            Ok(false) => {
                log::warn!(
                    "Login rejected for {}: still on {}",
                    credentials.username,
                    self.current_url()
                );
                self.state = AuthState::Failed;
                false
            }
            Err(e) => {
                log::warn!("Login failed for {}: {}", credentials.username, e);
                self.state = AuthState::Failed;
                false
            }
        }
    }

    /// Open a URL. Returns false on driver faults or cancellation.
    pub fn navigate(&mut self, url: &str) -> bool {
        if self.is_cancelled() {
            return false;
        }
        log::debug!("Navigating to {url}");
        match self.driver.navigate(url) {
            Ok(()) => {
                self.pacer.pause();
                true
            }
            Err(e) => {
                log::warn!("Navigation to {url} failed: {e}");
                false
            }
        }
    }

    /// Open the home feed.
    pub fn navigate_home(&mut self) -> bool {
        match utils::page_url(&self.config.base_url, "/") {
            Ok(url) => self.navigate(url.as_str()),
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }

    /// Reload the current page, keeping cookies.
    pub fn reload(&mut self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        match self.driver.reload() {
            Ok(()) => {
                self.pacer.pause_heavy();
                true
            }
            Err(e) => {
                log::warn!("Reload failed: {e}");
                false
            }
        }
    }

    /// Wait until `selector` is present, bounded by the configured timeout.
    pub fn wait_for(&mut self, selector: &str) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let timeout = self.config.wait_timeout();
        match self.driver.wait_for(selector, timeout) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("{e}");
                false
            }
        }
    }

    /// Run `n` steps of `strategy` and return how many feed items are loaded.
    pub fn scroll_incrementally(&mut self, strategy: ScrollStrategy, n: usize) -> usize {
        let p = self.pacer.reversal_probability();
        let plan = strategy.plan(n, self.pacer.rng(), |rng| rng.random_bool(p));
        for step in &plan {
            if self.is_cancelled() {
                break;
            }
            self.run_step(step);
        }
        self.loaded_count()
    }

    /// Force a jump to the bottom of the page.
    pub fn jump_to_bottom(&mut self) -> usize {
        if self.is_cancelled() {
            return self.loaded_count();
        }
        if let Err(e) = self.driver.scroll_to_bottom() {
            log::debug!("Jump to bottom failed: {e}");
        }
        self.pacer.settle();
        self.loaded_count()
    }

    /// Number of feed items currently in the DOM.
    pub fn loaded_count(&mut self) -> usize {
        let selector = self.config.item_selector.clone();
        self.driver.count(&selector).unwrap_or_else(|e| {
            log::debug!("Item count failed: {e}");
            0
        })
    }

    /// Serialized DOM of the current page.
    pub fn page_html(&mut self) -> Option<String> {
        self.driver
            .html()
            .map_err(|e| log::warn!("Page read failed: {e}"))
            .ok()
    }

    /// Click the first element matching `selector` with a randomly chosen mechanism.
    pub fn click(&mut self, selector: &str) -> bool {
        match self.click_with(selector) {
            Ok(()) => {
                self.pacer.pause();
                true
            }
            Err(e) => {
                log::debug!("Click on '{selector}' failed: {e}");
                false
            }
        }
    }

    /// Type `text` into the field matching `selector`.
    pub fn type_into(&mut self, selector: &str, text: &str) -> bool {
        match self.type_with(selector, text) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Typing into '{selector}' failed: {e}");
                false
            }
        }
    }

    /// Persist the current cookies for the bound account.
    pub fn save_cookies(&mut self) -> bool {
        let Some(store) = self.cookies.clone() else {
            return false;
        };
        let saved = self
            .driver
            .cookies()
            .and_then(|cookies| store.save(&cookies).map(|_| cookies.len()));
        match saved {
            Ok(n) => {
                log::debug!("Saved {n} cookies to {:?}", store.path());
                true
            }
            Err(e) => {
                log::warn!("Saving cookies failed: {e}");
                false
            }
        }
    }

    /// Load saved cookies for the bound account into the browser.
    pub fn load_cookies(&mut self) -> bool {
        let Some(store) = self.cookies.as_ref() else {
            return false;
        };
        let cookies = store.load();
        if cookies.is_empty() {
            return false;
        }
        match self.driver.set_cookies(&cookies) {
            Ok(()) => {
                log::debug!("Loaded {} saved cookies", cookies.len());
                true
            }
            Err(e) => {
                log::warn!("Restoring cookies failed: {e}");
                false
            }
        }
    }

    /// Release the browser. Safe to call more than once.
    pub fn close(&mut self) {
        if !self.closed {
            self.driver.close();
            self.closed = true;
        }
    }

    fn home_feed_loads(&mut self) -> bool {
        if !self.navigate_home() || self.on_login_page() {
            return false;
        }
        let selector = self.config.item_selector.clone();
        self.wait_for(&selector)
    }

    fn on_login_page(&self) -> bool {
        self.current_url().contains(&self.config.login_path)
    }

    fn submit_login_form(&mut self, credentials: &Credentials) -> Result<bool> {
        let login_url = utils::page_url(&self.config.base_url, &self.config.login_path)?;
        if !self.navigate(login_url.as_str()) {
            return Err(AppError::browser("login page unreachable"));
        }
        self.pacer.pause_heavy();

        let chain = self.selectors.username_field.clone();
        let username_field = self
            .first_present(&chain)
            .ok_or_else(|| AppError::mismatch("username field"))?;
        self.type_with(&username_field, &credentials.username)?;
        self.pacer.pause();

        let chain = self.selectors.password_field.clone();
        let password_field = self
            .first_present(&chain)
            .ok_or_else(|| AppError::mismatch("password field"))?;
        self.type_with(&password_field, &credentials.password)?;
        self.pacer.pause();

        let chain = self.selectors.login_button.clone();
        let submitted = match self.first_present(&chain) {
            Some(button) => self.click_with(&button).is_ok(),
            None => false,
        };
        if !submitted {
            log::debug!("No login button clicked, submitting with Enter");
            self.driver.press_enter()?;
        }
        self.pacer.pause_heavy();

        Ok(!self.on_login_page())
    }

    /// First selector of `chain` present on the page, waiting once for any of them.
    fn first_present(&mut self, chain: &[String]) -> Option<String> {
        if chain.is_empty() {
            return None;
        }
        self.wait_for(&chain.join(", "));
        chain
            .iter()
            .find(|selector| matches!(self.driver.count(selector), Ok(n) if n > 0))
            .cloned()
    }

    fn click_with(&mut self, selector: &str) -> Result<()> {
        match self.pacer.choose_mechanism() {
            ActionMechanism::Direct => self.driver.click(selector),
            ActionMechanism::Script => {
                let script = format!(
                    "(() => {{ const el = document.querySelector({}); if (!el) return false; \
                     el.dispatchEvent(new MouseEvent('click', {{bubbles: true, cancelable: true, view: window}})); \
                     return true; }})()",
                    serde_json::to_string(selector)?
                );
                self.expect_script_success(&script, selector)
            }
            ActionMechanism::Pointer => {
                let (x, y) = self.move_pointer_to(selector)?;
                self.driver.click_at(x, y)
            }
        }
    }

    fn type_with(&mut self, selector: &str, text: &str) -> Result<()> {
        match self.pacer.choose_mechanism() {
            ActionMechanism::Direct => {
                self.driver.focus(selector)?;
                self.type_chars(text)
            }
            ActionMechanism::Pointer => {
                let (x, y) = self.move_pointer_to(selector)?;
                self.driver.click_at(x, y)?;
                self.type_chars(text)
            }
            ActionMechanism::Script => {
                let script = format!(
                    "(() => {{ const el = document.querySelector({}); if (!el) return false; el.focus(); \
                     const setter = Object.getOwnPropertyDescriptor(HTMLInputElement.prototype, 'value').set; \
                     setter.call(el, {}); el.dispatchEvent(new Event('input', {{bubbles: true}})); \
                     return true; }})()",
                    serde_json::to_string(selector)?,
                    serde_json::to_string(text)?
                );
                self.expect_script_success(&script, selector)
            }
        }
    }

    fn type_chars(&mut self, text: &str) -> Result<()> {
        for c in text.chars() {
            if self.is_cancelled() {
                return Err(AppError::cancelled("typing"));
            }
            self.driver.send_char(c)?;
            self.pacer.keystroke();
        }
        Ok(())
    }

    fn expect_script_success(&mut self, script: &str, selector: &str) -> Result<()> {
        match self.driver.evaluate(script)? {
            serde_json::Value::Bool(true) => Ok(()),
            _ => Err(AppError::selector(selector, "no element for scripted action")),
        }
    }

    fn move_pointer_to(&mut self, selector: &str) -> Result<(f64, f64)> {
        let target = self.driver.element_center(selector)?;
        let path = pointer_path(self.pointer, target, self.pacer.rng());
        for (x, y) in path {
            if self.is_cancelled() {
                return Err(AppError::cancelled("pointer travel"));
            }
            self.driver.move_pointer(x, y)?;
            self.pacer.pointer_step();
        }
        self.pointer = target;
        Ok(target)
    }

    fn run_step(&mut self, step: &ScrollStep) {
        let scrolled = (|| -> Result<()> {
            if let Some((back, forward)) = step.reversal {
                self.driver.scroll_by(-back)?;
                self.pacer.keystroke();
                self.driver.scroll_by(forward)?;
            }
            for movement in &step.moves {
                match movement {
                    ScrollMove::By(dy) => self.driver.scroll_by(*dy)?,
                    ScrollMove::ToBottom => self.driver.scroll_to_bottom()?,
                }
            }
            Ok(())
        })();
        if let Err(e) = scrolled {
            log::debug!("Scroll step failed: {e}");
        }
        match step.pause {
            StepPause::Baseline => self.pacer.pause(),
            StepPause::Settle => self.pacer.settle(),
            StepPause::Heavy => self.pacer.pause_heavy(),
        }
    }
}

impl<D: PageDriver> Drop for Session<D> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::StoredCookie;
    use crate::browser::testing::ScriptedDriver;
    use crate::models::{DelayConfig, DelayRange};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    const FEED: &str = r#"<html><body>
        <div data-pressable-container="true"><span>one</span></div>
        <div data-pressable-container="true"><span>two</span></div>
    </body></html>"#;

    fn config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.delays = DelayConfig::none();
        config.session.cookie_dir = dir.path().join("cookies");
        config
    }

    fn session(driver: ScriptedDriver, config: &Config) -> Session<ScriptedDriver> {
        Session::with_driver(
            driver,
            config,
            Pacer::seeded(config.delays.clone(), 42),
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_form_login_succeeds_and_saves_cookies() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let driver = ScriptedDriver::new(vec![FEED.into()]).with_login_flow(true);
        let log = driver.events();
        let mut session = session(driver, &config);

        assert!(session.login(&Credentials::new("writer", "hunter2")));
        assert_eq!(session.state(), AuthState::Authenticated);
        assert!(config.session.cookie_file("writer").exists());
        assert!(log.lock().unwrap().iter().any(|e| e.starts_with("navigate:") && e.contains("/login")));
    }

    #[test]
    fn test_rejected_login_returns_false() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let driver = ScriptedDriver::new(vec![FEED.into()]).with_login_flow(false);
        let mut session = session(driver, &config);

        assert!(!session.login(&Credentials::new("writer", "wrong")));
        assert_eq!(session.state(), AuthState::Failed);
        assert!(!config.session.cookie_file("writer").exists());
    }

    #[test]
    fn test_saved_cookies_skip_login_form() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        CookieStore::new(config.session.cookie_file("writer"))
            .save(&[StoredCookie {
                name: "sessionid".into(),
                value: "abc".into(),
                domain: ".threads.net".into(),
                path: "/".into(),
                expires: -1.0,
                http_only: true,
                secure: true,
                same_site: None,
            }])
            .unwrap();
        let driver = ScriptedDriver::new(vec![FEED.into()]).with_login_flow(true);
        let log = driver.events();
        let mut session = session(driver, &config);

        assert!(session.login(&Credentials::new("writer", "unused")));
        let events = log.lock().unwrap();
        assert!(!events.iter().any(|e| e.contains("/login")));
        assert!(!events.iter().any(|e| e.starts_with("char:")));
    }

    #[test]
    fn test_corrupt_cookie_file_falls_back_to_form() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let path = config.session.cookie_file("writer");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "garbage").unwrap();
        let driver = ScriptedDriver::new(vec![FEED.into()]).with_login_flow(true);
        let mut session = session(driver, &config);

        assert!(session.login(&Credentials::new("writer", "hunter2")));
    }

    #[test]
    fn test_scroll_reports_loaded_items() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let more = FEED.replace("</body>", r#"<div data-pressable-container="true">three</div></body>"#);
        let mut session = session(ScriptedDriver::new(vec![FEED.into(), more]), &config);

        assert!(session.navigate_home());
        assert_eq!(session.loaded_count(), 2);
        assert_eq!(session.scroll_incrementally(ScrollStrategy::Shallow, 3), 3);
    }

    #[test]
    fn test_cancelled_session_refuses_navigation() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let cancel = CancellationToken::new();
        let mut session = Session::with_driver(
            ScriptedDriver::new(vec![FEED.into()]),
            &config,
            Pacer::seeded(DelayConfig::none(), 1),
            cancel.clone(),
        );
        cancel.cancel();
        assert!(!session.navigate_home());
        assert!(!session.login(&Credentials::new("writer", "x")));
    }

    #[test]
    fn test_cancel_during_heavy_pause_returns_promptly() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.delays.heavy = DelayRange::new(5.0, 8.0);
        let cancel = CancellationToken::new();
        let mut session = Session::with_driver(
            ScriptedDriver::new(vec![FEED.into()]),
            &config,
            Pacer::seeded(config.delays.clone(), 1),
            cancel.clone(),
        );
        assert!(session.navigate_home());

        let trigger = cancel.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });
        let start = Instant::now();
        session.reload();
        canceller.join().unwrap();

        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(!session.reload());
    }

    #[test]
    fn test_drop_closes_driver_once() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let driver = ScriptedDriver::new(vec![FEED.into()]);
        let log = driver.events();
        {
            let mut session = session(driver, &config);
            session.close();
        }
        let closes = log.lock().unwrap().iter().filter(|e| *e == "close").count();
        assert_eq!(closes, 1);
    }
}
