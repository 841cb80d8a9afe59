// src/browser/chrome.rs

//! Chrome binding for `PageDriver`.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::browser::tab::point::Point;
use headless_chrome::protocol::cdp::Network::CookieParam;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::json;

use super::{PageDriver, StoredCookie};
use crate::error::{AppError, Result};
use crate::models::SessionConfig;

/// Hides the automation flag and fills in the properties headless Chrome leaves empty.
const STEALTH_SCRIPT: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
    Object.defineProperty(navigator, 'languages', { get: () => ['ja-JP', 'ja', 'en-US', 'en'] });
"#;

/// A Chrome process with one tab.
pub struct ChromeDriver {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl ChromeDriver {
    /// Launch Chrome with stealth flags.
    pub fn launch(config: &SessionConfig, headless: bool) -> Result<Self> {
        let user_agent_arg = format!("--user-agent={}", config.user_agent);
        let lang_arg = format!("--lang={}", config.language);
        let args: Vec<&OsStr> = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-notifications"),
            OsStr::new(&user_agent_arg),
            OsStr::new(&lang_arg),
        ];

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .window_size(Some(config.window_size))
            .idle_browser_timeout(Duration::from_secs(300))
            .args(args)
            .build()
            .map_err(|e| AppError::browser(format!("Invalid launch options: {e}")))?;

        let browser = Browser::new(options)
            .map_err(|e| AppError::browser(format!("Chrome failed to start: {e}")))?;
        let tab = browser.new_tab().map_err(AppError::browser)?;
        tab.set_default_timeout(config.wait_timeout());

        log::debug!("Chrome started (headless={headless})");
        Ok(Self {
            browser: Some(browser),
            tab,
        })
    }

    fn hide_automation(&self) {
        if let Err(e) = self.tab.evaluate(STEALTH_SCRIPT, false) {
            log::debug!("Stealth override failed: {e}");
        }
    }
}

impl PageDriver for ChromeDriver {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(AppError::browser)?;
        self.hide_automation();
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        self.tab
            .reload(false, None)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(AppError::browser)?;
        self.hide_automation();
        Ok(())
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }

    fn html(&mut self) -> Result<String> {
        self.tab.get_content().map_err(AppError::browser)
    }

    fn evaluate(&mut self, script: &str) -> Result<serde_json::Value> {
        let object = self.tab.evaluate(script, false).map_err(AppError::browser)?;
        Ok(object.value.unwrap_or(serde_json::Value::Null))
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|e| AppError::timeout(format!("waiting for '{selector}': {e}")))
    }

    fn count(&mut self, selector: &str) -> Result<usize> {
        let script = format!(
            "document.querySelectorAll({}).length",
            serde_json::to_string(selector)?
        );
        let value = self.evaluate(&script)?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    fn scroll_by(&mut self, dy: i64) -> Result<()> {
        self.evaluate(&format!("window.scrollBy(0, {dy})"))?;
        Ok(())
    }

    fn scroll_to_bottom(&mut self) -> Result<()> {
        self.evaluate("window.scrollTo(0, document.body.scrollHeight)")?;
        Ok(())
    }

    fn click(&mut self, selector: &str) -> Result<()> {
        self.tab
            .find_element(selector)
            .and_then(|element| element.click().map(|_| ()))
            .map_err(AppError::browser)
    }

    fn element_center(&mut self, selector: &str) -> Result<(f64, f64)> {
        let point = self
            .tab
            .find_element(selector)
            .and_then(|element| element.get_midpoint())
            .map_err(AppError::browser)?;
        Ok((point.x, point.y))
    }

    fn move_pointer(&mut self, x: f64, y: f64) -> Result<()> {
        self.tab
            .move_mouse_to_point(Point { x, y })
            .map(|_| ())
            .map_err(AppError::browser)
    }

    fn click_at(&mut self, x: f64, y: f64) -> Result<()> {
        self.tab
            .click_point(Point { x, y })
            .map(|_| ())
            .map_err(AppError::browser)
    }

    fn focus(&mut self, selector: &str) -> Result<()> {
        self.tab
            .find_element(selector)
            .and_then(|element| element.focus().map(|_| ()))
            .map_err(AppError::browser)
    }

    fn send_char(&mut self, c: char) -> Result<()> {
        self.tab
            .send_character(&c.to_string())
            .map(|_| ())
            .map_err(AppError::browser)
    }

    fn press_enter(&mut self) -> Result<()> {
        self.tab
            .press_key("Enter")
            .map(|_| ())
            .map_err(AppError::browser)
    }

    fn cookies(&mut self) -> Result<Vec<StoredCookie>> {
        let cookies = self.tab.get_cookies().map_err(AppError::browser)?;
        cookies
            .into_iter()
            .map(|c| -> Result<StoredCookie> {
                Ok(serde_json::from_value(serde_json::to_value(c)?)?)
            })
            .collect()
    }

    fn set_cookies(&mut self, cookies: &[StoredCookie]) -> Result<()> {
        let params = cookies
            .iter()
            .map(|c| -> Result<CookieParam> {
                let mut param = json!({
                    "name": c.name,
                    "value": c.value,
                    "domain": c.domain,
                    "path": c.path,
                    "secure": c.secure,
                    "httpOnly": c.http_only,
                });
                if c.expires > 0.0 {
                    param["expires"] = json!(c.expires);
                }
                Ok(serde_json::from_value(param)?)
            })
            .collect::<Result<Vec<_>>>()?;
        self.tab.set_cookies(params).map_err(AppError::browser)
    }

    fn close(&mut self) {
        if let Some(browser) = self.browser.take() {
            if let Err(e) = self.tab.close(false) {
                log::debug!("Tab close failed: {e}");
            }
            drop(browser);
            log::debug!("Chrome closed");
        }
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        self.close();
    }
}
