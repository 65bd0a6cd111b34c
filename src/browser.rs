use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A single browser tab driven by the scraper.
///
/// Only four primitives are required; clicks, dropdowns and scrolling are
/// built from script evaluation so fakes stay small.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Value of a JavaScript expression, `None` for undefined
    async fn evaluate(&self, script: &str) -> Result<Option<Value>>;

    /// Whether `selector` appeared before the timeout
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Current serialized DOM
    async fn content(&self) -> Result<String>;

    async fn count(&self, selector: &str) -> Result<usize> {
        let script = format!("document.querySelectorAll({}).length", js_string(selector));
        let value = self.evaluate(&script).await?;
        Ok(value.and_then(|v| v.as_u64()).unwrap_or(0) as usize)
    }

    /// Click the first match; `false` when nothing matched
    async fn click(&self, selector: &str) -> Result<bool> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
            js_string(selector)
        );
        Ok(self.evaluate(&script).await?.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    /// Pick an option of `<select name=...>` and fire `change` so AJAX filters react
    async fn select_option(&self, select_name: &str, value: &str) -> Result<bool> {
        let script = format!(
            "(() => {{ const s = document.querySelector({}); if (!s) return false; \
             s.value = {}; s.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
            js_string(&format!(r#"select[name="{}"]"#, select_name)),
            js_string(value)
        );
        Ok(self.evaluate(&script).await?.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.evaluate("window.scrollTo(0, document.body.scrollHeight)").await?;
        Ok(())
    }

    async fn scroll_by(&self, dy: i64) -> Result<()> {
        self.evaluate(&format!("window.scrollBy(0, {})", dy)).await?;
        Ok(())
    }
}

/// Quote `s` as a JavaScript string literal
pub fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Headless Chrome tab
pub struct ChromePage {
    // Dropping the browser kills the tab, so it lives as long as the page.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromePage {
    pub fn launch(headless: bool) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open tab")?;

        Ok(Self { _browser: browser, tab })
    }

    /// Run a blocking tab call off the async runtime
    async fn with_tab<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .context("Browser task panicked")?
    }
}

#[async_trait]
impl BrowserPage for ChromePage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        debug!("Navigating to {}", url);
        let url = url.to_string();
        self.with_tab(move |tab| {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&url)
                .with_context(|| format!("Failed to navigate to {}", url))?;
            tab.wait_until_navigated()
                .with_context(|| format!("Timed out loading {}", url))?;
            Ok(())
        })
        .await
    }

    async fn evaluate(&self, script: &str) -> Result<Option<Value>> {
        let script = script.to_string();
        self.with_tab(move |tab| {
            let result = tab.evaluate(&script, false).context("Script evaluation failed")?;
            Ok(result.value)
        })
        .await
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            Ok(tab
                .wait_for_element_with_custom_timeout(&selector, timeout)
                .is_ok())
        })
        .await
    }

    async fn content(&self) -> Result<String> {
        self.with_tab(|tab| tab.get_content().context("Failed to read page HTML"))
            .await
    }
}
