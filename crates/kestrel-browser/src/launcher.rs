//! Launches a headless Chrome and hands out chain sessions bound to it.

use crate::chrome_finder::find_chrome;
use crate::driver::BrowserDriver;
use crate::{Error, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use kestrel_core::Session;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use url::Url;

/// Browser launch configuration.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Explicit Chrome binary; discovery runs when `None`.
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub window_size: (u32, u32),
    /// Extra command-line arguments passed through to Chrome.
    pub args: Vec<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            window_size: (1280, 720),
            args: Vec::new(),
        }
    }
}

/// An attached browser instance.
///
/// Owns the CDP connection and the background task that pumps its event
/// stream. Each call to [`session`](Self::session) opens a fresh tab and
/// wraps it in a [`Session`] ready for chaining.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    pub async fn launch(options: LaunchOptions) -> Result<Self> {
        let chrome = find_chrome(options.chrome_path.as_deref())?;
        tracing::info!(chrome = %chrome.display(), headless = options.headless, "launching browser");

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&chrome)
            .no_sandbox()
            .window_size(options.window_size.0, options.window_size.1)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");
        if !options.headless {
            builder = builder.with_head();
        }
        for arg in options.args {
            builder = builder.arg(arg);
        }
        let config = builder.build().map_err(Error::Launch)?;

        let (browser, mut handler) = Browser::launch(config).await?;

        // The handler stream must be polled for the connection to make
        // progress; park it on its own task for the browser's lifetime.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler: {e}");
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Open a new tab and build a [`Session`] whose relative paths resolve
    /// against `base_url`.
    pub async fn session(&self, base_url: &str) -> Result<Session> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::Launch(format!("invalid base URL {base_url:?}: {e}")))?;
        let page = self.browser.new_page("about:blank").await?;
        Ok(Session::new(Arc::new(BrowserDriver::new(page, base))))
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        self.browser.wait().await?;
        self.handler_task.abort();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_headless() {
        let options = LaunchOptions::default();
        assert!(options.headless);
        assert_eq!(options.window_size, (1280, 720));
        assert!(options.chrome_path.is_none());
        assert!(options.args.is_empty());
    }
}
