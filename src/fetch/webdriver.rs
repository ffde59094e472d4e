//! [`BrowserDriver`] over a WebDriver endpoint (chromedriver, msedgedriver).

use super::session::{BrowserDriver, Locator};
use crate::config::SessionConfig;
use crate::error::BrowserError;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value, json};
use tracing::{info, instrument};

#[derive(Debug)]
pub struct WebDriverBrowser {
    client: Client,
}

impl WebDriverBrowser {
    /// Start a new browser session on `config.webdriver_url`.
    #[instrument(level = "info", skip_all, fields(webdriver_url = %config.webdriver_url, headless = config.headless))]
    pub async fn connect(config: &SessionConfig, user_agent: &str) -> Result<Self, BrowserError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(capabilities(config.headless, user_agent));
        let client = builder
            .connect(&config.webdriver_url)
            .await
            .map_err(|e| BrowserError::Session(e.to_string()))?;
        info!("WebDriver session started");
        Ok(Self { client })
    }
}

/// Browser arguments, set for both Chrome and Edge drivers.
fn capabilities(headless: bool, user_agent: &str) -> Map<String, Value> {
    let mut args = vec![format!("--user-agent={user_agent}")];
    if headless {
        args.push("--headless=new".to_string());
    }
    let mut caps = Map::new();
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    caps.insert("ms:edgeOptions".to_string(), json!({ "args": args }));
    caps
}

fn locator(target: Locator<'_>) -> fantoccini::Locator<'_> {
    match target {
        Locator::Css(s) => fantoccini::Locator::Css(s),
        Locator::XPath(s) => fantoccini::Locator::XPath(s),
        Locator::Id(s) => fantoccini::Locator::Id(s),
    }
}

fn command<E: std::fmt::Display>(e: E) -> BrowserError {
    BrowserError::Command(e.to_string())
}

impl BrowserDriver for WebDriverBrowser {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        self.client.goto(url).await.map_err(command)
    }

    async fn click(&mut self, target: Locator<'_>) -> Result<(), BrowserError> {
        let element = self.client.find(locator(target)).await.map_err(command)?;
        element.click().await.map_err(command)
    }

    async fn type_into(&mut self, target: Locator<'_>, text: &str) -> Result<(), BrowserError> {
        let element = self.client.find(locator(target)).await.map_err(command)?;
        element.send_keys(text).await.map_err(command)
    }

    async fn is_displayed(&mut self, target: Locator<'_>) -> Result<bool, BrowserError> {
        let elements = self.client.find_all(locator(target)).await.map_err(command)?;
        match elements.first() {
            Some(element) => element.is_displayed().await.map_err(command),
            None => Ok(false),
        }
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        self.client.source().await.map_err(command)
    }

    async fn quit(self) -> Result<(), BrowserError> {
        self.client.close().await.map_err(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_capabilities() {
        let caps = capabilities(true, "ua-test");
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--headless=new"));
        assert!(args.iter().any(|a| a == "--user-agent=ua-test"));
        assert_eq!(caps["ms:edgeOptions"], caps["goog:chromeOptions"]);
    }

    #[test]
    fn test_visible_browser_capabilities() {
        let caps = capabilities(false, "ua-test");
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_locator_mapping() {
        assert!(matches!(locator(Locator::Id("error-container")), fantoccini::Locator::Id("error-container")));
        assert!(matches!(locator(Locator::XPath("//a")), fantoccini::Locator::XPath("//a")));
    }
}
