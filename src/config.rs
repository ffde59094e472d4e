//! Run configuration.
//!
//! Settings come from an optional YAML file (see [`HarvestConfig::load`]) with
//! every field defaulted, then individual CLI flags override them. The
//! resulting structs are handed to constructors explicitly; nothing here is
//! global.
//!
//! ```yaml
//! politeness:
//!   min_delay_secs: 2.0
//!   max_delay_secs: 5.0
//! session:
//!   webdriver_url: http://localhost:9515
//!   settle:
//!     submit_secs: 30
//! markup:
//!   content: div.available-content
//! ```

use crate::error::HarvestError;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Top-level harvesting settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarvestConfig {
    pub politeness: PolitenessConfig,
    /// Timeout for each anonymous HTTP request.
    pub request_timeout_secs: u64,
    /// Pool the per-request user agent is drawn from.
    pub user_agents: Vec<String>,
    /// Locations whose path contains any of these are not articles.
    pub exclude_keywords: Vec<String>,
    pub session: SessionConfig,
    pub markup: MarkupProfile,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            politeness: PolitenessConfig::default(),
            request_timeout_secs: 30,
            user_agents: vec![
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15".to_string(),
            ],
            exclude_keywords: vec![
                "about".to_string(),
                "archive".to_string(),
                "podcast".to_string(),
            ],
            session: SessionConfig::default(),
            markup: MarkupProfile::default(),
        }
    }
}

impl HarvestConfig {
    /// Load settings from a YAML file, or defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, HarvestError> {
        let config = match path {
            None => {
                debug!("No config file given; using defaults");
                Self::default()
            }
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    HarvestError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                let config = Self::from_yaml(&raw)?;
                info!(path = %path.display(), "Loaded configuration");
                config
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, HarvestError> {
        serde_yaml::from_str(raw).map_err(|e| HarvestError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), HarvestError> {
        let p = &self.politeness;
        check_delay("politeness.min_delay_secs", p.min_delay_secs)?;
        check_delay("politeness.max_delay_secs", p.max_delay_secs)?;
        if p.max_delay_secs < p.min_delay_secs {
            return Err(HarvestError::Config(format!(
                "politeness delay bounds must satisfy 0 <= min <= max (got {} and {})",
                p.min_delay_secs, p.max_delay_secs
            )));
        }
        let settle = &self.session.settle;
        check_delay("session.settle.sign_in_secs", settle.sign_in_secs)?;
        check_delay("session.settle.password_option_secs", settle.password_option_secs)?;
        check_delay("session.settle.submit_secs", settle.submit_secs)?;
        check_delay("session.settle.page_secs", settle.page_secs)?;
        if self.user_agents.is_empty() {
            return Err(HarvestError::Config("user_agents must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Longest delay any config value may ask for.
pub const MAX_DELAY_SECS: f64 = 3600.0;

fn check_delay(name: &str, secs: f64) -> Result<(), HarvestError> {
    if secs.is_finite() && (0.0..=MAX_DELAY_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(HarvestError::Config(format!(
            "{name} must be between 0 and {MAX_DELAY_SECS} seconds (got {secs})"
        )))
    }
}

/// Seconds to a [`Duration`], clamped to `[0, MAX_DELAY_SECS]`. NaN is zero.
pub fn delay_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.clamp(0.0, MAX_DELAY_SECS)).unwrap_or(Duration::ZERO)
}

/// Bounds for the randomized pause taken before every page request.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolitenessConfig {
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: 2.0,
            max_delay_secs: 5.0,
        }
    }
}

/// Settings for the authenticated browser session.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub webdriver_url: String,
    pub sign_in_url: String,
    pub headless: bool,
    /// Fixed browser user agent; one is drawn from the pool when unset.
    pub user_agent: Option<String>,
    pub selectors: LoginSelectors,
    pub settle: SettleTimings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            sign_in_url: "https://substack.com/sign-in".to_string(),
            headless: true,
            user_agent: None,
            selectors: LoginSelectors::default(),
            settle: SettleTimings::default(),
        }
    }
}

/// Locators on the sign-in page. These track the live markup and break when
/// it changes.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoginSelectors {
    /// XPath of the "sign in with password" option.
    pub password_option: String,
    pub email_field: String,
    pub password_field: String,
    /// XPath of the form's submit control.
    pub submit: String,
    /// Element id shown when sign-in is rejected.
    pub error_container: String,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            password_option: "//a[@class='login-option substack-login__login-option']".to_string(),
            email_field: "input[name='email']".to_string(),
            password_field: "input[name='password']".to_string(),
            submit: "//*[@id=\"substack-login\"]/div[2]/div[2]/form/button".to_string(),
            error_container: "error-container".to_string(),
        }
    }
}

/// Waits after each browser transition. The sign-in page renders client
/// side, so element lookups fail without them.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct SettleTimings {
    pub sign_in_secs: f64,
    pub password_option_secs: f64,
    pub submit_secs: f64,
    pub page_secs: f64,
}

impl Default for SettleTimings {
    fn default() -> Self {
        Self {
            sign_in_secs: 3.0,
            password_option_secs: 3.0,
            submit_secs: 30.0,
            page_secs: 2.0,
        }
    }
}

impl SettleTimings {
    pub fn sign_in(&self) -> Duration {
        delay_from_secs(self.sign_in_secs)
    }

    pub fn password_option(&self) -> Duration {
        delay_from_secs(self.password_option_secs)
    }

    pub fn submit(&self) -> Duration {
        delay_from_secs(self.submit_secs)
    }

    pub fn page(&self) -> Duration {
        delay_from_secs(self.page_secs)
    }
}

/// CSS selectors for the post page layout.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarkupProfile {
    pub title: String,
    pub subtitle: String,
    pub date: String,
    pub like_count: String,
    pub content: String,
    /// Present only on pages cut off for anonymous readers.
    pub paywall: String,
}

impl Default for MarkupProfile {
    fn default() -> Self {
        Self {
            title: "h1.post-title, h2".to_string(),
            subtitle: "h3.subtitle".to_string(),
            date: "div.pencraft.pc-reset.color-pub-secondary-text-hGQ02T.line-height-20-t4M0El.font-meta-MWBumP.size-11-NuY2Zx.weight-medium-fw81nC.transform-uppercase-yKDgcq.reset-IxiVJZ.meta-EgzBVA".to_string(),
            like_count: "a.post-ufi-button .label".to_string(),
            content: "div.available-content".to_string(),
            paywall: "h2.paywall-title".to_string(),
        }
    }
}

/// Sign-in credentials. Supplied from the environment by the CLI.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
