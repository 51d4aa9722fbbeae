//! Browser-context capability contract and the built-in HTTP-level engine.
//!
//! The portal is driven through a narrow scripted-browser contract:
//! [`BrowserEngine`] launches one isolated [`BrowserPage`] per acquisition,
//! the page performs in-page requests against the portal origin with its own
//! cookie jar, and [`BrowserPage::close`] tears everything down. A page is
//! exclusively owned, never shared, and never reused across accounts.
//!
//! The built-in [`HttpBrowserEngine`] emulates the context at the HTTP level
//! with a fresh `reqwest` client and a dedicated cookie jar per launch.
//! Profile fields a plain HTTP client cannot apply (viewport, timezone,
//! declared permissions) are part of the contract for real browser backends;
//! the HTTP engine forwards what it can (user agent, locale).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::{Client, Url};

use crate::error::{PortalError, Result};

/// Default connect timeout (seconds).
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default per-request timeout (seconds).
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Default navigation ceiling (seconds). First load of the portal behind
/// its anti-bot interstitial can take minutes; eligibility passes are rare
/// enough that waiting beats failing.
const DEFAULT_NAV_TIMEOUT_SECS: u64 = 600;
/// Default settle delay after navigation, standing in for the network-idle
/// wait of a real browser. The portal bootstraps its client-side session
/// state right after document load; acting before that races it.
const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;

/// Fingerprint configuration for a fresh browser context.
///
/// Realistic values resist basic bot detection; the defaults mirror a common
/// desktop Chrome install in the portal's home region.
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    /// Viewport size in CSS pixels (width, height).
    pub viewport: (u32, u32),
    /// Full user-agent string.
    pub user_agent: String,
    /// BCP 47 locale, also sent as `Accept-Language`.
    pub locale: String,
    /// IANA timezone identifier.
    pub timezone: String,
    /// Permissions declared as already granted to the context.
    pub permissions: Vec<String>,
}

impl Default for BrowserProfile {
    fn default() -> Self {
        Self {
            viewport: (1920, 1080),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36"
                .to_string(),
            locale: "zh-CN".to_string(),
            timezone: "Asia/Shanghai".to_string(),
            permissions: vec!["geolocation".to_string(), "notifications".to_string()],
        }
    }
}

/// Response of an in-page request.
#[derive(Debug, Clone)]
pub struct PageResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

/// One isolated page inside a launched browser context.
///
/// All methods suspend at the underlying network operation; callers await
/// each step before issuing the next, so no two requests for the same
/// account are ever in flight concurrently.
#[async_trait]
pub trait BrowserPage: Send {
    /// Navigate to `path` (relative to the portal origin) and wait for
    /// network quiescence before returning.
    async fn goto(&mut self, path: &str) -> Result<()>;

    /// Perform an in-page GET request.
    async fn get(&mut self, path: &str) -> Result<PageResponse>;

    /// Perform an in-page POST request with a JSON body.
    async fn post_json(&mut self, path: &str, body: &serde_json::Value) -> Result<PageResponse>;

    /// Perform an in-page POST request with a form-encoded body.
    async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> Result<PageResponse>;

    /// Read a cookie value from the context's jar for the portal origin.
    async fn cookie_value(&self, name: &str) -> Result<Option<String>>;

    /// Tear the context down: page first, then context, then browser.
    ///
    /// Idempotent; a second close is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Launches isolated browser contexts.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Launch a fresh, isolated context configured from `profile` and open
    /// one page on the portal origin.
    ///
    /// A failure here is a local/environment fault
    /// ([`PortalError::BrowserError`]), never a portal rejection.
    async fn launch(&self, profile: &BrowserProfile) -> Result<Box<dyn BrowserPage>>;
}

/// HTTP-level browser-context engine.
///
/// Each [`launch`](BrowserEngine::launch) builds a fresh `reqwest` client
/// with its own cookie jar, so sessions never leak between acquisitions.
pub struct HttpBrowserEngine {
    base_url: String,
    nav_timeout: Duration,
    settle_delay: Duration,
}

impl HttpBrowserEngine {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            nav_timeout: Duration::from_secs(DEFAULT_NAV_TIMEOUT_SECS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
        }
    }

    /// Override the navigation timeout ceiling.
    #[must_use]
    pub fn with_nav_timeout(mut self, timeout: Duration) -> Self {
        self.nav_timeout = timeout;
        self
    }

    /// Override the post-navigation settle delay.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

#[async_trait]
impl BrowserEngine for HttpBrowserEngine {
    async fn launch(&self, profile: &BrowserProfile) -> Result<Box<dyn BrowserPage>> {
        let origin = Url::parse(&self.base_url).map_err(|e| PortalError::BrowserError {
            detail: format!("invalid portal origin '{}': {e}", self.base_url),
        })?;

        let jar = Arc::new(Jar::default());

        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&profile.locale) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .user_agent(profile.user_agent.clone())
            .default_headers(headers)
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| PortalError::BrowserError {
                detail: format!("failed to build browser client: {e}"),
            })?;

        log::debug!(
            "launched browser context: viewport={}x{} locale={} tz={}",
            profile.viewport.0,
            profile.viewport.1,
            profile.locale,
            profile.timezone
        );

        Ok(Box::new(HttpBrowserPage {
            client,
            jar,
            origin,
            base_url: self.base_url.clone(),
            nav_timeout: self.nav_timeout,
            settle_delay: self.settle_delay,
            closed: false,
        }))
    }
}

struct HttpBrowserPage {
    client: Client,
    jar: Arc<Jar>,
    origin: Url,
    base_url: String,
    nav_timeout: Duration,
    settle_delay: Duration,
    closed: bool,
}

impl HttpBrowserPage {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(PortalError::BrowserError {
                detail: "page is closed".to_string(),
            });
        }
        Ok(())
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn read_response(response: reqwest::Response) -> Result<PageResponse> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| PortalError::NetworkError {
                detail: format!("failed to read response body: {e}"),
            })?;
        Ok(PageResponse { status, body })
    }

    fn transport_error(e: &reqwest::Error) -> PortalError {
        if e.is_timeout() {
            PortalError::Timeout {
                detail: e.to_string(),
            }
        } else {
            PortalError::NetworkError {
                detail: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl BrowserPage for HttpBrowserPage {
    async fn goto(&mut self, path: &str) -> Result<()> {
        self.ensure_open()?;
        let url = self.url_for(path);
        log::debug!("goto {url}");

        let response = self
            .client
            .get(&url)
            .timeout(self.nav_timeout)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;
        log::debug!("navigation status: {}", response.status());

        // Stand-in for the network-idle wait of a scripted browser.
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }

    async fn get(&mut self, path: &str) -> Result<PageResponse> {
        self.ensure_open()?;
        let url = self.url_for(path);
        log::debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;
        Self::read_response(response).await
    }

    async fn post_json(&mut self, path: &str, body: &serde_json::Value) -> Result<PageResponse> {
        self.ensure_open()?;
        let url = self.url_for(path);
        log::debug!("POST {url}");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;
        Self::read_response(response).await
    }

    async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> Result<PageResponse> {
        self.ensure_open()?;
        let url = self.url_for(path);
        log::debug!("POST {url} (form)");

        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;
        Self::read_response(response).await
    }

    async fn cookie_value(&self, name: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        let Some(header) = self.jar.cookies(&self.origin) else {
            return Ok(None);
        };
        let header = header.to_str().map_err(|e| PortalError::ParseError {
            detail: format!("cookie header is not valid UTF-8: {e}"),
        })?;

        Ok(header.split("; ").find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_string())
        }))
    }

    async fn close(&mut self) -> Result<()> {
        // Page, context and browser share one client here; dropping the
        // cookie jar with it is the whole teardown.
        self.closed = true;
        Ok(())
    }
}

fn normalize_base_url(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}
