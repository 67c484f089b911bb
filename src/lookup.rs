//! Statistics lookup through the same-origin proxy (or the upstream API).
//!
//! Lookup is an external collaborator of the certificate pipeline: all it
//! promises is a tagged result. Transport failures and non-2xx statuses map
//! to [`LookupError::LookupFailed`], an empty user list maps to
//! [`LookupError::UserNotFound`].

use futures::future::BoxFuture;

use crate::error::LookupError;
use crate::stats::UserStats;

#[cfg(feature = "http")]
use crate::stats::UsersResponse;
#[cfg(feature = "http")]
use crate::{Config, Error};
#[cfg(feature = "http")]
use reqwest::Client;
#[cfg(feature = "http")]
use std::time::Duration;

/// Public upstream host
pub const UPSTREAM_BASE: &str = "https://www.duolingo.com";

/// Where the provider is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupEndpoint {
    /// `GET {base}/api/duolingo/{username}`
    Proxy { base: String },
    /// `GET {base}/2017-06-30/users?username={username}`
    Upstream { base: String },
}

impl Default for LookupEndpoint {
    fn default() -> Self {
        LookupEndpoint::Upstream {
            base: UPSTREAM_BASE.to_string(),
        }
    }
}

impl LookupEndpoint {
    fn base(&self) -> &str {
        match self {
            LookupEndpoint::Proxy { base } | LookupEndpoint::Upstream { base } => base,
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        #[cfg(feature = "http")]
        {
            self.url_for("probe").map(|_| ())
        }
        #[cfg(not(feature = "http"))]
        {
            let base = self.base();
            if base.starts_with("http://") || base.starts_with("https://") {
                Ok(())
            } else {
                Err(crate::Error::ConfigError(format!("invalid endpoint {:?}", base)))
            }
        }
    }

    /// Request URL for `username`; the name is percent-encoded.
    #[cfg(feature = "http")]
    pub fn url_for(&self, username: &str) -> crate::Result<url::Url> {
        let mut url = url::Url::parse(self.base())
            .map_err(|e| Error::ConfigError(format!("invalid endpoint {:?}: {}", self.base(), e)))?;
        if url.cannot_be_a_base() {
            return Err(Error::ConfigError(format!("endpoint {:?} cannot be a base URL", self.base())));
        }
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::ConfigError(format!("endpoint {:?} has no path", self.base())))?;
            segments.pop_if_empty();
            match self {
                LookupEndpoint::Proxy { .. } => {
                    segments.extend(["api", "duolingo", username]);
                }
                LookupEndpoint::Upstream { .. } => {
                    segments.extend(["2017-06-30", "users"]);
                }
            }
        }
        if let LookupEndpoint::Upstream { .. } = self {
            url.query_pairs_mut().append_pair("username", username);
        }
        Ok(url)
    }
}

/// Source of user statistics.
pub trait StatsProvider: Send + Sync {
    /// Look up `username`. Blank names fail with `EmptyUsername` without I/O.
    fn lookup<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<UserStats, LookupError>>;
}

/// reqwest-backed provider.
#[cfg(feature = "http")]
pub struct HttpStatsProvider {
    client: Client,
    endpoint: LookupEndpoint,
}

#[cfg(feature = "http")]
impl HttpStatsProvider {
    pub fn new(config: &Config) -> crate::Result<Self> {
        config.endpoint.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &LookupEndpoint {
        &self.endpoint
    }
}

#[cfg(feature = "http")]
impl StatsProvider for HttpStatsProvider {
    fn lookup<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<UserStats, LookupError>> {
        Box::pin(async move {
            let username = username.trim();
            if username.is_empty() {
                return Err(LookupError::EmptyUsername);
            }

            let url = self
                .endpoint
                .url_for(username)
                .map_err(|e| LookupError::LookupFailed(e.to_string()))?;
            log::debug!("looking up {:?} via {}", username, url);

            let resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| LookupError::LookupFailed(format!("request failed: {}", e)))?;

            let status = resp.status();
            if !status.is_success() {
                log::warn!("lookup for {:?} returned HTTP {}", username, status);
                return Err(LookupError::LookupFailed(format!("HTTP {}", status.as_u16())));
            }

            let body: UsersResponse = resp
                .json()
                .await
                .map_err(|e| LookupError::LookupFailed(format!("invalid response body: {}", e)))?;

            UserStats::from_response(body, username)
        })
    }
}

#[cfg(all(test, feature = "http"))]
mod tests {
    use super::*;

    #[test]
    fn proxy_url_encodes_username() {
        let ep = LookupEndpoint::Proxy {
            base: "http://localhost:3000/".into(),
        };
        let url = ep.url_for("a/b c").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/duolingo/a%2Fb%20c");
    }

    #[test]
    fn upstream_url_uses_query() {
        let url = LookupEndpoint::default().url_for("ana").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.duolingo.com/2017-06-30/users?username=ana"
        );
    }

    #[test]
    fn invalid_base_is_config_error() {
        let ep = LookupEndpoint::Proxy { base: "not a url".into() };
        assert!(matches!(ep.validate(), Err(Error::ConfigError(_))));
    }

    #[tokio::test]
    async fn blank_username_short_circuits() {
        let provider = HttpStatsProvider::new(&Config::default()).unwrap();
        let err = provider.lookup("   ").await.unwrap_err();
        assert_eq!(err, LookupError::EmptyUsername);
    }
}
