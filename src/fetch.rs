use log::debug;
use reqwest::blocking::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Failure to retrieve a remote resource.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("request failed: {status} (URL: {url})")]
    Status {
        status: reqwest::StatusCode,
        url: Url,
    },
}

/// Retrieves raw bytes from a host. One attempt, no caching.
pub trait Fetch {
    fn fetch(&self, host: &str, path: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// `http` or `https`; used for host/path fetches.
    pub scheme: String,
    pub user_agent: String,
    /// Whole-request timeout. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            user_agent: format!("guide2md/{}", env!("CARGO_PKG_VERSION")),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Blocking HTTP implementation of [`Fetch`], also used to download pages.
pub struct HttpFetcher {
    client: Client,
    scheme: String,
}

impl HttpFetcher {
    pub fn new(opts: &HttpOptions) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(opts.user_agent.clone());
        if let Some(timeout) = opts.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self {
            client,
            scheme: opts.scheme.clone(),
        })
    }

    /// Fetches an HTML page and returns its body as text.
    pub fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
        let resp = self.get(url)?;
        resp.text().map_err(|source| FetchError::Request {
            url: url.clone(),
            source,
        })
    }

    fn get(&self, url: &Url) -> Result<reqwest::blocking::Response, FetchError> {
        debug!("GET {url}");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status(),
                url: url.clone(),
            });
        }
        Ok(resp)
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, host: &str, path: &str) -> Result<Vec<u8>, FetchError> {
        let url = resource_url(&self.scheme, host, path)?;
        let resp = self.get(&url)?;
        let bytes = resp.bytes().map_err(|source| FetchError::Request {
            url: url.clone(),
            source,
        })?;
        Ok(bytes.to_vec())
    }
}

/// Builds `scheme://host/path`. `host` may carry a port.
pub fn resource_url(scheme: &str, host: &str, path: &str) -> Result<Url, FetchError> {
    let raw = format!("{}://{}/{}", scheme, host, path.trim_start_matches('/'));
    Url::parse(&raw).map_err(|source| FetchError::InvalidUrl { url: raw, source })
}

/// Host (with a non-default port, if any) of a URL.
pub fn host_with_port(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
