//! Remote content access.
//!
//! [`RemoteFetcher`] is the single capability the engine needs from the
//! network: raw bytes of one path at one branch. [`ArchiveSource`] serves the
//! bootstrap path. [`HttpFetcher`] implements both over blocking `ureq`.

use std::io::{Read, Write};
use std::time::Duration;

use base64::Engine as _;
use thiserror::Error;
use url::Url;

use hooksync_core::{Config, Credentials};

/// Bodies the raw-content host answers with instead of a 404 status.
const NOT_FOUND_BODIES: [&str; 2] = ["Not Found", "404: Not Found"];

/// Why a remote fetch produced no content.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not found")]
    NotFound,

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid URL: {0}")]
    Url(String),

    #[error("failed to read response body: {0}")]
    Read(#[from] std::io::Error),
}

impl FetchError {
    /// Not-found and non-success answers get exactly one more attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::NotFound | FetchError::Status(_))
    }
}

/// Fetch the raw bytes of a single file.
pub trait RemoteFetcher {
    /// `repository` is the `owner/name` full name; `path` is relative to the repo root.
    fn fetch(&self, repository: &str, branch: &str, path: &str) -> Result<Vec<u8>, FetchError>;
}

/// Download a whole-repository zip archive.
pub trait ArchiveSource {
    /// Stream the archive into `out`, returning the number of bytes written.
    fn download_archive(
        &self,
        owner: &str,
        repository: &str,
        branch: &str,
        out: &mut dyn Write,
    ) -> Result<u64, FetchError>;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// `ureq`-backed fetcher for raw files and archives.
pub struct HttpFetcher {
    agent: ureq::Agent,
    raw_host: String,
    archive_host: String,
    credentials: Option<Credentials>,
}

impl HttpFetcher {
    pub fn from_config(config: &Config) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .redirects(5)
            .build();
        Self {
            agent,
            raw_host: config.raw_host.clone(),
            archive_host: config.archive_host.clone(),
            credentials: config.credentials.clone(),
        }
    }

    /// `<raw_host>/<owner>/<name>/<branch>/<path>`, every segment percent-encoded.
    pub fn raw_url(&self, repository: &str, branch: &str, path: &str) -> Result<Url, FetchError> {
        join_segments(
            &self.raw_host,
            repository
                .split('/')
                .chain(branch.split('/'))
                .chain(path.split('/')),
        )
    }

    /// `<archive_host>/<owner>/<repository>/archive/<branch>.zip`.
    pub fn archive_url(
        &self,
        owner: &str,
        repository: &str,
        branch: &str,
    ) -> Result<Url, FetchError> {
        let file = format!("{branch}.zip");
        join_segments(
            &self.archive_host,
            [owner, repository, "archive"]
                .into_iter()
                .chain(file.split('/')),
        )
    }

    fn get(&self, url: &Url) -> Result<ureq::Response, FetchError> {
        let mut request = self.agent.get(url.as_str());
        match &self.credentials {
            Some(creds) => {
                request = request
                    .set("User-Agent", &creds.user)
                    .set("Authorization", &basic_auth_header(creds));
            }
            None => {
                request = request.set("User-Agent", concat!("hooksync/", env!("CARGO_PKG_VERSION")));
            }
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => return Err(FetchError::NotFound),
            Err(ureq::Error::Status(code, _)) => return Err(FetchError::Status(code)),
            Err(ureq::Error::Transport(t)) => return Err(FetchError::Transport(t.to_string())),
        };
        if response.status() != 200 {
            return Err(FetchError::Status(response.status()));
        }
        Ok(response)
    }
}

impl RemoteFetcher for HttpFetcher {
    fn fetch(&self, repository: &str, branch: &str, path: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.raw_url(repository, branch, path)?;
        tracing::debug!("GET {url}");
        let response = self.get(&url)?;
        let mut body = Vec::new();
        response.into_reader().read_to_end(&mut body)?;
        if is_not_found_body(&body) {
            return Err(FetchError::NotFound);
        }
        Ok(body)
    }
}

impl ArchiveSource for HttpFetcher {
    fn download_archive(
        &self,
        owner: &str,
        repository: &str,
        branch: &str,
        out: &mut dyn Write,
    ) -> Result<u64, FetchError> {
        let url = self.archive_url(owner, repository, branch)?;
        tracing::info!("fetching archive from {url}");
        let response = self.get(&url)?;
        let mut reader = response.into_reader();
        Ok(std::io::copy(&mut reader, out)?)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn join_segments<'a>(
    host: &str,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<Url, FetchError> {
    let mut url = Url::parse(host).map_err(|e| FetchError::Url(format!("{host}: {e}")))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| FetchError::Url(format!("{host}: cannot be a base URL")))?;
        path.pop_if_empty();
        for segment in segments.into_iter().filter(|s| !s.is_empty()) {
            path.push(segment);
        }
    }
    Ok(url)
}

fn basic_auth_header(creds: &Credentials) -> String {
    let token = base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", creds.user, creds.password));
    format!("Basic {token}")
}

fn is_not_found_body(body: &[u8]) -> bool {
    std::str::from_utf8(body)
        .map(|text| NOT_FOUND_BODIES.contains(&text.trim()))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
