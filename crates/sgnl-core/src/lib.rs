use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub mod config;
pub mod model;

pub use config::{DensityWeights, GateConfig};
pub use model::{
    Adjustment, BatchReport, Candidate, DensityCheck, DensityCheckReport, ExtractionResult,
    GateDecision, HeuristicScore, PageMetadata, ReadabilityMetrics, ScoredCandidate,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("timed out after {0}ms")]
    Timeout(u64),
    #[error("estimator failed: {0}")]
    Estimator(String),
    #[error("insufficient content extracted ({chars} chars): {reason}")]
    InsufficientContent { chars: usize, reason: String },
    #[error("invalid config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// Timeout for the operation (network + body read).
    pub timeout_ms: Option<u64>,
    /// Hard cap on bytes read from the response body.
    pub max_bytes: Option<u64>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: None,
            max_bytes: None,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub truncated: bool,
    pub timings_ms: BTreeMap<String, u128>,
}

impl FetchResponse {
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).to_string()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Page retrieval collaborator.
///
/// Implementations report transport problems as `Err`; HTTP status handling is
/// left to the caller so that a non-2xx body is still inspectable.
#[async_trait::async_trait]
pub trait FetchBackend: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;
}

/// Proposition-based density estimators (idea density and its
/// dependency-based variant).
///
/// Outputs are nominally in `[0, 1]`; callers clamp.
pub trait PropositionEstimator: Send + Sync {
    fn name(&self) -> &'static str;
    fn idea_density(&self, text: &str) -> Result<f64>;
    fn dependency_density(&self, text: &str) -> Result<f64>;
}

/// Formula-based readability scoring.
pub trait ReadabilityEstimator: Send + Sync {
    fn name(&self) -> &'static str;
    fn metrics(&self, text: &str) -> Result<ReadabilityMetrics>;
}

/// Clean-text and metadata collaborator for raw markup.
pub trait ContentCleaner: Send + Sync {
    /// Readable text of the page, or `None` when nothing readable was found.
    fn extract_clean_text(&self, markup: &str) -> Option<String>;
    /// Structured metadata, or `None` when the markup carries none.
    fn extract_metadata(&self, markup: &str) -> Option<PageMetadata>;
}

/// Host of `url` with a single leading `www.` removed, or `"unknown"`.
///
/// Other subdomains are kept verbatim.
pub fn extract_domain(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url.trim()) else {
        return "unknown".to_string();
    };
    match parsed.host_str() {
        Some(host) if !host.is_empty() => host.strip_prefix("www.").unwrap_or(host).to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_domain_strips_www_only() {
        assert_eq!(
            extract_domain("https://www.example.com/path/to/page"),
            "example.com"
        );
        assert_eq!(extract_domain("https://example.com/page"), "example.com");
        assert_eq!(
            extract_domain("https://blog.example.com/x"),
            "blog.example.com"
        );
        assert_eq!(
            extract_domain("https://www.docs.example.com/"),
            "docs.example.com"
        );
    }

    #[test]
    fn extract_domain_unknown_for_unparseable_or_hostless() {
        assert_eq!(extract_domain("not-a-url"), "unknown");
        assert_eq!(extract_domain(""), "unknown");
        assert_eq!(extract_domain("mailto:someone@example.com"), "unknown");
    }

    #[test]
    fn fetch_response_success_is_2xx_only() {
        let mut r = FetchResponse {
            url: "https://example.com/".to_string(),
            final_url: "https://example.com/".to_string(),
            status: 200,
            content_type: None,
            bytes: b"hi".to_vec(),
            truncated: false,
            timings_ms: BTreeMap::new(),
        };
        assert!(r.is_success());
        r.status = 204;
        assert!(r.is_success());
        r.status = 301;
        assert!(!r.is_success());
        r.status = 404;
        assert!(!r.is_success());
        assert_eq!(r.text_lossy(), "hi");
    }

    #[test]
    fn fetch_request_builder_sets_bounds() {
        let req = FetchRequest::new("https://example.com")
            .with_timeout_ms(1_500)
            .with_max_bytes(10);
        assert_eq!(req.timeout(), Some(Duration::from_millis(1_500)));
        assert_eq!(req.max_bytes, Some(10));
    }
}
