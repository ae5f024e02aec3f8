use sgnl_core::{Error, FetchBackend, FetchRequest, FetchResponse, Result};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

pub mod density;
pub mod extract;
pub mod extractor;
pub mod gate;
pub mod heuristic;
pub mod propositions;
pub mod readability;
pub mod textprep;

pub use density::{DensityEngine, DensityInputs};
pub use extract::HtmlCleaner;
pub use extractor::ContentExtractor;
pub use gate::GateOrchestrator;
pub use heuristic::StructuralHeuristicScorer;
pub use propositions::LexicalPropositionEstimator;
pub use readability::FormulaReadability;

#[derive(Debug, Clone)]
pub struct LocalFetcher {
    client: reqwest::Client,
}

impl LocalFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("sgnl-local/0.1")
            .redirect(reqwest::redirect::Policy::limited(10))
            // Per-request timeouts (FetchRequest.timeout_ms) override the 30s default.
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl FetchBackend for LocalFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let mut timings_ms = BTreeMap::new();
        let t_req = std::time::Instant::now();
        let url = url::Url::parse(&req.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let mut rb = self.client.get(url);
        if let Some(to) = req.timeout() {
            rb = rb.timeout(to);
        }
        let resp = rb.send().await.map_err(|e| Error::Fetch(e.to_string()))?;
        let final_url = resp.url().to_string();
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let max_bytes = req.max_bytes.unwrap_or(u64::MAX) as usize;
        let mut truncated = false;
        let mut bytes = Vec::new();
        let mut stream = resp.bytes_stream();
        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Fetch(e.to_string()))?;
            if bytes.len().saturating_add(chunk.len()) > max_bytes {
                let can_take = max_bytes.saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..can_take]);
                truncated = true;
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        timings_ms.insert("network_fetch".to_string(), t_req.elapsed().as_millis());
        Ok(FetchResponse {
            url: req.url.clone(),
            final_url,
            status,
            content_type,
            bytes,
            truncated,
            timings_ms,
        })
    }
}

/// Fetch `url` and return its body as (lossy) text.
///
/// The whole exchange is bounded by `timeout_ms` on top of any transport
/// timeout, and non-2xx statuses are errors. A body cut at `max_bytes` is
/// still returned.
pub async fn fetch_markup(
    backend: &dyn FetchBackend,
    url: &str,
    timeout_ms: u64,
    max_bytes: u64,
) -> Result<String> {
    let req = FetchRequest::new(url)
        .with_timeout_ms(timeout_ms)
        .with_max_bytes(max_bytes);
    let resp = tokio::time::timeout(Duration::from_millis(timeout_ms), backend.fetch(&req))
        .await
        .map_err(|_| Error::Timeout(timeout_ms))??;
    debug!(
        target: "sgnl::fetch",
        url,
        final_url = %resp.final_url,
        status = resp.status,
        content_type = resp.content_type.as_deref().unwrap_or(""),
        bytes = resp.bytes.len(),
        elapsed_ms = resp.timings_ms.get("network_fetch").copied().unwrap_or_default() as u64,
        "fetched"
    );
    if !resp.is_success() {
        return Err(Error::Fetch(format!("HTTP {}", resp.status)));
    }
    if resp.truncated {
        warn!(target: "sgnl::fetch", url, max_bytes, "body truncated at max_bytes");
    }
    Ok(resp.text_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, http::StatusCode, routing::get, Router};
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn local_fetcher_reads_body_and_content_type() {
        let addr = serve(Router::new().route(
            "/",
            get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<p>hello</p>") }),
        ))
        .await;
        let fetcher = LocalFetcher::new().unwrap();
        let req = FetchRequest::new(format!("http://{addr}/")).with_timeout_ms(2_000);
        let resp = fetcher.fetch(&req).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type.as_deref(), Some("text/html"));
        assert_eq!(resp.text_lossy(), "<p>hello</p>");
        assert!(!resp.truncated);
        assert!(resp.timings_ms.contains_key("network_fetch"));
    }

    #[tokio::test]
    async fn local_fetcher_truncates_at_max_bytes() {
        let addr = serve(Router::new().route("/", get(|| async { "x".repeat(10_000) }))).await;
        let fetcher = LocalFetcher::new().unwrap();
        let req = FetchRequest::new(format!("http://{addr}/")).with_max_bytes(100);
        let resp = fetcher.fetch(&req).await.unwrap();
        assert!(resp.truncated);
        assert_eq!(resp.bytes.len(), 100);
    }

    #[tokio::test]
    async fn local_fetcher_rejects_invalid_urls() {
        let fetcher = LocalFetcher::new().unwrap();
        let err = fetcher
            .fetch(&FetchRequest::new("not a url"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn fetch_markup_returns_truncated_prefix() {
        let addr = serve(Router::new().route("/big", get(|| async { "y".repeat(5_000) }))).await;
        let fetcher = LocalFetcher::new().unwrap();
        let text = fetch_markup(&fetcher, &format!("http://{addr}/big"), 2_000, 64)
            .await
            .unwrap();
        assert_eq!(text, "y".repeat(64));
    }

    #[tokio::test]
    async fn fetch_markup_maps_non_success_status_to_error() {
        let addr = serve(Router::new().route(
            "/gone",
            get(|| async { (StatusCode::NOT_FOUND, "nope") }),
        ))
        .await;
        let fetcher = LocalFetcher::new().unwrap();
        let err = fetch_markup(&fetcher, &format!("http://{addr}/gone"), 2_000, 1_000)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "fetch failed: HTTP 404");
    }

    #[tokio::test]
    async fn fetch_markup_is_bounded_by_its_deadline() {
        let addr = serve(Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        ))
        .await;
        let fetcher = LocalFetcher::new().unwrap();
        let err = fetch_markup(&fetcher, &format!("http://{addr}/slow"), 150, 1_000)
            .await
            .unwrap_err();
        // Either the outer deadline or reqwest's own timeout fires first.
        assert!(
            matches!(err, Error::Timeout(150) | Error::Fetch(_)),
            "unexpected error: {err}"
        );
    }
}
