//! Raw markup → one canonical [`ExtractionResult`].
//!
//! Every failure mode (fetch error, non-2xx, nothing readable) becomes an
//! error record instead of an `Err`; callers decide what an error means.

use crate::density::DensityEngine;
use crate::extract::{extract_title_fallback, HtmlCleaner};
use crate::fetch_markup;
use regex::Regex;
use sgnl_core::model::UNTITLED;
use sgnl_core::{extract_domain, ContentCleaner, ExtractionResult, FetchBackend, GateConfig};
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

pub const NO_CONTENT: &str = "No content extracted";

const BASE_SIGNAL: f64 = 0.5;
const TECHNICAL_STEP: f64 = 0.05;
const TECHNICAL_CAP: f64 = 0.20;
const SPAM_STEP: f64 = 0.15;
const SPAM_CAP: f64 = 0.45;
const TRUSTED_BOOST: f64 = 0.20;

/// Code-like syntax and algorithmic vocabulary, matched on lowercased text.
static TECHNICAL_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bdef \w+\(",
        r"\bfunction \w+\(",
        r"\bimport \w+",
        r"\bclass \w+",
        r"\breturn\b",
        r"algorithm",
        r"complexity",
        r"\bo\(n",
        r"implementation",
        r"benchmark",
        r"theorem",
        r"\bproof\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("technical indicator should compile"))
    .collect()
});

const SPAM_PHRASES: &[&str] = &[
    "buy now",
    "click here",
    "sign up",
    "limited time",
    "subscribe",
    "act now",
    "order now",
    "free trial",
    "special offer",
    "save money",
    "don't miss",
    "exclusive deal",
];

const TRUSTED_DOMAINS: &[&str] = &[
    "arxiv.org",
    "github.com",
    "gitlab.com",
    "stackoverflow.com",
    "docs.python.org",
    "developer.mozilla.org",
    "doc.rust-lang.org",
    "docs.rs",
    "acm.org",
    "ieee.org",
    "nature.com",
    "science.org",
    "wikipedia.org",
    "readthedocs.io",
    "semanticscholar.org",
    "nih.gov",
];

fn length_component(chars: usize) -> f64 {
    match chars {
        n if n < 100 => -0.15,
        n if n < 300 => -0.05,
        n if n < 1_000 => 0.0,
        n if n < 5_000 => 0.05,
        _ => 0.10,
    }
}

fn is_trusted(domain: &str) -> bool {
    TRUSTED_DOMAINS
        .iter()
        .any(|t| domain == *t || domain.ends_with(&format!(".{t}")))
}

/// General content-quality estimate in `[0, 1]`, independent of density.
pub fn calculate_signal_score(content: &str, url: &str, title: &str) -> f64 {
    let haystack = format!("{title}\n{content}").to_lowercase();

    let technical_hits = TECHNICAL_RES.iter().filter(|re| re.is_match(&haystack)).count();
    let technical = (technical_hits as f64 * TECHNICAL_STEP).min(TECHNICAL_CAP);

    let spam_hits = SPAM_PHRASES.iter().filter(|p| haystack.contains(*p)).count();
    let spam = (spam_hits as f64 * SPAM_STEP).min(SPAM_CAP);

    let trusted = if is_trusted(&extract_domain(url)) {
        TRUSTED_BOOST
    } else {
        0.0
    };

    let score = BASE_SIGNAL + length_component(content.chars().count()) + technical - spam
        + trusted;
    score.clamp(0.0, 1.0)
}

#[derive(Clone)]
pub struct ContentExtractor {
    fetcher: Arc<dyn FetchBackend>,
    cleaner: Arc<dyn ContentCleaner>,
    density: DensityEngine,
    config: GateConfig,
}

impl ContentExtractor {
    pub fn new(fetcher: Arc<dyn FetchBackend>, density: DensityEngine, config: GateConfig) -> Self {
        Self {
            fetcher,
            cleaner: Arc::new(HtmlCleaner::new()),
            density,
            config,
        }
    }

    pub fn with_cleaner(mut self, cleaner: Arc<dyn ContentCleaner>) -> Self {
        self.cleaner = cleaner;
        self
    }

    pub fn fetcher(&self) -> &dyn FetchBackend {
        self.fetcher.as_ref()
    }

    pub fn cleaner(&self) -> &dyn ContentCleaner {
        self.cleaner.as_ref()
    }

    pub fn density(&self) -> &DensityEngine {
        &self.density
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub async fn extract_from_url(&self, url: &str, force_depth: bool) -> ExtractionResult {
        let markup = match fetch_markup(
            self.fetcher.as_ref(),
            url,
            self.config.fetch_timeout_ms,
            self.config.max_bytes,
        )
        .await
        {
            Ok(m) => m,
            Err(e) => {
                warn!(target: "sgnl::extract", url, error = %e, "fetch failed");
                return ExtractionResult::failed(url, e.to_string());
            }
        };
        self.extract_from_markup(url, &markup, force_depth)
    }

    /// Same pipeline as [`Self::extract_from_url`] for markup already in hand.
    ///
    /// Without `force_depth` the density metrics only look at the first
    /// `quick_scan_chars` characters; the packaged content is always whole.
    pub fn extract_from_markup(&self, url: &str, markup: &str, force_depth: bool) -> ExtractionResult {
        let Some(content) = self.cleaner.extract_clean_text(markup) else {
            warn!(target: "sgnl::extract", url, "no readable text");
            return ExtractionResult::failed(url, NO_CONTENT);
        };

        let title = self
            .cleaner
            .extract_metadata(markup)
            .and_then(|m| m.title)
            .or_else(|| extract_title_fallback(markup))
            .unwrap_or_else(|| UNTITLED.to_string());

        let length = content.chars().count();
        let signal_score = calculate_signal_score(&content, url, &title);

        let sample: String;
        let measured: &str = if force_depth || length <= self.config.quick_scan_chars {
            &content
        } else {
            sample = content.chars().take(self.config.quick_scan_chars).collect();
            &sample
        };
        let inputs = self.density.analyze(measured);
        let density_score = inputs.combined(self.density.weights());

        debug!(
            target: "sgnl::extract",
            url,
            length,
            signal_score,
            density_score,
            idea = inputs.idea,
            "extracted"
        );

        ExtractionResult {
            url: url.to_string(),
            title,
            source: extract_domain(url),
            length,
            signal_score,
            density_score,
            idea_density: inputs.idea,
            dependency_density: inputs.dependency,
            readability: inputs.readability,
            content,
            error: None,
        }
    }
}
