//! Records produced by the scoring pipeline.
//!
//! Everything here is built once per request and never mutated afterwards;
//! a retry builds a fresh value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named readability formulas (metric name → raw value).
pub type ReadabilityMetrics = BTreeMap<String, f64>;

pub const FLESCH_READING_EASE: &str = "flesch_reading_ease";
pub const FLESCH_KINCAID_GRADE: &str = "flesch_kincaid_grade";
pub const GUNNING_FOG: &str = "gunning_fog";
pub const AUTOMATED_READABILITY_INDEX: &str = "automated_readability_index";
pub const COLEMAN_LIAU_INDEX: &str = "coleman_liau_index";

pub const EXTRACTION_FAILED_TITLE: &str = "Extraction Failed";
pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub url: String,
    pub title: String,
    pub content: String,
    /// Originating domain (`www.` stripped).
    pub source: String,
    /// Length of `content` in characters; 0 for error results.
    pub length: usize,
    pub signal_score: f64,
    /// Combined density over every available channel.
    pub density_score: f64,
    /// Raw idea-density channel the combined score was built from.
    pub idea_density: f64,
    pub dependency_density: Option<f64>,
    pub readability: ReadabilityMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    /// Uniform error record: zero length, zeroed scores, no optional metrics.
    pub fn failed(url: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            url: url.to_string(),
            title: EXTRACTION_FAILED_TITLE.to_string(),
            content: format!("Error: {message}"),
            source: crate::extract_domain(url),
            length: 0,
            signal_score: 0.0,
            density_score: 0.0,
            idea_density: 0.0,
            dependency_density: None,
            readability: ReadabilityMetrics::new(),
            error: Some(message),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One signed detector contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub delta: i32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicScore {
    /// Always within `0..=100`.
    pub score: u8,
    pub reason: String,
    /// Non-zero adjustments in detector execution order.
    pub adjustments: Vec<Adjustment>,
}

impl HeuristicScore {
    pub const BASE: i32 = 50;
    pub const MAX_REASONS: usize = 3;
    pub const AVERAGE_REASON: &'static str = "Average content quality";

    /// Outcome that bypasses the detectors entirely (guards).
    pub fn short_circuit(score: u8, reason: &str) -> Self {
        Self {
            score: score.min(100),
            reason: reason.to_string(),
            adjustments: Vec::new(),
        }
    }

    /// Aggregate detector output: zero deltas are dropped, the score is
    /// `clamp(BASE + sum, 0, 100)` and the reason is the first three reasons
    /// in the order given.
    pub fn from_adjustments(adjustments: impl IntoIterator<Item = Adjustment>) -> Self {
        let adjustments: Vec<Adjustment> =
            adjustments.into_iter().filter(|a| a.delta != 0).collect();
        let total: i32 = adjustments.iter().map(|a| a.delta).sum();
        let score = (Self::BASE + total).clamp(0, 100) as u8;
        let reasons: Vec<&str> = adjustments
            .iter()
            .map(|a| a.reason.as_str())
            .filter(|r| !r.is_empty())
            .take(Self::MAX_REASONS)
            .collect();
        let reason = if reasons.is_empty() {
            Self::AVERAGE_REASON.to_string()
        } else {
            reasons.join("; ")
        };
        Self {
            score,
            reason,
            adjustments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub url: String,
    pub title: String,
    pub density_score: f64,
    pub signal_score: f64,
    pub skipped_analysis: bool,
    /// Set only on proceed decisions whose heuristic pass succeeded.
    pub heuristic: Option<HeuristicScore>,
    /// Fixed low-signal explanation on skip decisions.
    pub explanation: Option<String>,
    /// Canonical text handed to the analysis step, bounded by
    /// `max_content_chars`. Absent on skip decisions.
    pub analysis_text: Option<String>,
}

impl GateDecision {
    pub fn skip(extraction: &ExtractionResult) -> Self {
        Self {
            url: extraction.url.clone(),
            title: extraction.title.clone(),
            density_score: extraction.density_score,
            signal_score: extraction.signal_score,
            skipped_analysis: true,
            heuristic: None,
            explanation: Some(format!(
                "Low Signal: Content filtered (density={:.2})",
                extraction.density_score
            )),
            analysis_text: None,
        }
    }

    pub fn proceed(
        extraction: &ExtractionResult,
        heuristic: Option<HeuristicScore>,
        max_content_chars: usize,
    ) -> Self {
        Self {
            url: extraction.url.clone(),
            title: extraction.title.clone(),
            density_score: extraction.density_score,
            signal_score: extraction.signal_score,
            skipped_analysis: false,
            heuristic,
            explanation: None,
            analysis_text: Some(extraction.content.chars().take(max_content_chars).collect()),
        }
    }
}

fn default_title() -> String {
    UNTITLED.to_string()
}

/// A pre-fetched search hit submitted for batch scoring.
///
/// Unknown fields are carried through untouched so callers get their own
/// record back, enriched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Prior relevance in `[0, 1]` from the upstream search provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Candidate {
    pub const DEFAULT_PRIOR: f64 = 0.5;

    pub fn new(url: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: content.into(),
            score: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn prior(&self) -> f64 {
        self.score.unwrap_or(Self::DEFAULT_PRIOR)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub url: String,
    pub title: String,
    pub content: String,
    pub original_score: f64,
    pub heuristic_score: u8,
    pub heuristic_reason: String,
    pub density_score: f64,
    pub skipped_analysis: bool,
    pub final_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub query: String,
    pub results: Vec<ScoredCandidate>,
    pub count: usize,
    pub skipped_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityCheck {
    #[serde(flatten)]
    pub item: Candidate,
    pub density_score: f64,
    pub skipped_analysis: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityCheckReport {
    pub results: Vec<DensityCheck>,
    pub count: usize,
    pub skipped_count: usize,
    pub threshold: f64,
}

/// Round to three decimals, the precision batch records are reported at.
pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adj(delta: i32, reason: &str) -> Adjustment {
        Adjustment {
            delta,
            reason: reason.to_string(),
        }
    }

    #[test]
    fn failed_extraction_zeroes_everything() {
        let r = ExtractionResult::failed("https://www.example.com/a", "Test error");
        assert_eq!(r.title, "Extraction Failed");
        assert_eq!(r.content, "Error: Test error");
        assert_eq!(r.source, "example.com");
        assert_eq!(r.length, 0);
        assert_eq!(r.signal_score, 0.0);
        assert_eq!(r.density_score, 0.0);
        assert_eq!(r.idea_density, 0.0);
        assert!(r.dependency_density.is_none());
        assert!(r.readability.is_empty());
        assert_eq!(r.error.as_deref(), Some("Test error"));
        assert!(r.is_error());
    }

    #[test]
    fn heuristic_score_keeps_first_three_reasons_in_order() {
        let s = HeuristicScore::from_adjustments(vec![
            adj(20, "a"),
            adj(0, "dropped"),
            adj(8, "b"),
            adj(-5, "c"),
            adj(-10, "d"),
        ]);
        assert_eq!(s.score, 63);
        assert_eq!(s.reason, "a; b; c");
        assert_eq!(s.adjustments.len(), 4);
        assert!(s.adjustments.iter().all(|a| a.delta != 0));
    }

    #[test]
    fn heuristic_score_clamps_both_ends() {
        let low = HeuristicScore::from_adjustments(vec![adj(-30, "x"), adj(-30, "y")]);
        assert_eq!(low.score, 0);
        let high = HeuristicScore::from_adjustments(vec![adj(20, "x"), adj(15, "y"), adj(30, "z")]);
        assert_eq!(high.score, 100);
    }

    #[test]
    fn heuristic_score_without_adjustments_is_average() {
        let s = HeuristicScore::from_adjustments(Vec::new());
        assert_eq!(s.score, 50);
        assert_eq!(s.reason, "Average content quality");
        assert!(s.adjustments.is_empty());
    }

    #[test]
    fn skip_decision_explains_density() {
        let mut r = ExtractionResult::failed("https://example.com", "x");
        r.error = None;
        r.density_score = 0.3141;
        let d = GateDecision::skip(&r);
        assert!(d.skipped_analysis);
        assert!(d.heuristic.is_none());
        assert!(d.analysis_text.is_none());
        assert_eq!(
            d.explanation.as_deref(),
            Some("Low Signal: Content filtered (density=0.31)")
        );
    }

    #[test]
    fn proceed_decision_bounds_analysis_text() {
        let mut r = ExtractionResult::failed("https://example.com", "x");
        r.error = None;
        r.content = "é".repeat(20);
        let d = GateDecision::proceed(&r, None, 5);
        assert!(!d.skipped_analysis);
        assert_eq!(d.analysis_text.as_deref(), Some("ééééé"));
    }

    #[test]
    fn candidate_defaults_and_passthrough_fields() {
        let c: Candidate = serde_json::from_value(serde_json::json!({
            "url": "https://example.com",
            "raw_content": "kept",
        }))
        .unwrap();
        assert_eq!(c.title, "Untitled");
        assert_eq!(c.content, "");
        assert_eq!(c.prior(), 0.5);
        assert_eq!(c.extra["raw_content"], "kept");

        let check = DensityCheck {
            item: c,
            density_score: 0.5,
            skipped_analysis: false,
        };
        let v = serde_json::to_value(&check).unwrap();
        assert_eq!(v["raw_content"], "kept");
        assert_eq!(v["density_score"], 0.5);
    }

    #[test]
    fn round3_keeps_three_decimals() {
        assert_eq!(round3(0.12345), 0.123);
        assert_eq!(round3(0.9996), 1.0);
        assert_eq!(round3(1.0), 1.0);
    }
}
