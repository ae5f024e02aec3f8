//! The threshold gate in front of the expensive analysis step.
//!
//! Single-URL path: extract → density → skip, or heuristic + proceed.
//! Batch paths: score pre-fetched search candidates against a query
//! (`analyze_candidates`) or just flag them by density (`check_density`).

use crate::density::DensityEngine;
use crate::extractor::ContentExtractor;
use crate::fetch_markup;
use crate::heuristic::StructuralHeuristicScorer;
use futures_util::stream::{self, StreamExt};
use sgnl_core::model::round3;
use sgnl_core::{
    BatchReport, Candidate, DensityCheck, DensityCheckReport, Error, FetchBackend, GateConfig,
    GateDecision, Result, ScoredCandidate,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Canonical text shorter than this (in characters) is not worth gating.
pub const MIN_CONTENT_CHARS: usize = 100;
pub const TOO_SHORT: &str = "Too short";
pub const FETCH_FAILED_REASON: &str = "Could not analyze (fetch failed)";

const FALLBACK_HEURISTIC: u8 = 50;
const HEURISTIC_WEIGHT: f64 = 0.6;
const PRIOR_WEIGHT: f64 = 0.4;

fn short_url(url: &str) -> String {
    url.chars().take(80).collect()
}

/// `(heuristic * 0.6 + prior * 100 * 0.4) / 100`, rounded to 3 decimals.
pub fn final_score(heuristic: u8, prior: f64) -> f64 {
    round3((heuristic as f64 * HEURISTIC_WEIGHT + prior * 100.0 * PRIOR_WEIGHT) / 100.0)
}

#[derive(Clone)]
pub struct GateOrchestrator {
    extractor: ContentExtractor,
    scorer: StructuralHeuristicScorer,
}

impl GateOrchestrator {
    /// Built-in cleaner and estimators (minus any switched off in the env).
    pub fn new(fetcher: Arc<dyn FetchBackend>, config: GateConfig) -> Self {
        let density = DensityEngine::from_config(&config);
        Self::from_extractor(ContentExtractor::new(fetcher, density, config))
    }

    pub fn from_extractor(extractor: ContentExtractor) -> Self {
        Self {
            extractor,
            scorer: StructuralHeuristicScorer::new(),
        }
    }

    pub fn extractor(&self) -> &ContentExtractor {
        &self.extractor
    }

    pub fn config(&self) -> &GateConfig {
        self.extractor.config()
    }

    fn engine(&self) -> &DensityEngine {
        self.extractor.density()
    }

    /// Gate one URL.
    ///
    /// Only an extraction failure or sub-100-character content is an `Err`;
    /// a failed secondary fetch leaves the heuristic unset.
    pub async fn scan(&self, url: &str) -> Result<GateDecision> {
        let cfg = self.config();
        let extraction = self.extractor.extract_from_url(url, true).await;
        if let Some(err) = &extraction.error {
            return Err(Error::InsufficientContent {
                chars: extraction.length,
                reason: err.clone(),
            });
        }
        if extraction.length < MIN_CONTENT_CHARS {
            return Err(Error::InsufficientContent {
                chars: extraction.length,
                reason: TOO_SHORT.to_string(),
            });
        }

        if extraction.density_score < cfg.density_threshold {
            info!(
                target: "sgnl::gate",
                url,
                density = extraction.density_score,
                threshold = cfg.density_threshold,
                "low density; skipping analysis"
            );
            return Ok(GateDecision::skip(&extraction));
        }

        let heuristic = match fetch_markup(
            self.extractor.fetcher(),
            url,
            cfg.heuristic_fetch_timeout_ms,
            cfg.max_bytes,
        )
        .await
        {
            Ok(markup) => Some(self.scorer.score(&markup, &extraction.title)),
            Err(e) => {
                warn!(target: "sgnl::gate", url, error = %e, "heuristic fetch failed");
                None
            }
        };
        Ok(GateDecision::proceed(
            &extraction,
            heuristic,
            cfg.max_content_chars,
        ))
    }

    async fn score_candidate(&self, query: &str, candidate: Candidate) -> ScoredCandidate {
        let cfg = self.config();
        let supplied_density = |fallback: f64| {
            if candidate.content.is_empty() {
                fallback
            } else {
                self.engine().density(&candidate.content)
            }
        };

        let (heuristic_score, heuristic_reason, density) = match fetch_markup(
            self.extractor.fetcher(),
            &candidate.url,
            cfg.batch_fetch_timeout_ms,
            cfg.max_bytes,
        )
        .await
        {
            Ok(markup) => {
                let h = self.scorer.score(&markup, query);
                let density = match self.extractor.cleaner().extract_clean_text(&markup) {
                    Some(text) => self.engine().density(&text),
                    None => supplied_density(0.0),
                };
                (h.score, h.reason, density)
            }
            Err(e) => {
                warn!(target: "sgnl::gate", url = %short_url(&candidate.url), error = %e, "candidate fetch failed");
                (
                    FALLBACK_HEURISTIC,
                    FETCH_FAILED_REASON.to_string(),
                    supplied_density(0.5),
                )
            }
        };

        let skipped_analysis = density < cfg.density_threshold;
        if skipped_analysis {
            info!(target: "sgnl::gate", url = %short_url(&candidate.url), density, "low density candidate");
        }
        let prior = candidate.prior();
        ScoredCandidate {
            final_score: final_score(heuristic_score, prior),
            url: candidate.url,
            title: candidate.title,
            content: candidate.content,
            original_score: prior,
            heuristic_score,
            heuristic_reason,
            density_score: round3(density),
            skipped_analysis,
        }
    }

    /// Score every candidate independently and order by final score
    /// (descending, ties keep input order). One candidate's failure never
    /// affects another.
    pub async fn analyze_candidates(&self, query: &str, candidates: Vec<Candidate>) -> BatchReport {
        let concurrency = self.config().batch_concurrency.max(1);
        let mut results: Vec<ScoredCandidate> = stream::iter(
            candidates
                .into_iter()
                .map(|c| self.score_candidate(query, c)),
        )
        .buffered(concurrency)
        .collect()
        .await;
        results.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));

        let skipped_count = results.iter().filter(|r| r.skipped_analysis).count();
        info!(
            target: "sgnl::gate",
            count = results.len(),
            skipped = skipped_count,
            "batch analyzed"
        );
        BatchReport {
            query: query.to_string(),
            count: results.len(),
            skipped_count,
            results,
        }
    }

    /// Flag pre-fetched items by the density of their supplied content. No I/O.
    pub fn check_density(&self, items: Vec<Candidate>, threshold: f64) -> DensityCheckReport {
        let results: Vec<DensityCheck> = items
            .into_iter()
            .map(|item| {
                let density = if item.content.is_empty() {
                    0.0
                } else {
                    self.engine().density(&item.content)
                };
                DensityCheck {
                    item,
                    density_score: round3(density),
                    skipped_analysis: density < threshold,
                }
            })
            .collect();
        let skipped_count = results.iter().filter(|r| r.skipped_analysis).count();
        DensityCheckReport {
            count: results.len(),
            skipped_count,
            threshold,
            results,
        }
    }
}
