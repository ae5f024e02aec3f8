//! Multi-channel density scoring.
//!
//! Three independent channels feed one bounded score:
//! - idea density (propositions per word)
//! - dependency density (syntactic dependents per word, optional)
//! - readability (reading difficulty derived from Flesch reading ease, optional)
//!
//! Any channel can be missing (estimator switched off, estimator error, or
//! text too short). The combiner normalizes over the channels that are
//! present, so every subset combines on the same scale.

use crate::propositions::LexicalPropositionEstimator;
use crate::readability::FormulaReadability;
use serde::{Deserialize, Serialize};
use sgnl_core::model::FLESCH_READING_EASE;
use sgnl_core::{
    DensityWeights, GateConfig, PropositionEstimator, ReadabilityEstimator, ReadabilityMetrics,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Texts shorter than this (in characters) are not estimated.
pub const MIN_TEXT_CHARS: usize = 50;
/// Idea density reported when the estimator is unavailable or fails.
pub const NEUTRAL_DENSITY: f64 = 0.5;
/// Flesch reading ease at which reading difficulty is zero.
const EASE_CEILING: f64 = 90.0;

/// Per-text channel values, before combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityInputs {
    pub idea: f64,
    pub dependency: Option<f64>,
    pub readability: ReadabilityMetrics,
}

impl DensityInputs {
    pub fn combined(&self, weights: &DensityWeights) -> f64 {
        combine(self.idea, self.dependency, &self.readability, weights)
    }
}

/// Reading difficulty in "higher is denser" orientation, when the ease
/// metric is present.
pub fn reading_difficulty(readability: &ReadabilityMetrics) -> Option<f64> {
    readability
        .get(FLESCH_READING_EASE)
        .map(|ease| (EASE_CEILING - ease) / EASE_CEILING)
}

/// Weighted mean over the present channels.
pub fn combine(
    idea: f64,
    dependency: Option<f64>,
    readability: &ReadabilityMetrics,
    weights: &DensityWeights,
) -> f64 {
    combine_channels(Some(idea), dependency, readability, weights)
}

/// Like [`combine`], but the idea channel may be absent too. With no channel
/// present (or only zero-weight channels) the result is the neutral 0.5.
pub fn combine_channels(
    idea: Option<f64>,
    dependency: Option<f64>,
    readability: &ReadabilityMetrics,
    weights: &DensityWeights,
) -> f64 {
    let channels = [
        (weights.idea, idea),
        (weights.dependency, dependency),
        (weights.readability, reading_difficulty(readability)),
    ];
    let (weighted, used) = channels
        .iter()
        .filter_map(|(w, v)| v.map(|v| (*w, v)))
        .fold((0.0_f64, 0.0_f64), |(sum, ws), (w, v)| (sum + w * v, ws + w));
    if used == 0.0 {
        return NEUTRAL_DENSITY;
    }
    (weighted / used).clamp(0.0, 1.0)
}

fn too_short(text: &str) -> bool {
    text.chars().take(MIN_TEXT_CHARS).count() < MIN_TEXT_CHARS
}

/// Density engine with pluggable (and possibly absent) estimators.
#[derive(Clone)]
pub struct DensityEngine {
    propositions: Option<Arc<dyn PropositionEstimator>>,
    readability: Option<Arc<dyn ReadabilityEstimator>>,
    weights: DensityWeights,
}

impl std::fmt::Debug for DensityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DensityEngine")
            .field("propositions", &self.propositions.as_ref().map(|e| e.name()))
            .field("readability", &self.readability.as_ref().map(|e| e.name()))
            .field("weights", &self.weights)
            .finish()
    }
}

impl Default for DensityEngine {
    fn default() -> Self {
        Self::with_estimators(
            Some(Arc::new(LexicalPropositionEstimator::new())),
            Some(Arc::new(FormulaReadability::new())),
            DensityWeights::default(),
        )
    }
}

impl DensityEngine {
    pub fn with_estimators(
        propositions: Option<Arc<dyn PropositionEstimator>>,
        readability: Option<Arc<dyn ReadabilityEstimator>>,
        weights: DensityWeights,
    ) -> Self {
        Self {
            propositions,
            readability,
            weights,
        }
    }

    /// Engine with no estimators at all; every channel degrades.
    pub fn without_estimators(weights: DensityWeights) -> Self {
        Self::with_estimators(None, None, weights)
    }

    /// Built-in estimators, minus those switched off via
    /// `SGNL_IDEA_DENSITY=off` / `SGNL_READABILITY=off`.
    pub fn from_config(cfg: &GateConfig) -> Self {
        let propositions: Option<Arc<dyn PropositionEstimator>> =
            if GateConfig::estimator_enabled("IDEA_DENSITY") {
                Some(Arc::new(LexicalPropositionEstimator::new()))
            } else {
                None
            };
        let readability: Option<Arc<dyn ReadabilityEstimator>> =
            if GateConfig::estimator_enabled("READABILITY") {
                Some(Arc::new(FormulaReadability::new()))
            } else {
                None
            };
        Self::with_estimators(propositions, readability, cfg.weights)
    }

    pub fn weights(&self) -> &DensityWeights {
        &self.weights
    }

    pub fn has_proposition_estimator(&self) -> bool {
        self.propositions.is_some()
    }

    pub fn has_readability_estimator(&self) -> bool {
        self.readability.is_some()
    }

    pub fn idea_density(&self, text: &str) -> f64 {
        if too_short(text) {
            return 0.0;
        }
        let Some(est) = &self.propositions else {
            return NEUTRAL_DENSITY;
        };
        match est.idea_density(text) {
            Ok(v) => v.clamp(0.0, 1.0),
            Err(e) => {
                warn!(target: "sgnl::density", estimator = est.name(), error = %e, "idea density failed");
                NEUTRAL_DENSITY
            }
        }
    }

    pub fn dependency_density(&self, text: &str) -> Option<f64> {
        if too_short(text) {
            return None;
        }
        let est = self.propositions.as_ref()?;
        match est.dependency_density(text) {
            Ok(v) => Some(v.clamp(0.0, 1.0)),
            Err(e) => {
                debug!(target: "sgnl::density", estimator = est.name(), error = %e, "dependency density unavailable");
                None
            }
        }
    }

    pub fn readability_metrics(&self, text: &str) -> ReadabilityMetrics {
        if too_short(text) {
            return ReadabilityMetrics::new();
        }
        let Some(est) = &self.readability else {
            return ReadabilityMetrics::new();
        };
        est.metrics(text).unwrap_or_else(|e| {
            debug!(target: "sgnl::density", estimator = est.name(), error = %e, "readability unavailable");
            ReadabilityMetrics::new()
        })
    }

    pub fn analyze(&self, text: &str) -> DensityInputs {
        DensityInputs {
            idea: self.idea_density(text),
            dependency: self.dependency_density(text),
            readability: self.readability_metrics(text),
        }
    }

    pub fn density(&self, text: &str) -> f64 {
        self.analyze(text).combined(&self.weights)
    }
}
