//! Classic readability formulas over word, sentence and syllable counts.

use crate::textprep;
use sgnl_core::model::{
    AUTOMATED_READABILITY_INDEX, COLEMAN_LIAU_INDEX, FLESCH_KINCAID_GRADE, FLESCH_READING_EASE,
    GUNNING_FOG,
};
use sgnl_core::{Error, ReadabilityEstimator, ReadabilityMetrics, Result};

/// Words with this many syllables or more count as "complex" for Gunning fog.
const COMPLEX_SYLLABLES: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaReadability;

impl FormulaReadability {
    pub fn new() -> Self {
        Self
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl ReadabilityEstimator for FormulaReadability {
    fn name(&self) -> &'static str {
        "formula"
    }

    fn metrics(&self, text: &str) -> Result<ReadabilityMetrics> {
        let words = textprep::words(text);
        if words.is_empty() {
            return Err(Error::Estimator("no words to score".to_string()));
        }
        let w = words.len() as f64;
        let s = textprep::sentences(text).len().max(1) as f64;
        let syllables: Vec<usize> = words.iter().map(|x| textprep::syllables(x)).collect();
        let syl = syllables.iter().sum::<usize>() as f64;
        let complex = syllables
            .iter()
            .filter(|&&n| n >= COMPLEX_SYLLABLES)
            .count() as f64;
        let chars = textprep::word_char_count(&words) as f64;
        let letters = words
            .iter()
            .map(|x| textprep::letter_count(x))
            .sum::<usize>() as f64;

        let wps = w / s;
        let spw = syl / w;

        let mut out = ReadabilityMetrics::new();
        out.insert(
            FLESCH_READING_EASE.to_string(),
            round2(206.835 - 1.015 * wps - 84.6 * spw),
        );
        out.insert(
            FLESCH_KINCAID_GRADE.to_string(),
            round2(0.39 * wps + 11.8 * spw - 15.59),
        );
        out.insert(
            GUNNING_FOG.to_string(),
            round2(0.4 * (wps + 100.0 * complex / w)),
        );
        out.insert(
            AUTOMATED_READABILITY_INDEX.to_string(),
            round2(4.71 * (chars / w) + 0.5 * wps - 21.43),
        );
        // Coleman-Liau uses letters and sentences per 100 words.
        let l = letters / w * 100.0;
        let s100 = s / w * 100.0;
        out.insert(
            COLEMAN_LIAU_INDEX.to_string(),
            round2(0.0588 * l - 0.296 * s100 - 15.8),
        );
        Ok(out)
    }
}
