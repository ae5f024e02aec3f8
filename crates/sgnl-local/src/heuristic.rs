//! Structural quality estimate from raw markup alone (no model calls).
//!
//! Five detectors run in a fixed order; each contributes at most one signed
//! adjustment. The order matters: the consolidated reason keeps only the
//! first three reasons.

use regex::{Regex, RegexBuilder};
use sgnl_core::{Adjustment, HeuristicScore};
use std::sync::LazyLock;
use tracing::info;

/// Markup shorter than this (in characters) is not scored.
pub const MIN_MARKUP_CHARS: usize = 100;

pub const TOO_SHORT_REASON: &str = "Empty or too short content";
pub const PARSE_FAILED_REASON: &str = "Failed to parse HTML";
const PARSE_FAILED_SCORE: u8 = 30;

const CODING_KEYWORDS: &[&str] = &[
    "python",
    "javascript",
    "typescript",
    "java",
    "rust",
    "go",
    "golang",
    "api",
    "error",
    "how to",
    "tutorial",
    "example",
    "code",
    "function",
    "class",
    "method",
    "algorithm",
    "data structure",
    "programming",
    "debug",
    "exception",
    "library",
    "framework",
    "sdk",
    "cli",
    "docker",
    "kubernetes",
    "database",
    "sql",
    "nosql",
    "git",
];

const AFFILIATE_PATTERNS: &[&str] = &[
    r"amzn\.to",
    r"shareasale",
    r"clickbank",
    r"cj\.com",
    r"affiliate",
    r"awin1\.com",
    r"rakuten",
    r"impact\.com",
    r"partner\.",
    r"ref=",
    r"tag=",
    r"utm_source=affiliate",
];

const HYPE_PHRASES: &[&str] = &[
    "shocking",
    "miracle",
    "secret",
    "unbelievable",
    "amazing",
    "you won't believe",
    "mind-blowing",
    "insane",
    "crazy",
    "game-changer",
    "revolutionary",
    "ultimate",
    "best ever",
    "10x",
    "100x",
    "overnight",
    "instantly",
    "quick fix",
    "one weird trick",
    "doctors hate",
    "they don't want you to know",
];

static AFFILIATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(&AFFILIATE_PATTERNS.join("|"))
        .case_insensitive(true)
        .build()
        .expect("AFFILIATE_RE should compile")
});

static HYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = HYPE_PHRASES
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .expect("HYPE_RE should compile")
});

/// Elements whose text never counts as readable content.
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template"];

fn count(doc: &html_scraper::Html, selector: &str) -> usize {
    html_scraper::Selector::parse(selector)
        .map(|sel| doc.select(&sel).count())
        .unwrap_or(0)
}

fn first_text(doc: &html_scraper::Html, selector: &str) -> Option<String> {
    let sel = html_scraper::Selector::parse(selector).ok()?;
    let el = doc.select(&sel).next()?;
    Some(el.text().collect::<String>())
}

/// Visible text: trimmed text nodes outside script-like elements, joined
/// with single spaces.
pub fn visible_text(doc: &html_scraper::Html) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| INVISIBLE_TAGS.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        let t = text.trim();
        if !t.is_empty() {
            parts.push(t);
        }
    }
    parts.join(" ")
}

/// Binary bodies served as HTML: NUL bytes or a high share of control chars.
fn looks_unparseable(markup: &str) -> bool {
    if markup.contains('\0') {
        return true;
    }
    let total = markup.chars().count();
    let control = markup
        .chars()
        .filter(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\u{0c}'))
        .count();
    control * 10 > total
}

fn prefix_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn adjustment(delta: i32, reason: impl Into<String>) -> Adjustment {
    Adjustment {
        delta,
        reason: reason.into(),
    }
}

fn code_density(doc: &html_scraper::Html, query: &str) -> Option<Adjustment> {
    let q = query.to_lowercase();
    let coding_query = CODING_KEYWORDS.iter().any(|kw| q.contains(kw));
    let blocks = count(doc, "pre") + count(doc, "code");
    match (coding_query, blocks) {
        (true, n) if n >= 3 => Some(adjustment(20, format!("High code density ({n} blocks)"))),
        (true, n) if n >= 1 => Some(adjustment(
            10,
            format!("Contains code examples ({n} blocks)"),
        )),
        (false, n) if n >= 5 => Some(adjustment(10, format!("Rich in code samples ({n} blocks)"))),
        _ => None,
    }
}

fn data_density(doc: &html_scraper::Html) -> Option<Adjustment> {
    match count(doc, "table") {
        n if n >= 3 => Some(adjustment(15, format!("Structured data tables ({n})"))),
        n if n >= 1 => Some(adjustment(8, "Contains data tables")),
        _ => None,
    }
}

fn bloat(markup: &str, doc: &html_scraper::Html) -> Option<Adjustment> {
    let text_len = visible_text(doc).chars().count();
    if text_len == 0 {
        return Some(adjustment(-30, "No readable text content"));
    }
    if text_len < 200 {
        return Some(adjustment(-20, "Very thin content"));
    }
    let ratio = markup.chars().count() as f64 / text_len as f64;
    if ratio > 20.0 {
        Some(adjustment(
            -25,
            format!("Extremely bloated HTML (ratio: {ratio:.1})"),
        ))
    } else if ratio > 12.0 {
        Some(adjustment(-15, format!("High HTML bloat (ratio: {ratio:.1})")))
    } else if ratio > 8.0 {
        Some(adjustment(-5, "Moderate HTML overhead"))
    } else if ratio < 3.0 {
        Some(adjustment(10, "Clean, text-focused content"))
    } else {
        None
    }
}

fn affiliate_links(doc: &html_scraper::Html) -> Option<Adjustment> {
    let sel = html_scraper::Selector::parse("a[href]").ok()?;
    let n = doc
        .select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| AFFILIATE_RE.is_match(href))
        .count();
    match n {
        n if n >= 5 => Some(adjustment(-30, format!("Affiliate farm detected ({n} links)"))),
        n if n >= 3 => Some(adjustment(-20, format!("Multiple affiliate links ({n})"))),
        n if n >= 1 => Some(adjustment(-10, "Contains affiliate links")),
        _ => None,
    }
}

fn hype(doc: &html_scraper::Html) -> Option<Adjustment> {
    if let Some(title) = first_text(doc, "title") {
        if HYPE_RE.is_match(&title) {
            return Some(adjustment(
                -20,
                format!("Clickbait title detected: '{}...'", prefix_chars(&title, 50)),
            ));
        }
    }
    if let Some(h1) = first_text(doc, "h1") {
        if HYPE_RE.is_match(&h1) {
            return Some(adjustment(
                -15,
                format!("Hype headline detected: '{}...'", prefix_chars(&h1, 50)),
            ));
        }
    }
    None
}

/// Scores raw markup in `0..=100` with a short justification.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralHeuristicScorer;

impl StructuralHeuristicScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score `markup`; `query` decides whether code blocks count as on-topic.
    ///
    /// Pure: the same input always yields the same score.
    pub fn score(&self, markup: &str, query: &str) -> HeuristicScore {
        if markup.chars().take(MIN_MARKUP_CHARS).count() < MIN_MARKUP_CHARS {
            return HeuristicScore::short_circuit(0, TOO_SHORT_REASON);
        }
        if looks_unparseable(markup) {
            return HeuristicScore::short_circuit(PARSE_FAILED_SCORE, PARSE_FAILED_REASON);
        }
        let doc = html_scraper::Html::parse_document(markup);

        let detectors = [
            code_density(&doc, query),
            data_density(&doc),
            bloat(markup, &doc),
            affiliate_links(&doc),
            hype(&doc),
        ];
        let out = HeuristicScore::from_adjustments(detectors.into_iter().flatten());
        info!(
            target: "sgnl::heuristic",
            score = out.score,
            adjustments = out.adjustments.len(),
            reason = %out.reason,
            "structural score"
        );
        out
    }
}
