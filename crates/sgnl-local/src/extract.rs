use regex::Regex;
use sgnl_core::{ContentCleaner, PageMetadata};
use std::io::Cursor;
use std::sync::LazyLock;

static FOOTNOTE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\[\d+\]: .*$").expect("FOOTNOTE_LINE_RE should compile"));
static LINK_MARK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\[\]]*)\]\[\d+\]").expect("LINK_MARK_RE should compile")
});

/// Convert HTML to readable plain text.
///
/// Notes:
/// - This is intentionally "good enough" and deterministic, not a full readability engine.
/// - Link footnotes are dropped; only the anchor text stays inline.
pub fn html_to_text(html: &str, width: usize) -> String {
    // html2text expects bytes; Cursor avoids allocating a second large buffer.
    let raw = html2text::from_read(Cursor::new(html.as_bytes()), width)
        .unwrap_or_else(|_| html.to_string());
    let no_footnotes = FOOTNOTE_LINE_RE.replace_all(&raw, "");
    LINK_MARK_RE.replace_all(&no_footnotes, "$1").into_owned()
}

fn norm_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn has_any_text(s: &str) -> bool {
    s.chars().any(|c| !c.is_whitespace())
}

/// Collapse runs of spaces inside lines and runs of blank lines, keeping
/// paragraph breaks (sentence splitting relies on them).
pub fn normalize_text(s: &str) -> String {
    let mut out = String::new();
    let mut blank_run = 0usize;
    for line in s.lines() {
        let line = norm_ws(line);
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(&line);
        blank_run = 0;
    }
    out
}

fn class_or_id_lc(el: &html_scraper::ElementRef) -> String {
    let mut out = String::new();
    if let Some(c) = el.value().attr("class") {
        out.push_str(c);
        out.push(' ');
    }
    if let Some(i) = el.value().attr("id") {
        out.push_str(i);
    }
    out.to_ascii_lowercase()
}

fn is_boilerplate_container(el: &html_scraper::ElementRef) -> bool {
    let s = class_or_id_lc(el);
    if s.is_empty() {
        return false;
    }
    [
        "nav",
        "menu",
        "sidebar",
        "footer",
        "header",
        "banner",
        "cookie",
        "consent",
        "advert",
        "promo",
        "subscribe",
        "newsletter",
    ]
    .iter()
    .any(|bad| s.contains(bad))
}

fn element_text_chars(el: &html_scraper::ElementRef) -> usize {
    el.text().map(|t| t.chars().count()).sum()
}

fn element_link_text_chars(el: &html_scraper::ElementRef) -> usize {
    let Ok(sel) = html_scraper::Selector::parse("a") else {
        return 0;
    };
    el.select(&sel)
        .map(|a| a.text().map(|t| t.chars().count()).sum::<usize>())
        .sum()
}

/// Best article-like block: dense non-link text, with bonuses for
/// `article`/`main` and penalties for navigation-style containers.
fn pick_main_text(html: &str, max_elems: usize) -> Option<String> {
    let doc = html_scraper::Html::parse_document(html);
    let sel = html_scraper::Selector::parse("article, main, section, div").ok()?;
    let mut best_score: i64 = 0;
    let mut best_text: Option<String> = None;

    for el in doc.select(&sel).take(max_elems) {
        if is_boilerplate_container(&el) {
            continue;
        }
        let txt = element_text_chars(&el);
        if txt < 20 {
            continue;
        }
        let link_txt = element_link_text_chars(&el);
        let mut score = txt as i64 - 2 * (link_txt as i64);
        match el.value().name() {
            "article" => score += 500,
            "main" => score += 300,
            _ => {}
        }
        if link_txt > txt / 2 {
            score -= 500;
        }
        if score > best_score {
            best_score = score;
            let t = el.text().collect::<Vec<_>>().join(" ");
            best_text = Some(norm_ws(&t));
        }
    }
    best_text.filter(|t| has_any_text(t))
}

/// Higher is more "content-like": penalizes link soup, menu-like short lines
/// and UI boilerplate tokens.
fn quality_score(s: &str) -> i64 {
    let non_ws = s.chars().filter(|c| !c.is_whitespace()).count() as i64;
    let url_hits = s.matches("http").count() as i64;
    let mut score = non_ws - 200 * url_hits;

    let short_lines = s
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| l.chars().count() <= 30)
        .count() as i64;
    score -= 20 * short_lines;

    let sl = s.to_ascii_lowercase();
    for needle in ["sign up", "log in", "login", "cookie", "consent", "privacy", "terms"] {
        score -= 250 * sl.matches(needle).count() as i64;
    }
    score
}

fn strip_tag_blocks(html: &str, tag: &str) -> String {
    // Only removes a block when its close tag is found; ASCII-case-insensitive.
    let open_pat = format!("<{}", tag.to_ascii_lowercase());
    let close_pat = format!("</{}>", tag.to_ascii_lowercase());

    let mut out = String::new();
    let mut i = 0usize;
    let lower = html.to_ascii_lowercase();
    while let Some(rel_start) = lower[i..].find(&open_pat) {
        let start = i + rel_start;
        let after_open = start + open_pat.len();
        let Some(rel_end) = lower[after_open..].find(&close_pat) else {
            break;
        };
        out.push_str(&html[i..start]);
        i = after_open + rel_end + close_pat.len();
    }
    out.push_str(&html[i..]);
    out
}

fn decode_basic_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Last-resort title scan over raw markup.
///
/// Finds the first `<title` (any case), skips the rest of the opening tag and
/// takes the text up to the next `<` (or the end of input).
pub fn extract_title_fallback(markup: &str) -> Option<String> {
    if markup.is_empty() {
        return None;
    }
    let lower = markup.to_ascii_lowercase();
    let start = lower.find("<title")?;
    let open_end = start + lower[start..].find('>')? + 1;
    let rest = &markup[open_end..];
    let text = match rest.find('<') {
        Some(end) => &rest[..end],
        None => rest,
    };
    let title = norm_ws(&decode_basic_entities(text));
    (!title.is_empty()).then_some(title)
}

fn first_text(doc: &html_scraper::Html, selector: &str) -> Option<String> {
    let sel = html_scraper::Selector::parse(selector).ok()?;
    let el = doc.select(&sel).next()?;
    let t = norm_ws(&el.text().collect::<Vec<_>>().join(" "));
    (!t.is_empty()).then_some(t)
}

fn first_attr(doc: &html_scraper::Html, selector: &str, attr: &str) -> Option<String> {
    let sel = html_scraper::Selector::parse(selector).ok()?;
    let v = doc.select(&sel).next()?.value().attr(attr)?.trim().to_string();
    (!v.is_empty()).then_some(v)
}

/// Default clean-text and metadata collaborator.
///
/// Strips script-like blocks, renders with html2text and switches to the
/// article-like block when it is clearly better than the whole page.
#[derive(Debug, Clone)]
pub struct HtmlCleaner {
    pub width: usize,
    pub max_candidate_elems: usize,
}

impl Default for HtmlCleaner {
    fn default() -> Self {
        Self {
            width: 100,
            max_candidate_elems: 20_000,
        }
    }
}

impl HtmlCleaner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentCleaner for HtmlCleaner {
    fn extract_clean_text(&self, markup: &str) -> Option<String> {
        let mut html = markup.to_string();
        for tag in ["script", "style", "noscript"] {
            html = strip_tag_blocks(&html, tag);
        }
        let full = normalize_text(&html_to_text(&html, self.width));
        let main = pick_main_text(&html, self.max_candidate_elems);

        if let Some(main) = main {
            let full_ok = has_any_text(&full);
            let s_full = if full_ok { quality_score(&full) } else { 0 };
            if !full_ok || quality_score(&main) >= s_full + 300 {
                return Some(main);
            }
        }
        has_any_text(&full).then_some(full)
    }

    fn extract_metadata(&self, markup: &str) -> Option<PageMetadata> {
        let doc = html_scraper::Html::parse_document(markup);
        let meta = PageMetadata {
            title: first_text(&doc, "title")
                .or_else(|| first_attr(&doc, "meta[property=\"og:title\"]", "content")),
            description: first_attr(&doc, "meta[name=\"description\"]", "content")
                .or_else(|| first_attr(&doc, "meta[property=\"og:description\"]", "content")),
            site_name: first_attr(&doc, "meta[property=\"og:site_name\"]", "content"),
            language: first_attr(&doc, "html[lang]", "lang"),
        };
        (meta != PageMetadata::default()).then_some(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_from_simple_html() {
        let html = r#"<html><body><h1>Hello</h1><p>world</p></body></html>"#;
        let out = html_to_text(html, 80);
        assert!(out.contains("Hello"));
        assert!(out.contains("world"));
    }

    #[test]
    fn link_footnotes_are_dropped() {
        let html = r#"<p>See <a href="https://example.com/doc">the docs</a> for details.</p>"#;
        let out = html_to_text(html, 80);
        assert!(out.contains("the docs"));
        assert!(!out.contains("https://example.com/doc"));
    }

    #[test]
    fn clean_text_drops_scripts_and_styles() {
        let html = r#"<html><head><style>body{color:red}</style></head>
            <body><script>var tracking = 1;</script><p>Readable paragraph text.</p></body></html>"#;
        let out = HtmlCleaner::new().extract_clean_text(html).unwrap();
        assert!(out.contains("Readable paragraph text."));
        assert!(!out.contains("tracking"));
        assert!(!out.contains("color:red"));
    }

    #[test]
    fn clean_text_is_none_for_script_only_pages() {
        let html = "<html><body><script>render()</script></body></html>";
        assert!(HtmlCleaner::new().extract_clean_text(html).is_none());
        assert!(HtmlCleaner::new().extract_clean_text("").is_none());
    }

    #[test]
    fn main_block_wins_over_link_soup() {
        let nav: String = (0..40)
            .map(|i| format!("<li><a href=\"https://example.com/{i}\">Link {i}</a></li>"))
            .collect();
        let article = "Dense explanatory prose about the subject matter. ".repeat(20);
        let html = format!(
            "<html><body><ul class=\"menu\">{nav}</ul><article><p>{article}</p></article>\
             <footer class=\"footer\">Privacy Terms Cookie</footer></body></html>"
        );
        let out = HtmlCleaner::new().extract_clean_text(&html).unwrap();
        assert!(out.starts_with("Dense explanatory prose"));
        assert!(!out.contains("Link 3"));
    }

    #[test]
    fn normalize_text_keeps_paragraph_breaks() {
        assert_eq!(
            normalize_text("  a   b \n\n\n  c\n d  "),
            "a b\n\nc\nd"
        );
    }

    #[test]
    fn title_fallback_scans_raw_markup() {
        assert_eq!(
            extract_title_fallback("<html><head><TITLE lang=\"en\">  Fish &amp; Chips </TITLE>"),
            Some("Fish & Chips".to_string())
        );
        assert_eq!(
            extract_title_fallback("<title>unterminated"),
            Some("unterminated".to_string())
        );
        assert_eq!(extract_title_fallback("<title></title>"), None);
        assert_eq!(extract_title_fallback("<p>no title</p>"), None);
        assert_eq!(extract_title_fallback(""), None);
    }

    #[test]
    fn metadata_prefers_title_then_og_title() {
        let html = r#"<html lang="en"><head>
            <meta property="og:title" content="OG Title">
            <meta name="description" content="A description">
            <meta property="og:site_name" content="Example">
            </head><body></body></html>"#;
        let m = HtmlCleaner::new().extract_metadata(html).unwrap();
        assert_eq!(m.title.as_deref(), Some("OG Title"));
        assert_eq!(m.description.as_deref(), Some("A description"));
        assert_eq!(m.site_name.as_deref(), Some("Example"));
        assert_eq!(m.language.as_deref(), Some("en"));

        let with_title = r#"<html><head><title>Real</title><meta property="og:title" content="OG"></head></html>"#;
        let m = HtmlCleaner::new().extract_metadata(with_title).unwrap();
        assert_eq!(m.title.as_deref(), Some("Real"));
    }

    #[test]
    fn metadata_is_none_when_markup_has_none() {
        assert!(HtmlCleaner::new()
            .extract_metadata("<html><body><p>x</p></body></html>")
            .is_none());
    }
}
