//! Structural content classification of fetched pages.
//!
//! From an HTML body (and the HTTP status that produced it) computes the
//! page title, word count, presence of header/footer/navigation regions, a
//! page-type label, and a stable fingerprint of the tag skeleton used
//! upstream for change detection.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};

/// Page-type label derived from the body and fetch status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    Content,
    Blank,
    Error,
    Redirect,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Content => "content",
            PageType::Blank => "blank",
            PageType::Error => "error",
            PageType::Redirect => "redirect",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "blank" => PageType::Blank,
            "error" => PageType::Error,
            "redirect" => PageType::Redirect,
            _ => PageType::Content,
        }
    }
}

/// Classification result for one page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageClassification {
    pub title: Option<String>,
    pub word_count: usize,
    pub has_header: bool,
    pub has_footer: bool,
    pub has_navigation: bool,
    pub page_type: PageType,
    pub structure_digest: String,
}

impl PageClassification {
    /// Classification for a URL that produced no parseable body.
    pub fn failed() -> Self {
        PageClassification {
            title: None,
            word_count: 0,
            has_header: false,
            has_footer: false,
            has_navigation: false,
            page_type: PageType::Error,
            structure_digest: String::new(),
        }
    }
}

/// Pages with fewer words than this, and at least one structural region,
/// are chrome-only and labeled blank.
const BLANK_WORD_THRESHOLD: usize = 50;

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));

static HEADER_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("header, [role='banner']").expect("valid selector"));

static FOOTER_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("footer, [role='contentinfo']").expect("valid selector"));

static NAV_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("nav, [role='navigation']").expect("valid selector"));

static ALL_ELEMENTS_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("*").expect("valid selector"));

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script>").expect("valid regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style>").expect("valid regex"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

/// Classifies a page body fetched with the given HTTP status.
///
/// `status` is `None` when the fetch failed without a response; such pages
/// are labeled `error` with zeroed structural flags.
pub fn classify(body: &str, status: Option<u16>) -> PageClassification {
    let Some(status) = status else {
        return PageClassification::failed();
    };

    let document = Html::parse_document(body);

    let title = extract_title(&document);
    let word_count = count_words(body);
    let has_header = document.select(&HEADER_SELECTOR).next().is_some();
    let has_footer = document.select(&FOOTER_SELECTOR).next().is_some();
    let has_navigation = document.select(&NAV_SELECTOR).next().is_some();

    let page_type = if status >= 400 {
        PageType::Error
    } else if (300..400).contains(&status) && body.trim().is_empty() {
        PageType::Redirect
    } else if word_count < BLANK_WORD_THRESHOLD && (has_header || has_footer || has_navigation) {
        PageType::Blank
    } else {
        PageType::Content
    };

    PageClassification {
        title,
        word_count,
        has_header,
        has_footer,
        has_navigation,
        page_type,
        structure_digest: structure_digest(&document),
    }
}

/// First `<title>` text, trimmed; `None` when missing or empty.
pub fn extract_title(document: &Html) -> Option<String> {
    let element = document.select(&TITLE_SELECTOR).next()?;
    let title: String = element.text().collect::<String>().trim().to_string();
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Convenience wrapper for callers holding a raw body.
pub fn title_of(body: &str) -> Option<String> {
    extract_title(&Html::parse_document(body))
}

/// Whitespace-separated token count of the text content, with `<script>`,
/// `<style>`, and HTML comments stripped first.
fn count_words(body: &str) -> usize {
    let without_scripts = SCRIPT_RE.replace_all(body, " ");
    let without_styles = STYLE_RE.replace_all(&without_scripts, " ");
    let cleaned = COMMENT_RE.replace_all(&without_styles, " ");

    let document = Html::parse_document(&cleaned);
    let text: String = document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    text.split_whitespace().count()
}

/// SHA-256 over the element-name skeleton in document order. Text and
/// attributes are excluded, so equivalent structures hash identically.
fn structure_digest(document: &Html) -> String {
    let mut hasher = Sha256::new();
    for element in document.select(&ALL_ELEMENTS_SELECTOR) {
        hasher.update(b"<");
        hasher.update(element.value().name().as_bytes());
        hasher.update(b">");
    }
    format!("{:x}", hasher.finalize())
}
