//! Typed link extraction from HTML bodies.
//!
//! Given a body and its base URL, yields a deduplicated set of absolute
//! URLs in document order, each tagged with a [`LinkType`]. Category
//! toggles decide which links survive; malformed URLs are dropped and
//! counted as warnings.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::app::url::{canonicalize, has_resource_extension, is_external};
use crate::config::LinkToggles;
use crate::error_handling::{ProcessingStats, WarningType};

/// Category of a discovered hyperlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkType {
    /// `<a href>`, `<link href>`, `<area href>`
    StaticHtml,
    /// onclick handlers, data-url/data-href attributes, inline script URLs
    DynamicJs,
    /// images, scripts, stylesheets, media sources
    Resource,
    /// registrable host differs from the seed's
    External,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::StaticHtml => "static_html",
            LinkType::DynamicJs => "dynamic_js",
            LinkType::Resource => "resource",
            LinkType::External => "external",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "dynamic_js" => LinkType::DynamicJs,
            "resource" => LinkType::Resource,
            "external" => LinkType::External,
            _ => LinkType::StaticHtml,
        }
    }
}

/// One extracted link: canonical absolute URL plus its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub url: String,
    pub link_type: LinkType,
}

static ANY_ELEMENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("*").expect("valid selector"));

/// Conservative match for URL-shaped substrings inside script text and
/// event handlers.
static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s'"<>\\)]+"#).expect("valid regex"));

/// Link extractor bound to one run's seed, so external classification is
/// consistent across pages.
pub struct LinkExtractor {
    seed: Url,
}

impl LinkExtractor {
    pub fn new(seed: Url) -> Self {
        LinkExtractor { seed }
    }

    /// Extracts links from `body`, resolving relative URLs against
    /// `base_url`.
    ///
    /// Candidates are gathered in a single pass over the DOM, so emission
    /// order is document order across all categories; within one element,
    /// the tag-sourced URL comes before handler and data-attribute URLs.
    /// Duplicates collapse onto the first occurrence by canonical URL.
    pub fn extract(
        &self,
        body: &str,
        base_url: &Url,
        toggles: &LinkToggles,
        stats: &ProcessingStats,
    ) -> Vec<ExtractedLink> {
        let document = Html::parse_document(body);
        let mut links: Vec<ExtractedLink> = Vec::new();
        let mut seen = HashSet::new();

        let mut push = |url: Url, source_type: LinkType, links: &mut Vec<ExtractedLink>| {
            let link_type = if is_external(&url, &self.seed) {
                LinkType::External
            } else {
                source_type
            };
            let keep = match link_type {
                LinkType::StaticHtml => toggles.static_html,
                LinkType::DynamicJs => toggles.dynamic_js,
                LinkType::Resource => toggles.resource,
                LinkType::External => toggles.external,
            };
            if !keep {
                return;
            }
            let canonical = url.to_string();
            if seen.insert(canonical.clone()) {
                links.push(ExtractedLink {
                    url: canonical,
                    link_type,
                });
            }
        };

        for element in document.select(&ANY_ELEMENT) {
            let el = element.value();

            match el.name() {
                // Static anchors. URLs ending in resource extensions are
                // not pages.
                "a" | "area" => {
                    if let Some(href) = el.attr("href") {
                        if let Some(url) = resolve(href, Some(base_url), stats) {
                            if !has_resource_extension(&url) {
                                push(url, LinkType::StaticHtml, &mut links);
                            }
                        }
                    }
                }
                // Stylesheet <link> elements belong to the resource
                // category; other <link> elements are static.
                "link" => {
                    let stylesheet = el
                        .attr("rel")
                        .is_some_and(|rel| rel.eq_ignore_ascii_case("stylesheet"));
                    if let Some(href) = el.attr("href") {
                        if let Some(url) = resolve(href, Some(base_url), stats) {
                            if stylesheet {
                                if has_resource_extension(&url) {
                                    push(url, LinkType::Resource, &mut links);
                                }
                            } else if !has_resource_extension(&url) {
                                push(url, LinkType::StaticHtml, &mut links);
                            }
                        }
                    }
                }
                // External scripts are resources; inline script text is
                // scanned for URL-shaped substrings.
                "script" => {
                    if let Some(src) = el.attr("src") {
                        if let Some(url) = resolve(src, Some(base_url), stats) {
                            if has_resource_extension(&url) {
                                push(url, LinkType::Resource, &mut links);
                            }
                        }
                    } else {
                        let text: String = element.text().collect();
                        for m in URL_PATTERN.find_iter(&text) {
                            if let Some(url) = resolve(m.as_str(), None, stats) {
                                if !has_resource_extension(&url) {
                                    push(url, LinkType::DynamicJs, &mut links);
                                }
                            }
                        }
                    }
                }
                "img" | "source" => {
                    if let Some(src) = el.attr("src") {
                        if let Some(url) = resolve(src, Some(base_url), stats) {
                            if has_resource_extension(&url) {
                                push(url, LinkType::Resource, &mut links);
                            }
                        }
                    }
                }
                _ => {}
            }

            // onclick handler contents, on any element.
            if let Some(onclick) = el.attr("onclick") {
                for m in URL_PATTERN.find_iter(onclick) {
                    if let Some(url) = resolve(m.as_str(), None, stats) {
                        if !has_resource_extension(&url) {
                            push(url, LinkType::DynamicJs, &mut links);
                        }
                    }
                }
            }

            // data-url / data-href attributes, resolved against the base.
            if let Some(value) = el.attr("data-url").or_else(|| el.attr("data-href")) {
                if let Some(url) = resolve(value, Some(base_url), stats) {
                    if !has_resource_extension(&url) {
                        push(url, LinkType::DynamicJs, &mut links);
                    }
                }
            }
        }

        links
    }
}

/// Canonicalizes one candidate, counting drops of malformed or
/// unsupported URLs.
fn resolve(raw: &str, base: Option<&Url>, stats: &ProcessingStats) -> Option<Url> {
    match canonicalize(raw, base) {
        Some(url) => Some(url),
        None => {
            stats.increment_warning(WarningType::MalformedLink);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> LinkExtractor {
        LinkExtractor::new(Url::parse("https://example.com/").unwrap())
    }

    fn all_toggles() -> LinkToggles {
        LinkToggles {
            static_html: true,
            dynamic_js: true,
            resource: true,
            external: true,
        }
    }

    fn extract(html: &str, base: &Url, toggles: &LinkToggles) -> Vec<ExtractedLink> {
        extractor().extract(html, base, toggles, &ProcessingStats::new())
    }

    #[test]
    fn test_extract_static_anchors_in_document_order() {
        let html = r#"<html><body>
            <a href="/first">First</a>
            <area href="/second">
            <a href="/third">Third</a>
        </body></html>"#;
        let base = Url::parse("https://example.com/").unwrap();
        let links = extract(html, &base, &LinkToggles::default());

        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/first",
                "https://example.com/second",
                "https://example.com/third"
            ]
        );
        assert!(links.iter().all(|l| l.link_type == LinkType::StaticHtml));
    }

    #[test]
    fn test_mixed_categories_emitted_in_document_order() {
        let html = r#"<html><body>
            <img src="/one.png">
            <a href="/two">t</a>
            <div data-url="/three">d</div>
            <script>var next = "https://example.com/four";</script>
            <a href="/five">f</a>
        </body></html>"#;
        let base = Url::parse("https://example.com/").unwrap();
        let links = extract(html, &base, &all_toggles());

        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/one.png",
                "https://example.com/two",
                "https://example.com/three",
                "https://example.com/four",
                "https://example.com/five"
            ]
        );
    }

    #[test]
    fn test_extract_deduplicates_by_canonical_url() {
        let html = r##"<html><body>
            <a href="/page">One</a>
            <a href="/page#section">Same page, fragment</a>
            <a href="https://EXAMPLE.com/page">Same page, odd case</a>
        </body></html>"##;
        let base = Url::parse("https://example.com/").unwrap();
        let links = extract(html, &base, &LinkToggles::default());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com/page");
    }

    #[test]
    fn test_extract_dynamic_links() {
        let html = r#"<html><body>
            <button onclick="window.open('https://example.com/popup')">Open</button>
            <div data-url="/dynamic">d</div>
            <span data-href="/other">o</span>
            <script>var next = "https://example.com/from-script";</script>
        </body></html>"#;
        let base = Url::parse("https://example.com/").unwrap();
        let toggles = LinkToggles {
            static_html: false,
            dynamic_js: true,
            resource: false,
            external: false,
        };
        let links = extract(html, &base, &toggles);

        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/popup",
                "https://example.com/dynamic",
                "https://example.com/other",
                "https://example.com/from-script"
            ]
        );
        assert!(links.iter().all(|l| l.link_type == LinkType::DynamicJs));
    }

    #[test]
    fn test_extract_resource_links_by_extension() {
        let html = r#"<html><head>
            <link rel="stylesheet" href="/main.css">
        </head><body>
            <img src="/logo.png">
            <script src="/app.js"></script>
            <img src="/no-extension-image">
        </body></html>"#;
        let base = Url::parse("https://example.com/").unwrap();
        let toggles = LinkToggles {
            static_html: false,
            dynamic_js: false,
            resource: true,
            external: false,
        };
        let links = extract(html, &base, &toggles);

        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/main.css",
                "https://example.com/logo.png",
                "https://example.com/app.js"
            ]
        );
        assert!(links.iter().all(|l| l.link_type == LinkType::Resource));
    }

    #[test]
    fn test_external_links_reclassified_and_gated() {
        let html = r#"<a href="https://other.org/page">Elsewhere</a>
                      <a href="/local">Local</a>"#;
        let base = Url::parse("https://example.com/").unwrap();

        // External toggle off: external link dropped even though it came
        // from a static anchor.
        let links = extract(html, &base, &LinkToggles::default());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com/local");

        // External toggle on: survives with the External type.
        let links = extract(html, &base, &all_toggles());
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].link_type, LinkType::External);
        assert_eq!(links[0].url, "https://other.org/page");
    }

    #[test]
    fn test_subdomains_are_not_external() {
        let html = r#"<a href="https://blog.example.com/post">Blog</a>"#;
        let base = Url::parse("https://www.example.com/").unwrap();
        let ex = LinkExtractor::new(Url::parse("https://www.example.com/").unwrap());
        let links = ex.extract(html, &base, &LinkToggles::default(), &ProcessingStats::new());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link_type, LinkType::StaticHtml);
    }

    #[test]
    fn test_malformed_urls_dropped_and_counted() {
        let html = r#"<a href="http://exa mple.com/page">x</a>
                      <a href="javascript:void(0)">y</a>
                      <a href="mailto:a@b.c">z</a>"#;
        let base = Url::parse("https://example.com/").unwrap();
        let stats = ProcessingStats::new();
        let links = extractor().extract(html, &base, &all_toggles(), &stats);
        assert!(links.is_empty());
        assert_eq!(stats.warning_count(WarningType::MalformedLink), 3);
    }

    #[test]
    fn test_static_skips_resource_extension_targets() {
        let html = r#"<a href="/report.pdf">Report</a><a href="/page">Page</a>"#;
        let base = Url::parse("https://example.com/").unwrap();
        let links = extract(html, &base, &LinkToggles::default());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com/page");
    }

    #[test]
    fn test_extract_is_fixpoint_under_reextraction() {
        // Canonicalized output re-fed as hrefs canonicalizes to itself.
        let html = r#"<a href="/a/../b?q=1#frag">x</a>"#;
        let base = Url::parse("https://example.com/").unwrap();
        let first = extract(html, &base, &LinkToggles::default());
        assert_eq!(first.len(), 1);

        let rebuilt = format!(r#"<a href="{}">x</a>"#, first[0].url);
        let second = extract(&rebuilt, &base, &LinkToggles::default());
        assert_eq!(first, second);
    }
}
