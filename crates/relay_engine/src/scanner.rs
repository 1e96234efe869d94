use std::collections::HashSet;

use relay_core::{
    classify, filename_from_url, Configuration, DownloadCandidate, PageDocument, RoutingJob,
};
use scraper::{ElementRef, Html};
use url::Url;

const DEFAULT_MAX_LINKS: usize = 5_000;

/// Finds downloadable anchors in a rendered page.
///
/// Every call re-walks the document it is given; nothing is cached between
/// scans.
pub struct PageScanner {
    max_links: usize,
}

impl PageScanner {
    pub fn new() -> Self {
        Self::with_max_links(DEFAULT_MAX_LINKS)
    }

    pub fn with_max_links(max_links: usize) -> Self {
        Self { max_links }
    }

    /// Jobs for every anchor whose resolved URL the classifier accepts, in
    /// document order and without duplicates.
    pub fn scan(&self, page: &PageDocument, config: &Configuration) -> Vec<RoutingJob> {
        let document = Html::parse_document(&page.html);
        let base = Url::parse(&page.url).ok();
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();

        for element in elements(&document) {
            if jobs.len() >= self.max_links {
                break;
            }
            if !element.value().name().eq_ignore_ascii_case("a") {
                continue;
            }
            let Some(url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_url(href, base.as_ref()))
            else {
                continue;
            };
            if url.scheme() == "mailto" || !seen.insert(url.to_string()) {
                continue;
            }
            let candidate = DownloadCandidate::from_link(url.as_str(), Some(&page.url));
            if classify(&candidate, config).is_accept() {
                jobs.push(candidate.to_job());
            }
        }

        jobs
    }
}

impl Default for PageScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// A download action attached to one playable media element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaControl {
    source_url: String,
    referrer: String,
}

impl MediaControl {
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Consumes the control. The classifier is deliberately not consulted:
    /// the user asked for this element.
    pub fn activate(self) -> RoutingJob {
        let filename = filename_from_url(&self.source_url);
        RoutingJob::new(self.source_url, Some(filename), Some(self.referrer))
    }
}

/// Tracks which media elements already carry a control, so repeated
/// refreshes after content changes only surface new ones.
#[derive(Debug, Default)]
pub struct MediaAugmenter {
    offered: HashSet<String>,
}

impl MediaAugmenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(&mut self, page: &PageDocument) -> Vec<MediaControl> {
        let document = Html::parse_document(&page.html);
        let base = Url::parse(&page.url).ok();
        let mut controls = Vec::new();

        for element in elements(&document) {
            let Some(src) = media_source(element) else {
                continue;
            };
            let Some(url) = resolve_url(src, base.as_ref()) else {
                continue;
            };
            if self.offered.insert(url.to_string()) {
                controls.push(MediaControl {
                    source_url: url.into(),
                    referrer: page.url.clone(),
                });
            }
        }

        controls
    }

    /// Forgets everything, as when the page navigates.
    pub fn clear(&mut self) {
        self.offered.clear();
    }
}

fn elements(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document.root_element().descendants().filter_map(ElementRef::wrap)
}

fn is_media(name: &str) -> bool {
    name.eq_ignore_ascii_case("video") || name.eq_ignore_ascii_case("audio")
}

fn media_source(element: ElementRef<'_>) -> Option<&str> {
    let name = element.value().name();
    if is_media(name) {
        return element.value().attr("src");
    }
    if name.eq_ignore_ascii_case("source") {
        let parent = element.parent().and_then(ElementRef::wrap)?;
        if is_media(parent.value().name()) {
            return element.value().attr("src");
        }
    }
    None
}

fn resolve_url(reference: &str, base: Option<&Url>) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("javascript:") {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url);
    }
    base.and_then(|base| base.join(trimmed).ok())
}
