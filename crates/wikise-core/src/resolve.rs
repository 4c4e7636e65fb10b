//! Edition fallback and disambiguation logic.
//!
//! A lookup walks the editions named by [`EditionPreference::plan`] in order. Each step
//! produces an [`Outcome`]; the first `Accepted` or `Disambiguated` outcome ends the walk,
//! and the last edition in the plan is terminal (its failures are reported, not skipped).
//!
//! Content Source failures never escape as `Err`: they become [`ResultSection`]s.
//! Only bad caller input (`Error::InvalidArgument`) is returned as an error.

use crate::{
    ContentSource, Edition, EditionPreference, Error, Page, Result, ResultSection, ToolName,
    ToolRequest,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Simple-edition pages at or below this many characters count as stubs.
pub const DEFAULT_MIN_SIMPLE_CHARS: usize = 500;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 20;
pub const MAX_DISAMBIGUATION_OPTIONS: usize = 10;

const SIMPLE_UNAVAILABLE_NOTE: &str = "**Note:** Simple English version not available";

/// Which payload a title lookup renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Summary,
    Content,
    /// Summary and content together.
    Page,
}

impl LookupKind {
    /// `page` substitutes the closest title unless told otherwise; the narrower tools do not.
    pub fn default_auto_suggest(self) -> bool {
        self == Self::Page
    }

    fn noun(self) -> &'static str {
        match self {
            Self::Summary => "Summary",
            Self::Content => "Content",
            Self::Page => "Page",
        }
    }

    fn payload(self, page: &Page) -> Vec<ResultSection> {
        let summary = || ResultSection::new("Page Summary", page.summary.clone());
        let content = || ResultSection::new("Page Content", page.content.clone());
        match self {
            Self::Summary => vec![summary()],
            Self::Content => vec![content()],
            Self::Page => vec![summary(), content()],
        }
    }
}

/// Result of trying one edition.
#[derive(Debug)]
enum Outcome {
    Accepted { page: Page, substituted: bool },
    Stub { len: usize },
    NotFound,
    Disambiguated(Vec<String>),
    TransportError(Error),
}

/// Clamp a requested result count into `1..=MAX_SEARCH_LIMIT`.
pub fn clamp_limit(limit: Option<i64>) -> usize {
    let n = limit.unwrap_or(DEFAULT_SEARCH_LIMIT as i64);
    n.clamp(1, MAX_SEARCH_LIMIT as i64) as usize
}

fn require_non_empty<'a>(name: &str, v: &'a str) -> Result<&'a str> {
    let v = v.trim();
    if v.is_empty() {
        return Err(Error::InvalidArgument(format!("{name} must be non-empty")));
    }
    Ok(v)
}

fn bullets<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(|t| format!("- {t}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone)]
pub struct Resolver {
    source: Arc<dyn ContentSource>,
    preference: EditionPreference,
    min_simple_chars: usize,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("source", &self.source.name())
            .field("preference", &self.preference)
            .field("min_simple_chars", &self.min_simple_chars)
            .finish()
    }
}

impl Resolver {
    pub fn new(source: Arc<dyn ContentSource>, preference: EditionPreference) -> Self {
        Self {
            source,
            preference,
            min_simple_chars: DEFAULT_MIN_SIMPLE_CHARS,
        }
    }

    pub fn with_min_simple_chars(mut self, n: usize) -> Self {
        self.min_simple_chars = n;
        self
    }

    pub fn preference(&self) -> EditionPreference {
        self.preference
    }

    pub fn min_simple_chars(&self) -> usize {
        self.min_simple_chars
    }

    /// Entry point for a named tool with loosely-typed arguments.
    pub async fn call(
        &self,
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Vec<ResultSection>> {
        let req = ToolRequest::parse(name, arguments)?;
        self.dispatch(&req).await
    }

    pub async fn dispatch(&self, req: &ToolRequest) -> Result<Vec<ResultSection>> {
        let kind = match req.tool {
            ToolName::Search => {
                let query = req.str_arg("query")?.unwrap_or_default();
                return self.search(query, req.int_arg("limit")?).await;
            }
            ToolName::Summary => LookupKind::Summary,
            ToolName::Content => LookupKind::Content,
            ToolName::Page => LookupKind::Page,
        };
        let title = req.str_arg("title")?.unwrap_or_default();
        let auto_suggest = req
            .bool_arg("auto_suggest")?
            .unwrap_or(kind.default_auto_suggest());
        self.lookup(kind, title, auto_suggest).await
    }

    pub async fn search(&self, query: &str, limit: Option<i64>) -> Result<Vec<ResultSection>> {
        let query = require_non_empty("query", query)?;
        let limit = clamp_limit(limit);

        let mut simple_tried = false;
        for &edition in self.preference.plan() {
            match self.source.search(edition, query, limit).await {
                Ok(titles) if !titles.is_empty() => {
                    let mut meta = format!(
                        "**Wikipedia Version:** {}\n**Query:** {query}\n**Results Count:** {}\n**Language Code:** {}",
                        edition.label(),
                        titles.len(),
                        edition.code(),
                    );
                    if simple_tried {
                        meta.push_str("\n**Note:** Simple English results not available");
                    }
                    return Ok(vec![
                        ResultSection::new("Search Metadata", meta),
                        ResultSection::new("Search Results", bullets(&titles)),
                    ]);
                }
                Ok(_) => debug!(edition = edition.code(), query, "search returned no titles"),
                Err(e) => {
                    error!(edition = edition.code(), query, error = %e, "search failed");
                    return Ok(vec![ResultSection::new(
                        "Search Error",
                        format!(
                            "**Wikipedia Version:** {}\n**Query:** {query}\n**Language Code:** {}\n**Error:** {e}",
                            edition.label(),
                            edition.code(),
                        ),
                    )]);
                }
            }
            simple_tried |= edition == Edition::Simple;
        }

        Ok(vec![ResultSection::new(
            "Search Metadata",
            format!(
                "**Wikipedia Version:** None (not found)\n**Query:** {query}\n**Results Count:** 0\n**Language Code:** N/A\n**Error:** No results found in {}",
                self.searched_editions(),
            ),
        )])
    }

    pub async fn summary(&self, title: &str, auto_suggest: bool) -> Result<Vec<ResultSection>> {
        self.lookup(LookupKind::Summary, title, auto_suggest).await
    }

    pub async fn content(&self, title: &str, auto_suggest: bool) -> Result<Vec<ResultSection>> {
        self.lookup(LookupKind::Content, title, auto_suggest).await
    }

    pub async fn page(&self, title: &str, auto_suggest: bool) -> Result<Vec<ResultSection>> {
        self.lookup(LookupKind::Page, title, auto_suggest).await
    }

    pub async fn lookup(
        &self,
        kind: LookupKind,
        title: &str,
        auto_suggest: bool,
    ) -> Result<Vec<ResultSection>> {
        let title = require_non_empty("title", title)?;
        let plan = self.preference.plan();

        let mut simple_tried = false;
        for (i, &edition) in plan.iter().enumerate() {
            let terminal = i + 1 == plan.len();
            match self.attempt(edition, title, auto_suggest).await {
                Outcome::Accepted { page, substituted } => {
                    return Ok(self.page_sections(
                        kind,
                        edition,
                        title,
                        &page,
                        substituted,
                        simple_tried,
                    ));
                }
                Outcome::Disambiguated(options) => {
                    return Ok(disambiguation_sections(edition, title, &options, simple_tried));
                }
                Outcome::Stub { len } => {
                    debug!(
                        edition = edition.code(),
                        title,
                        len,
                        min = self.min_simple_chars,
                        "page too short; falling back"
                    );
                }
                Outcome::NotFound => {
                    debug!(edition = edition.code(), title, "page not found");
                }
                Outcome::TransportError(e) if terminal => {
                    error!(edition = edition.code(), title, error = %e, "page lookup failed");
                    return Ok(vec![ResultSection::new(
                        format!("{} Error", kind.noun()),
                        format!(
                            "**Wikipedia Version:** {}\n**Language Code:** {}\n**Requested Title:** {title}\n**Error:** {e}",
                            edition.label(),
                            edition.code(),
                        ),
                    )]);
                }
                Outcome::TransportError(e) => {
                    warn!(edition = edition.code(), title, error = %e, "lookup failed; falling back");
                }
            }
            simple_tried |= edition == Edition::Simple;
        }

        Ok(vec![ResultSection::new(
            "Page Not Found",
            format!(
                "**Wikipedia Version:** None (not found)\n**Language Code:** N/A\n**Requested Title:** {title}\n**Error:** Page does not exist in {}",
                self.searched_editions(),
            ),
        )])
    }

    /// One edition step: the lookup itself plus at most one auto-suggest retry.
    async fn attempt(&self, edition: Edition, title: &str, auto_suggest: bool) -> Outcome {
        match self.source.get_page(edition, title, auto_suggest).await {
            Ok(page) => self.grade(edition, page, false),
            Err(Error::Disambiguation { options, .. }) => Outcome::Disambiguated(options),
            Err(Error::NotFound(_)) if !auto_suggest => {
                debug!(edition = edition.code(), title, "retrying with auto_suggest");
                match self.source.get_page(edition, title, true).await {
                    Ok(page) => self.grade(edition, page, true),
                    Err(e) => {
                        debug!(edition = edition.code(), title, error = %e, "auto_suggest retry failed");
                        Outcome::NotFound
                    }
                }
            }
            Err(Error::NotFound(_)) => Outcome::NotFound,
            Err(e) => Outcome::TransportError(e),
        }
    }

    fn grade(&self, edition: Edition, page: Page, substituted: bool) -> Outcome {
        // The standard edition is the last resort; only Simple pages are length-checked.
        if edition == Edition::Simple {
            let len = page.content_len();
            if len <= self.min_simple_chars {
                return Outcome::Stub { len };
            }
        }
        Outcome::Accepted { page, substituted }
    }

    fn page_sections(
        &self,
        kind: LookupKind,
        edition: Edition,
        requested: &str,
        page: &Page,
        substituted: bool,
        simple_tried: bool,
    ) -> Vec<ResultSection> {
        let mut meta = format!(
            "**Title:** {}\n**Wikipedia Version:** {}\n**Language Code:** {}\n**URL:** {}\n**Content Length:** {} characters",
            page.title,
            edition.label(),
            edition.code(),
            page.url,
            page.content_len(),
        );
        if substituted {
            meta.push_str(&format!(
                "\n**Auto-suggested:** requested \"{requested}\", resolved to \"{}\"",
                page.title
            ));
        }
        if simple_tried {
            meta.push('\n');
            meta.push_str(SIMPLE_UNAVAILABLE_NOTE);
        }
        let mut out = vec![ResultSection::new(format!("{} Metadata", kind.noun()), meta)];
        out.extend(kind.payload(page));
        out
    }

    fn searched_editions(&self) -> &'static str {
        if self.preference.prefers_simple() {
            "Simple English or English Wikipedia"
        } else {
            "English Wikipedia"
        }
    }
}

fn disambiguation_sections(
    edition: Edition,
    requested: &str,
    options: &[String],
    simple_tried: bool,
) -> Vec<ResultSection> {
    let shown = &options[..options.len().min(MAX_DISAMBIGUATION_OPTIONS)];
    let mut meta = format!(
        "**Wikipedia Version:** {}\n**Language Code:** {}\n**Requested Title:** {requested}\n**Options Count:** {}",
        edition.label(),
        edition.code(),
        shown.len(),
    );
    if simple_tried {
        meta.push('\n');
        meta.push_str(SIMPLE_UNAVAILABLE_NOTE);
    }
    vec![
        ResultSection::new("Disambiguation Metadata", meta),
        ResultSection::new(
            "Disambiguation Options",
            format!("**Did you mean:**\n{}", bullets(shown)),
        ),
    ]
}
