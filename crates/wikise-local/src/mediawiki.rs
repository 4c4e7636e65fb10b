//! MediaWiki action API client (`/w/api.php`, `formatversion=2`).
//!
//! Notes:
//! - One endpoint per edition; nothing edition-specific is stored between calls.
//! - Auto-suggest resolves the title through search first (spelling suggestion, else top hit).
//! - Disambiguation pages are detected via `pageprops.disambiguation`; the options are the
//!   first link of each list item in the rendered page, in page order.

use crate::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use wikise_core::{ContentSource, Edition, Page};

pub const SIMPLE_ENDPOINT: &str = "https://simple.wikipedia.org/w/api.php";
pub const STANDARD_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;

fn parse_endpoint(s: &str) -> Result<reqwest::Url> {
    reqwest::Url::parse(s.trim())
        .map_err(|e| Error::NotConfigured(format!("invalid endpoint {s:?}: {e}")))
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<ApiQuery>,
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default)]
    parse: Option<ApiParse>,
}

#[derive(Debug, Deserialize)]
struct ApiParse {
    // Rendered HTML (a plain string under formatversion 2).
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiQuery {
    #[serde(default)]
    search: Vec<TitleRef>,
    #[serde(default)]
    searchinfo: Option<SearchInfo>,
    #[serde(default)]
    pages: Vec<ApiPage>,
}

#[derive(Debug, Deserialize)]
struct TitleRef {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SearchInfo {
    #[serde(default)]
    suggestion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    fullurl: Option<String>,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    pageprops: Option<PageProps>,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    // Present (as an empty string) only on disambiguation pages.
    #[serde(default)]
    disambiguation: Option<serde_json::Value>,
}

/// What a page probe found before the summary is fetched.
#[derive(Debug, PartialEq, Eq)]
enum Probe {
    Missing,
    Disambiguation { title: String },
    Article { title: String, url: String, content: String },
}

fn decode_response(body: &str) -> Result<ApiResponse> {
    let resp: ApiResponse =
        serde_json::from_str(body).map_err(|e| Error::Transport(format!("bad api json: {e}")))?;
    if let Some(e) = resp.error {
        return Err(Error::Transport(format!("api error {}: {}", e.code, e.info)));
    }
    Ok(resp)
}

fn decode(body: &str) -> Result<ApiQuery> {
    Ok(decode_response(body)?.query.unwrap_or_default())
}

fn parse_search(body: &str) -> Result<(Vec<String>, Option<String>)> {
    let q = decode(body)?;
    let titles = q.search.into_iter().map(|t| t.title).collect();
    let suggestion = q
        .searchinfo
        .and_then(|s| s.suggestion)
        .filter(|s| !s.trim().is_empty());
    Ok((titles, suggestion))
}

fn parse_probe(body: &str) -> Result<Probe> {
    let q = decode(body)?;
    let Some(p) = q.pages.into_iter().next() else {
        return Ok(Probe::Missing);
    };
    if p.missing || p.invalid {
        return Ok(Probe::Missing);
    }
    if p.pageprops.is_some_and(|pp| pp.disambiguation.is_some()) {
        return Ok(Probe::Disambiguation { title: p.title });
    }
    Ok(Probe::Article {
        url: p.fullurl.unwrap_or_default(),
        content: p.extract.unwrap_or_default(),
        title: p.title,
    })
}

fn parse_options(body: &str) -> Result<Vec<String>> {
    let html = decode_response(body)?
        .parse
        .map(|p| p.text)
        .unwrap_or_default();
    Ok(list_item_links(&html))
}

/// Text of the first link in each `<li>`, in document order. Table-of-contents entries are
/// skipped, as are items without a link.
fn list_item_links(html: &str) -> Vec<String> {
    let doc = html_scraper::Html::parse_fragment(html);
    let (Ok(li), Ok(a)) = (
        html_scraper::Selector::parse("li"),
        html_scraper::Selector::parse("a"),
    ) else {
        return Vec::new();
    };
    doc.select(&li)
        .filter(|el| !el.value().classes().any(|c| c.contains("tocsection")))
        .filter_map(|el| el.select(&a).next())
        .map(|link| link.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_extract(body: &str) -> Result<String> {
    let q = decode(body)?;
    Ok(q.pages
        .into_iter()
        .next()
        .and_then(|p| p.extract)
        .unwrap_or_default())
}

#[derive(Debug, Clone)]
pub struct MediaWikiSource {
    client: reqwest::Client,
    simple_endpoint: reqwest::Url,
    standard_endpoint: reqwest::Url,
    timeout_ms: u64,
}

impl MediaWikiSource {
    pub fn new(client: reqwest::Client) -> Result<Self> {
        Self::with_endpoints(client, SIMPLE_ENDPOINT, STANDARD_ENDPOINT)
    }

    pub fn with_endpoints(client: reqwest::Client, simple: &str, standard: &str) -> Result<Self> {
        Ok(Self {
            client,
            simple_endpoint: parse_endpoint(simple)?,
            standard_endpoint: parse_endpoint(standard)?,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        })
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        // Requests can hang indefinitely without a bound.
        self.timeout_ms = ms.clamp(1_000, 60_000);
        self
    }

    pub fn endpoint(&self, edition: Edition) -> &reqwest::Url {
        match edition {
            Edition::Simple => &self.simple_endpoint,
            Edition::Standard => &self.standard_endpoint,
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    async fn get(&self, edition: Edition, params: &[(&str, &str)]) -> Result<String> {
        let resp = self
            .client
            .get(self.endpoint(edition).clone())
            .query(&[("format", "json"), ("formatversion", "2")])
            .query(params)
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "{} api request failed: HTTP {}",
                edition.code(),
                status.as_u16()
            )));
        }
        resp.text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }

    async fn search_raw(
        &self,
        edition: Edition,
        query: &str,
        limit: usize,
        suggestion: bool,
    ) -> Result<(Vec<String>, Option<String>)> {
        let limit = limit.to_string();
        let mut params = vec![
            ("action", "query"),
            ("list", "search"),
            ("srsearch", query),
            ("srlimit", limit.as_str()),
            ("srprop", ""),
        ];
        if suggestion {
            params.push(("srinfo", "suggestion"));
        }
        let body = self.get(edition, &params).await?;
        parse_search(&body)
    }

    /// The title auto-suggest would substitute for `title`.
    async fn suggest(&self, edition: Edition, title: &str) -> Result<String> {
        let (hits, suggestion) = self.search_raw(edition, title, 1, true).await?;
        let picked = suggestion
            .or_else(|| hits.into_iter().next())
            .ok_or_else(|| Error::NotFound(title.to_string()))?;
        debug!(edition = edition.code(), title, picked = %picked, "auto_suggest resolved title");
        Ok(picked)
    }

    async fn disambiguation_options(&self, edition: Edition, title: &str) -> Result<Vec<String>> {
        let body = self
            .get(
                edition,
                &[
                    ("action", "parse"),
                    ("prop", "text"),
                    ("disableeditsection", "1"),
                    ("redirects", "1"),
                    ("page", title),
                ],
            )
            .await?;
        parse_options(&body)
    }

    async fn intro(&self, edition: Edition, title: &str) -> Result<String> {
        let body = self
            .get(
                edition,
                &[
                    ("action", "query"),
                    ("prop", "extracts"),
                    ("exintro", "1"),
                    ("explaintext", "1"),
                    ("redirects", "1"),
                    ("titles", title),
                ],
            )
            .await?;
        parse_extract(&body)
    }
}

#[async_trait::async_trait]
impl ContentSource for MediaWikiSource {
    fn name(&self) -> &'static str {
        "mediawiki"
    }

    async fn search(&self, edition: Edition, query: &str, limit: usize) -> Result<Vec<String>> {
        let (titles, _) = self.search_raw(edition, query, limit, false).await?;
        Ok(titles)
    }

    async fn get_page(&self, edition: Edition, title: &str, auto_suggest: bool) -> Result<Page> {
        let resolved = if auto_suggest {
            self.suggest(edition, title).await?
        } else {
            title.to_string()
        };
        let body = self
            .get(
                edition,
                &[
                    ("action", "query"),
                    ("prop", "info|pageprops|extracts"),
                    ("inprop", "url"),
                    ("ppprop", "disambiguation"),
                    ("explaintext", "1"),
                    ("redirects", "1"),
                    ("titles", resolved.as_str()),
                ],
            )
            .await?;
        match parse_probe(&body)? {
            Probe::Missing => Err(Error::NotFound(resolved)),
            Probe::Disambiguation { title } => {
                let options = self.disambiguation_options(edition, &title).await?;
                Err(Error::Disambiguation { title, options })
            }
            Probe::Article {
                title,
                url,
                content,
            } => {
                let summary = self.intro(edition, &title).await?;
                Ok(Page {
                    title,
                    url,
                    summary,
                    content,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_with_suggestion() {
        let js = r#"
        {
          "batchcomplete": true,
          "query": {
            "searchinfo": { "totalhits": 2, "suggestion": "moon" },
            "search": [
              { "ns": 0, "title": "Moon" },
              { "ns": 0, "title": "Moon landing" }
            ]
          }
        }
        "#;
        let (titles, suggestion) = parse_search(js).unwrap();
        assert_eq!(titles, vec!["Moon", "Moon landing"]);
        assert_eq!(suggestion.as_deref(), Some("moon"));
    }

    #[test]
    fn empty_search_has_no_titles() {
        let js = r#"{"batchcomplete":true,"query":{"searchinfo":{"totalhits":0},"search":[]}}"#;
        let (titles, suggestion) = parse_search(js).unwrap();
        assert!(titles.is_empty());
        assert!(suggestion.is_none());
    }

    #[test]
    fn parses_article_probe() {
        let js = r#"
        {
          "query": {
            "pages": [{
              "pageid": 1, "ns": 0, "title": "Moon",
              "fullurl": "https://simple.wikipedia.org/wiki/Moon",
              "extract": "The Moon is Earth's only natural satellite."
            }]
          }
        }
        "#;
        assert_eq!(
            parse_probe(js).unwrap(),
            Probe::Article {
                title: "Moon".to_string(),
                url: "https://simple.wikipedia.org/wiki/Moon".to_string(),
                content: "The Moon is Earth's only natural satellite.".to_string(),
            }
        );
    }

    #[test]
    fn missing_and_invalid_pages_probe_as_missing() {
        let missing = r#"{"query":{"pages":[{"ns":0,"title":"Zzznonexistent","missing":true}]}}"#;
        let invalid = r#"{"query":{"pages":[{"title":"<>","invalid":true,"invalidreason":"bad"}]}}"#;
        assert_eq!(parse_probe(missing).unwrap(), Probe::Missing);
        assert_eq!(parse_probe(invalid).unwrap(), Probe::Missing);
        assert_eq!(parse_probe(r#"{"batchcomplete":true}"#).unwrap(), Probe::Missing);
    }

    #[test]
    fn disambiguation_pageprop_is_detected() {
        let js = r#"
        {"query":{"pages":[{"pageid":7,"ns":0,"title":"Mercury",
          "pageprops":{"disambiguation":""},"extract":"Mercury may mean:"}]}}
        "#;
        assert_eq!(
            parse_probe(js).unwrap(),
            Probe::Disambiguation {
                title: "Mercury".to_string()
            }
        );
    }

    #[test]
    fn options_keep_page_order() {
        // Sorted by title, Freddie Mercury would come first.
        let js = serde_json::json!({"parse": {"title": "Mercury", "pageid": 7, "text": MERCURY_HTML}})
            .to_string();
        assert_eq!(
            parse_options(&js).unwrap(),
            vec!["Mercury (planet)", "Mercury (element)", "Mercury (mythology)", "Freddie Mercury"]
        );
    }

    #[test]
    fn options_without_parse_block_are_empty() {
        assert!(parse_options(r#"{"batchcomplete":true}"#).unwrap().is_empty());
        assert!(list_item_links("<p>no list here</p>").is_empty());
    }

    const MERCURY_HTML: &str = r##"<div class="mw-parser-output">
<p><b>Mercury</b> may mean:</p>
<div id="toc"><ul><li class="toclevel-1 tocsection-1"><a href="#Science">Science</a></li></ul></div>
<ul>
<li><a href="/wiki/Mercury_(planet)" title="Mercury (planet)">Mercury (planet)</a>, the planet closest to the Sun</li>
<li><a href="/wiki/Mercury_(element)" title="Mercury (element)">Mercury (element)</a>, a metal</li>
<li>an entry with no link</li>
<li><a href="/wiki/Mercury_(mythology)" title="Mercury (mythology)">Mercury (mythology)</a>, a Roman god, see <a href="/wiki/Hermes">Hermes</a></li>
<li><a href="/wiki/Freddie_Mercury" title="Freddie Mercury">Freddie Mercury</a></li>
</ul>
</div>"##;

    #[test]
    fn api_error_object_is_transport_error() {
        let js = r#"{"error":{"code":"maxlag","info":"Waiting for a database server"}}"#;
        let e = parse_search(js).unwrap_err();
        assert_eq!(
            e,
            Error::Transport("api error maxlag: Waiting for a database server".to_string())
        );
        assert!(matches!(parse_probe("<html>"), Err(Error::Transport(_))));
    }

    #[test]
    fn timeout_is_clamped() {
        let s = MediaWikiSource::new(reqwest::Client::new()).unwrap();
        assert_eq!(s.timeout_ms(), DEFAULT_TIMEOUT_MS);
        assert_eq!(s.clone().with_timeout_ms(1).timeout_ms(), 1_000);
        assert_eq!(s.with_timeout_ms(10_000_000).timeout_ms(), 60_000);
    }

    #[test]
    fn bad_endpoint_is_not_configured() {
        let e = MediaWikiSource::with_endpoints(reqwest::Client::new(), "not a url", STANDARD_ENDPOINT)
            .unwrap_err();
        assert!(matches!(e, Error::NotConfigured(_)));
    }

    mod http {
        use super::*;
        use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
        use std::collections::HashMap;
        use std::net::SocketAddr;

        async fn serve(app: Router) -> SocketAddr {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr: SocketAddr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            addr
        }

        fn article(title: &str, extract: &str) -> serde_json::Value {
            serde_json::json!({"query": {"pages": [{
                "ns": 0,
                "title": title,
                "fullurl": format!("https://simple.example/wiki/{title}"),
                "extract": extract
            }]}})
        }

        // A tiny fake of the simple-edition action API.
        async fn simple_api(Query(q): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
            let get = |k: &str| q.get(k).map(String::as_str).unwrap_or("");
            assert_eq!(get("format"), "json");
            assert_eq!(get("formatversion"), "2");

            if get("list") == "search" {
                let body = match get("srsearch") {
                    "moon" => serde_json::json!({"query": {"search": [
                        {"title": "Moon"}, {"title": "Moon landing"}, {"title": "Half Moon"}
                    ]}}),
                    "Eart" => serde_json::json!({"query": {
                        "searchinfo": {"suggestion": "Earth"},
                        "search": []
                    }}),
                    _ => serde_json::json!({"query": {"search": []}}),
                };
                return Json(body);
            }

            if get("action") == "parse" {
                assert_eq!(get("page"), "Mercury");
                return Json(serde_json::json!({"parse": {
                    "title": "Mercury",
                    "text": MERCURY_HTML
                }}));
            }

            let prop = get("prop");
            let body = match (get("titles"), prop) {
                ("Moon", "extracts") if get("exintro") == "1" => article("Moon", "Intro."),
                ("Moon", _) => article("Moon", "Intro. More text."),
                ("Earth", "extracts") => article("Earth", "Earth intro."),
                ("Earth", _) => article("Earth", "Earth intro. Body."),
                ("Mercury", _) => serde_json::json!({"query": {"pages": [{
                    "title": "Mercury", "pageprops": {"disambiguation": ""}
                }]}}),
                (t, _) => serde_json::json!({"query": {"pages": [{"title": t, "missing": true}]}}),
            };
            Json(body)
        }

        async fn fixture() -> MediaWikiSource {
            let app = Router::new()
                .route("/simple/w/api.php", get(simple_api))
                .route(
                    "/en/w/api.php",
                    get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
                );
            let addr = serve(app).await;
            MediaWikiSource::with_endpoints(
                reqwest::Client::new(),
                &format!("http://{addr}/simple/w/api.php"),
                &format!("http://{addr}/en/w/api.php"),
            )
            .unwrap()
        }

        #[tokio::test]
        async fn search_returns_titles_up_to_limit() {
            let src = fixture().await;
            let titles = src.search(Edition::Simple, "moon", 3).await.unwrap();
            assert_eq!(titles, vec!["Moon", "Moon landing", "Half Moon"]);
            assert!(src
                .search(Edition::Simple, "nothing", 3)
                .await
                .unwrap()
                .is_empty());
        }

        #[tokio::test]
        async fn get_page_fills_summary_and_content() {
            let src = fixture().await;
            let p = src.get_page(Edition::Simple, "Moon", false).await.unwrap();
            assert_eq!(p.title, "Moon");
            assert_eq!(p.summary, "Intro.");
            assert_eq!(p.content, "Intro. More text.");
            assert_eq!(p.url, "https://simple.example/wiki/Moon");
        }

        #[tokio::test]
        async fn auto_suggest_uses_spelling_suggestion() {
            let src = fixture().await;
            assert!(matches!(
                src.get_page(Edition::Simple, "Eart", false).await,
                Err(Error::NotFound(_))
            ));
            let p = src.get_page(Edition::Simple, "Eart", true).await.unwrap();
            assert_eq!(p.title, "Earth");
        }

        #[tokio::test]
        async fn auto_suggest_without_hits_is_not_found() {
            let src = fixture().await;
            assert!(matches!(
                src.get_page(Edition::Simple, "Qqqq", true).await,
                Err(Error::NotFound(_))
            ));
        }

        #[tokio::test]
        async fn disambiguation_carries_link_options() {
            let src = fixture().await;
            let e = src
                .get_page(Edition::Simple, "Mercury", false)
                .await
                .unwrap_err();
            assert_eq!(
                e,
                Error::Disambiguation {
                    title: "Mercury".to_string(),
                    options: vec![
                        "Mercury (planet)".to_string(),
                        "Mercury (element)".to_string(),
                        "Mercury (mythology)".to_string(),
                        "Freddie Mercury".to_string(),
                    ],
                }
            );
        }

        #[tokio::test]
        async fn http_failure_is_transport_error() {
            let src = fixture().await;
            let e = src
                .get_page(Edition::Standard, "Moon", false)
                .await
                .unwrap_err();
            assert_eq!(
                e,
                Error::Transport("en api request failed: HTTP 503".to_string())
            );
        }
    }
}
