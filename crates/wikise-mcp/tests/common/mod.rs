//! Local fake of the MediaWiki action API for both editions.
//!
//! Simple edition: "Moon" (long article), "Stubby" (short article), "Mercury" (disambiguation
//! whose list is not in title order), search "solar system" -> 3 titles.
//! Standard edition: "Stubby" and "Quark" articles. Everything else is missing.

#![allow(dead_code)]

use axum::{extract::Query, routing::get, Json, Router};
use std::collections::HashMap;
use std::net::SocketAddr;

fn article(title: &str, intro: &str, body_len: usize) -> serde_json::Value {
    serde_json::json!({"query": {"pages": [{
        "ns": 0,
        "title": title,
        "fullurl": format!("https://fixture.example/wiki/{title}"),
        "extract": format!("{intro} {}", "z".repeat(body_len))
    }]}})
}

fn intro(title: &str, intro: &str) -> serde_json::Value {
    serde_json::json!({"query": {"pages": [{"title": title, "extract": intro}]}})
}

fn missing(title: &str) -> serde_json::Value {
    serde_json::json!({"query": {"pages": [{"title": title, "missing": true}]}})
}

fn simple(q: &HashMap<String, String>) -> serde_json::Value {
    let get = |k: &str| q.get(k).map(String::as_str).unwrap_or("");
    if get("list") == "search" {
        return match get("srsearch") {
            "solar system" => serde_json::json!({"query": {"search": [
                {"title": "Solar System"}, {"title": "Sun"}, {"title": "Planet"}
            ]}}),
            _ => serde_json::json!({"query": {"search": []}}),
        };
    }
    if get("action") == "parse" && get("page") == "Mercury" {
        return serde_json::json!({"parse": {"title": "Mercury", "text": concat!(
            "<div class=\"mw-parser-output\"><p>Mercury may mean:</p><ul>",
            "<li><a href=\"/wiki/Mercury_(planet)\">Mercury (planet)</a>, a planet</li>",
            "<li><a href=\"/wiki/Mercury_(element)\">Mercury (element)</a>, a metal</li>",
            "<li><a href=\"/wiki/Mercury_(mythology)\">Mercury (mythology)</a>, a god</li>",
            "</ul></div>"
        )}});
    }
    let is_intro = get("exintro") == "1";
    match get("titles") {
        "Moon" if is_intro => intro("Moon", "The Moon goes around the Earth."),
        "Moon" => article("Moon", "The Moon goes around the Earth.", 1200),
        "Stubby" if is_intro => intro("Stubby", "Short."),
        "Stubby" => article("Stubby", "Short.", 10),
        "Mercury" => serde_json::json!({"query": {"pages": [{
            "title": "Mercury", "pageprops": {"disambiguation": ""}
        }]}}),
        t => missing(t),
    }
}

fn standard(q: &HashMap<String, String>) -> serde_json::Value {
    let get = |k: &str| q.get(k).map(String::as_str).unwrap_or("");
    if get("list") == "search" {
        return serde_json::json!({"query": {"search": []}});
    }
    let is_intro = get("exintro") == "1";
    match get("titles") {
        "Stubby" if is_intro => intro("Stubby", "Stubby, the full story."),
        "Stubby" => article("Stubby", "Stubby, the full story.", 4000),
        "Quark" if is_intro => intro("Quark", "A quark is a particle."),
        "Quark" => article("Quark", "A quark is a particle.", 30),
        t => missing(t),
    }
}

pub async fn serve_fixture() -> SocketAddr {
    let app = Router::new()
        .route(
            "/simple/w/api.php",
            get(|Query(q): Query<HashMap<String, String>>| async move { Json(simple(&q)) }),
        )
        .route(
            "/en/w/api.php",
            get(|Query(q): Query<HashMap<String, String>>| async move { Json(standard(&q)) }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("axum serve");
    });
    addr
}

/// Environment pointing a `wikise` process at the fixture.
pub fn fixture_env(addr: SocketAddr) -> Vec<(&'static str, String)> {
    vec![
        (
            "WIKISE_SIMPLE_ENDPOINT",
            format!("http://{addr}/simple/w/api.php"),
        ),
        (
            "WIKISE_STANDARD_ENDPOINT",
            format!("http://{addr}/en/w/api.php"),
        ),
        ("WIKISE_EDITION", "simple".to_string()),
        ("WIKISE_MIN_SIMPLE_CHARS", "500".to_string()),
        ("WIKISE_TIMEOUT_MS", "5000".to_string()),
    ]
}
