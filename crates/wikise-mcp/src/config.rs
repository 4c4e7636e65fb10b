//! Startup configuration shared by every subcommand that performs lookups.
//!
//! Each knob is a CLI flag backed by a `WIKISE_*` environment variable, so MCP clients
//! that launch the server without a shell can still configure it.

use anyhow::Context;
use std::sync::Arc;
use wikise_core::{EditionPreference, Resolver, DEFAULT_MIN_SIMPLE_CHARS};
use wikise_local::mediawiki::{
    MediaWikiSource, DEFAULT_TIMEOUT_MS, SIMPLE_ENDPOINT, STANDARD_ENDPOINT,
};

const USER_AGENT: &str = concat!(
    "wikise/",
    env!("CARGO_PKG_VERSION"),
    " (MCP Wikipedia lookup tools)"
);

#[derive(clap::Args, Debug, Clone)]
pub(crate) struct LookupConfig {
    /// Edition preference: "simple" tries Simple English first; "standard" (or "en") skips it.
    #[arg(long, env = "WIKISE_EDITION", default_value = "simple")]
    pub(crate) edition: String,
    /// Simple-edition pages at or below this many characters fall back to English.
    #[arg(long, env = "WIKISE_MIN_SIMPLE_CHARS", default_value_t = DEFAULT_MIN_SIMPLE_CHARS)]
    pub(crate) min_simple_chars: usize,
    #[arg(long, env = "WIKISE_SIMPLE_ENDPOINT", default_value = SIMPLE_ENDPOINT)]
    pub(crate) simple_endpoint: String,
    #[arg(long, env = "WIKISE_STANDARD_ENDPOINT", default_value = STANDARD_ENDPOINT)]
    pub(crate) standard_endpoint: String,
    /// Per-request timeout (ms), clamped to 1000..=60000.
    #[arg(long, env = "WIKISE_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub(crate) timeout_ms: u64,
}

impl LookupConfig {
    /// Unrecognized values fall back to the default rather than refusing to start.
    pub(crate) fn preference(&self) -> EditionPreference {
        match self.edition.parse::<EditionPreference>() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "using default edition preference (simple)");
                EditionPreference::default()
            }
        }
    }

    pub(crate) fn preference_recognized(&self) -> bool {
        self.edition.parse::<EditionPreference>().is_ok()
    }

    pub(crate) fn source(&self) -> anyhow::Result<MediaWikiSource> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building http client")?;
        let source =
            MediaWikiSource::with_endpoints(http, &self.simple_endpoint, &self.standard_endpoint)?
                .with_timeout_ms(self.timeout_ms);
        Ok(source)
    }

    pub(crate) fn build_resolver(&self) -> anyhow::Result<Resolver> {
        let source = self.source()?;
        let resolver = Resolver::new(Arc::new(source), self.preference())
            .with_min_simple_chars(self.min_simple_chars);
        tracing::debug!(?resolver, "resolver ready");
        Ok(resolver)
    }

    /// Resolved settings for `doctor` output.
    pub(crate) fn describe(&self) -> serde_json::Value {
        serde_json::json!({
            "edition": self.edition,
            "edition_recognized": self.preference_recognized(),
            "edition_preference": self.preference(),
            "min_simple_chars": self.min_simple_chars,
            "timeout_ms": self.timeout_ms.clamp(1_000, 60_000),
            "endpoints": {
                "simple": self.simple_endpoint,
                "standard": self.standard_endpoint,
            },
        })
    }
}
