use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod resolve;

pub use resolve::{Resolver, DEFAULT_MIN_SIMPLE_CHARS};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("page not found: {0}")]
    NotFound(String),
    #[error("{title} may refer to: {}", .options.join(", "))]
    Disambiguation { title: String, options: Vec<String> },
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Which Wikipedia the request goes to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    Simple,
    Standard,
}

impl Edition {
    /// MediaWiki language code (subdomain).
    pub fn code(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Standard => "en",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Simple => "Simple English",
            Self::Standard => "English",
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Process-wide choice of which editions a lookup walks through.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EditionPreference {
    #[default]
    PreferSimple,
    StandardOnly,
}

impl EditionPreference {
    /// Editions to try, in order. The last one is terminal.
    pub fn plan(self) -> &'static [Edition] {
        match self {
            Self::PreferSimple => &[Edition::Simple, Edition::Standard],
            Self::StandardOnly => &[Edition::Standard],
        }
    }

    pub fn prefers_simple(self) -> bool {
        matches!(self, Self::PreferSimple)
    }
}

impl FromStr for EditionPreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "simple" | "simple-english" | "prefer-simple" => Ok(Self::PreferSimple),
            "standard" | "en" | "english" | "standard-only" => Ok(Self::StandardOnly),
            other => Err(Error::InvalidArgument(format!(
                "unrecognized edition preference: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub content: String,
}

impl Page {
    /// Length in characters, not bytes.
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// One displayable block of tool output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultSection {
    pub heading: String,
    pub body: String,
}

impl ResultSection {
    pub fn new(heading: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            body: body.into(),
        }
    }
}

impl fmt::Display for ResultSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "# {}\n\n{}", self.heading, self.body)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolName {
    Search,
    Summary,
    Content,
    Page,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [Self::Search, Self::Summary, Self::Content, Self::Page];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Summary => "summary",
            Self::Content => "content",
            Self::Page => "page",
        }
    }
}

impl FromStr for ToolName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown tool: {s}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub tool: ToolName,
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl ToolRequest {
    pub fn parse(name: &str, arguments: serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        Ok(Self {
            tool: name.parse()?,
            arguments,
        })
    }

    pub fn str_arg(&self, key: &str) -> Result<Option<&str>> {
        match self.arguments.get(key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(Error::InvalidArgument(format!("{key} must be a string"))),
        }
    }

    pub fn bool_arg(&self, key: &str) -> Result<Option<bool>> {
        match self.arguments.get(key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(Error::InvalidArgument(format!("{key} must be a boolean"))),
        }
    }

    pub fn int_arg(&self, key: &str) -> Result<Option<i64>> {
        match self.arguments.get(key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| Error::InvalidArgument(format!("{key} must be an integer"))),
        }
    }
}

/// Read-only access to an encyclopedia. The edition is passed on every call;
/// implementations must not keep a "current language".
#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Ordered titles, at most `limit`.
    async fn search(&self, edition: Edition, query: &str, limit: usize) -> Result<Vec<String>>;

    /// Fails with `Error::NotFound` or `Error::Disambiguation` as distinguishable outcomes;
    /// anything else is a transport problem.
    async fn get_page(&self, edition: Edition, title: &str, auto_suggest: bool) -> Result<Page>;
}
