use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;

use config::LookupConfig;

const SCHEMA_VERSION: u64 = 1;

#[derive(Parser, Debug)]
#[command(name = "wikise")]
#[command(about = "Simple-English-first Wikipedia lookup (MCP stdio server)", long_about = None)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace). Logs go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as an MCP stdio server (for Cursor / MCP clients).
    #[cfg(feature = "stdio")]
    McpStdio(ServeCmd),
    /// Run one tool call and print its sections.
    Call(CallCmd),
    /// Print resolved configuration (json; no network).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[cfg(feature = "stdio")]
#[derive(clap::Args, Debug)]
struct ServeCmd {
    #[command(flatten)]
    lookup: LookupConfig,
}

#[derive(clap::Args, Debug)]
struct CallCmd {
    /// Tool name: search | summary | content | page
    tool: String,
    /// Tool arguments as a JSON object, e.g. '{"title":"Moon"}'.
    #[arg(long, default_value = "{}")]
    args: String,
    /// Output format: text|json
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
    #[command(flatten)]
    lookup: LookupConfig,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    #[command(flatten)]
    lookup: LookupConfig,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[cfg(feature = "stdio")]
mod mcp {
    use rmcp::{
        handler::server::router::tool::ToolRouter as RmcpToolRouter,
        handler::server::wrapper::Parameters,
        model::{CallToolResult, ServerCapabilities, ServerInfo},
        tool, tool_handler, tool_router,
        transport::stdio,
        ErrorData as McpError, ServiceExt,
    };
    use schemars::JsonSchema;
    use serde::Deserialize;
    use wikise_core::{resolve::LookupKind, Resolver};

    #[path = "envelope.rs"]
    mod envelope;
    use envelope::*;

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct SearchArgs {
        /// Search query for Wikipedia articles (required).
        #[serde(default)]
        query: Option<String>,
        /// Maximum number of titles to return. Default: 10; clamped to 1..=20.
        #[serde(default)]
        #[schemars(range(min = 1, max = 20))]
        limit: Option<i64>,
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct LookupArgs {
        /// Title of the Wikipedia page (required).
        #[serde(default)]
        title: Option<String>,
        /// Substitute the closest matching title when the exact one is missing.
        /// Default: true for `page`, false for `summary` and `content`.
        #[serde(default)]
        auto_suggest: Option<bool>,
    }

    #[derive(Clone)]
    pub(crate) struct WikiseMcp {
        tool_router: RmcpToolRouter<Self>,
        resolver: Resolver,
    }

    #[tool_router]
    impl WikiseMcp {
        pub(crate) fn new(resolver: Resolver) -> Self {
            Self {
                tool_router: Self::tool_router(),
                resolver,
            }
        }

        async fn lookup(
            &self,
            kind: LookupKind,
            params: Parameters<Option<LookupArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let args = params.0.unwrap_or_default();
            let title = args.title.unwrap_or_default();
            let auto_suggest = args
                .auto_suggest
                .unwrap_or(kind.default_auto_suggest());
            tracing::info!(?kind, title = %title, auto_suggest, "tool call");
            let sections = self
                .resolver
                .lookup(kind, &title, auto_suggest)
                .await
                .map_err(mcp_error)?;
            Ok(tool_result(&sections))
        }

        #[tool(
            description = "Search Wikipedia for article titles. Uses Simple English Wikipedia first, falls back to English."
        )]
        async fn search(
            &self,
            params: Parameters<Option<SearchArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let args = params.0.unwrap_or_default();
            let query = args.query.unwrap_or_default();
            tracing::info!(query = %query, limit = ?args.limit, "tool call: search");
            let sections = self
                .resolver
                .search(&query, args.limit)
                .await
                .map_err(mcp_error)?;
            Ok(tool_result(&sections))
        }

        #[tool(
            description = "Get the summary of a Wikipedia page. Tries Simple English first, falls back to English for missing or stub pages."
        )]
        async fn summary(
            &self,
            params: Parameters<Option<LookupArgs>>,
        ) -> Result<CallToolResult, McpError> {
            self.lookup(LookupKind::Summary, params).await
        }

        #[tool(
            description = "Get the full plain-text content of a Wikipedia page. Tries Simple English first, falls back to English for missing or stub pages."
        )]
        async fn content(
            &self,
            params: Parameters<Option<LookupArgs>>,
        ) -> Result<CallToolResult, McpError> {
            self.lookup(LookupKind::Content, params).await
        }

        #[tool(
            description = "Get both the summary and the full content of a Wikipedia page (Simple English first, English fallback)."
        )]
        async fn page(
            &self,
            params: Parameters<Option<LookupArgs>>,
        ) -> Result<CallToolResult, McpError> {
            self.lookup(LookupKind::Page, params).await
        }
    }

    #[tool_handler]
    impl rmcp::ServerHandler for WikiseMcp {
        fn get_info(&self) -> ServerInfo {
            ServerInfo {
                instructions: Some(
                    "Wikipedia lookup preferring Simple English. Each tool returns markdown sections: metadata first, then the payload or a not-found/disambiguation/error notice."
                        .to_string(),
                ),
                capabilities: ServerCapabilities::builder().enable_tools().build(),
                ..Default::default()
            }
        }
    }

    pub(crate) async fn serve_stdio(resolver: Resolver) -> Result<(), McpError> {
        let svc = WikiseMcp::new(resolver);
        let running = svc.serve(stdio()).await.map_err(internal_error)?;
        // Keep the stdio server alive until the client closes.
        running.waiting().await.map_err(internal_error)?;
        Ok(())
    }

}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    // stdout carries MCP frames; logs must stay on stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_env_file() {
    // Opt-in only (WIKISE_ENV_FILE). Never overrides the process environment.
    let Ok(p) = std::env::var("WIKISE_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        #[cfg(feature = "stdio")]
        Commands::McpStdio(args) => {
            let resolver = args.lookup.build_resolver()?;
            tracing::info!(
                preference = ?resolver.preference(),
                min_simple_chars = resolver.min_simple_chars(),
                "serving MCP over stdio"
            );
            mcp::serve_stdio(resolver)
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        Commands::Call(args) => {
            let arguments = match serde_json::from_str::<serde_json::Value>(&args.args)
                .context("--args must be JSON")?
            {
                serde_json::Value::Object(m) => m,
                _ => anyhow::bail!("--args must be a JSON object"),
            };
            let resolver = args.lookup.build_resolver()?;
            let sections = resolver.call(&args.tool, arguments).await?;
            match args.output.to_ascii_lowercase().as_str() {
                "json" => {
                    let v = serde_json::json!({
                        "schema_version": SCHEMA_VERSION,
                        "kind": "call",
                        "ok": true,
                        "tool": args.tool,
                        "sections": sections,
                    });
                    println!("{v}");
                }
                _ => {
                    let text = sections
                        .iter()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>()
                        .join("\n\n");
                    println!("{text}");
                }
            }
        }
        Commands::Doctor(args) => {
            let mut warnings: Vec<&'static str> = Vec::new();
            if !args.lookup.preference_recognized() {
                warnings.push("edition_unrecognized_using_simple");
            }
            let source_error = args.lookup.source().err().map(|e| e.to_string());
            let v = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "kind": "doctor",
                "ok": source_error.is_none(),
                "name": "wikise",
                "version": env!("CARGO_PKG_VERSION"),
                "features": { "stdio": cfg!(feature = "stdio") },
                "config": args.lookup.describe(),
                "error": source_error,
                "warnings": warnings,
            });
            println!("{v}");
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "kind": "version",
                "ok": true,
                "name": "wikise",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("wikise {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
    }

    Ok(())
}
