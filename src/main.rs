//! anime-resolve command line
//!
//! Resolves one title and prints the ranked records as JSON.

use anime_resolve::sources::SourceLoader;
use anime_resolve::{config, ExecutionMode, MatchMode, QueryFilters, ResolveRequest, Resolver};
use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

const ENV_HELP: &str = "\
ENVIRONMENT VARIABLES:
    PRECISE_SETTINGS_PATH          Path to settings.yml
    PRECISE_HTTP_TIMEOUT           Per-request timeout in seconds
    PRECISE_HTTP_MAX_CONNECTIONS   Connection pool size per host
    PRECISE_QUERY_CONCURRENCY      Source calls in flight at once
    PRECISE_MATCH_MODE             Default match mode
    RUST_LOG                       Log filter (default: warn)";

/// Resolve an anime title across Bangumi, AniList and Jikan
#[derive(Parser, Debug)]
#[command(name = "anime-resolve", version, about, after_help = ENV_HELP)]
struct Cli {
    /// Title to resolve; several words are joined with spaces
    #[arg(required_unless_present = "list_sources", num_args = 1..)]
    title: Vec<String>,

    #[arg(long, help = "Prefer works from this year")]
    year: Option<i32>,

    #[arg(
        long,
        value_parser = clap::value_parser!(u32).range(1..=12),
        help = "Prefer works starting in this month (1-12)"
    )]
    month: Option<u32>,

    #[arg(long, value_name = "NAME", help = "Keep only works by this studio")]
    studio: Option<String>,

    #[arg(long, value_name = "NAME", help = "Keep only works by this director")]
    director: Option<String>,

    #[arg(
        long = "source",
        value_name = "TYPE",
        help = "Keep only works adapted from this source type"
    )]
    source_type: Option<String>,

    #[arg(long, help = "Match mode: strict, normal or recall")]
    mode: Option<MatchMode>,

    #[arg(long = "top", value_name = "N", help = "Number of records to print")]
    top_n: Option<usize>,

    #[arg(long, help = "Query sources one at a time")]
    sequential: bool,

    #[arg(long, help = "Include per-source call statistics in the output")]
    stats: bool,

    #[arg(long, help = "List the source adapters this build ships and exit")]
    list_sources: bool,
}

impl Cli {
    fn request(&self) -> ResolveRequest {
        let filters = QueryFilters {
            year: self.year,
            month: self.month,
            studio: self.studio.clone(),
            director: self.director.clone(),
            source_type: self.source_type.clone(),
        };
        ResolveRequest {
            keyword: self.title.join(" "),
            filters,
            mode: self.mode,
            top_n: self.top_n,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.list_sources {
        for name in SourceLoader::available_sources() {
            println!("{}", name);
        }
        return Ok(());
    }

    let settings = config::load_settings()?;
    let mut resolver = Resolver::from_settings(settings);
    if cli.sequential {
        resolver = resolver.with_execution_mode(ExecutionMode::Sequential);
    }
    info!("Loaded {} sources", resolver.registry().len());

    let outcome = resolver.resolve(cli.request()).await?;
    let mut output = serde_json::json!({
        "records": outcome.field_maps(),
        "timings": outcome.timings,
        "unresponsive": outcome.unresponsive,
    });
    if cli.stats {
        output["stats"] = serde_json::to_value(resolver.metrics().source_stats())?;
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
