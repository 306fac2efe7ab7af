//! mimir — analyze ideas from the command line.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mimir::{
    AnalysisContext, AnalysisProvider, AnalysisRequest, Config, MimirBuilder, QualityTracker,
    SimilarityCache,
};

/// Mimir CLI
#[derive(Parser)]
#[command(name = "mimir")]
#[command(version = mimir::PKG_VERSION)]
#[command(about = "Score ideas against your goals")]
struct Args {
    /// Config file (default: ~/.mimir/config.toml)
    #[arg(short, long, env = "MIMIR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze an idea
    Analyze {
        /// Idea text (or omit to read from stdin)
        idea: Option<String>,
        /// A goal to judge the idea against (repeatable)
        #[arg(short, long = "goal")]
        goals: Vec<String>,
        /// Something to avoid (repeatable)
        #[arg(short, long = "avoid")]
        avoid: Vec<String>,
        /// Free-form notes for the prompt
        #[arg(short, long)]
        notes: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show backend availability
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let cache = Arc::new(SimilarityCache::new(config.cache.to_cache_config()));
    let mut builder = MimirBuilder::from_config(&config);
    if config.cache.enabled {
        builder = builder.shared_cache(Arc::clone(&cache));
    }
    let chain = builder.build()?;

    match args.command {
        Command::Analyze {
            idea,
            goals,
            avoid,
            notes,
            json,
        } => {
            let idea = read_input(idea)?;
            let mut context = AnalysisContext::new();
            context.goals = goals;
            context.avoid = avoid;
            context.notes = notes;
            let request = AnalysisRequest::new(idea).with_context(Arc::new(context));

            let result = chain.analyze(&request).await?;
            let quality = QualityTracker::new().record(&result);

            if json {
                let output = serde_json::json!({
                    "result": result,
                    "quality": quality,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!(
                    "score: {:.1}/10 ({})",
                    result.final_score, result.recommendation
                );
                println!("  mission alignment: {:.1}", result.scores.mission_alignment);
                println!("  anti-challenge:    {:.1}", result.scores.anti_challenge);
                println!("  strategic fit:     {:.1}", result.scores.strategic_fit);
                for (category, text) in &result.explanations {
                    println!("{category}: {text}");
                }
                let cached = if result.from_cache { ", cached" } else { "" };
                println!(
                    "via {} in {}ms{cached}",
                    result.provider,
                    result.duration.as_millis()
                );
                println!(
                    "quality: completeness {:.2}, consistency {:.2}, confidence {:.2}",
                    quality.completeness, quality.consistency, quality.confidence
                );
            }
        }

        Command::Status => {
            for status in chain.provider_status().await {
                let state = if status.available {
                    "available"
                } else {
                    "unavailable"
                };
                println!("{}: {state}", status.name);
            }
            if config.cache.enabled {
                let stats = cache.stats();
                println!(
                    "cache: {} entries, hit rate {:.0}%",
                    stats.entries,
                    stats.hit_rate * 100.0
                );
            } else {
                println!("cache: disabled");
            }
        }
    }

    Ok(())
}

/// Use the argument if given, otherwise read stdin (unless it is a terminal).
fn read_input(arg: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(text) = arg {
        return Ok(text);
    }
    if io::stdin().is_terminal() {
        return Err("no idea given (pass it as an argument or pipe it on stdin)".into());
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        return Err("empty idea".into());
    }
    Ok(trimmed.to_string())
}
