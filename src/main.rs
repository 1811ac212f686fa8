use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use ecofeed::activity::filter::CategoryFilter;
use ecofeed::activity::reactions::Reaction;
use ecofeed::api::client::ApiClient;
use ecofeed::api::wire::EventPage;
use ecofeed::config::Config;
use ecofeed::feed::engine::{FeedEngine, FeedView};
use ecofeed::feed::query::{FeedMode, FeedQuery, Surface};
use ecofeed::output::terminal;

/// Ecofeed: activity feeds for the zero-waste social platform.
///
/// Loads, classifies, filters, and pages the activity feed the same way the
/// web admin panel, the web user feed, and the mobile app do.
#[derive(Parser)]
#[command(name = "ecofeed", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and print one page of a feed
    Feed(FeedArgs),

    /// Classify a JSON file of raw activity records (no network)
    Classify {
        /// Path to a JSON array, or an {items, totalItems} page
        file: String,
    },

    /// Like or dislike a post, then print the refreshed feed
    React {
        /// The post id to react to
        post_id: String,

        /// Send a dislike instead of a like
        #[arg(long)]
        dislike: bool,

        #[command(flatten)]
        feed: FeedArgs,
    },

    /// List the category taxonomy and each surface's filters
    Categories,
}

#[derive(Args)]
struct FeedArgs {
    /// Which client surface's behavior to use
    #[arg(long, value_enum, default_value = "web-user")]
    surface: SurfaceArg,

    /// Own activity or activity from followed accounts
    #[arg(long, value_enum, default_value = "own")]
    mode: ModeArg,

    /// Category name (e.g. CreatePost) or "posts"
    #[arg(long)]
    category: Option<String>,

    /// Only show events by this actor id
    #[arg(long)]
    actor: Option<String>,

    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    page: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum SurfaceArg {
    WebAdmin,
    WebUser,
    Mobile,
}

impl From<SurfaceArg> for Surface {
    fn from(arg: SurfaceArg) -> Self {
        match arg {
            SurfaceArg::WebAdmin => Surface::WebAdmin,
            SurfaceArg::WebUser => Surface::WebUser,
            SurfaceArg::Mobile => Surface::Mobile,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Own,
    Following,
}

impl From<ModeArg> for FeedMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Own => FeedMode::Own,
            ModeArg::Following => FeedMode::Following,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ecofeed=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Feed(args) => {
            let config = Config::load()?;
            let engine = build_engine(&config, &args)?;
            let view = load_query(&engine, &args).await?;
            terminal::display_feed(&view);
        }

        Commands::Classify { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {file}"))?;
            let page: EventPage = serde_json::from_str(&raw)
                .with_context(|| format!("{file} is not an activity list"))?;
            info!(records = page.items.len(), "Classifying activity records");
            let batch = ecofeed::activity::event::normalize_batch(&page.items);
            terminal::display_classification(&batch);
        }

        Commands::React {
            post_id,
            dislike,
            feed,
        } => {
            let config = Config::load()?;
            let engine = build_engine(&config, &feed)?;
            load_query(&engine, &feed).await?;

            let reaction = if dislike {
                Reaction::Dislike
            } else {
                Reaction::Like
            };
            let view = engine.react(&post_id, reaction).await?;
            println!("Sent {reaction} for post {post_id}.");
            terminal::display_feed(&view);
        }

        Commands::Categories => {
            let config = Config::load()?;
            terminal::display_categories(config.page_size, config.bulk_page_size);
        }
    }

    Ok(())
}

fn build_engine(config: &Config, args: &FeedArgs) -> Result<FeedEngine> {
    let caller = config.require_caller()?;
    let client = ApiClient::new(&config.api_url, config.api_token.clone(), config.timeout)?;
    let profile = Surface::from(args.surface).profile(config.page_size, config.bulk_page_size);
    Ok(FeedEngine::new(
        Arc::new(client),
        caller,
        profile,
        args.mode.into(),
    ))
}

/// Build the requested query and load it, checking the category name first
/// so a typo fails before any request goes out.
async fn load_query(engine: &FeedEngine, args: &FeedArgs) -> Result<FeedView> {
    let category = match &args.category {
        Some(name) => Some(CategoryFilter::parse(name).with_context(|| {
            format!("Unknown category {name:?}. Run `ecofeed categories` to list them.")
        })?),
        None => None,
    };

    let query = FeedQuery::new(args.mode.into())
        .with_category(category)
        .with_actor(args.actor.clone())
        .with_page(args.page.max(1));

    Ok(engine.apply(query).await)
}
