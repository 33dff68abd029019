use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mood_core::{Emotion, NewItem, Selection};
use mood_store::{Feed, PublishDecision, TrainOutcome};
use rand::SeedableRng;
use rand::rngs::SmallRng;

#[derive(Parser)]
#[command(name = "mood", about = "Reaction-driven content picker")]
struct Cli {
    /// Data directory (default: $MOOD_DATA_DIR or ~/.moodfeed)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add one item to the catalog
    Add {
        title: String,
        /// Local path or URL; duplicates are skipped
        location: String,
        /// Provenance tag (community, channel, feed)
        source: String,
    },

    /// Import a JSON array of {title, location, source} objects
    Import {
        /// Input file path
        path: PathBuf,
    },

    /// Pick the next item to show
    Next {
        /// Print the selection as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a classifier label for an item
    React {
        item_id: i64,
        /// happy, surprise, neutral, fear, sad, disgust, angry, no_face, analysis_error
        emotion: String,
    },

    /// Retrain the scoring model on all stored reactions
    Train,

    /// Pick the best unseen item and mark it published
    Publish {
        /// Show the pick without recording it
        #[arg(long)]
        dry_run: bool,
    },

    /// List unseen candidates with their scores, best first
    Scores {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show catalog, reaction and model statistics
    Stats,
}

fn data_dir(cli: &Cli) -> Option<PathBuf> {
    cli.data_dir.clone().or_else(|| {
        std::env::var("MOOD_DATA_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    })
}

fn open_feed(cli: &Cli) -> Result<Feed> {
    Feed::open(data_dir(cli).as_deref()).context("failed to open feed")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Add {
            title,
            location,
            source,
        } => cmd_add(&cli, title, location, source),
        Commands::Import { path } => cmd_import(&cli, path),
        Commands::Next { json } => cmd_next(&cli, *json),
        Commands::React { item_id, emotion } => cmd_react(&cli, *item_id, emotion),
        Commands::Train => cmd_train(&cli),
        Commands::Publish { dry_run } => cmd_publish(&cli, *dry_run),
        Commands::Scores { limit } => cmd_scores(&cli, *limit),
        Commands::Stats => cmd_stats(&cli),
    }
}

fn cmd_add(cli: &Cli, title: &str, location: &str, source: &str) -> Result<()> {
    let feed = open_feed(cli)?;
    match feed
        .add_item(&NewItem::new(title, location, source))
        .context("failed to add item")?
    {
        Some(id) => println!("added item {id}"),
        None => println!("skipped: {location} already in catalog"),
    }
    Ok(())
}

fn cmd_import(cli: &Cli, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let items: Vec<NewItem> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse items from {}", path.display()))?;

    let feed = open_feed(cli)?;
    let added = feed.import_items(&items).context("failed to import items")?;
    println!(
        "imported {added} of {} items ({} duplicates skipped)",
        items.len(),
        items.len() - added
    );
    Ok(())
}

fn cmd_next(cli: &Cli, json: bool) -> Result<()> {
    let feed = open_feed(cli)?;
    let mut rng = SmallRng::from_os_rng();
    let selection = feed.next_item(&mut rng).context("failed to select item")?;

    if json {
        let value = serde_json::json!({
            "strategy": selection.strategy(),
            "score": selection.score(),
            "item": selection.item(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match &selection {
        Selection::NoItemsAvailable => println!("(no items available)"),
        _ => {
            if let Some(item) = selection.item() {
                println!("id:       {}", item.id);
                println!("title:    {}", item.title);
                println!("location: {}", item.location);
                println!("source:   {}", item.source);
            }
            match selection.score() {
                Some(score) => println!("strategy: {} ({score:.4})", selection.strategy()),
                None => println!("strategy: {}", selection.strategy()),
            }
        }
    }
    Ok(())
}

fn cmd_react(cli: &Cli, item_id: i64, label: &str) -> Result<()> {
    let emotion = Emotion::parse(label);
    if let Emotion::Unknown(raw) = &emotion {
        if raw.is_empty() {
            bail!("emotion label must not be empty");
        }
        tracing::warn!("unrecognized emotion '{raw}', stored with lowest priority");
    }

    let feed = open_feed(cli)?;
    let outcome = feed
        .react(item_id, &emotion)
        .with_context(|| format!("failed to record reaction for item {item_id}"))?;
    println!("{outcome}: item {item_id} -> {emotion}");
    Ok(())
}

fn cmd_train(cli: &Cli) -> Result<()> {
    let mut feed = open_feed(cli)?;
    match feed.train().context("failed to train model")? {
        TrainOutcome::Trained(report) => {
            println!(
                "trained on {} reactions ({} positive, {} sources)",
                report.samples, report.positives, report.categories
            );
            if !report.converged {
                println!(
                    "warning: optimizer stopped after {} iterations without converging",
                    report.iterations
                );
            }
            if let Some(path) = feed.model_path() {
                println!("saved to {}", path.display());
            }
        }
        TrainOutcome::Skipped(reason) => println!("skipped: {reason}"),
    }
    Ok(())
}

fn cmd_publish(cli: &Cli, dry_run: bool) -> Result<()> {
    let feed = open_feed(cli)?;
    match feed
        .pick_for_publication()
        .context("failed to pick item for publication")?
    {
        PublishDecision::Publish { item, score } => {
            if dry_run {
                println!("would publish item {} ({score:.4}): {}", item.id, item.location);
            } else {
                feed.mark_published(item.id)
                    .with_context(|| format!("failed to mark item {} published", item.id))?;
                println!("published item {} ({score:.4}): {}", item.id, item.location);
            }
        }
        PublishDecision::ModelUntrained => println!("skipped: model is not trained"),
        PublishDecision::NoCandidates => println!("skipped: no unseen items"),
    }
    Ok(())
}

fn cmd_scores(cli: &Cli, limit: Option<usize>) -> Result<()> {
    let feed = open_feed(cli)?;
    let ranked = feed.rank_candidates().context("failed to rank candidates")?;
    if ranked.is_empty() {
        println!("(no unseen items)");
        return Ok(());
    }
    let limit = limit.unwrap_or(ranked.len());
    for (item, score) in ranked.iter().take(limit) {
        println!("{score:.4}  {:>6}  {:<16}  {}", item.id, item.source, item.title);
    }
    Ok(())
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let feed = open_feed(cli)?;
    let stats = feed.stats().context("failed to collect stats")?;

    println!("items:      {}", stats.items);
    println!("reactions:  {}", stats.reactions);
    println!("unseen:     {}", stats.unseen);
    match &stats.trained_at {
        Some(at) if stats.trained => println!(
            "model:      trained ({} samples, {at})",
            stats.trained_samples
        ),
        _ => println!("model:      untrained"),
    }
    for (emotion, count) in &stats.emotions {
        println!("  {emotion:<16}{count}");
    }
    Ok(())
}
