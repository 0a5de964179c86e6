use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use content_aggregator::{AppConfig, ContentKind, FeedSession, PageOutcome, PgBackend, SearchQuery};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "content-aggregator", about = "Merged news, movie and social feed with favorites and manual order")]
struct Cli {
    #[command(flatten)]
    config: AppConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load feed pages and print the merged result
    Feed {
        #[arg(long, default_value_t = 1)]
        pages: u32,
        #[arg(long)]
        query: Option<String>,
    },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Move one item of the first feed page and store the new order
    Reorder { from: usize, to: usize },
    /// Create the PostgreSQL tables
    Schema,
}

#[derive(Subcommand)]
enum FavoritesAction {
    List,
    /// Favorite an item from the first feed page by id
    Add { content_id: String },
    /// Remove by favorite record id
    Remove { record_id: String },
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.config;
    info!("Starting content aggregator with {:?}", config);

    if let Command::Schema = cli.command {
        let Some(url) = config.database_url.as_deref() else {
            bail!("DATABASE_URL is required to create the schema");
        };
        let backend = PgBackend::new(url, config.user_id.clone())
            .await
            .context("Failed to connect to PostgreSQL")?;
        backend.setup_schema().await?;
        info!("Schema ready");
        return Ok(());
    }

    let fetcher = config.fetcher()?;
    let adapters = config.adapters(fetcher.clone())?;
    let backend = config.backend(fetcher).await?;
    let mut session = FeedSession::new(adapters, backend, config.session_settings());
    session.start().await;

    match cli.command {
        Command::Feed { pages, query } => {
            if let Some(q) = query {
                session.set_query(SearchQuery::new(q));
            }
            for _ in 0..pages.max(1) {
                let outcome = session.load_next_page().await;
                report_outcome(&outcome);
                if !session.has_more() {
                    break;
                }
            }
            let items = session.render().to_vec();
            for item in &items {
                let pinned = if session.favorites().is_favorite(&item.id) { "*" } else { " " };
                println!("{} {:<7} {:<40} {}", pinned, item.kind, item.id, item.title);
            }
        }
        Command::Favorites { action } => match action {
            FavoritesAction::List => {
                let records = session.favorites_mut().list().await?;
                for record in &records {
                    println!(
                        "{:<8} {:<7} {:<40} {}",
                        record.id, record.content_type, record.content_id, record.content_snapshot.title
                    );
                }
                let counts = session.favorites().count_by_kind();
                for kind in ContentKind::ALL {
                    println!("{}: {}", kind, counts.get(&kind).copied().unwrap_or(0));
                }
            }
            FavoritesAction::Add { content_id } => {
                let outcome = session.load_next_page().await;
                report_outcome(&outcome);
                let Some(item) = session.rendered().iter().find(|i| i.id == content_id).cloned() else {
                    bail!("{} is not on the first feed page", content_id);
                };
                session.favorites_mut().add(&item).await?;
                println!("Added {}", content_id);
            }
            FavoritesAction::Remove { record_id } => {
                session.favorites_mut().remove(&record_id).await?;
                println!("Removed {}", record_id);
            }
            FavoritesAction::Clear => {
                let outcome = session.favorites_mut().clear_all().await?;
                println!("Removed {}, failed {}", outcome.removed, outcome.failed);
                if !outcome.is_complete() {
                    warn!("Some favorites could not be removed");
                }
            }
        },
        Command::Reorder { from, to } => {
            report_outcome(&session.load_next_page().await);
            let items = session.drag_end(from, to)?;
            for (position, item) in items.iter().enumerate() {
                println!("{:>3} {}", position, item.id);
            }
        }
        Command::Schema => {}
    }

    session.shutdown().await;
    Ok(())
}

fn report_outcome(outcome: &PageOutcome) {
    match outcome {
        PageOutcome::Loaded(report) => {
            for (kind, err) in &report.failures {
                if err.is_auth_rejected() {
                    error!("{} rejected the credential, sign in again", kind);
                } else {
                    warn!("{} unavailable: {}", kind, err);
                }
            }
            info!("Page {} loaded, has_more={}", report.page, report.has_more);
        }
        PageOutcome::Superseded { issued, current } => {
            info!("Page from generation {} discarded (now {})", issued, current)
        }
        PageOutcome::Exhausted => info!("No more pages"),
    }
}
