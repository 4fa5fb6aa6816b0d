use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use subnews_scraper::config::Config;
use subnews_scraper::constants;
use subnews_scraper::logging;
use subnews_scraper::sources::create_source;
use subnews_scraper::store::UpdateStore;

#[derive(Parser)]
#[command(name = "subnews_scraper")]
#[command(about = "Game update and release announcement scraper")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch updates from the configured sources and merge them into the store
    Run {
        /// Specific sources to run (comma-separated).
        /// Available: hoyolab, lounge, coming_soon, social_feed
        #[arg(long)]
        sources: Option<String>,
    },
    /// Clean the persisted store: strip placeholder fragments, drop duplicates
    Cleanup,
}

async fn run_sources(source_names: &[String], config: &Config, store: &UpdateStore) -> usize {
    let mut total_added = 0;

    for name in source_names {
        let span = tracing::info_span!("Running source", source = %name);
        let _enter = span.enter();

        let Some(source) = create_source(name) else {
            warn!("Unknown source specified");
            println!("⚠️  Unknown source: {name}");
            continue;
        };

        info!("Starting fetch");
        let records = match source.fetch_updates(config).await {
            Ok(records) => records,
            Err(e) => {
                // One broken source never aborts the batch
                error!("Source failed: {e}");
                println!("❌ {name} failed: {e}");
                continue;
            }
        };
        info!("Fetched {} records", records.len());

        match source.merge_into(store, config, &records) {
            Ok(added) => {
                total_added += added;
                println!("✅ {name}: {} fetched, +{added} merged", records.len());
            }
            Err(e) => {
                error!("Merge failed: {e}");
                println!("❌ {name} merge failed: {e}");
            }
        }
    }
    total_added
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::from_env();
    let store = UpdateStore::new(&config.updates_path);

    match cli.command {
        Commands::Run { sources } => {
            let source_names: Vec<String> = match sources {
                Some(list) => list.split(',').map(|s| s.trim().to_string()).collect(),
                None => constants::get_supported_sources()
                    .into_iter()
                    .map(String::from)
                    .collect(),
            };

            println!("🔄 Running {} source(s)...", source_names.len());
            let added = run_sources(&source_names, &config, &store).await;
            println!("\n📊 Total records added: {added}");
        }
        Commands::Cleanup => {
            println!("🧹 Cleaning update store...");
            match store.cleanup() {
                Ok((cleaned, removed)) => {
                    println!("✅ {cleaned} descriptions cleaned, {removed} duplicates removed");
                }
                Err(e) => {
                    error!("Cleanup failed: {e}");
                    println!("❌ Cleanup failed: {e}");
                }
            }
        }
    }
}
