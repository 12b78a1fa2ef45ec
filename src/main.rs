mod discover;
mod error;
mod fetcher;
mod normalize;
mod output;
mod parser;
mod pipeline;
mod reference;
mod settings;
mod translate;

use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::info;

use pipeline::Pipeline;
use reference::ReferenceTables;
use settings::Settings;

#[derive(Parser)]
#[command(name = "d4_builds", about = "Sync maxroll Diablo 4 build guides into Companion presets")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, normalize, translate and write every manifest entry (default)
    Run,
    /// Find the top endgame guide per class on the listing pages
    Discover {
        /// Replace the manifest file with the discovered guides
        #[arg(long)]
        write: bool,
    },
    /// Rebuild the stat map from the Companion affix table
    RefreshStats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            // Reference data first: without it no entry can succeed.
            let manifest = reference::load_manifest(&settings.manifest_path)?;
            let tables = ReferenceTables::load(&settings)?;
            let source = fetcher::source_for(&settings)?;

            info!("Processing {} manifest entries", manifest.len());
            let pipeline = Pipeline {
                source: source.as_ref(),
                tables: &tables,
                wait: settings.render_wait(),
                builds_dir: &settings.builds_dir,
                translated_dir: &settings.translated_dir,
            };
            let report = pipeline.run(&manifest).await;
            report.print();
            Ok(())
        }
        Commands::Discover { write } => {
            let source = fetcher::source_for(&settings)?;
            let manifest = discover::discover_manifest(
                source.as_ref(),
                &settings.listing_url,
                &settings.render_wait(),
            )
            .await;
            if manifest.is_empty() {
                println!("No guides discovered.");
                return Ok(());
            }
            for (class, url) in &manifest {
                println!("{:<14} {}", class, url);
            }
            if write {
                let merged = discover::merge_manifest(&settings.manifest_path, &manifest)?;
                output::write_json(&settings.manifest_path, &merged)?;
                println!("Wrote {} entries to {:?}", merged.len(), settings.manifest_path);
            }
            Ok(())
        }
        Commands::RefreshStats => {
            let count = reference::refresh_stat_map(&settings).await?;
            println!("Stat map now has {} entries", count);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{:.1}s", d.as_secs_f64()),
        (0, _) => format!("{}m {}s", m, s),
        _ => format!("{}h {}m {}s", h, m, s),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn durations_pick_the_largest_unit() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3600 + 61)), "1h 1m 1s");
    }
}
