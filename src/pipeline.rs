use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::error::EntryError;
use crate::fetcher::{self, PageSource, RenderWait};
use crate::normalize;
use crate::output;
use crate::reference::{BuildManifestEntry, ReferenceTables};
use crate::translate;

/// Fetch → normalize → translate → write, one manifest entry at a time.
pub struct Pipeline<'a> {
    pub source: &'a dyn PageSource,
    pub tables: &'a ReferenceTables,
    pub wait: RenderWait,
    pub builds_dir: &'a Path,
    pub translated_dir: &'a Path,
}

pub struct EntryReport {
    pub class_name: String,
    pub outcome: Result<PathBuf, EntryError>,
}

pub struct RunReport {
    pub started: DateTime<Local>,
    pub elapsed: Duration,
    pub entries: Vec<EntryReport>,
}

impl<'a> Pipeline<'a> {
    /// Process every entry; a failure is recorded and the run moves on.
    pub async fn run(&self, manifest: &[BuildManifestEntry]) -> RunReport {
        let started = Local::now();
        let t0 = Instant::now();

        let pb = ProgressBar::new(manifest.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        let mut entries = Vec::with_capacity(manifest.len());
        for entry in manifest {
            pb.set_message(entry.class_name.clone());
            let outcome = self.process_entry(entry).await;
            match &outcome {
                Ok(path) => info!("{}: wrote {}", entry.class_name, path.display()),
                Err(e) => warn!("{} failed at {}: {}", entry.class_name, e.stage(), e),
            }
            entries.push(EntryReport {
                class_name: entry.class_name.clone(),
                outcome,
            });
            pb.inc(1);
        }
        pb.finish_and_clear();

        let report = RunReport {
            started,
            elapsed: t0.elapsed(),
            entries,
        };
        info!(
            "Run finished: {} ok, {} failed in {:.1}s",
            report.ok_count(),
            report.failed_count(),
            report.elapsed.as_secs_f64()
        );
        report
    }

    /// Nothing is written unless every stage succeeded for this entry.
    pub async fn process_entry(&self, entry: &BuildManifestEntry) -> Result<PathBuf, EntryError> {
        let raw = fetcher::fetch_build(self.source, entry, &self.wait).await?;
        let normalized = normalize::normalize(raw)?;
        let translated = translate::translate(&normalized, self.tables)?;
        let (_, translated_path) =
            output::save_build(self.builds_dir, self.translated_dir, &normalized, &translated)?;
        Ok(translated_path)
    }
}

impl RunReport {
    pub fn ok_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.len() - self.ok_count()
    }

    pub fn print(&self) {
        println!("Run started {}", self.started.format("%Y-%m-%d %H:%M:%S"));
        println!("{:>3} | {:<14} | {:<9} | {}", "#", "Class", "Result", "Detail");
        println!("{}", "-".repeat(80));

        for (i, e) in self.entries.iter().enumerate() {
            let (result, detail) = match &e.outcome {
                Ok(path) => ("ok".to_string(), path.display().to_string()),
                Err(err) => (err.stage().to_string(), err.to_string()),
            };
            println!(
                "{:>3} | {:<14} | {:<9} | {}",
                i + 1,
                truncate(&e.class_name, 14),
                result,
                truncate(&detail, 60)
            );
        }

        println!(
            "\n{} ok, {} failed ({} entries)",
            self.ok_count(),
            self.failed_count(),
            self.entries.len()
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

// ── Tests ──
