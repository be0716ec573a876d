use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, error, info, warn};

use crate::content::index_document;
use crate::fs::documents;

pub mod content;
pub mod domain;
pub mod error;
pub mod fs;
pub mod index;
pub mod value;
pub mod watch;

pub use crate::domain::{ArticleRecord, Index, Series};
pub use crate::error::IndexError;
pub use crate::index::{render_index, write_index};
pub use crate::value::{FrontDate, FrontValue};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding the articles
    #[arg(short, long, default_value = "docs/articles")]
    pub articles_dir: PathBuf,

    /// Path of the JSON index to write
    #[arg(short, long, default_value = "docs/public/blog-index.json")]
    pub output: PathBuf,

    /// Extension of the documents to index
    #[arg(short, long, default_value = "md")]
    pub extension: String,

    /// Skip documents that fail to read or parse instead of aborting
    #[arg(short, long)]
    pub keep_going: bool,

    /// Rebuild the index whenever an article changes
    #[arg(short, long)]
    pub watch: bool,
}

/// What to do when a single document cannot be indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop at the first failure. Nothing is written.
    #[default]
    Abort,
    /// Record the failure and carry on with the next document.
    Skip,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub extension: String,
    pub policy: ErrorPolicy,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extension: "md".to_string(),
            policy: ErrorPolicy::Abort,
        }
    }
}

impl From<&Args> for ScanOptions {
    fn from(args: &Args) -> Self {
        Self {
            extension: args.extension.clone(),
            policy: if args.keep_going {
                ErrorPolicy::Skip
            } else {
                ErrorPolicy::Abort
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub index: Index,
    /// Documents found with the right extension.
    pub scanned: usize,
    /// Documents without (or with empty) frontmatter.
    pub skipped: usize,
    /// Per-document failures, only populated under [`ErrorPolicy::Skip`].
    pub failures: Vec<IndexError>,
}

/// Indexes every `.md` document under `root`, aborting on the first
/// unreadable or malformed document.
pub fn build_index(root: &Path) -> Result<Index, IndexError> {
    build_index_with(root, &ScanOptions::default()).map(|report| report.index)
}

pub fn build_index_with(root: &Path, options: &ScanOptions) -> Result<BuildReport, IndexError> {
    let mut report = BuildReport::default();

    for entry in documents(root, &options.extension) {
        let outcome = match entry {
            Ok(document) => {
                report.scanned += 1;
                index_document(root, &document, &options.extension)
            }
            Err(err) => Err(err.into()),
        };

        match outcome {
            Ok(Some(record)) => {
                debug!("Indexed {} as {}", record.title, record.path);
                report.index.push(record);
            }
            Ok(None) => report.skipped += 1,
            Err(err) if options.policy == ErrorPolicy::Skip => {
                warn!("Skipping: {}", err.chain());
                report.failures.push(err);
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        "Indexed {} of {} documents under {}",
        report.index.len(),
        report.scanned,
        root.display()
    );
    Ok(report)
}

/// Builds the index and writes it out once.
pub fn build_and_write(args: &Args) -> Result<BuildReport, IndexError> {
    let report = build_index_with(&args.articles_dir, &ScanOptions::from(args))?;
    if !report.failures.is_empty() {
        warn!(
            "{} document(s) could not be indexed and were left out",
            report.failures.len()
        );
    }
    write_index(&report.index, &args.output)?;
    Ok(report)
}

pub fn run(args: &Args) -> Result<(), IndexError> {
    if !args.watch {
        build_and_write(args)?;
        return Ok(());
    }

    if let Err(err) = build_and_write(args) {
        error!("Initial build failed: {}", err.chain());
    }
    watch::watch(args)
}
