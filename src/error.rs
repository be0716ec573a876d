use std::error::Error as _;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to walk articles directory")]
    Walk(#[from] walkdir::Error),
    #[error("Malformed frontmatter in {}", path.display())]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Frontmatter in {} is not a key-value mapping", path.display())]
    NotAMapping { path: PathBuf },
    #[error("Failed to serialize index")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Watcher error")]
    Watch(#[from] notify::Error),
}

impl IndexError {
    /// The message followed by every underlying cause, `: `-separated.
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut cause = self.source();
        while let Some(err) = cause {
            message.push_str(": ");
            message.push_str(&err.to_string());
            cause = err.source();
        }
        message
    }
}
