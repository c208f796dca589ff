use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cgisf_lib::cgisf;
use include_dir::{include_dir, Dir};
use itertools::Itertools;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::{Settings, SourceKind};

static QUOTES_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/quotes");

/// Name of the collection compiled into the binary.
pub const DEFAULT_COLLECTION: &str = "english";

/// Why a new target text could not be produced.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("failed to read quotes from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse quotes in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no quotes available in {0}")]
    NoQuotes(String),
    #[error("quote source produced empty text")]
    Empty,
    #[error("quote worker stopped before delivering a quote")]
    Disconnected,
}

/// Supplies target texts on demand. Implementations may block, they are
/// only ever called off the UI thread.
pub trait QuoteSource: Send + Sync + fmt::Debug {
    fn fetch_quote(&self) -> Result<String, QuoteError>;

    fn name(&self) -> &str;
}

#[derive(Deserialize, Clone, Debug)]
pub struct QuoteCollection {
    pub name: String,
    pub quotes: Vec<String>,
}

/// Trim and collapse every whitespace run (newlines included) to a single
/// space, so a quote is always one typeable line.
pub fn normalize(text: &str) -> Result<String, QuoteError> {
    let normalized = text.split_whitespace().join(" ");
    if normalized.is_empty() {
        Err(QuoteError::Empty)
    } else {
        Ok(normalized)
    }
}

/// Random index in `0..len` that differs from `last` whenever there is a
/// choice.
pub fn pick_index<R: Rng + ?Sized>(rng: &mut R, len: usize, last: Option<usize>) -> usize {
    if len <= 1 {
        return 0;
    }
    match last {
        Some(prev) if prev < len => {
            let idx = rng.gen_range(0..len - 1);
            if idx >= prev {
                idx + 1
            } else {
                idx
            }
        }
        _ => rng.gen_range(0..len),
    }
}

/// Picks from `quotes`, remembering the pick in `last`.
fn pick_quote(quotes: &[String], last: &Mutex<Option<usize>>, name: &str) -> Result<String, QuoteError> {
    if quotes.is_empty() {
        return Err(QuoteError::NoQuotes(name.to_string()));
    }
    let mut last = last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let idx = pick_index(&mut rand::thread_rng(), quotes.len(), *last);
    *last = Some(idx);
    debug!(source = name, idx, "picked quote");
    normalize(&quotes[idx])
}

/// Quotes compiled into the binary.
#[derive(Debug)]
pub struct BundledQuotes {
    collection: QuoteCollection,
    last: Mutex<Option<usize>>,
}

impl BundledQuotes {
    pub fn load(name: &str) -> Result<Self, QuoteError> {
        let file = QUOTES_DIR
            .get_file(format!("{name}.json"))
            .ok_or_else(|| QuoteError::NoQuotes(name.to_string()))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| QuoteError::NoQuotes(name.to_string()))?;
        let collection: QuoteCollection =
            serde_json::from_str(contents).map_err(|source| QuoteError::Parse {
                path: file.path().to_path_buf(),
                source,
            })?;

        Ok(Self {
            collection,
            last: Mutex::new(None),
        })
    }

    pub fn quotes(&self) -> &[String] {
        &self.collection.quotes
    }
}

impl QuoteSource for BundledQuotes {
    fn fetch_quote(&self) -> Result<String, QuoteError> {
        pick_quote(&self.collection.quotes, &self.last, &self.collection.name)
    }

    fn name(&self) -> &str {
        &self.collection.name
    }
}

/// Quotes read from a file on every fetch, so edits show up without a
/// restart. `.json` files hold a [`QuoteCollection`]; anything else is one
/// quote per non-blank line.
#[derive(Debug)]
pub struct FileQuotes {
    path: PathBuf,
    label: String,
    last: Mutex<Option<usize>>,
}

impl FileQuotes {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            label: path.display().to_string(),
            path,
            last: Mutex::new(None),
        }
    }

    fn read_quotes(&self) -> Result<Vec<String>, QuoteError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| QuoteError::Io {
            path: self.path.clone(),
            source,
        })?;

        let is_json = self
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            let collection: QuoteCollection =
                serde_json::from_str(&contents).map_err(|source| QuoteError::Parse {
                    path: self.path.clone(),
                    source,
                })?;
            Ok(collection.quotes)
        } else {
            Ok(contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect())
        }
    }
}

impl QuoteSource for FileQuotes {
    fn fetch_quote(&self) -> Result<String, QuoteError> {
        let quotes = self.read_quotes()?;
        pick_quote(&quotes, &self.last, &self.label)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Randomly generated sentences.
#[derive(Debug, Clone)]
pub struct SentenceQuotes {
    count: usize,
}

impl SentenceQuotes {
    pub fn new(count: usize) -> Self {
        Self {
            count: count.max(1),
        }
    }
}

impl QuoteSource for SentenceQuotes {
    fn fetch_quote(&self) -> Result<String, QuoteError> {
        let rng = &mut rand::thread_rng();
        let sentences = (0..self.count)
            .map(|_| {
                cgisf(
                    rng.gen_range(1..3),
                    rng.gen_range(1..3),
                    rng.gen_range(1..5),
                    rng.gen_bool(0.5),
                    rng.gen_range(1..3),
                    rng.gen_bool(0.5),
                )
            })
            .join(" ");
        normalize(&sentences)
    }

    fn name(&self) -> &str {
        "sentences"
    }
}

/// Always the same text.
#[derive(Debug, Clone)]
pub struct FixedQuote {
    text: String,
}

impl FixedQuote {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl QuoteSource for FixedQuote {
    fn fetch_quote(&self) -> Result<String, QuoteError> {
        normalize(&self.text)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Build the quote source selected by `settings`.
pub fn source_for(settings: &Settings) -> Result<Arc<dyn QuoteSource>, QuoteError> {
    let source: Arc<dyn QuoteSource> = match settings.source {
        SourceKind::Bundled => Arc::new(BundledQuotes::load(DEFAULT_COLLECTION)?),
        SourceKind::File => match settings.quotes_file {
            Some(ref path) => Arc::new(FileQuotes::new(path)),
            None => return Err(QuoteError::NoQuotes("no quotes file configured".to_string())),
        },
        SourceKind::Sentences => Arc::new(SentenceQuotes::new(settings.sentences)),
        SourceKind::Fixed => Arc::new(FixedQuote::new(settings.initial_target.clone())),
    };
    debug!(source = source.name(), "quote source ready");
    Ok(source)
}
