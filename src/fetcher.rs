use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::quote::{QuoteError, QuoteSource};

pub type FetchResult = Result<String, QuoteError>;

/// Runs quote fetches off the UI thread, one at a time.
///
/// While a fetch is outstanding further requests are refused; there is no
/// queue and no cancellation. Dropping the fetcher discards whatever the
/// worker eventually sends.
#[derive(Debug)]
pub struct QuoteFetcher {
    source: Arc<dyn QuoteSource>,
    pending: Option<Receiver<FetchResult>>,
}

impl QuoteFetcher {
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        Self {
            source,
            pending: None,
        }
    }

    /// Start a fetch. Returns false, doing nothing, if one is already in
    /// flight.
    pub fn request(&mut self) -> bool {
        if self.pending.is_some() {
            debug!("quote fetch already in flight");
            return false;
        }

        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.source);
        info!(source = source.name(), "fetching quote");
        thread::spawn(move || {
            // the receiver may be gone if the app shut down meanwhile
            let _ = tx.send(source.fetch_quote());
        });

        self.pending = Some(rx);
        true
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Non-blocking check for a finished fetch. Each result is handed out
    /// once, after which the fetcher accepts requests again.
    pub fn poll(&mut self) -> Option<FetchResult> {
        let outcome = match self.pending.as_ref()?.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(QuoteError::Disconnected),
        };
        self.pending = None;
        Some(outcome)
    }

    /// Like [`poll`](Self::poll) but blocks for up to `timeout`.
    pub fn wait(&mut self, timeout: Duration) -> Option<FetchResult> {
        let outcome = match self.pending.as_ref()?.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => Err(QuoteError::Disconnected),
        };
        self.pending = None;
        Some(outcome)
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }
}
