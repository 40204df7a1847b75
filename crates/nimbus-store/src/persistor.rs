//! Fire-and-forget persistence of aggregation records.
//!
//! Detaching the insert from the response path keeps client latency
//! insensitive to storage stalls; a lost write is logged and tolerated.

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::store::{NewWeatherQuery, QueryStore};

/// Submission handle. Never blocks the caller and never reports an error
/// back to it.
#[derive(Clone)]
pub struct Persistor {
    tx: mpsc::UnboundedSender<NewWeatherQuery>,
}

impl Persistor {
    /// Create a persistor and the writer that drains it. The writer must
    /// be driven via [`PersistWriter::run`].
    pub fn new(store: QueryStore) -> (Self, PersistWriter) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, PersistWriter { store, rx })
    }

    /// Queue a record for persistence.
    pub fn submit(&self, record: NewWeatherQuery) {
        if self.tx.send(record).is_err() {
            warn!("persist writer is gone; aggregation record dropped");
        }
    }
}

/// Background task that writes queued records to the store.
pub struct PersistWriter {
    store: QueryStore,
    rx: mpsc::UnboundedReceiver<NewWeatherQuery>,
}

impl PersistWriter {
    /// Run until the shutdown signal, then drain whatever is already
    /// queued before exiting.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("persist writer started");
        loop {
            tokio::select! {
                record = self.rx.recv() => match record {
                    Some(record) => self.write(record).await,
                    None => break,
                },
                _ = shutdown.changed() => {
                    while let Ok(record) = self.rx.try_recv() {
                        self.write(record).await;
                    }
                    break;
                }
            }
        }
        info!("persist writer stopped");
    }

    async fn write(&self, record: NewWeatherQuery) {
        match self.store.insert_query(&record).await {
            Ok(id) => debug!(
                id,
                location = %record.location,
                request_count = record.request_count,
                "aggregation record persisted"
            ),
            Err(e) => error!(
                error = %e,
                location = %record.location,
                "failed to persist aggregation record"
            ),
        }
    }
}
