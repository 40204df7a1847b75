//! The per-location batching state machine.
//!
//! Each location owns a slot with at most one current batch (open or in
//! flight) plus a pending list for tickets that arrive while a batch is in
//! flight. The slot map mutex is held only across lookup/insert and the
//! slot mutex only across state transitions — never across the upstream
//! fan-out or ticket delivery.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{CoalesceError, CoalesceResult};

/// Aggregated readings from both upstream providers, shared by every
/// ticket in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// The location the readings were fetched for.
    pub location: String,
    /// Temperature reported by the first provider, °C.
    pub service_a_temp: f64,
    /// Temperature reported by the second provider, °C.
    pub service_b_temp: f64,
    /// Arithmetic mean of the two readings, °C.
    pub average_temp: f64,
}

/// One upstream fan-out on behalf of a frozen batch.
///
/// `request_count` is the number of tickets frozen into the batch;
/// implementations persist it alongside the readings.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, location: &str, request_count: usize) -> CoalesceResult<Aggregate>;
}

/// A single `get` call waiting for its batch to complete.
struct Ticket {
    tx: oneshot::Sender<CoalesceResult<Aggregate>>,
}

/// Batch phase of a location slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No batch exists for the location.
    Idle,
    /// A batch is accepting tickets; its wait timer is armed.
    Open,
    /// A frozen batch is awaiting its fan-out result.
    InFlight,
}

/// Per-location batching state. All fields are guarded by the slot mutex.
struct LocationState {
    phase: Phase,
    /// Tickets of the open batch. Empty unless `phase == Open`.
    open: Vec<Ticket>,
    /// Generation of the open batch. Timers fire against a generation and
    /// exit as no-ops when it no longer matches.
    open_generation: u64,
    /// Wait timer for the open batch — or for the pending batch while a
    /// batch is in flight. At most one timer exists per slot.
    timer: Option<JoinHandle<()>>,
    /// Tickets that arrived while a batch was in flight; they form the
    /// next batch.
    pending: Vec<Ticket>,
    /// Generation pre-assigned to the pending batch.
    pending_generation: u64,
    /// The pending batch's wait window closed before promotion.
    pending_elapsed: bool,
    /// Generation counter for this slot.
    next_generation: u64,
}

impl LocationState {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            open: Vec::new(),
            open_generation: 0,
            timer: None,
            pending: Vec::new(),
            pending_generation: 0,
            pending_elapsed: false,
            next_generation: 0,
        }
    }

    fn fresh_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Freeze the open batch: cancel its wait timer, snapshot the tickets
    /// and transition to in flight. The snapshot length is the batch's
    /// pinned request count.
    fn freeze(&mut self) -> Vec<Ticket> {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.phase = Phase::InFlight;
        std::mem::take(&mut self.open)
    }
}

type Slot = Arc<Mutex<LocationState>>;

/// Groups concurrent same-location requests into batches that share one
/// upstream fan-out.
///
/// Cheap to clone; clones share the location map.
#[derive(Clone)]
pub struct Coalescer {
    inner: Arc<Inner>,
}

struct Inner {
    fetcher: Arc<dyn Fetch>,
    /// Location → slot. Held only across lookup/insert.
    slots: Mutex<HashMap<String, Slot>>,
    max_requests: usize,
    wait: Duration,
}

impl Coalescer {
    /// Create a coalescer over the given fan-out implementation.
    ///
    /// A batch freezes once it holds `max_requests` tickets (clamped to at
    /// least 1) or once `wait` has elapsed since it opened.
    pub fn new(fetcher: Arc<dyn Fetch>, max_requests: usize, wait: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                slots: Mutex::new(HashMap::new()),
                max_requests: max_requests.max(1),
                wait,
            }),
        }
    }

    /// Fetch the aggregated temperature for `location`, coalescing with
    /// concurrent callers.
    ///
    /// Suspends until the ticket's batch completes. Every ticket in a
    /// batch observes the same readings or the same error.
    pub async fn get(&self, location: &str) -> CoalesceResult<Aggregate> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(location, Ticket { tx }).await;
        match rx.await {
            Ok(result) => result,
            Err(_) => {
                // A batch task died without delivering. Invariant
                // violation, not an expected runtime condition.
                error!(%location, "batch task dropped ticket without delivery");
                Err(CoalesceError::Dropped)
            }
        }
    }

    /// Look up or create the slot for a location. Concurrent callers for
    /// the same location always observe the same slot.
    async fn slot(&self, location: &str) -> Slot {
        let mut slots = self.inner.slots.lock().await;
        slots
            .entry(location.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(LocationState::new())))
            .clone()
    }

    /// Place a ticket into the location's open or pending batch, firing
    /// the size trigger when the open batch fills.
    async fn enqueue(&self, location: &str, ticket: Ticket) {
        let slot = self.slot(location).await;
        let frozen = {
            let mut state = slot.lock().await;
            match state.phase {
                Phase::Idle => {
                    let generation = state.fresh_generation();
                    state.phase = Phase::Open;
                    state.open_generation = generation;
                    state.open.push(ticket);
                    state.timer = Some(self.arm_timer(location, slot.clone(), generation));
                    debug!(%location, generation, "batch opened");
                }
                Phase::Open => {
                    state.open.push(ticket);
                }
                Phase::InFlight => {
                    // The pending batch's wait window starts at its first
                    // ticket; later arrivals never re-arm the timer.
                    let first_pending = state.pending.is_empty();
                    state.pending.push(ticket);
                    if first_pending {
                        let generation = state.fresh_generation();
                        state.pending_generation = generation;
                        state.pending_elapsed = false;
                        state.timer = Some(self.arm_timer(location, slot.clone(), generation));
                        debug!(%location, generation, "next batch queued behind in-flight batch");
                    }
                }
            }
            if state.phase == Phase::Open && state.open.len() >= self.inner.max_requests {
                info!(%location, request_count = state.open.len(), "batch reached size limit");
                Some(state.freeze())
            } else {
                None
            }
        };
        if let Some(tickets) = frozen {
            self.dispatch(location.to_string(), slot, tickets);
        }
    }

    /// Arm the wait timer for batch generation `generation`.
    fn arm_timer(&self, location: &str, slot: Slot, generation: u64) -> JoinHandle<()> {
        let coalescer = self.clone();
        let location = location.to_string();
        let wait = self.inner.wait;
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            coalescer.on_timer(&location, &slot, generation).await;
        })
    }

    /// Timer callback. Freezes the matching open batch; marks a matching
    /// pending batch as due; anything else is a stale fire and a no-op.
    async fn on_timer(&self, location: &str, slot: &Slot, generation: u64) {
        let frozen = {
            let mut state = slot.lock().await;
            if state.phase == Phase::Open && state.open_generation == generation {
                debug!(%location, generation, request_count = state.open.len(), "wait timer elapsed");
                // This task is the timer; it has fired, so drop the handle
                // rather than aborting ourselves.
                state.timer = None;
                Some(state.freeze())
            } else if state.phase == Phase::InFlight
                && state.pending_generation == generation
                && !state.pending.is_empty()
            {
                // The next batch's window closed while the current batch
                // is still in flight; promote it the moment that completes.
                state.pending_elapsed = true;
                state.timer = None;
                None
            } else {
                // Stale: the size trigger beat this timer.
                None
            }
        };
        if let Some(tickets) = frozen {
            self.dispatch(location.to_string(), slot.clone(), tickets);
        }
    }

    /// Run a frozen batch in its own task.
    fn dispatch(&self, location: String, slot: Slot, tickets: Vec<Ticket>) {
        let coalescer = self.clone();
        tokio::spawn(async move {
            coalescer.run_batch(location, slot, tickets).await;
        });
    }

    /// Process a frozen batch: one fan-out, delivery to every ticket, then
    /// the pending → current hand-off. A promoted batch that is already
    /// due (full, or past its wait window) runs in this same task, which
    /// orders batch N's delivery before batch N+1's fan-out.
    async fn run_batch(&self, location: String, slot: Slot, mut tickets: Vec<Ticket>) {
        loop {
            let request_count = tickets.len();
            let result = self.inner.fetcher.fetch(&location, request_count).await;
            match &result {
                Ok(aggregate) => info!(
                    %location,
                    request_count,
                    temperature = aggregate.average_temp,
                    "batch completed"
                ),
                Err(e) => warn!(%location, request_count, error = %e, "batch failed"),
            }

            // Delivery happens without the slot lock. Receivers that gave
            // up (dropped connections) are ignored.
            for ticket in tickets.drain(..) {
                let _ = ticket.tx.send(result.clone());
            }

            let mut state = slot.lock().await;
            if state.pending.is_empty() {
                state.phase = Phase::Idle;
                return;
            }
            let promoted = std::mem::take(&mut state.pending);
            let generation = state.pending_generation;
            let elapsed = state.pending_elapsed;
            state.pending_elapsed = false;

            if promoted.len() >= self.inner.max_requests || elapsed {
                // Already due: freeze on the spot and keep processing in
                // this task.
                if let Some(timer) = state.timer.take() {
                    timer.abort();
                }
                debug!(
                    %location,
                    generation,
                    request_count = promoted.len(),
                    "pending batch promoted in flight"
                );
                drop(state);
                tickets = promoted;
                continue;
            }

            // Not due yet: it becomes the open batch, and the wait timer
            // armed when its first ticket arrived keeps governing it.
            state.phase = Phase::Open;
            state.open = promoted;
            state.open_generation = generation;
            debug!(
                %location,
                generation,
                request_count = state.open.len(),
                "pending batch promoted open"
            );
            return;
        }
    }
}
