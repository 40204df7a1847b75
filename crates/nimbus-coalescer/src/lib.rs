//! nimbus-coalescer — per-location request batching for nimbus.
//!
//! Concurrent temperature requests for the same location are grouped into
//! batches so that each batch performs exactly one upstream fan-out. A
//! batch fires when it fills up or when its wait timer elapses, whichever
//! comes first, and every request in it receives the same result.
//!
//! # Architecture
//!
//! ```text
//! Coalescer::get(location)
//!   ├── ticket enqueued into the location's open batch
//!   │     ├── size trigger  → freeze + fan-out
//!   │     └── wait timer    → freeze + fan-out
//!   ├── batch in flight     → later tickets accumulate as the next batch
//!   └── delivery            → one cloned result to every ticket
//! ```
//!
//! The upstream fan-out itself is behind the [`Fetch`] seam; the daemon
//! plugs in the real two-provider fan-out, tests plug in stubs.

pub mod coalescer;
pub mod error;

pub use coalescer::{Aggregate, Coalescer, Fetch};
pub use error::{CoalesceError, CoalesceResult};
