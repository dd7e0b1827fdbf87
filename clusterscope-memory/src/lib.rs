//! # clusterscope memory — the live and historical view of the cluster
//!
//! Four cooperating pieces:
//! - **World Model** — authoritative current-state cache with kind and
//!   namespace indexes, O(1) lookup by `(kind, namespace, name)`.
//! - **Temporal Store** — ring buffer of timestamped snapshots plus a
//!   bounded change log; answers point-in-time and diff queries.
//! - **Synchronizer** — pulls inventories through a `ResourceFetcher` and
//!   keeps both stores aligned.
//! - **Query API** — derived queries over the world model plus a
//!   low-latency recent-change feed.

pub mod query;
pub mod synchronizer;
pub mod temporal;
pub mod world_model;

pub use query::QueryApi;
pub use synchronizer::Synchronizer;
pub use temporal::{TemporalStore, TimePoint};
pub use world_model::WorldModel;
