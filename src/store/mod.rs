use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod entity;
pub mod memory;

pub use entity::{Entity, Kind, RefEntry};
pub use memory::MemoryStore;

/// Store-layer failures. `NotFound` and `Unavailable` are deliberately
/// distinct so a backend outage never reads as a missing record.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity not found")]
    NotFound,
    #[error("write conflict: record changed since read")]
    Conflict,
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One page of a cursor-based scan.
#[derive(Debug, Clone)]
pub struct ScanPage {
    pub entities: Vec<Entity>,
    /// Present when more records remain past this page.
    pub next_cursor: Option<String>,
}

/// Uniform get/put/delete/query operations against keyed records of a named
/// kind. Everything above this trait is backend-agnostic; handlers receive it
/// as an injected dependency so tests can substitute an in-memory fake.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Insert a new record, assigning a fresh id. Ids are never reused.
    async fn insert(&self, kind: Kind, attributes: Map<String, Value>) -> Result<Entity, StoreError>;

    async fn get(&self, kind: Kind, id: i64) -> Result<Option<Entity>, StoreError>;

    /// Full replace of an existing record. When `expected_version` is given
    /// the write fails with `Conflict` unless the stored version matches.
    async fn put(&self, entity: Entity, expected_version: Option<u64>) -> Result<Entity, StoreError>;

    /// Remove a record. Returns whether it existed.
    async fn delete(&self, kind: Kind, id: i64) -> Result<bool, StoreError>;

    /// Paged scan in insertion order. `cursor` must be a token previously
    /// returned in `ScanPage::next_cursor` for the same kind.
    async fn scan(&self, kind: Kind, limit: usize, cursor: Option<&str>) -> Result<ScanPage, StoreError>;

    /// Unbounded count of all records of a kind. O(total records).
    async fn count(&self, kind: Kind) -> Result<usize, StoreError>;

    /// Backend liveness probe.
    async fn health(&self) -> Result<(), StoreError>;
}
