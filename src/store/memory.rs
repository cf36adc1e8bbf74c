use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::entity::{Entity, Kind};
use super::{EntityStore, ScanPage, StoreError};

/// In-memory `EntityStore` backend. Records are kept per kind in id order,
/// which doubles as insertion order because ids come from one monotonic
/// counter. Suitable as the test double and as a standalone single-process
/// deployment; a hosted document-store client implements the same trait.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

struct Inner {
    next_id: i64,
    tables: HashMap<Kind, BTreeMap<i64, Entity>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner { next_id: 1000, tables: HashMap::new() }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Cursors are opaque to callers: hex over `"{kind}:{last_id}"`. A token for
/// the wrong kind or with a mangled payload is rejected; a token naming a
/// since-deleted id still resumes after its position in the scan order.
fn encode_cursor(kind: Kind, last_id: i64) -> String {
    hex::encode(format!("{}:{}", kind.as_str(), last_id))
}

fn decode_cursor(kind: Kind, token: &str) -> Result<i64, StoreError> {
    let invalid = || StoreError::InvalidCursor(token.to_string());
    let bytes = hex::decode(token).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    let (kind_name, id) = text.split_once(':').ok_or_else(invalid)?;
    if Kind::parse(kind_name) != Some(kind) {
        return Err(invalid());
    }
    id.parse::<i64>().map_err(|_| invalid())
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn insert(&self, kind: Kind, attributes: Map<String, Value>) -> Result<Entity, StoreError> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let entity = Entity {
            kind,
            id: inner.next_id,
            attributes,
            references: BTreeMap::new(),
            version: 1,
        };
        inner.tables.entry(kind).or_default().insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn get(&self, kind: Kind, id: i64) -> Result<Option<Entity>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.tables.get(&kind).and_then(|table| table.get(&id)).cloned())
    }

    async fn put(&self, entity: Entity, expected_version: Option<u64>) -> Result<Entity, StoreError> {
        let mut inner = self.lock()?;
        let table = inner.tables.entry(entity.kind).or_default();
        let current = table.get(&entity.id).ok_or(StoreError::NotFound)?;
        if let Some(expected) = expected_version {
            if current.version != expected {
                return Err(StoreError::Conflict);
            }
        }
        let stored = Entity { version: current.version + 1, ..entity };
        table.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, kind: Kind, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        Ok(inner
            .tables
            .get_mut(&kind)
            .map(|table| table.remove(&id).is_some())
            .unwrap_or(false))
    }

    async fn scan(&self, kind: Kind, limit: usize, cursor: Option<&str>) -> Result<ScanPage, StoreError> {
        let after = match cursor {
            Some(token) => Some(decode_cursor(kind, token)?),
            None => None,
        };

        let inner = self.lock()?;
        let Some(table) = inner.tables.get(&kind) else {
            return Ok(ScanPage { entities: Vec::new(), next_cursor: None });
        };

        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        let mut iter = table.range((lower, Bound::Unbounded));
        let entities: Vec<Entity> = iter.by_ref().take(limit).map(|(_, e)| e.clone()).collect();
        let next_cursor = if iter.next().is_some() {
            entities.last().map(|last| encode_cursor(kind, last.id))
        } else {
            None
        };

        Ok(ScanPage { entities, next_cursor })
    }

    async fn count(&self, kind: Kind) -> Result<usize, StoreError> {
        let inner = self.lock()?;
        Ok(inner.tables.get(&kind).map(BTreeMap::len).unwrap_or(0))
    }

    async fn health(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(name: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_string(), json!(name));
        map
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids_across_kinds() {
        let store = MemoryStore::new();
        let a = store.insert(Kind::Client, attrs("a")).await.unwrap();
        let b = store.insert(Kind::Program, attrs("b")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = MemoryStore::new();
        let a = store.insert(Kind::Client, attrs("a")).await.unwrap();
        assert!(store.delete(Kind::Client, a.id).await.unwrap());
        let b = store.insert(Kind::Client, attrs("b")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn put_requires_existing_record() {
        let store = MemoryStore::new();
        let mut entity = store.insert(Kind::User, attrs("u")).await.unwrap();
        entity.id += 999;
        let err = store.put(entity, None).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn conditional_put_detects_stale_version() {
        let store = MemoryStore::new();
        let entity = store.insert(Kind::User, attrs("u")).await.unwrap();

        // First writer wins, second is stale.
        store.put(entity.clone(), Some(entity.version)).await.unwrap();
        let err = store.put(entity.clone(), Some(entity.version)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));

        // Unconditional put still succeeds (last write wins).
        store.put(entity, None).await.unwrap();
    }

    #[tokio::test]
    async fn scan_pages_through_all_records_once() {
        let store = MemoryStore::new();
        for i in 0..7 {
            store.insert(Kind::Program, attrs(&format!("p{i}"))).await.unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = store.scan(Kind::Program, 3, cursor.as_deref()).await.unwrap();
            assert!(page.entities.len() <= 3);
            seen.extend(page.entities.iter().map(|e| e.id));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(seen.len(), 7);
        seen.dedup();
        assert_eq!(seen.len(), 7);
    }

    #[tokio::test]
    async fn exact_final_page_omits_next_cursor() {
        let store = MemoryStore::new();
        for i in 0..4 {
            store.insert(Kind::Client, attrs(&format!("c{i}"))).await.unwrap();
        }
        let page = store.scan(Kind::Client, 4, None).await.unwrap();
        assert_eq!(page.entities.len(), 4);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn cursor_naming_deleted_record_resumes_past_it() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(store.insert(Kind::Client, attrs(&format!("c{i}"))).await.unwrap().id);
        }
        let page = store.scan(Kind::Client, 2, None).await.unwrap();
        let cursor = page.next_cursor.unwrap();

        // Delete the record the cursor points at, then resume.
        assert!(store.delete(Kind::Client, ids[1]).await.unwrap());
        let page = store.scan(Kind::Client, 2, Some(&cursor)).await.unwrap();
        assert_eq!(page.entities[0].id, ids[2]);
    }

    #[tokio::test]
    async fn malformed_and_wrong_kind_cursors_are_rejected() {
        let store = MemoryStore::new();
        store.insert(Kind::Client, attrs("c")).await.unwrap();

        let err = store.scan(Kind::Client, 5, Some("not-hex!")).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidCursor(_)));

        let foreign = encode_cursor(Kind::Program, 1);
        let err = store.scan(Kind::Client, 5, Some(&foreign)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidCursor(_)));
    }

    #[tokio::test]
    async fn count_tracks_inserts_and_deletes() {
        let store = MemoryStore::new();
        assert_eq!(store.count(Kind::User).await.unwrap(), 0);
        let a = store.insert(Kind::User, attrs("a")).await.unwrap();
        store.insert(Kind::User, attrs("b")).await.unwrap();
        assert_eq!(store.count(Kind::User).await.unwrap(), 2);
        store.delete(Kind::User, a.id).await.unwrap();
        assert_eq!(store.count(Kind::User).await.unwrap(), 1);
    }
}
