use crate::store::{EntityStore, Kind, RefEntry, StoreError};

/// Bounded retries for the read-modify-write cycle before surfacing Conflict.
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Maintains embedded reference lists between two entity kinds. The same
/// component serves both relations in the system — a Client's `programs` list
/// and a User's `clients` list — parameterized by owner kind and relation
/// name rather than duplicated per pair.
///
/// Callers are responsible for validating that the referenced entity exists
/// before calling `link`; the maintainer only touches the owner record.
/// Each mutation is a conditional put keyed on the version read at load, so
/// two concurrent writers to the same owner cannot silently drop each
/// other's entries; the loser retries against the fresh list.
pub struct RelationshipMaintainer<'a> {
    store: &'a dyn EntityStore,
}

impl<'a> RelationshipMaintainer<'a> {
    pub fn new(store: &'a dyn EntityStore) -> Self {
        Self { store }
    }

    /// Append `entry` to the owner's reference list, initializing the list if
    /// absent. Fails `NotFound` when the owner does not exist. Duplicate
    /// entries are appended as-is.
    pub async fn link(
        &self,
        owner_kind: Kind,
        owner_id: i64,
        relation: &str,
        entry: RefEntry,
    ) -> Result<(), StoreError> {
        for attempt in 0.. {
            let mut owner = self
                .store
                .get(owner_kind, owner_id)
                .await?
                .ok_or(StoreError::NotFound)?;
            let version = owner.version;
            owner
                .references
                .entry(relation.to_string())
                .or_default()
                .push(entry.clone());

            match self.store.put(owner, Some(version)).await {
                Ok(_) => return Ok(()),
                Err(StoreError::Conflict) if attempt + 1 < MAX_WRITE_ATTEMPTS => {
                    tracing::debug!(
                        kind = %owner_kind,
                        owner_id,
                        relation,
                        "link lost a write race, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        unreachable!("link retry loop always returns");
    }

    /// Rebuild the owner's reference list without any entry matching
    /// `referenced_id`. An absent list or absent id is a successful no-op.
    pub async fn unlink(
        &self,
        owner_kind: Kind,
        owner_id: i64,
        relation: &str,
        referenced_id: i64,
    ) -> Result<(), StoreError> {
        for attempt in 0.. {
            let mut owner = self
                .store
                .get(owner_kind, owner_id)
                .await?
                .ok_or(StoreError::NotFound)?;
            let version = owner.version;

            let Some(list) = owner.references.get_mut(relation) else {
                return Ok(());
            };
            if !list.iter().any(|entry| entry.id == referenced_id) {
                return Ok(());
            }
            list.retain(|entry| entry.id != referenced_id);

            match self.store.put(owner, Some(version)).await {
                Ok(_) => return Ok(()),
                Err(StoreError::Conflict) if attempt + 1 < MAX_WRITE_ATTEMPTS => {
                    tracing::debug!(
                        kind = %owner_kind,
                        owner_id,
                        relation,
                        "unlink lost a write race, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        unreachable!("unlink retry loop always returns");
    }
}
