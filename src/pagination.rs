use crate::store::{Entity, EntityStore, Kind, StoreError};

/// One page of a listing: at most `page_size` entities, a resume token when
/// more remain, and (unless disabled) the total record count of the kind.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<Entity>,
    pub next_cursor: Option<String>,
    pub total_count: Option<usize>,
}

/// Cursor-based listing over a store kind.
///
/// The total count comes from a separate unbounded scan of the kind, so every
/// listing costs O(total records) on top of the page fetch. That trade-off is
/// inherited from the source design; deployments that need cheap listings set
/// `include_total_count = false` and the field is omitted entirely.
pub struct Paginator<'a> {
    store: &'a dyn EntityStore,
    page_size: usize,
    include_total_count: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(store: &'a dyn EntityStore, page_size: usize, include_total_count: bool) -> Self {
        Self { store, page_size, include_total_count }
    }

    /// Fetch one page. `cursor` must be a token previously returned in
    /// `Page::next_cursor` for the same kind; anything else fails with the
    /// store's `InvalidCursor`.
    pub async fn list(&self, kind: Kind, cursor: Option<&str>) -> Result<Page, StoreError> {
        let scan = self.store.scan(kind, self.page_size, cursor).await?;
        let total_count = if self.include_total_count {
            Some(self.store.count(kind).await?)
        } else {
            None
        };
        Ok(Page {
            items: scan.entities,
            next_cursor: scan.next_cursor,
            total_count,
        })
    }
}
