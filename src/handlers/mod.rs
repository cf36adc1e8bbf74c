use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::store::entity::EMAIL_FIELD;
use crate::store::{Entity, EntityStore, Kind, StoreError};

pub mod clients;
pub mod programs;
pub mod users;

/// Page size used for internal lookup scans (not client-facing listings).
const LOOKUP_SCAN_LIMIT: usize = 50;

/// Parse a path id. Non-numeric ids are rejected before any store access.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::bad_request(format!("invalid {} id '{}'", what, raw)))
}

/// Validate a request body against an operation's input schema. Missing or
/// mistyped fields fail before any store access.
pub(crate) fn parse_body<T: DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload)
        .map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e)))
}

/// Locate the User record whose email matches a principal identity. The
/// store has no secondary index, so this walks the kind page by page.
pub(crate) async fn find_user_by_email(
    store: &dyn EntityStore,
    email: &str,
) -> Result<Option<Entity>, StoreError> {
    let mut cursor: Option<String> = None;
    loop {
        let page = store.scan(Kind::User, LOOKUP_SCAN_LIMIT, cursor.as_deref()).await?;
        if let Some(user) = page
            .entities
            .into_iter()
            .find(|entity| entity.attr_str(EMAIL_FIELD) == Some(email))
        {
            return Ok(Some(user));
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(None),
        }
    }
}
