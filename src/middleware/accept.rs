use axum::http::{header, HeaderMap};

use crate::error::ApiError;

/// Reject requests whose Accept header cannot take `application/json`. An
/// absent header means "anything" and passes.
pub fn ensure_accepts_json(headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(accept) = headers.get(header::ACCEPT) else {
        return Ok(());
    };

    let value = accept
        .to_str()
        .map_err(|_| ApiError::not_acceptable("unreadable Accept header"))?;

    let acceptable = value.split(',').any(|part| {
        let media_type = part.split(';').next().unwrap_or("").trim();
        media_type == "*/*"
            || media_type.eq_ignore_ascii_case("application/json")
            || media_type.eq_ignore_ascii_case("application/*")
    });

    if acceptable {
        Ok(())
    } else {
        Err(ApiError::not_acceptable("this endpoint only serves application/json"))
    }
}
