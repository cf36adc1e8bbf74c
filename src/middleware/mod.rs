pub mod accept;
pub mod auth;

pub use accept::ensure_accepts_json;
pub use auth::{AuthPrincipal, MaybePrincipal};
