use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pagination: PaginationConfig,
    pub auth: AuthConfig,
    pub identity: IdentityConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Absolute base URL used for self/next links. When absent, links are
    /// derived from the request's Host header.
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Fixed page size for every resource kind; not client-configurable.
    pub page_size: usize,
    /// The total count is a full scan per listing. Turn off to skip the scan
    /// and omit `totalCount` from list responses.
    pub include_total_count: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token issuer, e.g. "https://tenant.auth0.example/". Trailing slash
    /// significant: tokens are matched against this exact value.
    pub issuer: String,
    /// JWKS document location. Defaults to `{issuer}.well-known/jwks.json`.
    pub jwks_uri: String,
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub client_id: String,
    pub client_secret: String,
    pub connection: String,
}

/// Surfaces the open product questions as deployment policy rather than
/// hard-coded answers: whether the program catalog is readable without a
/// token, and whether signup is open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub public_program_catalog: bool,
    pub public_signup: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::defaults().with_env_overrides()
    }

    fn defaults() -> Self {
        let issuer = String::new();
        Self {
            server: ServerConfig { port: 8080, public_base_url: None },
            pagination: PaginationConfig { page_size: 5, include_total_count: true },
            auth: AuthConfig {
                jwks_uri: derive_jwks_uri(&issuer),
                issuer,
                audience: None,
            },
            identity: IdentityConfig {
                client_id: String::new(),
                client_secret: String::new(),
                connection: "Username-Password-Authentication".to_string(),
            },
            policy: PolicyConfig { public_program_catalog: true, public_signup: true },
        }
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("CASEWORK_PUBLIC_BASE_URL") {
            self.server.public_base_url = Some(v);
        }

        // Pagination overrides
        if let Ok(v) = env::var("CASEWORK_PAGE_SIZE") {
            self.pagination.page_size = v.parse().unwrap_or(self.pagination.page_size);
        }
        if let Ok(v) = env::var("CASEWORK_INCLUDE_TOTAL_COUNT") {
            self.pagination.include_total_count =
                v.parse().unwrap_or(self.pagination.include_total_count);
        }

        // Auth overrides
        if let Ok(v) = env::var("CASEWORK_AUTH_ISSUER") {
            self.auth.jwks_uri = derive_jwks_uri(&v);
            self.auth.issuer = v;
        }
        if let Ok(v) = env::var("CASEWORK_AUTH_JWKS_URI") {
            self.auth.jwks_uri = v;
        }
        if let Ok(v) = env::var("CASEWORK_AUTH_AUDIENCE") {
            self.auth.audience = Some(v);
        }

        // Identity-provider overrides
        if let Ok(v) = env::var("CASEWORK_IDP_CLIENT_ID") {
            self.identity.client_id = v;
        }
        if let Ok(v) = env::var("CASEWORK_IDP_CLIENT_SECRET") {
            self.identity.client_secret = v;
        }
        if let Ok(v) = env::var("CASEWORK_IDP_CONNECTION") {
            self.identity.connection = v;
        }

        // Policy overrides
        if let Ok(v) = env::var("CASEWORK_PUBLIC_PROGRAM_CATALOG") {
            self.policy.public_program_catalog =
                v.parse().unwrap_or(self.policy.public_program_catalog);
        }
        if let Ok(v) = env::var("CASEWORK_PUBLIC_SIGNUP") {
            self.policy.public_signup = v.parse().unwrap_or(self.policy.public_signup);
        }

        self
    }
}

fn derive_jwks_uri(issuer: &str) -> String {
    match url::Url::parse(issuer).and_then(|base| base.join(".well-known/jwks.json")) {
        Ok(joined) => joined.to_string(),
        Err(_) => format!("{}/.well-known/jwks.json", issuer.trim_end_matches('/')),
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
