use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resource kinds stored in the backing document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    Client,
    User,
    Program,
}

impl Kind {
    /// Kind name as stored in the backend (also the cursor namespace).
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Client => "Client",
            Kind::User => "User",
            Kind::Program => "Program",
        }
    }

    /// URL path segment for the resource collection.
    pub fn collection(&self) -> &'static str {
        match self {
            Kind::Client => "clients",
            Kind::User => "users",
            Kind::Program => "programs",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Client" => Some(Kind::Client),
            "User" => Some(Kind::User),
            "Program" => Some(Kind::Program),
            _ => None,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relation (reference-list) field names.
pub mod relation {
    /// Programs a Client is enrolled in, embedded on the Client.
    pub const PROGRAMS: &str = "programs";
    /// Clients assigned to a User, embedded on the User.
    pub const CLIENTS: &str = "clients";
}

/// Attribute field holding the owning principal's identity on a Client.
pub const OWNER_FIELD: &str = "owner";

/// Attribute field holding a User's principal identity.
pub const EMAIL_FIELD: &str = "email";

/// Lightweight pointer embedded in one entity to denote a related entity of
/// another kind. Serialized on the wire as `{"id": ..., "self": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefEntry {
    pub id: i64,
    #[serde(rename = "self")]
    pub self_link: String,
}

impl RefEntry {
    pub fn new(id: i64, self_link: impl Into<String>) -> Self {
        Self { id, self_link: self_link.into() }
    }
}

/// A stored record. Identity is the (kind, id) pair; ids are assigned by the
/// store at insert and never reused after deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub kind: Kind,
    pub id: i64,
    /// Plain attribute fields (name, diagnosis, owner, ...).
    pub attributes: Map<String, Value>,
    /// Relation name -> ordered reference list.
    pub references: BTreeMap<String, Vec<RefEntry>>,
    /// Monotonic per-record stamp bumped on every write; used for
    /// conditional puts.
    pub version: u64,
}

impl Entity {
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// The reference list for a relation; absent lists read as empty.
    pub fn references(&self, relation: &str) -> &[RefEntry] {
        self.references.get(relation).map(Vec::as_slice).unwrap_or(&[])
    }
}
