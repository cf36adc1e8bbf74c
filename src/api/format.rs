use axum::http::{header, HeaderMap};
use serde_json::{json, Map, Value};

use crate::config::AppConfig;
use crate::pagination::Page;
use crate::store::{Entity, Kind};

/// Base URL for absolute self/next links: the configured public base URL when
/// set, otherwise derived from the request's Host header.
pub fn request_base_url(headers: &HeaderMap, config: &AppConfig) -> String {
    if let Some(base) = &config.server.public_base_url {
        return base.trim_end_matches('/').to_string();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{}", host)
}

pub fn collection_url(base_url: &str, kind: Kind) -> String {
    format!("{}/{}", base_url, kind.collection())
}

pub fn entity_url(base_url: &str, kind: Kind, id: i64) -> String {
    format!("{}/{}/{}", base_url, kind.collection(), id)
}

/// Public wire shape of an entity: id, flattened attributes, reference lists
/// under their relation names, and a self link. Links are assembled here at
/// response time, never stored.
pub fn entity_to_api_value(entity: &Entity, base_url: &str) -> Value {
    let mut obj = Map::new();
    obj.insert("id".to_string(), json!(entity.id));
    for (name, value) in &entity.attributes {
        obj.insert(name.clone(), value.clone());
    }
    for (relation, entries) in &entity.references {
        let list: Vec<Value> = entries
            .iter()
            .map(|entry| json!({ "id": entry.id, "self": entry.self_link }))
            .collect();
        obj.insert(relation.clone(), Value::Array(list));
    }
    obj.insert(
        "self".to_string(),
        json!(entity_url(base_url, entity.kind, entity.id)),
    );
    Value::Object(obj)
}

/// Wire shape of a listing: `items` with self links, an absolute `next` URL
/// embedding the cursor when more results remain, and `totalCount` unless the
/// count scan is disabled.
pub fn page_to_api_value(page: &Page, kind: Kind, base_url: &str) -> Value {
    let items: Vec<Value> = page
        .items
        .iter()
        .map(|entity| entity_to_api_value(entity, base_url))
        .collect();

    let mut obj = Map::new();
    obj.insert("items".to_string(), Value::Array(items));
    if let Some(cursor) = &page.next_cursor {
        obj.insert(
            "next".to_string(),
            json!(format!("{}?cursor={}", collection_url(base_url, kind), cursor)),
        );
    }
    if let Some(total) = page.total_count {
        obj.insert("totalCount".to_string(), json!(total));
    }
    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::store::entity::relation;
    use crate::store::RefEntry;
    use axum::http::HeaderValue;
    use std::collections::BTreeMap;

    fn sample_client() -> Entity {
        let mut attributes = Map::new();
        attributes.insert("name".to_string(), json!("Alice"));
        attributes.insert("owner".to_string(), json!("casey@example.com"));
        let mut references = BTreeMap::new();
        references.insert(
            relation::PROGRAMS.to_string(),
            vec![RefEntry::new(9, "http://localhost/programs/9")],
        );
        Entity { kind: Kind::Client, id: 3, attributes, references, version: 1 }
    }

    #[test]
    fn entity_value_flattens_attributes_and_links() {
        let value = entity_to_api_value(&sample_client(), "http://localhost");
        assert_eq!(value["id"], 3);
        assert_eq!(value["name"], "Alice");
        assert_eq!(value["self"], "http://localhost/clients/3");
        assert_eq!(value["programs"][0]["id"], 9);
        assert_eq!(value["programs"][0]["self"], "http://localhost/programs/9");
    }

    #[test]
    fn page_value_embeds_cursor_in_next_url() {
        let page = Page {
            items: vec![sample_client()],
            next_cursor: Some("abc123".to_string()),
            total_count: Some(11),
        };
        let value = page_to_api_value(&page, Kind::Client, "http://localhost");
        assert_eq!(value["next"], "http://localhost/clients?cursor=abc123");
        assert_eq!(value["totalCount"], 11);
        assert_eq!(value["items"][0]["self"], "http://localhost/clients/3");
    }

    #[test]
    fn page_value_omits_absent_next_and_count() {
        let page = Page { items: vec![], next_cursor: None, total_count: None };
        let value = page_to_api_value(&page, Kind::Program, "http://localhost");
        assert!(value.get("next").is_none());
        assert!(value.get("totalCount").is_none());
        assert_eq!(value["items"], json!([]));
    }

    #[test]
    fn base_url_prefers_configured_override() {
        let mut config = AppConfig::from_env();
        config.server.public_base_url = Some("https://api.example.org/".to_string());
        let headers = HeaderMap::new();
        assert_eq!(request_base_url(&headers, &config), "https://api.example.org");

        config.server.public_base_url = None;
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("api.local:8080"));
        assert_eq!(request_base_url(&headers, &config), "http://api.local:8080");
    }
}
