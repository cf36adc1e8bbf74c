mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{cursor_from_next, spawn_app, spawn_app_with, test_config, token_for};

fn program_body(name: &str) -> serde_json::Value {
    json!({ "name": name, "desc": "after-school support", "suppliesNeeded": ["snacks", "books"] })
}

#[tokio::test]
async fn catalog_is_public_by_default() -> Result<()> {
    let app = spawn_app();
    let caseworker = token_for("casey@example.com");

    let res = app
        .request("POST", "/programs", Some(&caseworker), Some(program_body("Tutoring")))
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    let id = res.body["id"].as_i64().unwrap();

    // Anonymous list and get both succeed.
    let res = app.get("/programs", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["totalCount"], 1);

    let res = app.get(&format!("/programs/{id}"), None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["name"], "Tutoring");
    assert_eq!(res.body["suppliesNeeded"], json!(["snacks", "books"]));
    Ok(())
}

#[tokio::test]
async fn private_catalog_policy_requires_a_token() -> Result<()> {
    let mut config = test_config();
    config.policy.public_program_catalog = false;
    let app = spawn_app_with(config, false);
    let caseworker = token_for("casey@example.com");

    let res = app.get("/programs", None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.get("/programs", Some(&caseworker)).await?;
    assert_eq!(res.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn mutation_always_requires_a_token() -> Result<()> {
    let app = spawn_app();

    let res = app.request("POST", "/programs", None, Some(program_body("X"))).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn cursor_walk_visits_every_program_exactly_once() -> Result<()> {
    let app = spawn_app();
    let caseworker = token_for("casey@example.com");
    for i in 0..7 {
        app.request("POST", "/programs", Some(&caseworker), Some(program_body(&format!("p{i}"))))
            .await?;
    }

    let mut ids = Vec::new();
    let mut uri = "/programs".to_string();
    loop {
        let res = app.get(&uri, None).await?;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["totalCount"], 7);
        let items = res.body["items"].as_array().unwrap();
        assert!(items.len() <= 5);
        ids.extend(items.iter().map(|item| item["id"].as_i64().unwrap()));

        match res.body.get("next").and_then(|v| v.as_str()) {
            Some(next) => uri = format!("/programs?cursor={}", cursor_from_next(next)),
            None => break,
        }
    }

    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 7);
    Ok(())
}

#[tokio::test]
async fn garbage_cursor_is_a_client_error() -> Result<()> {
    let app = spawn_app();
    let res = app.get("/programs?cursor=notacursor", None).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn total_count_can_be_disabled_by_config() -> Result<()> {
    let mut config = test_config();
    config.pagination.include_total_count = false;
    let app = spawn_app_with(config, false);
    let caseworker = token_for("casey@example.com");
    app.request("POST", "/programs", Some(&caseworker), Some(program_body("p"))).await?;

    let res = app.get("/programs", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.get("totalCount").is_none());
    assert_eq!(res.body["items"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn replace_and_delete_round_trip() -> Result<()> {
    let app = spawn_app();
    let caseworker = token_for("casey@example.com");

    let res = app
        .request("POST", "/programs", Some(&caseworker), Some(program_body("Tutoring")))
        .await?;
    let id = res.body["id"].as_i64().unwrap();

    let res = app
        .request(
            "PUT",
            &format!("/programs/{id}"),
            Some(&caseworker),
            Some(json!({ "name": "Mentoring", "desc": "weekly mentoring", "suppliesNeeded": [] })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(
        res.headers.get("location").and_then(|v| v.to_str().ok()),
        Some(format!("http://localhost/programs/{id}").as_str())
    );

    let res = app.get(&format!("/programs/{id}"), None).await?;
    assert_eq!(res.body["name"], "Mentoring");

    let res = app.request("DELETE", &format!("/programs/{id}"), Some(&caseworker), None).await?;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    let res = app.get(&format!("/programs/{id}"), None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn replacing_an_unknown_program_is_not_found() -> Result<()> {
    let app = spawn_app();
    let caseworker = token_for("casey@example.com");

    let res = app
        .request("PUT", "/programs/424242", Some(&caseworker), Some(program_body("X")))
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}
