use std::time::Duration;

use actor_core::platform::ApifyClient;
use actor_core::{Credential, Platform, PlatformError, RunStatus};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for_server(server: &MockServer) -> ApifyClient {
    ApifyClient::new(server.uri(), Duration::from_secs(5)).expect("client creation should succeed")
}

fn cred() -> Credential {
    Credential::parse(Some("apify_api_test")).expect("credential")
}

#[tokio::test]
async fn list_actors_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acts"))
        .and(header("authorization", "Bearer apify_api_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "total": 1, "items": [{ "id": "abc", "name": "web-scraper" }] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let body = client_for_server(&server).list_actors(&cred()).await.expect("listing");
    assert_eq!(body["data"]["items"][0]["name"], "web-scraper");
}

#[tokio::test]
async fn remote_status_and_body_are_preserved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acts"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "type": "token-not-valid", "message": "Authentication token is not valid." }
        })))
        .mount(&server)
        .await;

    let err = client_for_server(&server).list_actors(&cred()).await.unwrap_err();
    match err {
        PlatformError::Remote { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body["error"]["type"], "token-not-valid");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn non_json_error_body_is_kept_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/actor-runs/r1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client_for_server(&server).run(&cred(), "r1").await.unwrap_err();
    match err {
        PlatformError::Remote { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, json!("upstream unavailable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_platform_is_a_transport_error() {
    let client = ApifyClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
    let err = client.list_actors(&cred()).await.unwrap_err();
    assert!(matches!(err, PlatformError::Transport(_)));
}

#[tokio::test]
async fn start_run_sends_memory_and_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/acts/acme~crawler/runs"))
        .and(query_param("memory", "512"))
        .and(body_json(json!({ "startUrls": [{ "url": "http://a" }] })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": "run-1", "status": "READY", "defaultDatasetId": "ds-1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let run = client_for_server(&server)
        .start_run(
            &cred(),
            "acme/crawler",
            512,
            &json!({ "startUrls": [{ "url": "http://a" }] }),
        )
        .await
        .expect("run");

    assert_eq!(run.id, "run-1");
    assert_eq!(run.status, RunStatus::Ready);
    assert_eq!(run.default_dataset_id.as_deref(), Some("ds-1"));
}

#[tokio::test]
async fn input_schema_unwraps_data_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acts/acme~crawler/input-schema"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "properties": { "q": { "type": "string" } } }
        })))
        .mount(&server)
        .await;

    let schema = client_for_server(&server)
        .input_schema(&cred(), "acme/crawler")
        .await
        .expect("schema");
    assert_eq!(schema["properties"]["q"]["type"], "string");
}

#[tokio::test]
async fn builds_and_last_run_are_read_from_envelopes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acts/abc/builds"))
        .and(query_param("desc", "1"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "items": [{ "id": "b2", "buildNumber": "0.0.2" }] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/actor-builds/b2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": "b2", "inputSchema": "{\"properties\":{}}" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acts/abc/runs/last"))
        .and(query_param("status", "SUCCEEDED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": "r7", "status": "SUCCEEDED", "defaultKeyValueStoreId": "kv7" }
        })))
        .mount(&server)
        .await;

    let client = client_for_server(&server);
    let builds = client.list_builds(&cred(), "abc").await.expect("builds");
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].id, "b2");

    let build = client.build(&cred(), "b2").await.expect("build");
    assert_eq!(build.input_schema, Some(json!("{\"properties\":{}}")));

    let last = client.last_succeeded_run(&cred(), "abc").await.expect("last run");
    assert_eq!(last.status, RunStatus::Succeeded);
    assert_eq!(last.default_key_value_store_id.as_deref(), Some("kv7"));
}

#[tokio::test]
async fn dataset_items_are_returned_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/datasets/ds-1/items"))
        .and(query_param("clean", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "rank": 1 }, { "rank": 2 }, { "rank": 3 }
        ])))
        .mount(&server)
        .await;

    let items = client_for_server(&server)
        .dataset_items(&cred(), "ds-1")
        .await
        .expect("items");
    let ranks: Vec<i64> = items.iter().filter_map(|i| i["rank"].as_i64()).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}
