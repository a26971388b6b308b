//! Resolving catalog links against a local mock of the catalog API.

use fanout_catalog::{Catalog, CatalogError, LocatorKind, SpotifyCatalog, find_locator, parse_locator};
use httpmock::prelude::*;
use serde_json::{Value, json};

fn catalog(server: &MockServer) -> SpotifyCatalog {
    SpotifyCatalog::new(reqwest::Client::new(), "id", "secret")
        .with_endpoints(server.url("/v1"), server.url("/api/token"))
}

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/token")
                .header_exists("authorization")
                .body("grant_type=client_credentials");
            then.status(200)
                .json_body(json!({ "access_token": "tok", "token_type": "Bearer", "expires_in": 3600 }));
        })
        .await
}

fn simple_track(id: &str) -> Value {
    json!({ "id": id, "name": format!("song {id}") })
}

#[tokio::test]
async fn test_album_paginates_and_uses_largest_cover() {
    let server = MockServer::start_async().await;
    mock_token(&server).await;

    let first_page: Vec<Value> = (0..50).map(|i| simple_track(&format!("t{i}"))).collect();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/albums/abc").header("authorization", "Bearer tok");
            then.status(200).json_body(json!({
                "name": "Album",
                "images": [
                    { "url": "http://img/640", "width": 640, "height": 640 },
                    { "url": "http://img/64", "width": 64, "height": 64 }
                ],
                "tracks": { "items": first_page, "total": 52 }
            }));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/albums/abc/tracks")
                .query_param("offset", "50")
                .query_param("limit", "50");
            then.status(200).json_body(json!({
                "items": [simple_track("t50"), simple_track("t51")],
                "total": 52
            }));
        })
        .await;

    let locator = parse_locator("https://open.spotify.com/album/abc").unwrap();
    let entries = catalog(&server).resolve(&locator).await.unwrap();

    second.assert_async().await;
    assert_eq!(entries.len(), 52);
    assert!(entries.iter().all(|e| e.resource_key == "http://img/640"));
    assert_eq!(entries[51].source_id, "t51");
}

#[tokio::test]
async fn test_playlist_skips_unplayable_items() {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/pl1");
            then.status(200).json_body(json!({
                "name": "Mix",
                "tracks": {
                    "total": 4,
                    "items": [
                        { "track": { "id": "a", "album": { "images": [{ "url": "http://img/a" }] } } },
                        { "track": null },
                        { "track": { "id": "b", "album": { "images": [] } } },
                        { "track": { "id": "c", "album": { "images": [{ "url": "http://img/c" }] } } }
                    ]
                }
            }));
        })
        .await;

    let locator = find_locator("look: https://open.spotify.com/playlist/pl1?si=zz").unwrap();
    assert_eq!(locator.kind, LocatorKind::Playlist);

    let entries = catalog(&server).resolve(&locator).await.unwrap();

    let keys: Vec<_> = entries.iter().map(|e| (e.resource_key.as_str(), e.source_id.as_str())).collect();
    assert_eq!(keys, vec![("http://img/a", "a"), ("http://img/c", "c")]);
}

#[tokio::test]
async fn test_token_is_cached_across_requests() {
    let server = MockServer::start_async().await;
    let token = mock_token(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/tracks/t1");
            then.status(200).json_body(json!({
                "id": "t1",
                "album": { "images": [{ "url": "http://img/t1" }] }
            }));
        })
        .await;

    let catalog = catalog(&server);
    let locator = parse_locator("https://open.spotify.com/track/t1").unwrap();
    catalog.resolve(&locator).await.unwrap();
    let entries = catalog.resolve(&locator).await.unwrap();

    token.assert_hits_async(1).await;
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_editorial_playlist_not_found() {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/37i9dQZF1DXcBWIGoYBM5M");
            then.status(404).json_body(json!({ "error": { "status": 404 } }));
        })
        .await;

    let locator = parse_locator("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M").unwrap();
    let err = catalog(&server).resolve(&locator).await.unwrap_err();

    assert!(matches!(err, CatalogError::NotFound(msg) if msg.contains("editorial")));
}

#[tokio::test]
async fn test_rejected_credentials() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/token");
            then.status(400).body(r#"{"error":"invalid_client"}"#);
        })
        .await;

    let locator = parse_locator("https://open.spotify.com/track/t1").unwrap();
    let err = catalog(&server).resolve(&locator).await.unwrap_err();

    assert!(matches!(err, CatalogError::Auth(msg) if msg.contains("invalid_client")));
}
