//! Adding resolved tracks to a user playlist through a local mock API.

use fanout_catalog::{CatalogError, PlaylistWriter};
use httpmock::prelude::*;
use serde_json::{Value, json};

fn writer(server: &MockServer) -> PlaylistWriter {
    PlaylistWriter::new(reqwest::Client::new(), "id", "secret", "refresh", "auto")
        .with_endpoints(server.url("/v1"), server.url("/api/token"))
}

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/token")
                .body("grant_type=refresh_token&refresh_token=refresh");
            then.status(200).json_body(json!({ "access_token": "user", "expires_in": 3600 }));
        })
        .await
}

fn items(ids: impl IntoIterator<Item = String>) -> Value {
    let items: Vec<Value> = ids.into_iter().map(|id| json!({ "track": { "id": id } })).collect();
    json!({ "items": items })
}

#[tokio::test]
async fn test_existing_tracks_paginate_until_short_page() {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    let first = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/playlists/auto/tracks")
                .query_param("offset", "0")
                .query_param("limit", "100")
                .header("authorization", "Bearer user");
            then.status(200).json_body(items((0..100).map(|i| format!("t{i}"))));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/auto/tracks").query_param("offset", "100");
            then.status(200).json_body(json!({ "items": [{ "track": { "id": "t100" } }, { "track": null }] }));
        })
        .await;

    let ids = writer(&server).existing_track_ids().await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(ids.len(), 101);
    assert!(ids.contains("t100"));
}

#[tokio::test]
async fn test_add_new_skips_present_and_duplicate_tracks() {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/auto/tracks");
            then.status(200).json_body(items(["a".to_string()]));
        })
        .await;
    let add = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/playlists/auto/tracks")
                .json_body(json!({ "uris": ["spotify:track:b", "spotify:track:c"], "position": 0 }));
            then.status(201).json_body(json!({ "snapshot_id": "s" }));
        })
        .await;

    let added = writer(&server)
        .add_new(["a", "b", "c", "b", ""].map(String::from))
        .await
        .unwrap();

    assert_eq!(added, 2);
    add.assert_async().await;
}

#[tokio::test]
async fn test_add_new_adds_everything_when_listing_fails() {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/auto/tracks");
            then.status(500);
        })
        .await;
    let add = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/playlists/auto/tracks")
                .json_body(json!({ "uris": ["spotify:track:a"], "position": 0 }));
            then.status(201).json_body(json!({ "snapshot_id": "s" }));
        })
        .await;

    assert_eq!(writer(&server).add_new(["a".to_string()]).await.unwrap(), 1);
    add.assert_async().await;
}

#[tokio::test]
async fn test_large_additions_are_batched() {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    let add = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/playlists/auto/tracks");
            then.status(201).json_body(json!({ "snapshot_id": "s" }));
        })
        .await;

    let uris: Vec<String> = (0..150).map(|i| format!("spotify:track:t{i}")).collect();
    writer(&server).add_tracks(&uris).await.unwrap();

    add.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_rejected_add_is_an_error() {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/playlists/auto/tracks");
            then.status(403).body("insufficient scope");
        })
        .await;

    let err = writer(&server)
        .add_tracks(&["spotify:track:x".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::Http { status: 403, body } if body.contains("scope")));
}
