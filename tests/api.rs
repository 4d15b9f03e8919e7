//! Integration tests for the Twitch client against a mocked API.

use pretty_assertions::assert_eq;
use serde_json::json;
use twitch_pack::cache::ResponseCache;
use twitch_pack::twitch_api::{StreamStatus, TwitchClient};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connected_client(server: &MockServer) -> TwitchClient {
    let mut client = TwitchClient::new("abc123", Some("channel-token".to_string()), ResponseCache::new())
        .with_api_base(server.uri());
    client.set_channel_id("44322889");
    client
}

fn channel_body() -> serde_json::Value {
    json!({
        "_id": "44322889",
        "name": "dallas",
        "display_name": "dallas",
        "url": "https://www.twitch.tv/dallas",
        "status": "The Finest Programming",
        "game": "Creative",
        "followers": 40,
        "views": 232,
        "partner": false,
        "email": "dallas@example.com"
    })
}

#[tokio::test]
async fn channel_request_carries_the_twitch_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channel"))
        .and(header("Client-ID", "abc123"))
        .and(header("Accept", "application/vnd.twitchtv.v5+json"))
        .and(header("Authorization", "OAuth channel-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(channel_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = connected_client(&server);
    let channel = client.channel().await.unwrap();
    assert_eq!(channel.id, "44322889");
    assert_eq!(channel.followers, 40);
}

#[tokio::test]
async fn api_failures_surface_as_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channel"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let client = connected_client(&server);
    let err = client.channel().await.unwrap_err();
    assert!(err.to_string().contains("500"), "unexpected error: {err}");
}

#[tokio::test]
async fn stream_is_served_from_cache_within_the_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/streams/44322889"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stream": {
                "_id": 23932774784u64,
                "game": "Tetris",
                "viewers": 7254,
                "channel": channel_body()
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connected_client(&server);
    let first = client.stream().await.unwrap().unwrap();
    // Second read must not hit the server again.
    let second = client.stream().await.unwrap().unwrap();
    assert_eq!(first.id, second.id);

    let status = client.stream_status().await.unwrap();
    assert_eq!(
        status,
        StreamStatus::Live {
            game: Some("Tetris".to_string())
        }
    );
}

#[tokio::test]
async fn offline_streams_are_not_errors_and_are_cached_too() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/streams/44322889"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stream": null })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connected_client(&server);
    assert!(client.stream().await.unwrap().is_none());
    // The offline verdict is held under the same TTL.
    assert_eq!(client.stream_status().await.unwrap(), StreamStatus::Offline);
}

#[tokio::test]
async fn video_listings_are_cached_until_evicted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels/44322889/videos"))
        .and(query_param("broadcast_type", "archive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_total": 1,
            "videos": [{
                "_id": "v106400740",
                "title": "Weekly Stream",
                "broadcast_type": "archive",
                "url": "https://www.twitch.tv/twitch/v/106400740",
                "length": 12637,
                "views": 76
            }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = connected_client(&server);
    let first = client.channel_archive().await.unwrap();
    assert_eq!(first.len(), 1);
    // Cached: no second request.
    client.channel_archive().await.unwrap();

    // Evicting forces a refetch.
    client.cache().clear().await;
    let refetched = client.channel_archive().await.unwrap();
    assert_eq!(refetched[0].title, "Weekly Stream");
}

#[tokio::test]
async fn highlights_and_archive_use_distinct_cache_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels/44322889/videos"))
        .and(query_param("broadcast_type", "highlight"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_total": 0,
            "videos": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/channels/44322889/videos"))
        .and(query_param("broadcast_type", "archive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_total": 0,
            "videos": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connected_client(&server);
    assert!(client.channel_highlights().await.unwrap().is_empty());
    assert!(client.channel_archive().await.unwrap().is_empty());
    // Both listings now come from their own cache entries.
    client.channel_highlights().await.unwrap();
    client.channel_archive().await.unwrap();
}

#[tokio::test]
async fn follow_flow_for_a_new_follower() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("Authorization", "OAuth visitor-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "129454141",
            "name": "dallasnchains",
            "display_name": "dallasnchains"
        })))
        .mount(&server)
        .await;
    // Not following yet: the relationship endpoint 404s.
    Mock::given(method("GET"))
        .and(path("/users/129454141/follows/channels/44322889"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"error": "Not Found", "status": 404})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/users/129454141/follows/channels/44322889"))
        .and(header("Authorization", "OAuth visitor-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "created_at": "2017-01-26T00:54:07Z",
            "notifications": false,
            "channel": channel_body()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connected_client(&server);
    let user = client.user(Some("visitor-token")).await.unwrap();
    assert_eq!(user.id, "129454141");

    assert!(!client
        .is_following(&user.id, Some("visitor-token"))
        .await
        .unwrap());
    assert!(client.follow(&user.id, Some("visitor-token")).await.unwrap());
}

#[tokio::test]
async fn existing_follow_relationship_is_detected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/129454141/follows/channels/44322889"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "created_at": "2017-01-26T00:54:07Z",
            "notifications": true,
            "channel": channel_body()
        })))
        .mount(&server)
        .await;

    let client = connected_client(&server);
    assert!(client
        .is_following("129454141", Some("visitor-token"))
        .await
        .unwrap());
}

#[tokio::test]
async fn follow_check_surfaces_unexpected_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/129454141/follows/channels/44322889"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = connected_client(&server);
    let err = client
        .is_following("129454141", Some("visitor-token"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("503"), "unexpected error: {err}");
}

#[tokio::test]
async fn follow_fails_when_the_returned_channel_does_not_match() {
    let server = MockServer::start().await;
    let mut other = channel_body();
    other["_id"] = json!("99999999");
    Mock::given(method("PUT"))
        .and(path("/users/129454141/follows/channels/44322889"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "notifications": false,
            "channel": other
        })))
        .mount(&server)
        .await;

    let client = connected_client(&server);
    assert!(!client.follow("129454141", Some("visitor-token")).await.unwrap());
}

#[tokio::test]
async fn channel_scoped_calls_need_a_connected_channel() {
    let server = MockServer::start().await;
    let client = TwitchClient::new("abc123", Some("channel-token".to_string()), ResponseCache::new())
        .with_api_base(server.uri());

    let err = client.stream().await.unwrap_err();
    assert!(
        err.to_string().contains("no channel connected"),
        "unexpected error: {err}"
    );
}
