//! Core Twitch API client functionality.

use crate::cache::{
    ResponseCache, STREAM_KEY, STREAM_TTL, VIDEOS_ARCHIVE_KEY, VIDEOS_HIGHLIGHT_KEY, VIDEOS_TTL,
};
use crate::twitch_api::{
    channels::Channel,
    streams::{Stream, StreamResponse, StreamStatus},
    users::{FollowRelationship, User},
    videos::{BroadcastType, Video, VideoListParams, VideoListResponse},
};
use eyre::Context;
use reqwest::{Method, StatusCode};
use tracing::instrument;

/// Base URL of the Twitch v5 API.
const KRAKEN_ENDPOINT: &str = "https://api.twitch.tv/kraken";

/// Media type selecting v5 of the Twitch API.
const ACCEPT_V5: &str = "application/vnd.twitchtv.v5+json";

/// Client for interacting with the Twitch v5 API.
///
/// The client wraps the connected channel's OAuth2 access token and provides
/// methods for the handful of endpoints the bridge uses. Channel-scoped
/// reads go through the shared [`ResponseCache`]; user-scoped calls (the
/// follow flow) present a visitor's token instead of the channel's.
///
/// Every request carries the `Client-ID` header and the v5 `Accept` media
/// type; authenticated requests add `Authorization: OAuth <token>`.
#[derive(Debug, Clone)]
pub struct TwitchClient {
    /// HTTP client for API requests.
    client: reqwest::Client,
    /// The application's client ID, sent on every request.
    client_id: String,
    /// The connected channel's access token, if the channel is connected.
    channel_token: Option<String>,
    /// The connected channel's ID, once a snapshot has been taken.
    channel_id: Option<String>,
    /// API base URL; overridable so tests can point at a local server.
    api_base: String,
    /// Shared response cache.
    cache: ResponseCache,
}

impl TwitchClient {
    /// Creates a new Twitch API client.
    ///
    /// # Arguments
    ///
    /// * `client_id` - The registered application's client ID
    /// * `channel_token` - The connected channel's access token, when known
    /// * `cache` - The shared response cache
    pub fn new(
        client_id: impl Into<String>,
        channel_token: Option<String>,
        cache: ResponseCache,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: client_id.into(),
            channel_token,
            channel_id: None,
            api_base: KRAKEN_ENDPOINT.to_string(),
            cache,
        }
    }

    /// Points the client at a different API base URL.
    ///
    /// Used by tests to target a mock server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Records the connected channel's ID.
    ///
    /// Channel-dependent endpoints (stream, videos, follows) need it; it
    /// comes from the persisted channel snapshot or a fresh [`Self::channel`]
    /// call.
    pub fn set_channel_id(&mut self, channel_id: impl Into<String>) {
        self.channel_id = Some(channel_id.into());
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel_id.as_deref()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    fn require_channel_id(&self) -> eyre::Result<&str> {
        self.channel_id
            .as_deref()
            .ok_or_else(|| eyre::eyre!("no channel connected; authorize the channel first"))
    }

    /// Makes an authenticated HTTP request to the Twitch API.
    ///
    /// Consolidates the shared request path: URL assembly, the `Client-ID`
    /// and v5 `Accept` headers, the `Authorization: OAuth` header (channel
    /// token by default, `token_override` for user-scoped calls), and query
    /// parameters. The response is returned without a status check so
    /// callers that care about specific statuses (the follow-relationship
    /// 404) can inspect it.
    async fn send_authenticated(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        token_override: Option<&str>,
    ) -> eyre::Result<reqwest::Response> {
        let token = token_override
            .or(self.channel_token.as_deref())
            .ok_or_else(|| eyre::eyre!("no access token available for {path}"))?;

        let url = format!("{}/{}", self.api_base.trim_end_matches('/'), path);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Client-ID", &self.client_id)
            .header("Accept", ACCEPT_V5)
            .header("Authorization", format!("OAuth {token}"));

        if let Some(query) = query {
            request = request.query(query);
        }

        request
            .send()
            .await
            .with_context(|| format!("send {method} request to Twitch API: {url}"))
    }

    /// Like [`Self::send_authenticated`], but treats any non-2xx status as a
    /// failure: the status and body are logged and surfaced as an error.
    #[instrument(skip(self, query, token_override), level = "trace")]
    async fn make_authenticated_request(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        token_override: Option<&str>,
    ) -> eyre::Result<reqwest::Response> {
        let response = self
            .send_authenticated(method.clone(), path, query, token_override)
            .await?;
        require_success(response, &format!("{method} {path}")).await
    }

    /// Fetches the connected channel object.
    ///
    /// Uses the v5 `channel` endpoint, which resolves the channel behind the
    /// presented access token.
    ///
    /// # Required scopes
    ///
    /// * `channel_read`
    #[instrument(skip(self))]
    pub async fn channel(&self) -> eyre::Result<Channel> {
        let response = self
            .make_authenticated_request(Method::GET, "channel", None, None)
            .await?;

        let channel: Channel = response
            .json()
            .await
            .context("parse Twitch channel response as JSON")?;

        tracing::debug!(
            channel_id = channel.id,
            followers = channel.followers,
            "fetched channel"
        );

        Ok(channel)
    }

    /// Fetches the channel's VODs with the given listing parameters.
    ///
    /// Uses the v5 `channels/{channel_id}/videos` endpoint. This call is not
    /// cached; the cached views are [`Self::channel_highlights`] and
    /// [`Self::channel_archive`].
    #[instrument(skip(self))]
    pub async fn channel_videos(&self, params: &VideoListParams) -> eyre::Result<Vec<Video>> {
        let channel_id = self.require_channel_id()?;
        let path = format!("channels/{channel_id}/videos");
        let query = params.to_query();

        let response = self
            .make_authenticated_request(Method::GET, &path, Some(query.as_slice()), None)
            .await?;

        let videos: VideoListResponse = response
            .json()
            .await
            .context("parse Twitch videos response as JSON")?;

        tracing::debug!(
            total = videos.total,
            returned_items = videos.videos.len(),
            "fetched channel videos"
        );

        Ok(videos.videos)
    }

    /// Returns the channel's highlight VODs, cached for 24 hours.
    pub async fn channel_highlights(&self) -> eyre::Result<Vec<Video>> {
        self.cached_videos(VIDEOS_HIGHLIGHT_KEY, BroadcastType::Highlight)
            .await
    }

    /// Returns the channel's archived VODs, cached for 24 hours.
    pub async fn channel_archive(&self) -> eyre::Result<Vec<Video>> {
        self.cached_videos(VIDEOS_ARCHIVE_KEY, BroadcastType::Archive)
            .await
    }

    async fn cached_videos(&self, key: &str, kind: BroadcastType) -> eyre::Result<Vec<Video>> {
        if let Some(cached) = self.cache.get(key).await {
            tracing::trace!(key, "serving videos from cache");
            return serde_json::from_value(cached).context("decode cached video listing");
        }

        let params = VideoListParams {
            broadcast_type: Some(kind),
            ..VideoListParams::default()
        };
        let videos = self.channel_videos(&params).await?;

        let value = serde_json::to_value(&videos).context("encode video listing for cache")?;
        self.cache.put(key, value, VIDEOS_TTL).await;

        Ok(videos)
    }

    /// Returns the channel's live stream, or `None` when offline.
    ///
    /// Uses the v5 `streams/{channel_id}` endpoint. The result (including an
    /// offline verdict) is cached for 30 minutes.
    #[instrument(skip(self))]
    pub async fn stream(&self) -> eyre::Result<Option<Stream>> {
        if let Some(cached) = self.cache.get(STREAM_KEY).await {
            tracing::trace!("serving stream from cache");
            return serde_json::from_value(cached).context("decode cached stream");
        }

        let channel_id = self.require_channel_id()?;
        let path = format!("streams/{channel_id}");
        let response = self
            .make_authenticated_request(Method::GET, &path, None, None)
            .await?;

        let stream: StreamResponse = response
            .json()
            .await
            .context("parse Twitch stream response as JSON")?;

        tracing::debug!(live = stream.stream.is_some(), "fetched stream");

        let value = serde_json::to_value(&stream.stream).context("encode stream for cache")?;
        self.cache.put(STREAM_KEY, value, STREAM_TTL).await;

        Ok(stream.stream)
    }

    /// Returns a live/offline summary of the channel, via the stream cache.
    pub async fn stream_status(&self) -> eyre::Result<StreamStatus> {
        let stream = self.stream().await?;
        Ok(StreamStatus::from_stream(stream.as_ref()))
    }

    /// Fetches the user behind an access token.
    ///
    /// Uses the v5 `user` endpoint. Pass a visitor's token for the follow
    /// flow; with `None`, the channel owner's token is used.
    ///
    /// # Required scopes
    ///
    /// * `user_read`
    #[instrument(skip(self, token_override))]
    pub async fn user(&self, token_override: Option<&str>) -> eyre::Result<User> {
        let response = self
            .make_authenticated_request(Method::GET, "user", None, token_override)
            .await?;

        let user: User = response
            .json()
            .await
            .context("parse Twitch user response as JSON")?;

        tracing::debug!(user_id = user.id, "fetched user");

        Ok(user)
    }

    /// Checks whether a user follows the connected channel.
    ///
    /// Uses the v5 `users/{user_id}/follows/channels/{channel_id}` endpoint.
    /// A 404 means the user does not follow the channel; that is not an
    /// error. True iff the returned relationship names the connected
    /// channel.
    #[instrument(skip(self, token_override), ret)]
    pub async fn is_following(
        &self,
        user_id: &str,
        token_override: Option<&str>,
    ) -> eyre::Result<bool> {
        let channel_id = self.require_channel_id()?.to_string();
        let path = format!("users/{user_id}/follows/channels/{channel_id}");

        let response = self
            .send_authenticated(Method::GET, &path, None, token_override)
            .await?;

        // Not following is a 404, not a failure.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let response = require_success(response, &format!("GET {path}")).await?;

        let follow: FollowRelationship = response
            .json()
            .await
            .context("parse Twitch follow response as JSON")?;

        Ok(follow.channel.id == channel_id)
    }

    /// Follows the connected channel on behalf of a user.
    ///
    /// Uses PUT on the v5 `users/{user_id}/follows/channels/{channel_id}`
    /// endpoint. Following an already-followed channel is idempotent; Twitch
    /// returns the existing relationship. True iff the returned relationship
    /// names the connected channel.
    ///
    /// # Required scopes
    ///
    /// * `user_follows_edit`
    #[instrument(skip(self, token_override), ret)]
    pub async fn follow(
        &self,
        user_id: &str,
        token_override: Option<&str>,
    ) -> eyre::Result<bool> {
        let channel_id = self.require_channel_id()?.to_string();
        let path = format!("users/{user_id}/follows/channels/{channel_id}");

        let response = self
            .make_authenticated_request(Method::PUT, &path, None, token_override)
            .await?;

        let follow: FollowRelationship = response
            .json()
            .await
            .context("parse Twitch follow response as JSON")?;

        let followed = follow.channel.id == channel_id;
        if followed {
            tracing::info!(user_id, channel_id, "user is now following the channel");
        }

        Ok(followed)
    }
}

/// Turns a non-2xx response into a logged error.
///
/// Callers that tolerate a specific status (the follow-check 404) handle it
/// before calling this.
async fn require_success(
    response: reqwest::Response,
    request: &str,
) -> eyre::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    tracing::error!(%status, request, error = %error_text, "Twitch API request failed");
    Err(eyre::eyre!(
        "Twitch API {request} request failed with status {status}: {error_text}"
    ))
}
