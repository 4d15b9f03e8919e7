//! Bridge a site with a Twitch channel.
//!
//! The crate wires three pieces together:
//!
//! - [`oauth`] — OAuth2 authorization for the channel owner and for
//!   visitors going through the follow flow
//! - [`twitch_api`] — the Twitch v5 client with its cached channel,
//!   stream, and video reads
//! - [`settings`] — the durable settings record (credentials, OAuth
//!   state, channel snapshot, site-follower counter)
//!
//! The functions below are the two end-to-end flows: connecting the
//! channel and following it on behalf of a visitor.

use eyre::Context;

pub mod cache;
pub mod oauth;
pub mod settings;
pub mod twitch_api;

use cache::ResponseCache;
use oauth::{
    AuthorizationCode, CHANNEL_SCOPES, FOLLOW_SCOPES, OAuthManager, RedirectUrl, TokenResponse,
};
use settings::{Settings, SettingsStore};
use twitch_api::{Channel, TwitchClient};

/// Connects the channel and returns a ready-to-use client.
///
/// Loads the settings and makes sure a channel access token is available
/// (see [`ensure_channel_authorization`]). Afterwards the channel snapshot
/// is refreshed if it is missing or stale.
pub async fn connect_channel(store: &SettingsStore) -> eyre::Result<TwitchClient> {
    let settings = store.load().await?;
    eyre::ensure!(
        settings.has_credentials(),
        "client_id and client_secret are not configured; register an application on Twitch \
         and add them to {}",
        store.path().display(),
    );

    let oauth = OAuthManager::new(settings.client_id.as_str(), settings.client_secret.as_str());
    let settings = ensure_channel_authorization(&oauth, store).await?;

    let mut client = TwitchClient::new(
        settings.client_id.clone(),
        settings.token.clone(),
        ResponseCache::new(),
    );
    if let Some(channel) = &settings.channel {
        client.set_channel_id(channel.id.clone());
    }

    refresh_channel_data(&mut client, store, false).await?;

    Ok(client)
}

/// Makes sure the settings hold a channel access token, and returns them.
///
/// A stored token is reused as-is. Otherwise a stored authorization code
/// (left behind by an earlier run whose exchange did not complete) is
/// exchanged against its recorded redirect URL. Only when neither exists
/// does the interactive channel-owner flow run (scope `channel_read`); its
/// code is persisted as soon as it is captured, the token only once the
/// exchange succeeds.
pub async fn ensure_channel_authorization(
    oauth: &OAuthManager,
    store: &SettingsStore,
) -> eyre::Result<Settings> {
    let mut settings = store.load().await?;
    if settings.token.is_some() {
        return Ok(settings);
    }

    if let (Some(code), Some(redirect)) = (settings.code.clone(), settings.redirect_uri.clone()) {
        tracing::debug!("exchanging the authorization code from an earlier run");
        let redirect = RedirectUrl::new(redirect).context("stored redirect URL is malformed")?;
        match oauth
            .exchange_code(AuthorizationCode::new(code), redirect)
            .await
        {
            Ok(token) => {
                settings.store_token(token.access_token().secret().clone());
                store.save(&settings).await?;
                return Ok(settings);
            }
            Err(e) => {
                // The endpoint rejected the code, so it is spent; drop it and
                // let the next run start a fresh authorization.
                settings.discard_code();
                store.save(&settings).await?;
                return Err(e.wrap_err(
                    "exchange the stored authorization code; run again to re-authorize",
                ));
            }
        }
    }

    let (code, redirect) = oauth
        .request_authorization(CHANNEL_SCOPES)
        .await
        .context("authorize the channel on Twitch")?;

    // The code and its redirect URL survive a failed exchange; the next run
    // picks them up instead of re-prompting.
    settings.store_code(code.secret().clone(), redirect.as_str());
    store.save(&settings).await?;

    let token = oauth
        .exchange_code(code, redirect)
        .await
        .context("exchange the channel authorization code")?;
    settings.store_token(token.access_token().secret().clone());
    store.save(&settings).await?;

    Ok(settings)
}

/// Refreshes the persisted channel snapshot when needed.
///
/// The snapshot is refreshed when `force` is set, when none exists, or
/// when it is older than the refresh interval; otherwise the stored one is
/// returned untouched. A fresh snapshot also updates the client's channel
/// id.
pub async fn refresh_channel_data(
    client: &mut TwitchClient,
    store: &SettingsStore,
    force: bool,
) -> eyre::Result<Channel> {
    let mut settings = store.load().await?;
    let now = jiff::Timestamp::now();

    if !settings.needs_channel_refresh(now, force) {
        let channel = settings
            .channel
            .expect("needs_channel_refresh is false only with a snapshot present");
        return Ok(channel);
    }

    let channel = client.channel().await.context("fetch channel data")?;
    client.set_channel_id(channel.id.clone());
    settings.record_channel(channel.clone(), now);
    store.save(&settings).await?;
    tracing::info!(channel_id = channel.id, "updated channel stats");

    Ok(channel)
}

/// Follows the connected channel on behalf of a visitor.
///
/// Runs the visitor OAuth flow (scopes `user_read user_follows_edit`),
/// resolves the visitor's user record, and follows the channel unless the
/// visitor already follows it. Returns whether the visitor ended up
/// following. Follows that were created through this flow are counted in
/// the settings.
pub async fn follow_channel_flow(
    client: &TwitchClient,
    store: &SettingsStore,
) -> eyre::Result<bool> {
    let mut settings = store.load().await?;
    eyre::ensure!(
        settings.has_credentials(),
        "client_id and client_secret are not configured"
    );

    let oauth = OAuthManager::new(settings.client_id.as_str(), settings.client_secret.as_str());
    let token = oauth
        .authenticate(FOLLOW_SCOPES)
        .await
        .context("authorize the visitor on Twitch")?;
    let visitor_token = token.access_token().secret().clone();

    let user = client
        .user(Some(&visitor_token))
        .await
        .context("fetch the visitor's user record")?;

    if client.is_following(&user.id, Some(&visitor_token)).await? {
        tracing::debug!(user_id = user.id, "visitor already follows the channel");
        return Ok(true);
    }

    let followed = client.follow(&user.id, Some(&visitor_token)).await?;
    if followed {
        settings.record_site_follow();
        store.save(&settings).await?;
    }

    Ok(followed)
}
