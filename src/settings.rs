//! The persisted settings record and its JSON file store.
//!
//! Settings hold the application credentials, the OAuth state of the
//! connected channel (authorization code, access token), the last channel
//! snapshot with its timestamp, and the count of follows that came through
//! the site. They are read once per flow, mutated by the OAuth callback or
//! maintenance actions, and persisted back verbatim.

use crate::twitch_api::channels::Channel;
use eyre::Context;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Minimum age of the channel snapshot before it is refreshed, unless the
/// refresh is forced.
pub const CHANNEL_REFRESH_INTERVAL_SECS: i64 = 6 * 60 * 60;

/// The durable settings record.
///
/// Invariant: `token` stays `None` until a code exchange succeeds; `code`
/// may be present on its own after the authorize leg of the flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// The registered application's client ID.
    #[serde(default)]
    pub client_id: String,
    /// The registered application's client secret.
    #[serde(default)]
    pub client_secret: String,
    /// The authorization code from the most recent OAuth redirect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// The redirect URL the code was presented on.
    ///
    /// Token endpoints verify it against the authorize request, so it is
    /// needed to exchange the code on a later run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    /// The channel's access token, set only after a successful exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// The last snapshot of the connected channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    /// When the channel snapshot was last refreshed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_last_update: Option<Timestamp>,
    /// How many follows were initiated through the site.
    #[serde(default)]
    pub followers_from_site: u64,
}

impl Settings {
    /// Whether the application credentials have been filled in.
    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    /// Whether a channel has been through (at least part of) the OAuth flow.
    pub fn is_connected(&self) -> bool {
        self.code.is_some() || self.token.is_some()
    }

    /// Records the authorization code from the redirect, together with the
    /// redirect URL it was presented on.
    pub fn store_code(&mut self, code: impl Into<String>, redirect_uri: impl Into<String>) {
        self.code = Some(code.into());
        self.redirect_uri = Some(redirect_uri.into());
    }

    /// Drops a pending authorization code the token endpoint rejected.
    pub fn discard_code(&mut self) {
        self.code = None;
        self.redirect_uri = None;
    }

    /// Records the access token after a successful code exchange.
    pub fn store_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Records a fresh channel snapshot.
    pub fn record_channel(&mut self, channel: Channel, now: Timestamp) {
        self.channel = Some(channel);
        self.channel_last_update = Some(now);
    }

    /// Whether the channel snapshot should be refreshed.
    ///
    /// True when forced, when no snapshot or timestamp exists, or when the
    /// snapshot is older than [`CHANNEL_REFRESH_INTERVAL_SECS`]; at most one
    /// refresh per interval otherwise.
    pub fn needs_channel_refresh(&self, now: Timestamp, force: bool) -> bool {
        if force || self.channel.is_none() {
            return true;
        }
        match self.channel_last_update {
            None => true,
            Some(last) => now.as_second() > last.as_second() + CHANNEL_REFRESH_INTERVAL_SECS,
        }
    }

    /// Removes the channel authorization: code, token, and snapshot.
    ///
    /// Credentials and the site-follower counter survive a disconnect.
    pub fn disconnect(&mut self) {
        self.code = None;
        self.redirect_uri = None;
        self.token = None;
        self.channel = None;
        self.channel_last_update = None;
        tracing::info!("removed channel authorization");
    }

    /// Counts a follow that came through the site.
    pub fn record_site_follow(&mut self) {
        self.followers_from_site += 1;
    }
}

/// JSON file store for [`Settings`].
///
/// A missing file loads as defaults; saving writes the whole record back.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Opens the store at the platform config location, creating the
    /// directory if needed (e.g. `~/.config/twitch-pack/settings.json` on
    /// Linux).
    pub fn open_default() -> eyre::Result<Self> {
        let dirs = directories::ProjectDirs::from("tv", "twitch-pack", "twitch-pack")
            .ok_or_else(|| eyre::eyre!("could not determine a config directory"))?;
        let config_dir = dirs.config_dir();
        std::fs::create_dir_all(config_dir)
            .with_context(|| format!("create config directory {}", config_dir.display()))?;
        Ok(Self::new(config_dir.join("settings.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the settings, or defaults when no file exists yet.
    pub async fn load(&self) -> eyre::Result<Settings> {
        if !tokio::fs::try_exists(&self.path)
            .await
            .with_context(|| format!("probe {}", self.path.display()))?
        {
            tracing::debug!(path = %self.path.display(), "no settings file, using defaults");
            return Ok(Settings::default());
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("read {}", self.path.display()))?;
        serde_json::from_str(&contents).context("parse settings file")
    }

    /// Persists the settings record.
    pub async fn save(&self, settings: &Settings) -> eyre::Result<()> {
        let contents =
            serde_json::to_string_pretty(settings).context("serialize settings")?;
        tokio::fs::write(&self.path, contents)
            .await
            .with_context(|| format!("write {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "saved settings");
        Ok(())
    }
}
