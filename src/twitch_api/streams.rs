//! Twitch Streams API types.

use crate::twitch_api::channels::Channel;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Response structure for the v5 `streams/{channel_id}` call.
///
/// The `stream` member is `null` when the channel is offline; that is a
/// normal response, not a failure.
///
/// See: <https://dev.twitch.tv/docs/v5/reference/streams/>
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamResponse {
    /// The live stream, or `None` when the channel is offline.
    pub stream: Option<Stream>,
}

/// A `stream` resource describes a live broadcast on a channel.
///
/// Only the fields the bridge actually uses are decoded.
///
/// See: <https://dev.twitch.tv/docs/v5/reference/streams/>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stream {
    /// The ID Twitch assigns to this live session.
    #[serde(rename = "_id")]
    pub id: u64,
    /// The game being streamed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<String>,
    /// Current concurrent viewer count.
    #[serde(default)]
    pub viewers: u64,
    /// When the stream went live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    /// The channel that is streaming.
    pub channel: Channel,
}

/// Summary of a channel's live status, derived from [`StreamResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StreamStatus {
    /// The channel is live, playing `game` if known.
    Live {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game: Option<String>,
    },
    /// The channel is offline.
    Offline,
}

impl StreamStatus {
    /// Derives the status summary from an optional live stream.
    pub fn from_stream(stream: Option<&Stream>) -> Self {
        match stream {
            Some(stream) => Self::Live {
                game: stream.game.clone(),
            },
            None => Self::Offline,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live { game: Some(game) } => write!(f, "live ({game})"),
            Self::Live { game: None } => write!(f, "live"),
            Self::Offline => write!(f, "offline"),
        }
    }
}
