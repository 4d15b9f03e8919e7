//! Twitch Videos API types.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Response structure for the v5 `channels/{channel_id}/videos` call.
///
/// See: <https://dev.twitch.tv/docs/v5/reference/channels/>
#[derive(Debug, Serialize, Deserialize)]
pub struct VideoListResponse {
    /// The videos matching the request.
    pub videos: Vec<Video>,
    /// Total number of videos on the channel matching the filter.
    #[serde(rename = "_total", default)]
    pub total: u64,
}

/// A `video` resource describes a VOD on a channel.
///
/// Only the fields the bridge actually uses are decoded.
///
/// See: <https://dev.twitch.tv/docs/v5/reference/videos/>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// The ID Twitch uses to uniquely identify the video.
    #[serde(rename = "_id")]
    pub id: String,
    /// The video's title.
    pub title: String,
    /// The video's description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// What kind of VOD this is.
    pub broadcast_type: BroadcastType,
    /// The video page URL.
    pub url: String,
    /// Video length in seconds.
    #[serde(default)]
    pub length: u64,
    /// View count.
    #[serde(default)]
    pub views: u64,
    /// When the video was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<Timestamp>,
}

/// The kind of VOD, used both as a response field and as a listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastType {
    /// A past broadcast, automatically archived.
    Archive,
    /// A highlight cut from a past broadcast.
    Highlight,
    /// A manually uploaded video.
    Upload,
}

impl fmt::Display for BroadcastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive => write!(f, "archive"),
            Self::Highlight => write!(f, "highlight"),
            Self::Upload => write!(f, "upload"),
        }
    }
}

/// Query parameters for the video listing call.
#[derive(Debug, Clone, Default)]
pub struct VideoListParams {
    /// Restrict the listing to one kind of VOD.
    pub broadcast_type: Option<BroadcastType>,
    /// Maximum number of videos to return (Twitch caps this at 100).
    pub limit: Option<u32>,
    /// Offset into the full listing.
    pub offset: Option<u32>,
}

impl VideoListParams {
    /// Renders the parameters as query-string pairs.
    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(kind) = self.broadcast_type {
            query.push(("broadcast_type", kind.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            query.push(("offset", offset.to_string()));
        }
        query
    }
}
