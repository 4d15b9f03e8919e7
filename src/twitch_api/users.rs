//! Twitch Users API types.

use crate::twitch_api::channels::Channel;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A `user` resource describes a Twitch account.
///
/// Returned by the v5 `user` endpoint for the account behind the presented
/// access token. Only the fields the bridge actually uses are decoded.
///
/// See: <https://dev.twitch.tv/docs/v5/reference/users/>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The ID Twitch uses to uniquely identify the user.
    #[serde(rename = "_id")]
    pub id: String,
    /// The user's login name.
    pub name: String,
    /// The user's display name.
    pub display_name: String,
    /// The user's bio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// URL of the user's logo image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// The user's email address.
    ///
    /// Only present with the `user_read` scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A follow relationship between a user and a channel.
///
/// Returned by `users/{user_id}/follows/channels/{channel_id}` both when
/// checking the relationship (GET) and when creating it (PUT). The endpoint
/// responds 404 when the user does not follow the channel.
///
/// See: <https://dev.twitch.tv/docs/v5/reference/users/>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowRelationship {
    /// When the follow was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    /// Whether the user receives notifications for the channel.
    #[serde(default)]
    pub notifications: bool,
    /// The followed channel.
    pub channel: Channel,
}
