//! Twitch Channels API types.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A `channel` resource describes a Twitch channel.
///
/// This is the object returned by the v5 `channel` endpoint for the
/// authorized channel owner, and the subset of it embedded in stream and
/// follow responses. Only the fields the bridge actually uses are decoded.
///
/// See: <https://dev.twitch.tv/docs/v5/reference/channels/>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// The ID Twitch uses to uniquely identify the channel.
    #[serde(rename = "_id")]
    pub id: String,
    /// The channel's login name.
    pub name: String,
    /// The channel's display name, as shown on the channel page.
    pub display_name: String,
    /// The channel page URL.
    pub url: String,
    /// The channel's current title ("status" in Twitch terms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// The game the channel was last playing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<String>,
    /// Total follower count.
    #[serde(default)]
    pub followers: u64,
    /// Total channel view count.
    #[serde(default)]
    pub views: u64,
    /// Whether the channel is a Twitch partner.
    #[serde(default)]
    pub partner: bool,
    /// URL of the channel's logo image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// The owner's email address.
    ///
    /// Only present when fetched with the owner's `channel_read` scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// When the channel was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_an_owner_channel_response() {
        let channel: Channel = serde_json::from_str(
            r#"{
                "_id": "44322889",
                "name": "dallas",
                "display_name": "dallas",
                "url": "https://www.twitch.tv/dallas",
                "status": "The Finest Programming",
                "game": "Creative",
                "followers": 40,
                "views": 232,
                "partner": false,
                "logo": "https://static-cdn.jtvnw.net/jtv_user_pictures/dallas.png",
                "email": "dallas@example.com",
                "created_at": "2013-06-03T19:12:02Z",
                "broadcaster_language": "en",
                "mature": true
            }"#,
        )
        .unwrap();

        assert_eq!(channel.id, "44322889");
        assert_eq!(channel.display_name, "dallas");
        assert_eq!(channel.followers, 40);
        assert!(!channel.partner);
        assert_eq!(channel.email.as_deref(), Some("dallas@example.com"));
    }

    #[test]
    fn embedded_channel_objects_lack_owner_fields() {
        // Follow and stream responses embed a channel without the email.
        let channel: Channel = serde_json::from_str(
            r#"{
                "_id": "44322889",
                "name": "dallas",
                "display_name": "dallas",
                "url": "https://www.twitch.tv/dallas",
                "followers": 40,
                "views": 232,
                "partner": false
            }"#,
        )
        .unwrap();

        assert_eq!(channel.email, None);
        assert_eq!(channel.game, None);
    }
}
