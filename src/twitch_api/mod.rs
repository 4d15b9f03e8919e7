//! Twitch v5 API client library.
//!
//! One module per API resource (channels, streams, videos, users), with
//! [`client::TwitchClient`] holding the shared authenticated request path.
//! The bridge touches only a handful of endpoints:
//!
//! - `channel` — the connected channel object (title, game, followers)
//! - `streams/{id}` — live status, `null` when offline
//! - `channels/{id}/videos` — VOD listings, filterable by broadcast type
//! - `user` — the account behind an access token
//! - `users/{uid}/follows/channels/{cid}` — follow check (GET) and
//!   follow (PUT)
//!
//! Stream and video reads are cached with fixed TTLs; see [`crate::cache`].

pub mod channels;
pub mod client;
pub mod streams;
pub mod users;
pub mod videos;

// Re-export main types for convenience
pub use client::TwitchClient;

pub use channels::Channel;
pub use streams::{Stream, StreamResponse, StreamStatus};
pub use users::{FollowRelationship, User};
pub use videos::{BroadcastType, Video, VideoListParams, VideoListResponse};
