//! # vidra-commons
//!
//! Shared foundation for the Vidra services: type-safe identifiers,
//! domain models, the common error taxonomy, RPC envelopes,
//! configuration loading and logging initialization.
//!
//! Everything that crosses a crate or process boundary lives here so
//! the service crates agree on one vocabulary.

pub mod config;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod models;
pub mod rpc;

pub use errors::{CommonError, Result};
pub use models::ids::{InvitationId, MemberId, MessageId, RoomId, VideoId};
pub use models::member::{Member, MemberStatus, SessionRecord};
pub use models::message::{bucket_date, today_bucket_date, ChatMessage, MessageBucket, RoomUnreadInfo};
pub use models::role::Role;
pub use models::room::{Invitation, InvitationStatus, JoinMode, Room, RoomType};
pub use models::video::{TranscodingJob, Video, VideoStatus, VideoType};
