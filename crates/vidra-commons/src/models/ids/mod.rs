//! Type-safe id wrappers.
//!
//! External identifiers are opaque UUID strings. Wrapping them keeps
//! a member id from being handed to a function expecting a room id,
//! and concentrates the validation that matters when ids end up in
//! pub/sub topic names and object-store keys.

mod invitation_id;
mod member_id;
mod message_id;
mod room_id;
mod video_id;

pub use invitation_id::InvitationId;
pub use member_id::{IdValidationError, MemberId};
pub use message_id::MessageId;
pub use room_id::RoomId;
pub use video_id::VideoId;
