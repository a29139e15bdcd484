//! # vidra-store
//!
//! Durable storage for the Vidra services: Postgres repositories
//! behind async traits so the use cases stay testable with in-memory
//! doubles.
//!
//! The credential store is plain relational; rooms, invitations and
//! the day-bucketed chat messages use `TEXT[]`/JSONB columns so the
//! document-shaped chat data keeps its one-bucket-per-day layout, and
//! bucket appends can be expressed as commutative server-side array
//! appends instead of racy read-modify-write cycles.

pub mod error;
pub mod invitation_repo;
pub mod member_repo;
pub mod message_repo;
pub mod pool;
pub mod room_repo;
pub mod video_repo;

pub use error::{StoreError, StoreResult};
pub use invitation_repo::{InvitationRepo, PgInvitationRepo};
pub use member_repo::{MemberRepo, NewMember, PgMemberRepo};
pub use message_repo::{MarkReadOutcome, MessageRepo, PgMessageRepo};
pub use pool::{connect_pool, ensure_schema};
pub use room_repo::{PgRoomRepo, RoomRepo};
pub use video_repo::{NewVideo, PgVideoRepo, VideoRepo};
