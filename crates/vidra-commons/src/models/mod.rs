//! Domain models shared across the Vidra services.

pub mod ids;
pub mod member;
pub mod message;
pub mod role;
pub mod room;
pub mod video;
