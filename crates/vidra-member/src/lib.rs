//! # vidra-member
//!
//! The member service: registration, login/logout, forced logout,
//! session liveness and reconnect, exposed over HTTP/JSON RPC.
//!
//! The credential store owns identity; the session cache owns
//! liveness. A signed token asserts who you are, the cache entry
//! decides whether you are still logged in.

pub mod config;
pub mod handlers;
pub mod routes;
pub mod service;

pub use config::MemberConfig;
pub use service::MemberService;
