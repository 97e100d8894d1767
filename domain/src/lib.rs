//! Business logic for the Common Stories backend.
//!
//! The interesting part of this layer is the session-to-OAuth-token bridge:
//! [`session_gate`] decides per request whether to proceed, silently refresh
//! the underlying access token, or reject; [`login`] turns a PKCE
//! authorization code into a session. Everything else on the platform
//! consumes the authenticated identity these two produce.

pub use entity::{organizations, roles, sessions, users, Id};

pub mod error;
pub mod gateway;
pub mod login;
pub mod session_gate;
pub mod user_profile;
