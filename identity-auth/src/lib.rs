//! Authentication toolkit for the Common Stories BFF.
//!
//! This crate talks to the external OAuth2 authorization server (code
//! exchange, refresh, userinfo), provides the PKCE primitives used by the
//! login flow, encrypts tokens for at-rest storage, and hosts the
//! client-side expiry advisor. It has no knowledge of sessions or the
//! database; those live in the layers above.

pub mod advisor;
pub mod encryption;
pub mod error;
pub mod oauth;

pub use error::Error;
