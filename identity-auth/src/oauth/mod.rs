//! OAuth 2.0 client pieces: token/userinfo exchanges and PKCE.

mod client;
mod pkce;
mod token;

pub use client::{Client, ClientConfig, RefreshError, UserInfo};
pub use pkce::{generate_state, PkceChallenge, PkceVerifier};
pub use token::{TokenResponse, TokenSet};
