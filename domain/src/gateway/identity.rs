//! OAuth client for the external identity server.
//!
//! Builds a configured `identity-auth` client from process configuration so
//! the rest of the domain layer never reads config fields for it.

use std::time::Duration;

use identity_auth::oauth::{Client, ClientConfig};
use secrecy::SecretString;
use service::config::Config;

use crate::error::Error;

/// Create a new client for the configured authorization server.
pub fn new_client(config: &Config) -> Result<Client, Error> {
    let client_config = ClientConfig {
        server_url: config.oauth_server_url().to_string(),
        client_id: config.oauth_client_id().to_string(),
        client_secret: SecretString::from(config.oauth_client_secret()),
        redirect_uri: config.oauth_redirect_uri().to_string(),
        scope: config.oauth_scope().to_string(),
        authorize_url: config.oauth_authorize_url(),
        token_url: config.oauth_token_url(),
        userinfo_url: config.oauth_userinfo_url(),
        timeout: Duration::from_secs(config.oauth_http_timeout_secs),
    };

    Ok(Client::new(client_config)?)
}
