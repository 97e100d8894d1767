use domain::session_gate::SessionGate;
use sea_orm::DatabaseConnection;
use service::config::Config;
use std::sync::Arc;

pub(crate) mod controller;
pub mod error;
pub mod extractors;
pub(crate) mod middleware;
pub mod router;

pub use error::{Error, Result};

/// Application state passed into the Router. Carries the infrastructure
/// handles plus the long-lived session gate, whose per-session refresh
/// locks must survive across requests.
#[derive(Clone)]
pub struct AppState {
    pub database_connection: Arc<DatabaseConnection>,
    pub config: Config,
    pub session_gate: Arc<SessionGate>,
}

impl AppState {
    pub fn new(config: Config, db: &Arc<DatabaseConnection>) -> Result<Self> {
        let session_gate = Arc::new(SessionGate::from_config(&config)?);
        Ok(Self {
            database_connection: Arc::clone(db),
            config,
            session_gate,
        })
    }

    pub fn db_conn_ref(&self) -> &DatabaseConnection {
        self.database_connection.as_ref()
    }
}
