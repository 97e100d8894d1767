use log::*;
use service::config::Config;
use service::logging::Logger;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    info!("Starting Common Stories backend in {} mode", config.runtime_env());

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to connect to the database: {e}");
            std::process::exit(1);
        }
    };

    // Maintenance mode: sweep expired session rows and exit. Run from cron.
    if config.cleanup_expired_sessions {
        match domain::login::sweep_expired_sessions(&db).await {
            Ok(_) => return,
            Err(e) => {
                error!("Expired-session cleanup failed: {e:?}");
                std::process::exit(1);
            }
        }
    }

    let interface = config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = config.port;

    let app_state = match web::AppState::new(config, &db) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application state: {e:?}");
            std::process::exit(1);
        }
    };

    let router = web::router::define_routes(app_state);

    let address = format!("{interface}:{port}");
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {address}: {e}");
            std::process::exit(1);
        }
    };

    info!("Server starting... listening for connections on http://{address}");

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}
