use anyhow::Result;
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use vigia_common::status::Role;
use vigia_common::types::CreateUserRequest;
use vigia_storage::Store;

use vigia_server::app;
use vigia_server::catalog_seed;
use vigia_server::config::{self, ServerConfig};
use vigia_server::state::AppState;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  vigia-server [config.toml]                                 Start the server");
    eprintln!("  vigia-server init-catalogs <config.toml> [seed.json]       Sync catalogs (built-in defaults when seed omitted)");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vigia=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("init-catalogs") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-catalogs requires <config.toml> argument")
            })?;
            run_init_catalogs(config_path, args.get(3).map(String::as_str)).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

async fn open_store(config: &ServerConfig) -> Result<Store> {
    let db_url = config.database.connection_url();
    Store::new(&db_url, &config.database.data_path()).await
}

/// Initialize catalogs.
/// - With `seed_path`: import entries from a JSON seed file
/// - Without `seed_path`: sync the built-in catalogs
async fn run_init_catalogs(config_path: &str, seed_path: Option<&str>) -> Result<()> {
    let config = config::ServerConfig::load(config_path)?;
    let store = open_store(&config).await?;
    if let Some(path) = seed_path {
        catalog_seed::init_from_seed_file(&store, path).await?;
    } else {
        catalog_seed::init_default_catalogs(&store).await?;
    }
    Ok(())
}

fn random_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

async fn ensure_default_admin(store: &Store, config: &ServerConfig) {
    match store.count_users().await {
        Ok(0) => {
            let req = CreateUserRequest {
                username: config.auth.default_username.clone(),
                password: config.auth.default_password.clone(),
                email: config.auth.default_email.clone(),
                first_name: "Administrador".to_string(),
                paternal_surname: "Sistema".to_string(),
                maternal_surname: None,
                phone: None,
                position: None,
                role: Some(Role::Administrator),
            };
            match store.create_user(&req).await {
                Ok(user) => {
                    tracing::info!(username = %user.username, "Created default admin account");
                    if config.auth.default_password == "changeme" {
                        tracing::warn!("Default admin uses the stock password. Change it after first login.");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create default admin account");
                }
            }
        }
        Ok(count) => {
            tracing::info!(
                count,
                "Users table already has accounts, skipping default admin creation"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to check users table");
        }
    }
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = config::ServerConfig::load(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        data_dir = %config.database.data_dir,
        db = %config.database.redacted_url(),
        "vigia-server starting"
    );

    let store = Arc::new(open_store(&config).await?);

    if let Err(e) = catalog_seed::init_default_catalogs(&store).await {
        tracing::error!(error = %e, "Failed to initialize default catalogs");
    }

    ensure_default_admin(&store, &config).await;

    // JWT secret: use configured value or generate random
    let jwt_secret = match &config.auth.jwt_secret {
        Some(secret) if !secret.is_empty() => Arc::new(secret.clone()),
        _ => {
            tracing::warn!("No jwt_secret configured. A random secret was generated and will change on restart. Set [auth].jwt_secret in config for production use.");
            Arc::new(random_secret())
        }
    };

    let state = AppState {
        store,
        start_time: Utc::now(),
        jwt_secret,
        token_expire_secs: config.auth.token_expire_secs,
        config: Arc::new(config.clone()),
    };

    let app = app::build_http_app(state);
    let http_addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!(http = %http_addr, "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutting down gracefully");
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
