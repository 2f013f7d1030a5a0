//! janua-auth 服务入口。

use janua_adapter_postgres::{check_connection, create_pool, PostgresConfig};
use janua_bootstrap::{init_runtime, shutdown_signal};
use janua_config::AppConfig;
use secrecy::ExposeSecret;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let config = AppConfig::load(&config_dir)?;

    init_runtime(&config);

    let pool = create_pool(
        &PostgresConfig::new(config.database.url.expose_secret())
            .with_max_connections(config.database.max_connections),
    )
    .await?;
    check_connection(&pool).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let engine = janua_auth::build_engine(&config, pool)?;
    // 传输层尚未接入,这里只保证引擎可用并等待关闭信号。
    let _ = &engine.auth;
    let _ = &engine.oauth2;

    info!(app_name = %config.app_name, "Authentication engine ready");
    shutdown_signal().await;
    info!("Shutting down");

    Ok(())
}
