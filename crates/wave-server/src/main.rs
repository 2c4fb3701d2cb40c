use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use wave_api::identity::JwtIdentity;
use wave_api::routes;
use wave_api::state::AppStateInner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wave=debug,wave_api=debug,wave_db=info,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("WAVE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let ttl = token_ttl(
        std::env::var("WAVE_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "30".into())
            .parse()?,
    )?;
    let db_path = std::env::var("WAVE_DB_PATH").unwrap_or_else(|_| "wave.db".into());
    let host = std::env::var("WAVE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("WAVE_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;

    if jwt_secret == "dev-secret-change-me" {
        warn!("WAVE_JWT_SECRET not set, using the development secret");
    }

    // Init database
    let db = Arc::new(wave_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let identity = JwtIdentity::new(db.clone(), jwt_secret, ttl);
    let state = AppStateInner::new(db, identity);

    let app = routes::router(state)
        .layer(cors_layer()?)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Wave server v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Token lifetime in whole days; must be positive and representable.
fn token_ttl(days: i64) -> anyhow::Result<chrono::Duration> {
    if days <= 0 {
        anyhow::bail!("WAVE_TOKEN_TTL_DAYS must be positive, got {}", days);
    }
    chrono::Duration::try_days(days)
        .ok_or_else(|| anyhow::anyhow!("WAVE_TOKEN_TTL_DAYS out of range: {}", days))
}

/// CORS from comma-separated `ORIGINS`, `ALLOW_METHODS` and `ALLOW_HEADERS`.
/// Unset or `*` origins fall back to a permissive layer.
fn cors_layer() -> anyhow::Result<CorsLayer> {
    let origins = std::env::var("ORIGINS").unwrap_or_default();
    if origins.trim().is_empty() || origins.trim() == "*" {
        return Ok(CorsLayer::permissive());
    }

    let origins = split_list(&origins)
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    let methods = match std::env::var("ALLOW_METHODS") {
        Ok(list) if list.trim() != "*" => AllowMethods::list(
            split_list(&list)
                .map(|m| m.parse::<Method>())
                .collect::<Result<Vec<_>, _>>()?,
        ),
        _ => AllowMethods::mirror_request(),
    };

    let headers = match std::env::var("ALLOW_HEADERS") {
        Ok(list) if list.trim() != "*" => AllowHeaders::list(
            split_list(&list)
                .map(|h| h.parse::<HeaderName>())
                .collect::<Result<Vec<_>, _>>()?,
        ),
        _ => AllowHeaders::mirror_request(),
    };

    info!("CORS restricted to {} origin(s)", origins.len());
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(true))
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|item| !item.is_empty())
}
