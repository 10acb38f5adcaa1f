use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use textfx::{Engine, GeneratorConfig, Mode, TemplateCatalog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(3000);

    let mode = match std::env::var("TEXTFX_MODE").ok().as_deref() {
        None | Some("protocol") => Mode::Protocol,
        Some("dom") => Mode::Dom,
        Some(other) => anyhow::bail!("Unknown TEXTFX_MODE: {}", other),
    };

    let config = GeneratorConfig {
        mode,
        ..Default::default()
    };
    let engine = Engine::new(TemplateCatalog::builtin(), config)?;
    let app = textfx::server::router(Arc::new(engine));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("textfx listening on http://{} (mode: {:?})", addr, mode);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
