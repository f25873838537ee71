use clap::Parser; // for cli
use forum_gate::{build_router, config::Args, state::AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

// this is main async function with tokio
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // parse cli arguments
    let args = Args::parse();
    let state = AppState::load(&args)?;
    let app = build_router(state.clone());

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Forum running on http://localhost:{}", args.port);
    info!("Forum pages under {}/", state.forum_prefix);
    info!("Flood cooldown: {} seconds", args.flood_cooldown);
    info!(
        "Post length: {}..={} characters",
        args.post_min_length, args.post_max_length
    );
    if args.no_csrf {
        info!("CSRF check disabled");
    }

    axum::serve(listener, app).await?;
    Ok(())
}
