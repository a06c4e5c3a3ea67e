use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use turbo_feed::{
    article::FixtureStore,
    config::FeedSettings,
    feed::{
        comment::NoComments, fragment_namespace, render::NodeRenderer, ContentAssembler,
        FeedBuilder, FeedVariant, FragmentCache, MokaFragmentCache, NoopFragmentCache,
    },
    http::{router, AppState, FragmentPrimer, WarmUp},
};

#[derive(Parser)]
#[command(name = "turbo-feed")]
#[command(about = "RSS and Yandex Turbo feed service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[arg(short, long, default_value = "3005")]
    port: u16,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long)]
    debug: bool,

    #[arg(long, value_enum, default_value_t = FeedVariant::YandexTurbo)]
    variant: FeedVariant,

    /// Directory of pre-rendered `<slug>.xml` item fragments to load on each request
    #[arg(long)]
    fragments_dir: Option<PathBuf>,

    /// Serve cached item fragments instead of re-rendering them
    #[arg(long)]
    use_cached_fragments: bool,

    #[arg(long, default_value = "10000")]
    cache_capacity: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("turbo_feed={filter_level},tower_http=info").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    dotenvy::dotenv().ok();

    let mut settings = FeedSettings::from_env(args.variant)?;
    settings.use_cached_fragments |= args.use_cached_fragments;

    let cache: Arc<dyn FragmentCache> = if settings.use_cached_fragments || args.fragments_dir.is_some() {
        Arc::new(MokaFragmentCache::new(args.cache_capacity))
    } else {
        Arc::new(NoopFragmentCache)
    };

    let mut warm_ups: Vec<Arc<dyn WarmUp>> = Vec::new();
    if let Some(dir) = &args.fragments_dir {
        warm_ups.push(Arc::new(FragmentPrimer::new(
            dir.clone(),
            &fragment_namespace(settings.variant, settings.secure_links),
            cache.clone(),
        )));
    }

    let store = FixtureStore::bundled()?;
    info!("serving {} articles as a {} feed", store.len(), settings.variant);

    let assembler = ContentAssembler::new(
        Arc::new(NodeRenderer),
        Arc::new(NoComments),
        settings.comments_limit,
    );
    let feed = FeedBuilder::new(Arc::new(settings), Arc::new(store), assembler, cache);
    let app = router(AppState::new(feed, warm_ups));

    let bind_addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    info!("feed server started on {}", bind_addr);
    info!("   curl http://{}/feed", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from([
            "turbo-feed",
            "--port",
            "9000",
            "--debug",
            "--variant",
            "generic",
            "--fragments-dir",
            "/tmp/fragments",
        ])
        .unwrap();

        assert_eq!(args.port, 9000);
        assert!(args.debug);
        assert_eq!(args.variant, FeedVariant::Generic);
        assert_eq!(args.fragments_dir, Some(PathBuf::from("/tmp/fragments")));
        assert!(!args.use_cached_fragments);
    }

    #[test]
    fn test_default_variant() {
        let args = Args::try_parse_from(["turbo-feed"]).unwrap();
        assert_eq!(args.variant, FeedVariant::YandexTurbo);
        assert_eq!(args.port, 3005);
    }
}
