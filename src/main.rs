use coinfolio::providers::{BinanceProvider, CoinGeckoProvider, CoinbaseProvider};
use coinfolio::{api, config::Config, db::init_db, PriceProvider, PriceResolver, Repository};
use coinfolio::resolver::ResolverOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));

    // Fallback chain, in priority order. The resolver adds the synthetic
    // terminal stage itself.
    let providers: Vec<Arc<dyn PriceProvider>> = vec![
        Arc::new(BinanceProvider::new(
            config.binance_api_url.clone(),
            config.binance_api_key.clone(),
        )),
        Arc::new(CoinGeckoProvider::new(config.coingecko_api_url.clone())),
        Arc::new(CoinbaseProvider::new(config.coinbase_api_url.clone())),
    ];
    let resolver = Arc::new(PriceResolver::new(
        providers,
        ResolverOptions {
            current_ttl: Duration::from_secs(config.current_ttl_secs),
            history_ttl: Duration::from_secs(config.history_ttl_secs),
            provider_timeout: Duration::from_secs(config.provider_timeout_secs),
            max_concurrent: config.max_concurrent_fetches,
        },
    ));

    // Create router
    let app = api::create_router(api::AppState::new(repo, resolver, config));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
