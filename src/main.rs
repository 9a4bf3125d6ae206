//! event-stream-broker server binary.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use event_stream_broker::config::Config;
use event_stream_broker::handlers::{create_router, AppState};
use event_stream_broker::ports::app_existence::{HttpApplicationExistenceChecker, InMemoryApplicationExistenceChecker};
use event_stream_broker::ports::blacklist::{InMemoryBlacklist, RedisBlacklist};
use event_stream_broker::ports::consumer_factory::KafkaConsumerFactory;
use event_stream_broker::ports::event_type_repo::{HttpEventTypeRepository, InMemoryEventTypeRepository};
use event_stream_broker::ports::feature_toggles::InMemoryFeatureToggleService;
use event_stream_broker::ports::scope_checker::AllowAllMatchingScopeChecker;
use event_stream_broker::ports::stats_source::InMemorySubscriptionStatsSource;
use event_stream_broker::ports::subscription_store::memory::InMemorySubscriptionStore;
use event_stream_broker::ports::subscription_store::postgres::PgSubscriptionStore;
use event_stream_broker::ports::{
    ApplicationExistenceChecker, Blacklist, ConsumerFactory, EventTypeRepository, FeatureToggleService,
    SubscriptionStatsSource, SubscriptionStore,
};
use event_stream_broker::streaming::SystemClock;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let matches = Command::new("broker-server")
        .version("0.1.0")
        .author("Event Streaming Team")
        .about("HTTP-fronted event-streaming broker")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Server port")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(Arg::new("host").long("host").value_name("HOST").help("Server host"))
        .arg(
            Arg::new("validate-config")
                .long("validate-config")
                .help("Validate configuration and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").unwrap();

    let mut config = Config::from_file(config_path).unwrap_or_else(|err| {
        tracing::warn!(%err, path = %config_path, "falling back to defaults + environment overrides");
        Config::from_env().expect("default configuration must be valid")
    });

    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }
    if let Some(host) = matches.get_one::<String>("host") {
        config.server.host = host.clone();
    }
    config.validate().context("configuration validation failed")?;

    if matches.get_flag("validate-config") {
        info!("configuration is valid");
        return Ok(());
    }

    let config = Arc::new(config);
    let state = build_app_state(config.clone()).await?;

    let app = create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(if config.server.enable_cors {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
            }),
    );

    let addr = SocketAddr::new(config.server.host.parse().context("invalid server host")?, config.server.port);

    info!(%addr, "starting event-stream-broker");

    let listener = tokio::net::TcpListener::bind(&addr).await.context("failed to bind to address")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shutdown complete");
    Ok(())
}

async fn build_app_state(config: Arc<Config>) -> Result<AppState> {
    let subscription_store: Arc<dyn SubscriptionStore> = if config.store.subscription_store_url == "memory" {
        Arc::new(InMemorySubscriptionStore::new())
    } else {
        let pool = sqlx::PgPool::connect(&config.store.subscription_store_url)
            .await
            .context("failed to connect to subscription store")?;
        Arc::new(PgSubscriptionStore::new(pool))
    };

    let blacklist: Arc<dyn Blacklist> = match &config.store.blacklist_redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("invalid blacklist redis url")?;
            Arc::new(RedisBlacklist::new(client))
        }
        None => Arc::new(InMemoryBlacklist::new()),
    };

    let http_client = reqwest::Client::new();
    let (event_type_repo, app_existence): (Arc<dyn EventTypeRepository>, Arc<dyn ApplicationExistenceChecker>) =
        match &config.store.metadata_service_base_url {
            Some(base_url) => (
                Arc::new(HttpEventTypeRepository::new(http_client.clone(), base_url.clone())),
                Arc::new(HttpApplicationExistenceChecker::new(http_client, base_url.clone())),
            ),
            None => (
                Arc::new(InMemoryEventTypeRepository::new()),
                Arc::new(InMemoryApplicationExistenceChecker::new()),
            ),
        };

    let consumer_factory: Arc<dyn ConsumerFactory> = Arc::new(KafkaConsumerFactory::new(
        config.consumer.kafka_bootstrap_servers.clone().unwrap_or_else(|| "localhost:9092".to_string()),
        Duration::from_millis(config.consumer.poll_budget_ms),
    ));

    let feature_toggles: Arc<dyn FeatureToggleService> = {
        let toggles = InMemoryFeatureToggleService::with_defaults();
        toggles.set(event_stream_broker::ports::feature_toggles::HIGH_LEVEL_API, config.toggles.high_level_api);
        toggles.set(
            event_stream_broker::ports::feature_toggles::CHECK_OWNING_APPLICATION,
            config.toggles.check_owning_application,
        );
        toggles.set(
            event_stream_broker::ports::feature_toggles::SEND_BATCH_VIA_OUTPUT_STREAM,
            config.toggles.send_batch_via_output_stream,
        );
        Arc::new(toggles)
    };

    let stats_source: Arc<dyn SubscriptionStatsSource> = Arc::new(InMemorySubscriptionStatsSource::new());

    Ok(AppState {
        config,
        subscription_store,
        event_type_repo,
        app_existence,
        scope_checker: Arc::new(AllowAllMatchingScopeChecker),
        feature_toggles,
        blacklist,
        stats_source,
        consumer_factory,
        clock: Arc::new(SystemClock::new()),
    })
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "event_stream_broker=info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
