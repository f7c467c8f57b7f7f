use actix_web::{dev::Service, web, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feed_cache::{
    CacheMetrics, FeedCacheBackend, InMemoryFeedCache, RedisFeedCache, SharedFeedCache,
};
use feed_service::config::Config;
use feed_service::db::{PgPostRepository, PgProfileRepository, PostStore, ProfileGraph, ProfileStore};
use feed_service::handlers::{configure_profile_routes, configure_routes, HandlerState};
use feed_service::middleware::{JwtAuthMiddleware, JwtValidator};
use feed_service::{
    feed_event_queue, metrics, spawn_feed_event_workers, FeedFanoutWriter, FeedQueryService,
    PostService, ProfileService,
};

/// Upper bound on draining queued feed events at shutdown
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to load configuration")?;

    info!("Starting feed-service v{}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.env);

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to create database pool")?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations applied");
    }

    let posts: Arc<dyn PostStore> = Arc::new(PgPostRepository::new(pool.clone()));
    let profiles: Arc<dyn ProfileStore> = Arc::new(PgProfileRepository::new(pool.clone()));
    let graph = Arc::new(ProfileGraph::new(Arc::clone(&profiles)));

    let cache: SharedFeedCache = match config.cache.backend {
        FeedCacheBackend::InMemory => Arc::new(InMemoryFeedCache::new(graph)),
        FeedCacheBackend::Redis => {
            let redis = RedisFeedCache::connect(&config.cache.redis_url, graph, config.cache.ttl_secs)
                .await
                .context("Failed to connect to Redis feed cache")?;
            redis.ping().await.context("Redis feed cache health check failed")?;
            Arc::new(redis)
        }
    };
    info!(backend = cache.backend_name(), "Feed cache initialized");

    if let Err(e) = CacheMetrics::register(prometheus::default_registry()) {
        warn!("Failed to register feed cache metrics: {}", e);
    }

    // Fan-out runs off the request path
    let (publisher, receiver) = feed_event_queue(config.events.queue_capacity);
    let writer = Arc::new(FeedFanoutWriter::new(
        Arc::clone(&posts),
        Arc::clone(&profiles),
        Arc::clone(&cache),
    ));
    let dispatcher = spawn_feed_event_workers(writer, receiver, &config.events);

    let state = web::Data::new(HandlerState {
        posts: Arc::new(PostService::new(
            Arc::clone(&posts),
            Arc::clone(&profiles),
            publisher,
        )),
        feed: Arc::new(FeedQueryService::new(posts, Arc::clone(&profiles), cache)),
        profiles: Arc::new(ProfileService::new(profiles)),
    });

    let validator = Arc::new(
        JwtValidator::from_config(&config.jwt)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to initialize JWT validation")?,
    );

    let bind_addr = format!("{}:{}", config.app.host, config.app.port);
    info!("HTTP server listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .wrap_fn(|req, srv| {
                let method = req.method().to_string();
                let path = req
                    .match_pattern()
                    .unwrap_or_else(|| req.path().to_string());
                let start = Instant::now();

                let fut = srv.call(req);
                async move {
                    let res = fut.await;
                    let status = match &res {
                        Ok(res) => res.status().as_u16(),
                        Err(err) => err.as_response_error().status_code().as_u16(),
                    };
                    metrics::observe_http_request(&method, &path, status, start.elapsed());
                    res
                }
            })
            .service(
                web::scope("/api/posts")
                    .wrap(JwtAuthMiddleware::new(Arc::clone(&validator)))
                    .configure(configure_routes),
            )
            .service(
                web::scope("/api/profiles")
                    .wrap(JwtAuthMiddleware::new(Arc::clone(&validator)))
                    .configure(configure_profile_routes),
            )
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    // server and its handler state are gone; let queued events finish
    match tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, dispatcher).await {
        Ok(Ok(())) => info!("Feed event dispatcher drained"),
        Ok(Err(e)) => warn!("Feed event dispatcher failed: {}", e),
        Err(_) => warn!("Timed out draining feed events"),
    }

    Ok(())
}
