// Vidra streaming service binary

use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Result;
use log::{info, warn};
use tokio::sync::watch;

use vidra_broker::RedisJobQueue;
use vidra_filestore::{build_object_store, BlobStore};
use vidra_session::connect_redis;
use vidra_store::{connect_pool, ensure_schema, PgVideoRepo};
use vidra_streaming::{
    routes, FfmpegTranscoder, JobProcessor, StreamingConfig, StreamingService, TranscodeWorker,
};

#[actix_web::main]
async fn main() -> Result<()> {
    let config_path = std::env::var("VIDRA_STREAMING_CONFIG")
        .unwrap_or_else(|_| "config/streaming.toml".to_string());
    let config = StreamingConfig::from_file(&config_path)?;

    vidra_commons::logging::init_logging(&config.logging.level);
    info!(
        "starting vidra-streaming v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.server.bind_addr()
    );

    let pool = connect_pool(
        &config.postgres.url(),
        config.postgres.max_connections,
        config.postgres.retry_count,
        config.postgres.retry_interval(),
    )
    .await?;
    ensure_schema(&pool).await?;

    let redis = connect_redis(
        &config.redis.url(),
        config.redis.retry_count,
        config.redis.retry_interval(),
    )
    .await?;

    let videos = Arc::new(PgVideoRepo::new(pool));
    let blobs = BlobStore::new(build_object_store(&config.object_store)?);
    let queue = RedisJobQueue::new(redis, config.queue.max_attempts);
    queue.ensure_group().await?;

    let service = web::Data::new(StreamingService::new(
        videos.clone(),
        blobs.clone(),
        Arc::new(queue.clone()),
        &config.tmp_dir,
        &config.public_base_url,
    ));

    // the transcoding consumer runs beside the HTTP surface and is
    // cancelled through the shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = TranscodeWorker::new(
        queue,
        JobProcessor::new(
            videos,
            blobs,
            Arc::new(FfmpegTranscoder::new()),
            &config.tmp_dir,
        ),
        Duration::from_secs(config.queue.nack_backoff_secs),
        format!("transcoder-{}", std::process::id()),
    );
    let worker_handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

    let bind_addr = config.server.bind_addr();
    let workers = config.server.workers;

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(service.clone())
            .configure(routes::configure_routes)
    })
    .bind(&bind_addr)?
    .workers(if workers == 0 { num_cpus::get() } else { workers })
    .run()
    .await?;

    if shutdown_tx.send(true).is_err() {
        warn!("transcode worker already gone at shutdown");
    }
    let _ = worker_handle.await;

    info!("streaming service shutdown complete");
    Ok(())
}
