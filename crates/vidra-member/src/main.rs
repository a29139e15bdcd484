// Vidra member service binary

use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Result;
use log::info;

use vidra_member::{routes, MemberConfig, MemberService};
use vidra_session::{connect_redis, RedisKvStore, SessionStore};
use vidra_store::{connect_pool, ensure_schema, PgMemberRepo};

#[actix_web::main]
async fn main() -> Result<()> {
    let config_path = std::env::var("VIDRA_MEMBER_CONFIG")
        .unwrap_or_else(|_| "config/member.toml".to_string());
    let config = MemberConfig::from_file(&config_path)?;

    vidra_commons::logging::init_logging(&config.logging.level);
    info!(
        "starting vidra-member v{} on {}",
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

    let sessions = SessionStore::new(
        Arc::new(RedisKvStore::new(redis)),
        config.auth.session_ttl(),
    );
    let service = web::Data::new(MemberService::new(
        Arc::new(PgMemberRepo::new(pool)),
        sessions,
        config.auth.secret(),
        config.auth.bcrypt_cost,
    ));

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

    info!("member service shutdown complete");
    Ok(())
}
