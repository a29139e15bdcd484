// Vidra chat service binary

use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Result;
use log::info;

use vidra_broker::{RedisChatPublisher, RedisChatSubscriber};
use vidra_chat::messages::MessageService;
use vidra_chat::rooms::RoomService;
use vidra_chat::routes::{self, AuthContext};
use vidra_chat::{ChatConfig, ChatServices};
use vidra_session::connect_redis;
use vidra_store::{connect_pool, ensure_schema, PgInvitationRepo, PgMessageRepo, PgRoomRepo};

#[actix_web::main]
async fn main() -> Result<()> {
    let config_path =
        std::env::var("VIDRA_CHAT_CONFIG").unwrap_or_else(|_| "config/chat.toml".to_string());
    let config = ChatConfig::from_file(&config_path)?;

    vidra_commons::logging::init_logging(&config.logging.level);
    info!(
        "starting vidra-chat v{} on {}",
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

    let redis_conn = connect_redis(
        &config.redis.url(),
        config.redis.retry_count,
        config.redis.retry_interval(),
    )
    .await?;
    let subscriber = RedisChatSubscriber::from_url(&config.redis.url())?;

    let room_repo = Arc::new(PgRoomRepo::new(pool.clone()));
    let services = web::Data::new(ChatServices::new(
        RoomService::new(room_repo.clone(), Arc::new(PgInvitationRepo::new(pool.clone()))),
        MessageService::new(
            room_repo,
            Arc::new(PgMessageRepo::new(pool)),
            Arc::new(RedisChatPublisher::new(redis_conn)),
        ),
    ));
    let subscriber = web::Data::new(subscriber);
    let auth = web::Data::new(AuthContext {
        jwt_secret: config.auth.secret(),
    });

    let bind_addr = config.server.bind_addr();
    let workers = config.server.workers;

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(services.clone())
            .app_data(subscriber.clone())
            .app_data(auth.clone())
            .configure(routes::configure_routes)
    })
    .bind(&bind_addr)?
    .workers(if workers == 0 { num_cpus::get() } else { workers })
    .run()
    .await?;

    info!("chat service shutdown complete");
    Ok(())
}
