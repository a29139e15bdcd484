// Vidra gateway binary

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Result;
use log::info;

use vidra_gateway::clients::BackendClients;
use vidra_gateway::{routes, GatewayConfig};

#[actix_web::main]
async fn main() -> Result<()> {
    let config_path = std::env::var("VIDRA_GATEWAY_CONFIG")
        .unwrap_or_else(|_| "config/gateway.toml".to_string());
    let config = GatewayConfig::from_file(&config_path)?;

    vidra_commons::logging::init_logging(&config.logging.level);
    info!(
        "starting vidra-gateway v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.server.bind_addr()
    );

    let clients = web::Data::new(BackendClients::new(
        &config.services.member_url,
        &config.services.streaming_url,
    ));
    let jwt_secret = config.auth.secret();

    let bind_addr = config.server.bind_addr();
    let workers = config.server.workers;

    HttpServer::new(move || {
        let jwt_secret = jwt_secret.clone();
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(clients.clone())
            .configure(|cfg| routes::configure_routes(cfg, &jwt_secret))
    })
    .bind(&bind_addr)?
    .workers(if workers == 0 { num_cpus::get() } else { workers })
    .run()
    .await?;

    info!("gateway shutdown complete");
    Ok(())
}
