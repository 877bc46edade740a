mod app_state;
mod handlers;
mod routes;

use std::io;
use std::path::Path;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing_subscriber::EnvFilter;

use bfield_maps::build_field_manager;
use bfield_maps::config::load_config_from_env;
use bfield_maps::utils::resolver::SearchPath;

use app_state::AppState;

const DEFAULT_CONFIG_PATH: &str = "config/bfield.json";

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 磁场图必须在启动时完整加载，任何错误都直接退出
    let (config, config_path) = load_config_from_env(Path::new(DEFAULT_CONFIG_PATH))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let resolver = SearchPath::from_config_and_env(&config.search_path);
    let manager = build_field_manager(&config, &resolver).map_err(|e| {
        tracing::error!(target: "bfield::server", error = %e, "field_manager.load_failed");
        io::Error::other(e)
    })?;

    for map in manager.maps() {
        tracing::info!(
            target: "bfield::server",
            key = map.key(),
            defined = map.defined_count(),
            "map.registered"
        );
    }

    let app_state = web::Data::new(AppState {
        manager: Arc::new(manager),
        config_path: config_path.display().to_string(),
    });

    tracing::info!(target: "bfield::server", addr = "http://127.0.0.1:8080", "server.starting");
    tracing::info!(target: "bfield::server", "GET / - 服务信息");
    tracing::info!(target: "bfield::server", "GET /field?x=<mm>&y=<mm>&z=<mm> - 查询磁场");
    tracing::info!(target: "bfield::server", "GET /maps - 已加载的磁场图");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind(("127.0.0.1", 8080))?
    .run()
    .await
}
