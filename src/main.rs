// Módulos de la aplicación
mod analysis;
mod api;
mod app_state;
mod config;
mod extract;
mod heuristic;
mod llm;
mod models;
mod normalize;

use crate::app_state::AppState;
use anyhow::Context;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 2. Cargar configuración (sin credencial del LLM no se arranca)
    let cfg = config::AppConfig::from_env().context("Error al cargar la configuración")?;
    info!(
        "Configuración cargada: entorno {:?}, proveedor {:?}, modelo '{}'",
        cfg.app_env, cfg.llm_provider, cfg.llm_chat_model
    );

    // 3. Inicializar gestor del LLM
    let llm_manager = llm::LlmManager::from_config(&cfg);

    // 4. Crear estado compartido de la aplicación
    let app_state = AppState::new(cfg, llm_manager);

    // 5. Configurar el router (API + formulario estático)
    let app = api::create_router(app_state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // 6. Iniciar el servidor
    let server_addr = &app_state.config.server_addr;
    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {server_addr}"))?;
    let server_url = format!("http://{}", server_addr);
    info!("🚀 Servidor escuchando en {}", &server_url);

    if app_state.config.open_browser && webbrowser::open(&server_url).is_err() {
        info!("No se pudo abrir el navegador. Por favor, accede a {} manualmente.", server_url);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await
        .context("Error sirviendo peticiones")?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}
