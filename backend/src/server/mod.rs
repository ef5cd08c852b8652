//! Server construction, background loops and shutdown.

mod config;
mod state_builders;

pub use config::AppSettings;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use color_eyre::eyre::{Result, WrapErr};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use backend::Trace;
use backend::doc::openapi_json;
use backend::domain::background::{TokioSleeper, run_loop};
use backend::inbound::http::health::HealthState;
use backend::inbound::http::routes::configure;
use backend::inbound::http::state::HttpState;
use backend::outbound::persistence::DbPool;

use state_builders::{Backend, ScheduledTask, build_backend};

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .configure(configure)
        .service(openapi_json)
}

fn spawn_loops(tasks: Vec<ScheduledTask>, shutdown: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
    let sleeper = Arc::new(TokioSleeper);
    tasks
        .into_iter()
        .map(|ScheduledTask { task, schedule }| {
            tokio::spawn(run_loop(task, sleeper.clone(), schedule, shutdown.clone()))
        })
        .collect()
}

/// Open the pool, start the background loops and serve HTTP until the
/// process is asked to stop.
///
/// # Errors
///
/// Fails when configuration is incomplete, the pool cannot be opened or the
/// listener cannot bind.
pub async fn run(settings: AppSettings) -> Result<()> {
    let bind_addr = settings.bind_addr()?;
    let pool = DbPool::new(settings.pool_config()?)
        .await
        .wrap_err("failed to open database pool")?;
    let Backend { http_state, tasks } = build_backend(&settings, &pool)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loops = spawn_loops(tasks, &shutdown_rx);

    let health_state = web::Data::new(HealthState::new());
    let http_state = web::Data::new(http_state);
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || build_app(server_health_state.clone(), http_state.clone()))
        .bind(bind_addr)
        .wrap_err_with(|| format!("failed to bind {bind_addr}"))?
        .run();

    health_state.mark_ready();
    info!(%bind_addr, "reviews backend listening");
    let served = server.await;

    health_state.mark_unhealthy();
    if shutdown_tx.send(true).is_err() {
        warn!("background loops already stopped");
    }
    for handle in loops {
        if let Err(err) = handle.await {
            warn!(error = %err, "background loop ended abnormally");
        }
    }
    info!("reviews backend stopped");
    served.wrap_err("http server failed")
}
