use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

use crate::{config::Settings, page::render_html, pipeline::Pipeline};

#[derive(Clone)]
pub struct DashboardState {
    pub settings: Settings,
}

pub fn router(settings: Settings) -> Router {
    Router::new()
        .route("/", get(index))
        .with_state(DashboardState { settings })
}

pub async fn serve_dashboard(settings: Settings) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.dashboard_host, settings.dashboard_port)
        .parse()
        .with_context(|| {
            format!(
                "dashboard addr {}:{}",
                settings.dashboard_host, settings.dashboard_port
            )
        })?;

    let app = router(settings);

    log::info!("dashboard.start url=http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("dashboard.stop");
        })
        .await?;
    Ok(())
}

/// Runs the whole blocking pipeline for every page view.
async fn index(State(st): State<DashboardState>) -> impl IntoResponse {
    let settings = st.settings.clone();
    let rendered = tokio::task::spawn_blocking(move || -> Result<String> {
        let dash = Pipeline::new(settings)?.run()?;
        Ok(render_html(&dash.page)?)
    })
    .await;

    match rendered {
        Ok(Ok(html)) => Html(html).into_response(),
        Ok(Err(e)) => {
            log::error!("dashboard.error {:#}", e);
            (StatusCode::BAD_GATEWAY, format!("{e:#}")).into_response()
        }
        Err(e) => {
            log::error!("dashboard.error join {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
