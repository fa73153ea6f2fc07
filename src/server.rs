use std::{
    collections::HashSet,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{ConnectInfo, Query, Request, State},
    http::Uri,
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, info_span};

use crate::{
    VisitsQueryParams, VisitsSummary,
    config::{HttpConfig, ServerConfig},
    counter::VisitCounter,
    error::AppError,
    page::{canonical_page_id, page_id, page_title, user_id},
    template::Template,
};

#[derive(Clone)]
pub struct AppState {
    counter: VisitCounter,
    template: Arc<Template>,
    ignored_pages: Arc<HashSet<String>>,
}

impl AppState {
    pub fn new(counter: VisitCounter, template: Template, ignored_pages: Vec<String>) -> Self {
        Self {
            counter,
            template: Arc::new(template),
            ignored_pages: Arc::new(ignored_pages.into_iter().collect()),
        }
    }

    pub fn counter(&self) -> &VisitCounter {
        &self.counter
    }
}

#[derive(Serialize)]
struct PageData {
    home: bool,
    title: String,
    page_user_visits: u64,
    page_total_visits: u64,
    user_total_visits: u64,
    total_visits: u64,
}

pub struct WebServer {
    state: AppState,
    static_dir: PathBuf,
}

impl WebServer {
    /// Loads the page template and creates the process-wide counter.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let template = Template::load(&config.paths.template)
            .with_context(|| format!("Failed to load template {:?}", config.paths.template))?;
        let state = AppState::new(VisitCounter::new(), template, config.ignored_pages.clone());

        Ok(Self::with_state(state, &config.paths.static_dir))
    }

    pub fn with_state(state: AppState, static_dir: &Path) -> Self {
        Self {
            state,
            static_dir: static_dir.to_path_buf(),
        }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone(), &self.static_dir)
    }

    pub async fn start(self, config: HttpConfig) -> Result<()> {
        let addr = SocketAddr::new(config.host, config.port);
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        self.serve(listener).await
    }

    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let router = self.router();

        info!("Starting web server on http://{}", listener.local_addr()?);
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }
}

/// Builds the application routes.
///
/// Handlers read the visitor address from [`ConnectInfo`], so the router has to
/// be served with connect info (or given a `MockConnectInfo` layer in tests).
pub fn router(state: AppState, static_dir: &Path) -> Router {
    // count runs first, then log, then render
    let pages = Router::new()
        .fallback(render_page)
        .layer(middleware::from_fn(log_visits))
        .layer(middleware::from_fn_with_state(state.clone(), count_visits));

    let counter = Arc::new(AtomicUsize::new(0));

    Router::new()
        .route("/api/visits", get(visits_summary))
        .nest_service("/static", ServeDir::new(static_dir))
        .merge(pages)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(move |request: &Request| {
                let req_id = counter.fetch_add(1, Ordering::Relaxed);
                info_span!(
                    "http_request",
                    req_id,
                    method = ?request.method(),
                    path = ?request.uri(),
                )
            }),
        )
}

async fn count_visits(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let page = page_id(request.uri().path());
    if !state.ignored_pages.contains(&page) {
        state.counter.increment(&page, &user_id(remote));
    }

    next.run(request).await
}

async fn log_visits(
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    info!("visit: {} - {}", remote, request.uri().path());

    next.run(request).await
}

async fn render_page(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    uri: Uri,
) -> Result<Html<String>, AppError> {
    let page = page_id(uri.path());
    let user = user_id(remote);
    let counter = &state.counter;

    let data = PageData {
        home: page.is_empty(),
        title: page_title(uri.path()),
        page_user_visits: counter.page_user_visits(&page, &user),
        page_total_visits: counter.page_total_visits(&page),
        user_total_visits: counter.user_total_visits(&user),
        total_visits: counter.total_visits(),
    };

    Ok(Html(state.template.render(&data)?))
}

async fn visits_summary(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Query(params): Query<VisitsQueryParams>,
) -> impl IntoResponse {
    let page = canonical_page_id(params.page.unwrap_or_default());
    let user = user_id(remote);
    let counter = &state.counter;

    Json(VisitsSummary {
        page_user_visits: counter.page_user_visits(&page, &user),
        page_total_visits: counter.page_total_visits(&page),
        user_total_visits: counter.user_total_visits(&user),
        total_visits: counter.total_visits(),
    })
}
