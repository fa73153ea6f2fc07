use std::{net::SocketAddr, path::PathBuf};

use axum::{
    Router,
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use page_visits::{AppState, Template, VisitCounter, VisitsSummary, WebServer, router};
use tower::ServiceExt;

const TEMPLATE: &str =
    "{{ title }}|{{ page_user_visits }}|{{ page_total_visits }}|{{ user_total_visits }}|{{ total_visits }}";

fn static_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static")
}

fn remote(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, last_octet], 40000))
}

fn create_state(template: &str) -> AppState {
    AppState::new(
        VisitCounter::new(),
        Template::parse(template).unwrap(),
        vec!["/favicon.ico".to_string()],
    )
}

fn create_app(state: &AppState, remote: SocketAddr) -> Router {
    router(state.clone(), &static_dir()).layer(MockConnectInfo(remote))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();

    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_page_visit_is_counted_before_render() {
    let state = create_state(TEMPLATE);
    let app = create_app(&state, remote(1));

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Home|1|1|1|1");

    let (_, body) = get(&app, "/").await;
    assert_eq!(body, "Home|2|2|2|2");
}

#[tokio::test]
async fn test_trailing_slash_is_same_page() {
    let state = create_state(TEMPLATE);
    let app = create_app(&state, remote(1));

    get(&app, "/about/").await;
    let (_, body) = get(&app, "/about").await;

    assert_eq!(body, "About|2|2|2|2");
    assert_eq!(state.counter().page_total_visits("/about"), 2);
}

#[tokio::test]
async fn test_visits_per_user() {
    let state = create_state(TEMPLATE);
    let alice = create_app(&state, remote(1));
    let bob = create_app(&state, remote(2));

    get(&alice, "/docs").await;
    get(&alice, "/").await;
    let (_, body) = get(&bob, "/docs").await;

    // bob: 1 visit here, 2 on the page, 1 overall, 3 in total
    assert_eq!(body, "Docs|1|2|1|3");

    let counter = state.counter();
    assert_eq!(counter.page_user_visits("/docs", "10.0.0.1:40000"), 1);
    assert_eq!(counter.user_total_visits("10.0.0.1:40000"), 2);
    assert_eq!(counter.total_visits(), 3);
}

#[tokio::test]
async fn test_ignored_page_is_rendered_but_not_counted() {
    let state = create_state(TEMPLATE);
    let app = create_app(&state, remote(1));

    let (status, body) = get(&app, "/favicon.ico").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Favicon.Ico|0|0|0|0");
    assert_eq!(state.counter().total_visits(), 0);
}

#[tokio::test]
async fn test_static_files_are_not_counted() {
    let state = create_state(TEMPLATE);
    let app = create_app(&state, remote(1));

    let (status, body) = get(&app, "/static/style.css").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("font-family"));

    let (status, _) = get(&app, "/static/missing.css").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(state.counter().total_visits(), 0);
}

#[tokio::test]
async fn test_visits_summary() {
    let state = create_state(TEMPLATE);
    let alice = create_app(&state, remote(1));
    let bob = create_app(&state, remote(2));

    get(&alice, "/about").await;
    get(&alice, "/about").await;
    get(&bob, "/about").await;
    get(&bob, "/").await;

    let (status, body) = get(&alice, "/api/visits?page=/about/").await;
    assert_eq!(status, StatusCode::OK);
    let summary: VisitsSummary = serde_json::from_str(&body).unwrap();
    assert_eq!(
        summary,
        VisitsSummary {
            page_user_visits: 2,
            page_total_visits: 3,
            user_total_visits: 2,
            total_visits: 4,
        }
    );

    // root page by default, and the summary itself is not a visit
    let (_, body) = get(&bob, "/api/visits").await;
    let summary: VisitsSummary = serde_json::from_str(&body).unwrap();
    assert_eq!(summary.page_user_visits, 1);
    assert_eq!(summary.page_total_visits, 1);
    assert_eq!(summary.user_total_visits, 2);
    assert_eq!(summary.total_visits, 4);
}

#[tokio::test]
async fn test_render_error_keeps_count() {
    let state = create_state("{{ title }} {{ unknown }}");
    let app = create_app(&state, remote(1));

    let (status, body) = get(&app, "/broken").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("unknown"));
    assert_eq!(state.counter().page_user_visits("/broken", "10.0.0.1:40000"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests() {
    const REQUESTS: u64 = 200;

    let state = create_state(TEMPLATE);
    let app = create_app(&state, remote(1));

    let handles: Vec<_> = (0..REQUESTS)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { get(&app, "/busy").await })
        })
        .collect();
    for handle in handles {
        let (status, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    let counter = state.counter();
    assert_eq!(counter.page_user_visits("/busy", "10.0.0.1:40000"), REQUESTS);
    assert_eq!(counter.total_visits(), REQUESTS);
}

#[tokio::test]
async fn test_serve_over_tcp() {
    let state = create_state(TEMPLATE);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = WebServer::with_state(state.clone(), &static_dir());
    tokio::spawn(server.serve(listener));

    let client = reqwest::Client::new();

    let body = client
        .get(format!("http://{addr}/hello%20world/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.starts_with("Hello World|"));

    client
        .get(format!("http://{addr}/hello%20world"))
        .send()
        .await
        .unwrap();

    let summary: VisitsSummary = client
        .get(format!("http://{addr}/api/visits"))
        .query(&[("page", "/hello world")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // the remote port may change between connections, so only check page-wide numbers
    assert_eq!(summary.page_total_visits, 2);
    assert_eq!(summary.total_visits, 2);
    assert_eq!(state.counter().page_total_visits("/hello world"), 2);
}
