use super::*;
use crate::pipeline::ItemProcessor;
use crate::pipeline::test_helpers::{
    Generation, MockGenerator, Mocks, fast_report_policy, output_in,
};
use crate::types::Event;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;


/// Orchestrator over in-memory collaborators, plus the mocks and scratch dir
struct TestApp {
    orchestrator: Arc<BatchOrchestrator>,
    mocks: Mocks,
    _dir: TempDir,
}

impl TestApp {
    fn new(generator: MockGenerator) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mocks = Mocks::new(generator);
        let processor = ItemProcessor::new(output_in(dir.path()), &mocks.services());
        let orchestrator = Arc::new(BatchOrchestrator::new(
            Arc::new(processor),
            mocks.sink.clone(),
            fast_report_policy(),
        ));
        Self {
            orchestrator,
            mocks,
            _dir: dir,
        }
    }

    fn router(&self) -> Router {
        self.router_with(Config::default())
    }

    fn router_with(&self, config: Config) -> Router {
        create_router(self.orchestrator.clone(), Arc::new(config))
    }
}

fn slow_generator(prompt: &str, delay: Duration) -> MockGenerator {
    let mut generator = MockGenerator::scripted(&[(prompt, Generation::Images(1))]);
    generator.delays.insert(prompt.to_string(), delay);
    generator
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Wait for BatchCompleted (or BatchAborted) on `rx`
async fn wait_for_batch_end(rx: &mut tokio::sync::broadcast::Receiver<Event>) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(Event::BatchCompleted { .. } | Event::BatchAborted { .. }) => return,
                Ok(_) => continue,
                Err(e) => panic!("event channel closed: {}", e),
            }
        }
    })
    .await
    .expect("batch did not finish in time");
}

#[tokio::test]
async fn test_api_server_stops_on_shutdown_signal() {
    let app = TestApp::new(MockGenerator::default());
    let mut config = Config::default();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(start_api_server_with_shutdown(
        app.orchestrator.clone(),
        Arc::new(config),
        async move {
            rx.await.ok();
        },
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_api_server_reports_bind_failure() {
    let app = TestApp::new(MockGenerator::default());
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = Config::default();
    config.api.bind_address = occupied.local_addr().unwrap();

    let result = start_api_server(app.orchestrator.clone(), Arc::new(config)).await;
    assert!(matches!(result, Err(crate::Error::Io(_))));
}

#[tokio::test]
async fn test_cors_enabled() {
    let app = TestApp::new(MockGenerator::default());

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let app = TestApp::new(MockGenerator::default());
    let mut config = Config::default();
    config.api.cors_enabled = false;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.router_with(config).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let app = TestApp::new(MockGenerator::default());
    let mut config = Config::default();
    config.api.cors_origins = vec!["https://studio.example.com".to_string()];
    let router = app.router_with(config);

    let allowed = Request::builder()
        .uri("/health")
        .header("Origin", "https://studio.example.com")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(allowed).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "https://studio.example.com"
    );

    let other = Request::builder()
        .uri("/health")
        .header("Origin", "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(other).await.unwrap();
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}
