//! Route-level tests: drive the full router with `oneshot` and observe
//! emitted exception reports through a recording sink.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use hookshot_core::{HookError, HookService, Mapping, ServiceHandle};
use hookshot_server::network::NetworkConfig;
use hookshot_server::report::{ExceptionReport, ExceptionReporter, ReportSink};
use hookshot_server::service::{DispatchConfig, JSON_CONTENT_TYPE, LONG_HOOK_MESSAGE};
use hookshot_server::{Dispatcher, NetworkModule, ServiceRegistry};
use parking_lot::Mutex;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingSink {
    reports: Mutex<Vec<ExceptionReport>>,
}

impl RecordingSink {
    fn reports(&self) -> Vec<ExceptionReport> {
        self.reports.lock().clone()
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn deliver(&self, report: &ExceptionReport) -> anyhow::Result<()> {
        self.reports.lock().push(report.clone());
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl ReportSink for FailingSink {
    async fn deliver(&self, _report: &ExceptionReport) -> anyhow::Result<()> {
        anyhow::bail!("collector unreachable")
    }
}

#[derive(Clone, Copy)]
enum Script {
    Ack,
    Ignore,
    Fail(fn() -> HookError),
    Panic,
    Sleep(Duration),
}

struct Scripted {
    name: &'static str,
    title: &'static str,
    diagnostic: bool,
    script: Script,
}

impl Scripted {
    fn new(name: &'static str, script: Script) -> Self {
        Self {
            name,
            title: "Scripted",
            diagnostic: false,
            script,
        }
    }
}

#[async_trait]
impl HookService for Scripted {
    fn hook_name(&self) -> &'static str {
        self.name
    }

    fn title(&self) -> &'static str {
        self.title
    }

    fn is_diagnostic(&self) -> bool {
        self.diagnostic
    }

    async fn receive(
        &self,
        _event: &str,
        _data: &Mapping,
        _payload: &Mapping,
    ) -> Result<Option<ServiceHandle>, HookError> {
        match self.script {
            Script::Ack => Ok(Some(ServiceHandle::ok())),
            Script::Ignore => Ok(None),
            Script::Fail(make) => Err(make()),
            Script::Panic => panic!("handler bug"),
            Script::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                Ok(Some(ServiceHandle::ok()))
            }
        }
    }
}

fn services() -> Vec<Scripted> {
    vec![
        Scripted {
            title: "Acknowledger",
            ..Scripted::new("ack", Script::Ack)
        },
        Scripted::new("quiet", Script::Ignore),
        Scripted::new("conf", Script::Fail(|| HookError::configuration("Missing token"))),
        Scripted::new("down", Script::Fail(|| HookError::connection_failed("Connection refused"))),
        Scripted::new("late", Script::Fail(|| HookError::timeout("read timed out"))),
        Scripted::new("gone", Script::Fail(|| HookError::missing("Repository not found"))),
        Scripted::new("boom", Script::Fail(|| anyhow::anyhow!("kaboom").into())),
        Scripted::new("panicky", Script::Panic),
        Scripted::new("sleepy", Script::Sleep(Duration::from_secs(10))),
        Scripted::new("steady", Script::Sleep(Duration::from_secs(9))),
        Scripted {
            diagnostic: true,
            ..Scripted::new("selftest", Script::Sleep(Duration::from_secs(10)))
        },
        Scripted {
            diagnostic: true,
            ..Scripted::new("selfboom", Script::Fail(|| anyhow::anyhow!("diag failure").into()))
        },
    ]
}

fn module_with_sink(sink: Arc<dyn ReportSink>) -> NetworkModule {
    let mut builder = ServiceRegistry::builder();
    for service in services() {
        builder.register(service).unwrap();
    }
    let reporter = ExceptionReporter::with_sink("github-services", "test-host", sink);
    let dispatcher = Dispatcher::new(
        Arc::new(builder.build()),
        Arc::new(reporter),
        DispatchConfig::default(),
    );
    NetworkModule::new(NetworkConfig::default(), Arc::new(dispatcher))
}

fn router_with_sink(sink: Arc<dyn ReportSink>) -> Router {
    module_with_sink(sink).build_router()
}

fn router() -> (Router, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    (router_with_sink(sink.clone()), sink)
}

fn json_event(path: &str, body: &str) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(Body::from(body.to_string()))
        .unwrap()
}

const EMPTY_EVENT: &str = r#"{"data": {}, "payload": {}}"#;

async fn send(router: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

// ---------------------------------------------------------------------------
// Discovery and liveness
// ---------------------------------------------------------------------------

#[tokio::test]
async fn discovery_route_returns_title() {
    let (router, _) = router();
    let (status, body) = send(router, Request::get("/ack").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Acknowledger");
}

#[tokio::test]
async fn root_is_a_liveness_probe() {
    let (router, _) = router();
    let (status, body) = send(router, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn health_lists_registered_services() {
    let (router, _) = router();
    let (status, body) = send(router, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["services"], services().len());
    assert_eq!(json["in_flight"], 0);
}

#[tokio::test]
async fn unknown_hook_is_a_router_404() {
    let (router, sink) = router();
    let (status, _) = send(router, json_event("/nope/push", EMPTY_EVENT)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(sink.reports().is_empty());
}

// ---------------------------------------------------------------------------
// Outcome classification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn handled_event_is_200_with_acknowledgement() {
    let (router, sink) = router();
    let (status, body) = send(router, json_event("/ack/push", EMPTY_EVENT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
    assert!(sink.reports().is_empty());
}

#[tokio::test]
async fn form_encoded_event_is_dispatched() {
    let (router, _) = router();
    let request = Request::post("/ack/push")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("data=%7B%7D&payload=%7B%22ref%22%3A%22main%22%7D"))
        .unwrap();
    let (status, body) = send(router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn ignored_event_is_200_with_explanation() {
    let (router, sink) = router();
    let (status, body) = send(router, json_event("/quiet/issues", EMPTY_EVENT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "quiet Service does not respond to 'issues' events");
    assert!(sink.reports().is_empty());
}

#[tokio::test]
async fn classified_failures_map_to_statuses_without_reports() {
    let cases = [
        ("/conf/push", StatusCode::BAD_REQUEST, "Missing token"),
        ("/down/push", StatusCode::SERVICE_UNAVAILABLE, "Connection refused"),
        ("/late/push", StatusCode::GATEWAY_TIMEOUT, "Service Timeout"),
        ("/gone/push", StatusCode::NOT_FOUND, "Repository not found"),
    ];
    for (path, expected_status, expected_body) in cases {
        let (router, sink) = router();
        let (status, body) = send(router, json_event(path, EMPTY_EVENT)).await;
        assert_eq!(status, expected_status, "{path}");
        assert_eq!(body, expected_body, "{path}");
        assert!(sink.reports().is_empty(), "{path}");
    }
}

#[tokio::test]
async fn unclassified_failure_is_500_with_one_report() {
    let (router, sink) = router();
    let (status, body) = send(
        router,
        json_event("/boom/push", r#"{"data": {"token": "secret"}, "payload": {"ref": "main"}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "ERROR");

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.service_name, "boom");
    assert_eq!(report.server, "test-host");
    assert_eq!(report.message, "kaboom");
    assert!(!report.rollup_hash.is_empty());
    assert_eq!(report.event.as_deref(), Some("push"));
    assert!(report.service_data.is_none());
    assert!(report.payload.is_none());
    assert!(report.duration.is_none());
}

#[tokio::test]
async fn diagnostic_failure_report_carries_its_data() {
    let (router, sink) = router();
    let (status, _) = send(
        router,
        json_event("/selfboom/push", r#"{"data": {"url": "http://x"}, "payload": {"a": 1}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].service_data.as_deref(), Some(r#"{"url":"http://x"}"#));
    assert_eq!(reports[0].payload.as_deref(), Some(r#"{"a":1}"#));
}

#[tokio::test]
async fn panicking_handler_is_500_with_one_report() {
    let (router, sink) = router();
    let (status, body) = send(router, json_event("/panicky/push", EMPTY_EVENT)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "ERROR");
    assert_eq!(sink.reports().len(), 1);
}

#[tokio::test]
async fn malformed_body_is_500_with_one_report() {
    let (router, sink) = router();
    let (status, body) = send(router, json_event("/ack/push", "{not json")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "ERROR");
    assert_eq!(sink.reports().len(), 1);
    assert_eq!(sink.reports()[0].service_name, "ack");
}

#[tokio::test]
async fn events_after_shutdown_are_refused() {
    let sink = Arc::new(RecordingSink::default());
    let module = module_with_sink(sink.clone());
    module.shutdown_controller().trigger_shutdown();
    let router = module.build_router();

    let (status, body) = send(router.clone(), json_event("/boom/push", EMPTY_EVENT)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Server Shutting Down");
    assert!(sink.reports().is_empty());

    let (_, health) = send(router, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert!(health.contains(r#""state":"draining""#));
}

#[tokio::test]
async fn plain_json_body_is_500_with_one_report() {
    let (router, sink) = router();
    let request = Request::post("/ack/push")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(EMPTY_EVENT))
        .unwrap();
    let (status, body) = send(router, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "ERROR");
    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].message, "missing `data` parameter");
}

// ---------------------------------------------------------------------------
// Slow hooks
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn slow_hook_keeps_its_outcome_and_is_reported() {
    let (router, sink) = router();
    let (status, body) = send(router, json_event("/sleepy/push", EMPTY_EVENT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].message, LONG_HOOK_MESSAGE);
    let duration = reports[0].duration.as_deref().unwrap();
    assert!(duration.starts_with("10") && duration.ends_with('s'), "{duration}");
}

#[tokio::test(start_paused = true)]
async fn hook_at_threshold_is_not_reported() {
    let (router, sink) = router();
    let (status, _) = send(router, json_event("/steady/push", EMPTY_EVENT)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(sink.reports().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_diagnostic_hook_is_exempt() {
    let (router, sink) = router();
    let (status, _) = send(router, json_event("/selftest/push", EMPTY_EVENT)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(sink.reports().is_empty());
}

// ---------------------------------------------------------------------------
// Reporter resilience
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_collector_does_not_change_the_response() {
    let router = router_with_sink(Arc::new(FailingSink));
    let (status, body) = send(router, json_event("/boom/push", EMPTY_EVENT)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "ERROR");
}
