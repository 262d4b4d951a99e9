use std::{
    net::TcpListener as StdTcpListener,
    sync::{Arc, Mutex},
    time::Duration,
};

use metrics_push::{exporter::CONTENT_TYPE, HttpPushClient, MetricsBuffer, PushConfig};
use poem::{
    handler,
    http::{Method, StatusCode},
    listener::TcpListener,
    web::Data,
    EndpointExt, Request, Server,
};
use tokio::task;

#[derive(Debug, Clone, PartialEq)]
struct Recorded {
    method: Method,
    path: String,
    content_type: Option<String>,
    body: String,
}

#[derive(Debug)]
struct FakeGateway {
    requests: Mutex<Vec<Recorded>>,
    status: StatusCode,
}

#[handler]
async fn record(req: &Request, body: String, Data(gw): Data<&Arc<FakeGateway>>) -> StatusCode {
    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    gw.requests.lock().unwrap().push(Recorded {
        method: req.method().clone(),
        path: req.uri().path().to_owned(),
        content_type,
        body,
    });
    gw.status
}

/// Serves the fake gateway on a free port and returns its base URL.
async fn serve(status: StatusCode) -> (Arc<FakeGateway>, String, task::JoinHandle<()>) {
    let gw = Arc::new(FakeGateway {
        requests: Mutex::new(vec![]),
        status,
    });
    let app = record.data(gw.clone());

    let std_listener = StdTcpListener::bind("127.0.0.1:0").expect("bind std listener");
    let port = std_listener.local_addr().expect("local addr").port();
    drop(std_listener);

    let listener = TcpListener::bind(format!("127.0.0.1:{port}"));
    let server = tokio::spawn(async move {
        Server::new(listener).run(app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    (gw, format!("http://127.0.0.1:{port}"), server)
}

fn buffer(url: String) -> MetricsBuffer<HttpPushClient> {
    let client = HttpPushClient::with_timeout(url, Duration::from_secs(5));
    let config = PushConfig::new().job("nightly").group("instance", "db-1");
    MetricsBuffer::new(client, config)
}

#[tokio::test]
async fn flush_puts_buffered_lines() {
    let (gw, url, server) = serve(StatusCode::OK).await;

    task::spawn_blocking(move || {
        let mut buf = buffer(url);
        buf.measure_at("jobs_done", 3, 1000);
        buf.gauge("queue_depth", 0.5);
        buf.try_flush()
    })
    .await
    .expect("join")
    .expect("flush ok");

    let requests = gw.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.method, Method::PUT);
    assert_eq!(req.path, "/metrics/job/nightly/instance/db-1");
    assert_eq!(req.content_type.as_deref(), Some(CONTENT_TYPE));
    let mut lines = req.body.lines();
    assert_eq!(lines.next(), Some("jobs_done 3 1000"));
    assert!(lines
        .next()
        .unwrap()
        .starts_with("queue_depth 0.500000000000000000 "));
    assert_eq!(lines.next(), None);

    server.abort();
}

#[tokio::test]
async fn remove_deletes_group() {
    let (gw, url, server) = serve(StatusCode::ACCEPTED).await;

    task::spawn_blocking(move || buffer(url).try_remove())
        .await
        .expect("join")
        .expect("remove ok");

    let requests = gw.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::DELETE);
    assert_eq!(requests[0].path, "/metrics/job/nightly/instance/db-1");

    server.abort();
}

#[tokio::test]
async fn gateway_errors_are_suppressed_by_default() {
    let (gw, url, server) = serve(StatusCode::INTERNAL_SERVER_ERROR).await;

    let (surfaced, handled) = task::spawn_blocking(move || {
        let handled = Arc::new(Mutex::new(0));
        let counter = handled.clone();
        let mut buf = buffer(url).on_error(move |_| *counter.lock().unwrap() += 1);
        buf.increment("attempts");
        buf.flush();
        buf.remove();
        let surfaced = buf.try_flush().is_err();
        let handled = *handled.lock().unwrap();
        (surfaced, handled)
    })
    .await
    .expect("join");

    assert!(surfaced);
    assert_eq!(handled, 2);
    assert_eq!(gw.requests.lock().unwrap().len(), 3);

    server.abort();
}

#[tokio::test]
async fn unreachable_gateway_is_suppressed() {
    let port = {
        let std_listener = StdTcpListener::bind("127.0.0.1:0").expect("bind std listener");
        std_listener.local_addr().expect("local addr").port()
    };
    let url = format!("http://127.0.0.1:{port}");

    let surfaced = task::spawn_blocking(move || {
        let mut buf = buffer(url);
        buf.increment("attempts");
        buf.flush();
        buf.remove();
        buf.try_flush().is_err()
    })
    .await
    .expect("join");

    assert!(surfaced);
}

#[tokio::test]
async fn dot_segment_label_keeps_its_own_group() {
    let (gw, url, server) = serve(StatusCode::ACCEPTED).await;

    task::spawn_blocking(move || {
        let client = HttpPushClient::with_timeout(url, Duration::from_secs(5));
        let config = PushConfig::new().job("nightly").group("instance", "..");
        MetricsBuffer::new(client, config).try_remove()
    })
    .await
    .expect("join")
    .expect("remove ok");

    let requests = gw.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::DELETE);
    assert_eq!(requests[0].path, "/metrics/job/nightly/instance@base64/Li4=");

    server.abort();
}
