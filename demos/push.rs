use std::time::{Duration, Instant};

use metrics_push::{buf::log_error, HttpPushClient, MetricsBuffer, PushConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::var("PUSHGATEWAY_URL").unwrap_or_else(|_| "http://127.0.0.1:9091".into());
    let client = HttpPushClient::with_timeout(url, Duration::from_secs(5));
    let config = PushConfig::new().job("demo").group("instance", "local");
    let mut metrics = MetricsBuffer::new(client, config).on_error(log_error);

    let start = Instant::now();
    let mut processed = 0;
    for i in 0..16 {
        std::thread::sleep(Duration::from_millis(50));
        processed += 1;
        metrics.gauge("demo_progress", f64::from(i) / 16.0);
    }
    metrics.measure("demo_items_processed", processed);
    metrics.increment("demo_runs");
    metrics.timing_duration("demo_elapsed_ms", start.elapsed());
    if std::env::args().any(|arg| arg == "--remove") {
        metrics.remove();
        println!("removed job demo from {}", metrics.client().url());
        return;
    }
    metrics.flush();
    println!("pushed {} lines to {}", metrics.len(), metrics.client().url());
}
