//! Latency driver against a running hangar server. Not a cargo-harness
//! bench: start a server, then `cargo bench`.
//!
//! HANGAR_HOST / HANGAR_PORT select the target (default 127.0.0.1:5433).

use std::time::{Duration, Instant};

use tokio_postgres::{Config, NoTls};
use ulid::Ulid;

const HOUR: i64 = 3_600_000;

async fn connect(host: &str, port: u16) -> tokio_postgres::Client {
    let mut config = Config::new();
    config
        .host(host)
        .port(port)
        .dbname(format!("bench-{}", Ulid::new()))
        .user("owner")
        .password("hangar");

    let (client, conn) = config.connect(NoTls).await.expect("connect failed");
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            eprintln!("connection error: {e}");
        }
    });
    client
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

async fn bench_sequential_bookings(client: &tokio_postgres::Client, n: usize) {
    let mut latencies = Vec::with_capacity(n);
    for i in 0..n {
        let id = Ulid::new();
        let start = (i as i64) * 2 * HOUR;
        let end = start + HOUR;
        let sql = format!(
            r#"INSERT INTO bookings (id, start, "end") VALUES ('{id}', {start}, {end})"#
        );
        let t = Instant::now();
        client.batch_execute(&sql).await.expect("insert failed");
        latencies.push(t.elapsed());
    }
    print_latency("sequential bookings", &mut latencies);
}

async fn bench_conflict_rejections(client: &tokio_postgres::Client, n: usize) {
    // Every proposal lands on the already-booked first slot
    let mut latencies = Vec::with_capacity(n);
    for _ in 0..n {
        let id = Ulid::new();
        let sql = format!(
            r#"INSERT INTO bookings (id, start, "end") VALUES ('{id}', 0, {HOUR})"#
        );
        let t = Instant::now();
        let result = client.batch_execute(&sql).await;
        latencies.push(t.elapsed());
        assert!(result.is_err(), "conflict expected");
    }
    print_latency("conflict rejections", &mut latencies);
}

async fn bench_availability_queries(client: &tokio_postgres::Client, n: usize, window_end: i64) {
    let mut latencies = Vec::with_capacity(n);
    for _ in 0..n {
        let sql = format!(
            "SELECT * FROM availability WHERE start >= 0 AND \"end\" <= {window_end}"
        );
        let t = Instant::now();
        client.simple_query(&sql).await.expect("query failed");
        latencies.push(t.elapsed());
    }
    print_latency("availability queries", &mut latencies);
}

#[tokio::main]
async fn main() {
    let host = std::env::var("HANGAR_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port: u16 = std::env::var("HANGAR_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5433);

    println!("hangar stress bench against {host}:{port}");
    let client = connect(&host, port).await;

    let bookings = 500;
    bench_sequential_bookings(&client, bookings).await;
    bench_conflict_rejections(&client, 200).await;
    bench_availability_queries(&client, 200, (bookings as i64) * 2 * HOUR).await;
}
