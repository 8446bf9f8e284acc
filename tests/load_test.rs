//! Load testing for the reverse proxy.

use std::time::Instant;

use reqwest::StatusCode;

mod common;

#[tokio::test]
async fn test_load_mixed_hosts() {
    // 1. Setup Mock Backends
    let api = common::start_echo_backend().await;
    let web = common::start_echo_backend().await;

    // 2. Start Proxy with two open hosts and one restricted host
    let (proxy, shutdown) = common::spawn_proxy(common::config(
        &[("api", api), ("web", web)],
        &[
            ("api.test", Some("api"), vec![]),
            ("web.test", Some("web"), vec![]),
            ("admin.test", Some("api"), vec!["10.10.10.10"]),
        ],
        "api",
    ))
    .await;

    // 3. Run Load Test
    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;
    let cases = [
        ("api.test", StatusCode::OK),
        ("web.test", StatusCode::OK),
        ("admin.test", StatusCode::FORBIDDEN),
        ("nobody.test", StatusCode::NOT_FOUND),
    ];

    let client = common::client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for task_index in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{}/load", proxy);
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            let mut mismatches = 0usize;
            for i in 0..requests_per_task {
                let (host, expected) = cases[(task_index + i) % cases.len()];
                let req_start = Instant::now();
                match client.get(&url).header("host", host).send().await {
                    Ok(res) if res.status() == expected => latencies.push(req_start.elapsed()),
                    _ => mismatches += 1,
                }
            }
            (latencies, mismatches)
        }));
    }

    let mut all_latencies = Vec::new();
    let mut mismatches = 0;
    for task in tasks {
        let (latencies, failed) = task.await.unwrap();
        all_latencies.extend(latencies);
        mismatches += failed;
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    assert_eq!(mismatches, 0, "every request should get its host's status");

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");

    shutdown.trigger();
}
