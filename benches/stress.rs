use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio_postgres::{Config, NoTls};

const LANGUAGES: [&str; 3] = ["German", "English", "Spanish"];
const PRODUCTS: [&str; 3] = ["SolarPanels", "Heatpumps", "Batteries"];
const RATINGS: [&str; 3] = ["Gold", "Silver", "Bronze"];

static TENANT_SEQ: AtomicUsize = AtomicUsize::new(0);

fn tenant_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("bench_{nanos}_{}", TENANT_SEQ.fetch_add(1, Ordering::Relaxed))
}

async fn connect(host: &str, port: u16, dbname: &str) -> tokio_postgres::Client {
    let mut config = Config::new();
    config
        .host(host)
        .port(port)
        .dbname(dbname)
        .user("slotfinder")
        .password("slotfinder");

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

fn array(values: &[&str]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| format!("'{v}'")).collect();
    format!("ARRAY[{}]", quoted.join(", "))
}

/// Managers with rotating attributes, each with a day of half-hourly slots.
async fn seed(client: &tokio_postgres::Client, managers: i64) {
    for id in 1..=managers {
        let i = id as usize;
        let languages = [LANGUAGES[i % 3], LANGUAGES[(i + 1) % 3]];
        let products = [PRODUCTS[i % 3], PRODUCTS[(i + 2) % 3]];
        let ratings = [RATINGS[i % 3]];
        client
            .batch_execute(&format!(
                "INSERT INTO sales_managers (id, name, languages, products, customer_ratings) \
                 VALUES ({id}, 'Seller {id}', {}, {}, {})",
                array(&languages),
                array(&products),
                array(&ratings),
            ))
            .await
            .unwrap();

        let rows: Vec<String> = (0..16)
            .map(|n| {
                let slot_id = id * 100 + n;
                let minutes = 8 * 60 + n * 30;
                let booked = (id + n) % 4 == 0;
                format!(
                    "({slot_id}, {id}, '2024-05-03T{:02}:{:02}:00Z', {booked})",
                    minutes / 60,
                    minutes % 60
                )
            })
            .collect();
        client
            .batch_execute(&format!(
                "INSERT INTO slots (id, sales_manager_id, start_date, booked) VALUES {}",
                rows.join(", ")
            ))
            .await
            .unwrap();
    }
    println!("  seeded {managers} managers x 16 slots");
}

fn availability_query(i: usize, strategy: &str) -> String {
    format!(
        "SELECT * FROM availability WHERE date = '2024-05-03' AND language = '{}' \
         AND rating = '{}' AND products IN ('{}') AND strategy = '{strategy}'",
        LANGUAGES[i % 3],
        RATINGS[(i / 3) % 3],
        PRODUCTS[(i / 9) % 3],
    )
}

async fn phase1_sequential(client: &tokio_postgres::Client, strategy: &str) {
    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();

    for i in 0..n {
        let t = Instant::now();
        client.simple_query(&availability_query(i, strategy)).await.unwrap();
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} queries in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency(&format!("{strategy} latency"), &mut latencies);
}

async fn phase2_read_under_load(host: &str, port: u16, tenant: &str) {
    // Writers keep inserting slots on a different day of the same tenant
    let stop = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let mut writer_handles = Vec::new();
    for w in 0..4i64 {
        let host = host.to_string();
        let tenant = tenant.to_string();
        let stop = stop.clone();
        writer_handles.push(tokio::spawn(async move {
            let client = connect(&host, port, &tenant).await;
            let mut i = 0i64;
            while !stop.load(Ordering::Relaxed) {
                let id = 1_000_000 + w * 100_000 + i;
                let _ = client
                    .batch_execute(&format!(
                        "INSERT INTO slots VALUES ({id}, {}, {}, false)",
                        1 + i % 50,
                        // 2024-06-01T00:00:00Z onwards
                        1_717_200_000_000i64 + i * 1_800_000
                    ))
                    .await;
                i += 1;
            }
        }));
    }

    let n_readers = 10;
    let reads_per_reader = 300;
    let mut reader_handles = Vec::new();
    for r in 0..n_readers {
        let host = host.to_string();
        let tenant = tenant.to_string();
        reader_handles.push(tokio::spawn(async move {
            let client = connect(&host, port, &tenant).await;
            let strategy = if r % 2 == 0 { "memory" } else { "store" };
            let mut latencies = Vec::with_capacity(reads_per_reader);
            for i in 0..reads_per_reader {
                let t = Instant::now();
                client.simple_query(&availability_query(i + r, strategy)).await.unwrap();
                latencies.push(t.elapsed());
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for h in reader_handles {
        all_latencies.extend(h.await.unwrap());
    }

    stop.store(true, Ordering::Relaxed);
    for h in writer_handles {
        let _ = h.await;
    }

    print_latency("availability query", &mut all_latencies);
}

async fn phase3_connection_storm(host: &str, port: u16) {
    let n_conns = 50;
    let ops_per_conn = 10;

    let start = Instant::now();
    let mut handles = Vec::new();
    let success = std::sync::Arc::new(AtomicUsize::new(0));

    for _ in 0..n_conns {
        let host = host.to_string();
        let success = success.clone();
        handles.push(tokio::spawn(async move {
            let client = connect(&host, port, &tenant_name()).await;
            seed(&client, 2).await;
            for i in 0..ops_per_conn {
                client.simple_query(&availability_query(i, "memory")).await.unwrap();
            }
            success.fetch_add(1, Ordering::Relaxed);
        }));
    }

    for h in handles {
        let _ = h.await;
    }

    let elapsed = start.elapsed();
    let ok = success.load(Ordering::Relaxed);
    println!(
        "  {n_conns} connections, {ops_per_conn} ops each: {ok}/{n_conns} succeeded in {:.2}s",
        elapsed.as_secs_f64()
    );
}

#[tokio::main]
async fn main() {
    let host = std::env::var("SLOTFINDER_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port: u16 = std::env::var("SLOTFINDER_PORT")
        .unwrap_or_else(|_| "5433".into())
        .parse()
        .expect("invalid SLOTFINDER_PORT");

    println!("=== slotfinder stress benchmark ===");
    println!("target: {host}:{port}\n");

    let tenant = tenant_name();

    println!("[setup]");
    let client = connect(&host, port, &tenant).await;
    seed(&client, 50).await;

    println!("\n[phase 1] sequential availability, in-memory strategy");
    phase1_sequential(&client, "memory").await;

    println!("\n[phase 1] sequential availability, store strategy");
    phase1_sequential(&client, "store").await;
    drop(client);

    println!("\n[phase 2] read latency under write load");
    phase2_read_under_load(&host, port, &tenant).await;

    println!("\n[phase 3] connection storm");
    phase3_connection_storm(&host, port).await;

    println!("\n=== done ===");
}
