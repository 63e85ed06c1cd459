use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use ulid::Ulid;

use courtside::engine::{Engine, EngineError};
use courtside::model::*;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        return;
    }
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
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

fn fresh_engine(label: &str) -> Arc<Engine> {
    let dir = std::env::temp_dir().join(format!("courtside_bench_{label}_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).expect("create bench dir");
    Arc::new(Engine::new(dir.join("courtside.wal")).expect("open engine"))
}

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date") + chrono::Duration::days(offset)
}

fn window(start: usize, len: usize) -> BTreeSet<Slot> {
    Slot::all().skip(start).take(len).collect()
}

fn candidate(date: NaiveDate, granularity: Granularity, slots: BTreeSet<Slot>) -> Candidate {
    Candidate {
        date,
        granularity,
        slots,
        requester: Requester {
            name: "bench".into(),
            ..Requester::default()
        },
    }
}

async fn phase1_sequential() {
    let engine = fresh_engine("seq");
    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();

    // One approved two-slot booking per window, spread over many dates.
    for i in 0..n {
        let slots = window((i % 24) * 2, 2);
        let t = Instant::now();
        let r = engine
            .submit(candidate(day((i / 24) as i64), Granularity::SingleUnit, slots))
            .await
            .expect("submit");
        engine.approve(r.id, None).await.expect("approve");
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} submit+approve in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("write latency", &mut latencies);
}

async fn phase2_contended_approvals() {
    let engine = fresh_engine("contended");
    let dates = 20;
    let per_date = 50;

    let mut ids = Vec::new();
    for d in 0..dates {
        for i in 0..per_date {
            let granularity = if i % 3 == 0 {
                Granularity::WholeResource
            } else {
                Granularity::SingleUnit
            };
            let r = engine
                .submit(candidate(day(d), granularity, window(36 + i % 4, 3)))
                .await
                .expect("submit");
            ids.push(r.id);
        }
    }

    let start = Instant::now();
    let mut handles = Vec::new();
    for id in ids {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let t = Instant::now();
            let outcome = engine.approve(id, None).await;
            (outcome, t.elapsed())
        }));
    }

    let mut approved = 0;
    let mut refused = 0;
    let mut latencies = Vec::new();
    for h in handles {
        let (outcome, latency) = h.await.expect("task");
        latencies.push(latency);
        match outcome {
            Ok(_) => approved += 1,
            Err(EngineError::Conflict { .. }) => refused += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    let elapsed = start.elapsed();
    println!(
        "  {} approvals in {:.2}s: {approved} approved, {refused} refused",
        dates * per_date,
        elapsed.as_secs_f64()
    );
    print_latency("approval latency", &mut latencies);

    // No slot may be held by two approved reservations.
    for d in 0..dates {
        let approved = engine.list_approved(day(d)).await;
        let mut seen = BTreeSet::new();
        for r in &approved {
            for slot in &r.slots {
                assert!(seen.insert(*slot), "double booking on {} at {slot}", day(d));
            }
        }
    }
    println!("  verified: no double bookings across {dates} dates");
}

async fn phase3_read_under_load() {
    let engine = fresh_engine("reads");
    let date = day(0);
    for i in 0..24 {
        let r = engine
            .submit(candidate(date, Granularity::SingleUnit, window(i * 2, 1)))
            .await
            .expect("submit");
        if i % 2 == 0 {
            engine.approve(r.id, None).await.expect("approve");
        }
    }

    let writer_engine = engine.clone();
    let writer = tokio::spawn(async move {
        for i in 0..1000 {
            let slots = window(1 + (i % 24) * 2, 1);
            let _ = writer_engine
                .submit(candidate(date, Granularity::SingleUnit, slots))
                .await;
        }
    });

    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let request = window(20, 4);
    for _ in 0..n {
        let t = Instant::now();
        let result = engine
            .check_conflicts(date, &request, Granularity::WholeResource, None)
            .await;
        latencies.push(t.elapsed());
        assert!(result.has_conflict);
        let _ = engine.get_availability(date).await;
    }
    writer.await.expect("writer");
    print_latency("conflict check latency", &mut latencies);
}

#[tokio::main]
async fn main() {
    println!("=== courtside stress benchmark ===\n");

    println!("[phase 1] sequential submit + approve");
    phase1_sequential().await;

    println!("\n[phase 2] contended approvals");
    phase2_contended_approvals().await;

    println!("\n[phase 3] read latency under write load");
    phase3_read_under_load().await;

    println!("\n=== benchmark complete ===");
}
