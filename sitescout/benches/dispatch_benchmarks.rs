use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sitescout::{
    errors::FetchError,
    fetch::{Fetcher, Lines},
    run,
    search::{MatchPredicate, PatternMatcher},
    ShutdownSignal,
};
use std::io::{self, Cursor};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use url::Url;

/// Serves generated pages from memory; every third host carries a match on its last line
struct SyntheticFetcher {
    lines_per_page: usize,
    latency: Duration,
}

impl Fetcher for SyntheticFetcher {
    fn fetch(&self, url: &Url) -> Result<Lines, FetchError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        let host = url.host_str().unwrap_or_default().to_string();
        let matching = host
            .trim_start_matches("site")
            .split('.')
            .next()
            .and_then(|n| n.parse::<usize>().ok())
            .map_or(false, |n| n % 3 == 0);
        let count = self.lines_per_page;
        Ok(Box::new((0..count).map(move |i| {
            let line = if matching && i + 1 == count {
                format!("<p>{} has salt and pepper</p>", host)
            } else {
                format!("<p>line {} of {}</p>", i, host)
            };
            Ok::<_, io::Error>(line)
        })))
    }
}

fn site_list(count: usize) -> Vec<u8> {
    let mut csv = String::from("rank,site\n");
    for i in 0..count {
        csv.push_str(&format!("{},site{}.example\n", i + 1, i));
    }
    csv.into_bytes()
}

fn scan(csv: &[u8], fetcher: Arc<dyn Fetcher>, predicate: Arc<dyn MatchPredicate>, threads: usize) {
    let outcome = run(
        Cursor::new(csv.to_vec()),
        Vec::new(),
        predicate,
        fetcher,
        NonZeroUsize::new(threads).unwrap(),
        &ShutdownSignal::new(),
    )
    .unwrap();
    black_box(outcome.output);
}

fn bench_worker_counts(c: &mut Criterion) {
    let csv = site_list(200);
    let predicate: Arc<dyn MatchPredicate> = Arc::new(PatternMatcher::new(r".*\sand\s.*").unwrap());
    let fetcher: Arc<dyn Fetcher> = Arc::new(SyntheticFetcher {
        lines_per_page: 50,
        latency: Duration::from_millis(1),
    });

    let mut group = c.benchmark_group("worker_counts");
    group.sample_size(20);
    for threads in [1, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| scan(&csv, fetcher.clone(), predicate.clone(), threads))
        });
    }
    group.finish();
}

fn bench_page_size(c: &mut Criterion) {
    let csv = site_list(100);
    let predicate: Arc<dyn MatchPredicate> = Arc::new(PatternMatcher::new(r".*\sand\s.*").unwrap());

    let mut group = c.benchmark_group("page_size");
    for lines in [10, 1_000] {
        let fetcher: Arc<dyn Fetcher> = Arc::new(SyntheticFetcher {
            lines_per_page: lines,
            latency: Duration::ZERO,
        });
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, _| {
            b.iter(|| scan(&csv, fetcher.clone(), predicate.clone(), 4))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_worker_counts, bench_page_size);
criterion_main!(benches);
