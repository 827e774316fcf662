use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info};

use super::dispatcher::Dispatcher;
use super::matcher::MatchPredicate;
use super::shutdown::ShutdownSignal;
use super::work::{result_channel, work_channel, ResultSender, WorkReceiver};
use super::worker::Worker;
use crate::config::ScoutConfig;
use crate::errors::{ScoutError, ScoutResult};
use crate::fetch::{Fetcher, UrlFetcher};
use crate::metrics::{RunSummary, ScoutMetrics};

/// What a finished run hands back: the output sink and the run counters
#[derive(Debug)]
pub struct ScanOutcome<W> {
    pub output: W,
    pub summary: RunSummary,
}

/// Fixed set of worker threads sharing one work channel and one result channel.
///
/// Dropping the pool without calling `join` cancels the shared shutdown signal and waits
/// for every worker to stop.
pub struct WorkerPool {
    workers: Vec<thread::JoinHandle<()>>,
    shutdown: ShutdownSignal,
}

impl WorkerPool {
    /// Spawns `size` workers. The pool takes ownership of `result_tx`, so once every
    /// worker has exited the result channel is disconnected.
    pub fn spawn(
        size: NonZeroUsize,
        work_rx: WorkReceiver,
        result_tx: ResultSender,
        fetcher: Arc<dyn Fetcher>,
        shutdown: ShutdownSignal,
        metrics: ScoutMetrics,
    ) -> ScoutResult<Self> {
        let mut pool = Self {
            workers: Vec::with_capacity(size.get()),
            shutdown: shutdown.clone(),
        };

        for worker_id in 0..size.get() {
            let handle = Worker::builder()
                .work_receiver(work_rx.clone())
                .result_sender(result_tx.clone())
                .fetcher(fetcher.clone())
                .shutdown(shutdown.clone())
                .metrics(metrics.clone())
                .build()?
                .spawn(format!("scout-worker-{}", worker_id))?;
            pool.workers.push(handle);
        }

        debug!("Spawned {} workers", size);
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Waits for every worker to stop
    pub fn join(mut self) -> ScoutResult<()> {
        self.join_all()
    }

    fn join_all(&mut self) -> ScoutResult<()> {
        let mut panicked = None;
        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("scout-worker").to_string();
            if handle.join().is_err() {
                error!("Worker thread {} panicked", name);
                panicked.get_or_insert(name);
            }
        }
        match panicked {
            Some(name) => Err(ScoutError::ThreadPanicked(name)),
            None => Ok(()),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.shutdown.cancel();
            let _ = self.join_all();
        }
    }
}

/// Runs one dispatcher and a pool of `thread_count` workers until the dispatcher stops.
///
/// The run ends on its own once every work item has been processed, or earlier when
/// `shutdown` is cancelled. A fatal dispatcher error cancels `shutdown`, waits for the
/// workers, and is returned.
pub fn run<R, W>(
    input: R,
    output: W,
    predicate: Arc<dyn MatchPredicate>,
    fetcher: Arc<dyn Fetcher>,
    thread_count: NonZeroUsize,
    shutdown: &ShutdownSignal,
) -> ScoutResult<ScanOutcome<W>>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let metrics = ScoutMetrics::new();
    let (work_tx, work_rx) = work_channel();
    let (result_tx, result_rx) = result_channel();

    let pool = WorkerPool::spawn(
        thread_count,
        work_rx,
        result_tx,
        fetcher,
        shutdown.clone(),
        metrics.clone(),
    )?;

    let dispatcher = Dispatcher::builder()
        .input(input)
        .output(output)
        .predicate(predicate)
        .work_sender(work_tx)
        .result_receiver(result_rx)
        .shutdown(shutdown.clone())
        .metrics(metrics.clone())
        .build()?;

    info!("Starting scan with {} workers", pool.len());
    let handle = thread::Builder::new()
        .name("scout-dispatcher".to_string())
        .spawn(move || dispatcher.run())
        .map_err(|e| ScoutError::thread_spawn("scout-dispatcher", e))?;

    let outcome = match handle.join() {
        Ok(outcome) => outcome,
        Err(_) => Err(ScoutError::ThreadPanicked("scout-dispatcher".to_string())),
    };

    let output = match outcome {
        Ok(output) => output,
        Err(e) => {
            error!("Scan aborted: {}", e);
            shutdown.cancel();
            pool.join()?;
            return Err(e);
        }
    };
    pool.join()?;

    metrics.log_stats();
    let summary = metrics.get_stats();
    info!(
        "Scan complete. {} of {} sites matched",
        summary.matches_written, summary.items_dispatched
    );

    Ok(ScanOutcome { output, summary })
}

/// Opens the configured input and output files and runs a scan over them with the HTTP
/// fetcher.
pub fn run_with_config(config: &ScoutConfig, shutdown: &ShutdownSignal) -> ScoutResult<RunSummary> {
    let predicate: Arc<dyn MatchPredicate> = Arc::new(config.build_matcher()?);
    let fetcher: Arc<dyn Fetcher> = Arc::new(UrlFetcher::new(&config.user_agent)?);

    let input = open_input(&config.input_path)?;
    let output = prepare_output(&config.output_path)?;

    let outcome = run(
        input,
        BufWriter::new(output),
        predicate,
        fetcher,
        config.thread_count,
        shutdown,
    )?;
    outcome
        .output
        .into_inner()
        .map_err(|e| ScoutError::OutputWrite(e.into_error()))?
        .sync_all()
        .map_err(ScoutError::OutputWrite)?;

    Ok(outcome.summary)
}

/// Opens the input file, which must be an existing regular file
pub fn open_input(path: &Path) -> ScoutResult<File> {
    if !path.is_file() {
        return Err(ScoutError::invalid_argument(format!(
            "File does not exist or is unreadable: {}",
            path.display()
        )));
    }
    File::open(path).map_err(ScoutError::InputRead)
}

/// Creates the output file, replacing an existing regular file. Anything else already at
/// `path` is an error.
pub fn prepare_output(path: &Path) -> ScoutResult<File> {
    if path.exists() && !path.is_file() {
        return Err(ScoutError::invalid_argument(format!(
            "Output file exists and is not a regular file: {}",
            path.display()
        )));
    }
    File::create(path).map_err(ScoutError::OutputWrite)
}
