use crossbeam_channel::select;
use std::sync::Arc;
use std::thread;
use tracing::{debug, trace, warn};

use super::shutdown::ShutdownSignal;
use super::work::{ResultSender, WorkItem, WorkReceiver};
use crate::errors::{FetchError, ScoutError, ScoutResult};
use crate::fetch::Fetcher;
use crate::metrics::ScoutMetrics;

/// Pulls work items, fetches their content and reports the ones that match.
///
/// Any number of workers may share the same channels. A failure on one item is logged and
/// the worker carries on with the next; only shutdown or a closed work channel ends it.
pub struct Worker {
    work_rx: WorkReceiver,
    result_tx: ResultSender,
    fetcher: Arc<dyn Fetcher>,
    shutdown: ShutdownSignal,
    metrics: ScoutMetrics,
}

impl Worker {
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder::default()
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Runs the loop on a new named thread
    pub fn spawn(self, name: impl Into<String>) -> ScoutResult<thread::JoinHandle<()>> {
        let name = name.into();
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || self.run())
            .map_err(|e| ScoutError::thread_spawn(name, e))
    }

    /// Runs the loop on the current thread until shutdown or until the work channel is
    /// closed and drained
    pub fn run(self) {
        debug!("Worker started");
        while !self.shutdown.is_cancelled() {
            let item = select! {
                recv(self.work_rx) -> msg => match msg {
                    Ok(item) => item,
                    Err(_) => {
                        debug!("Work channel closed, worker stopping");
                        return;
                    }
                },
                recv(self.shutdown.cancelled()) -> _ => break,
            };
            if self.shutdown.is_cancelled() {
                break;
            }
            self.process(&item);
        }
        debug!("Shutdown requested, worker stopping");
    }

    fn process(&self, item: &WorkItem) {
        match self.scan(item) {
            Ok(matched) => {
                self.metrics.record_fetched(matched);
                if matched {
                    trace!("Match found in {}", item.resource_id());
                    if self.result_tx.send(item.resource_id().to_string()).is_err() {
                        debug!("Result channel closed, dropping match for {}", item.resource_id());
                    }
                }
            }
            Err(e) => {
                self.metrics.record_failure();
                warn!("Error reading data from URL {}: {}", item.resource_id(), e);
            }
        }
    }

    /// Returns whether any line matched. Stops reading at the first match; the line
    /// source is dropped, releasing its connection, on every path out of here.
    fn scan(&self, item: &WorkItem) -> Result<bool, FetchError> {
        let lines = self.fetcher.fetch(item.url())?;
        for line in lines {
            if item.predicate().matches(&line?) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Collects a worker's collaborators; the channels and the fetcher are required
#[derive(Default)]
pub struct WorkerBuilder {
    work_rx: Option<WorkReceiver>,
    result_tx: Option<ResultSender>,
    fetcher: Option<Arc<dyn Fetcher>>,
    shutdown: Option<ShutdownSignal>,
    metrics: Option<ScoutMetrics>,
}

impl WorkerBuilder {
    pub fn work_receiver(mut self, work_rx: WorkReceiver) -> Self {
        self.work_rx = Some(work_rx);
        self
    }

    pub fn result_sender(mut self, result_tx: ResultSender) -> Self {
        self.result_tx = Some(result_tx);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn metrics(mut self, metrics: ScoutMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> ScoutResult<Worker> {
        Ok(Worker {
            work_rx: self
                .work_rx
                .ok_or_else(|| ScoutError::invalid_argument("Work channel is missing"))?,
            result_tx: self
                .result_tx
                .ok_or_else(|| ScoutError::invalid_argument("Result channel is missing"))?,
            fetcher: self
                .fetcher
                .ok_or_else(|| ScoutError::invalid_argument("Fetcher is missing"))?,
            shutdown: self.shutdown.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
        })
    }
}
