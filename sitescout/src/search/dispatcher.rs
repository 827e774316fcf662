//! The dispatcher: the single control actor of a run.
//!
//! It works in two phases on one thread:
//!
//! 1. **Production**: reads the CSV input, turns every usable record into a [`WorkItem`]
//!    and enqueues it on the work channel. When the input is exhausted (or production
//!    fails) it drops its work sender and fires the input-exhausted latch.
//!
//! 2. **Consumption**: drains the result channel, appending one matched id per line to the
//!    output and flushing after each write. It stops when shutdown is requested or when
//!    every result producer has gone away. Exhausted input alone never ends this phase,
//!    since workers may still be fetching.

use crossbeam_channel::select;
use std::io::{BufReader, Read, Write};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::matcher::MatchPredicate;
use super::shutdown::{ExhaustedTrigger, InputExhausted, ShutdownSignal};
use super::work::{ResultReceiver, WorkItem, WorkSender};
use crate::errors::{ScoutError, ScoutResult};
use crate::fetch::LossyLines;
use crate::metrics::ScoutMetrics;

/// Scheme prepended to locators that do not carry one
pub const DEFAULT_SCHEME: &str = "http://";

#[cfg(windows)]
const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
const LINE_SEPARATOR: &str = "\n";

/// Extracts and normalizes the locator from one input record.
///
/// Returns `None` for records with fewer than two comma separated fields. Trailing empty
/// fields do not count, so `"1,"` is skipped as well.
pub fn parse_record(record: &str) -> Option<String> {
    let mut fields: Vec<&str> = record.split(',').collect();
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    if fields.len() < 2 {
        return None;
    }
    Some(normalize_locator(fields[1]))
}

/// Trims the field, strips one layer of double quotes wrapping the whole field, and
/// prefixes [`DEFAULT_SCHEME`] when no scheme is present.
pub fn normalize_locator(field: &str) -> String {
    let mut locator = field.trim();
    if locator.len() > 2
        && locator.starts_with('"')
        && locator.ends_with('"')
        && !locator[1..locator.len() - 1].contains('"')
    {
        locator = &locator[1..locator.len() - 1];
    }

    if has_scheme(locator) {
        locator.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME, locator)
    }
}

fn has_scheme(locator: &str) -> bool {
    match locator.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Produces work from the input, then writes results to the output until told to stop
pub struct Dispatcher<R, W> {
    input: R,
    output: W,
    predicate: Arc<dyn MatchPredicate>,
    work_tx: WorkSender,
    result_rx: ResultReceiver,
    shutdown: ShutdownSignal,
    metrics: ScoutMetrics,
    exhausted_trigger: ExhaustedTrigger,
    exhausted: InputExhausted,
}

impl<R: Read, W: Write> Dispatcher<R, W> {
    pub fn builder() -> DispatcherBuilder<R, W> {
        DispatcherBuilder::default()
    }

    /// Latch observers can wait on to learn that every work item has been enqueued
    pub fn input_exhausted(&self) -> InputExhausted {
        self.exhausted.clone()
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// Runs both phases to completion and hands the output back.
    ///
    /// Fails on unreadable input, a locator that is not a valid URL, or a failed write.
    pub fn run(self) -> ScoutResult<W> {
        let Dispatcher {
            input,
            mut output,
            predicate,
            work_tx,
            result_rx,
            shutdown,
            metrics,
            exhausted_trigger,
            exhausted: _,
        } = self;

        let produced = produce(input, &predicate, &work_tx, &metrics);
        drop(work_tx);
        exhausted_trigger.fire();
        let count = produced?;
        info!("Input exhausted after dispatching {} items", count);

        drain(&mut output, &result_rx, &shutdown, &metrics)?;
        Ok(output)
    }
}

fn produce<R: Read>(
    input: R,
    predicate: &Arc<dyn MatchPredicate>,
    work_tx: &WorkSender,
    metrics: &ScoutMetrics,
) -> ScoutResult<usize> {
    info!("Reading work items from input");
    // Columns other than the locator may hold any encoding; only real read failures are fatal
    let mut lines = LossyLines::new(BufReader::new(input));

    // The first record is a header
    if let Some(header) = lines.next() {
        header.map_err(ScoutError::InputRead)?;
    }

    let mut count = 0;
    for (index, line) in lines.enumerate() {
        let line = line.map_err(ScoutError::InputRead)?;
        let Some(locator) = parse_record(&line) else {
            debug!("Skipping record {}: fewer than two fields", index + 2);
            metrics.record_skipped();
            continue;
        };

        let item = WorkItem::new(predicate.clone(), locator)?;
        if let Err(err) = work_tx.send(item) {
            warn!("No workers left to receive {}", err.into_inner().resource_id());
            continue;
        }
        metrics.record_dispatched();
        count += 1;
    }
    Ok(count)
}

fn drain<W: Write>(
    output: &mut W,
    result_rx: &ResultReceiver,
    shutdown: &ShutdownSignal,
    metrics: &ScoutMetrics,
) -> ScoutResult<()> {
    while !shutdown.is_cancelled() {
        select! {
            recv(result_rx) -> msg => match msg {
                Ok(resource_id) => {
                    if shutdown.is_cancelled() {
                        break;
                    }
                    output
                        .write_all(resource_id.as_bytes())
                        .and_then(|_| output.write_all(LINE_SEPARATOR.as_bytes()))
                        .and_then(|_| output.flush())
                        .map_err(ScoutError::OutputWrite)?;
                    metrics.record_written();
                }
                Err(_) => {
                    debug!("All result producers finished, dispatcher stopping");
                    return Ok(());
                }
            },
            recv(shutdown.cancelled()) -> _ => break,
        }
    }
    debug!("Shutdown requested, dispatcher stopping");
    Ok(())
}

/// Collects the dispatcher's collaborators; every one except the shutdown signal and
/// metrics is required.
pub struct DispatcherBuilder<R, W> {
    input: Option<R>,
    output: Option<W>,
    predicate: Option<Arc<dyn MatchPredicate>>,
    work_tx: Option<WorkSender>,
    result_rx: Option<ResultReceiver>,
    shutdown: Option<ShutdownSignal>,
    metrics: Option<ScoutMetrics>,
}

impl<R, W> Default for DispatcherBuilder<R, W> {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            predicate: None,
            work_tx: None,
            result_rx: None,
            shutdown: None,
            metrics: None,
        }
    }
}

impl<R: Read, W: Write> DispatcherBuilder<R, W> {
    pub fn input(mut self, input: R) -> Self {
        self.input = Some(input);
        self
    }

    pub fn output(mut self, output: W) -> Self {
        self.output = Some(output);
        self
    }

    pub fn predicate(mut self, predicate: Arc<dyn MatchPredicate>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn work_sender(mut self, work_tx: WorkSender) -> Self {
        self.work_tx = Some(work_tx);
        self
    }

    pub fn result_receiver(mut self, result_rx: ResultReceiver) -> Self {
        self.result_rx = Some(result_rx);
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

    pub fn build(self) -> ScoutResult<Dispatcher<R, W>> {
        let input = self
            .input
            .ok_or_else(|| ScoutError::invalid_argument("Input reader is missing"))?;
        let output = self
            .output
            .ok_or_else(|| ScoutError::invalid_argument("Output writer is missing"))?;
        let predicate = self
            .predicate
            .ok_or_else(|| ScoutError::invalid_argument("Search pattern is missing"))?;
        let work_tx = self
            .work_tx
            .ok_or_else(|| ScoutError::invalid_argument("Work channel is missing"))?;
        let result_rx = self
            .result_rx
            .ok_or_else(|| ScoutError::invalid_argument("Result channel is missing"))?;
        let (exhausted_trigger, exhausted) = InputExhausted::new();

        Ok(Dispatcher {
            input,
            output,
            predicate,
            work_tx,
            result_rx,
            shutdown: self.shutdown.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
            exhausted_trigger,
            exhausted,
        })
    }
}
