/// The concurrent core: one dispatcher, a fixed pool of workers, two channels between them.
///
/// ```text
/// input CSV -> Dispatcher -> work channel -> Worker x N -> Fetcher -> MatchPredicate
///                  ^                                                        |
///                  +---------------- result channel <-----------------------+
///                  |
///                  v
///             output file
/// ```
///
/// # Shutdown
///
/// Every actor holds a clone of the same [`ShutdownSignal`]. Each blocking wait is a
/// `select!` over the data channel and the signal, so cancelling wakes an actor at its next
/// blocking point. A fetch that is already in flight is never interrupted; the worker
/// notices the signal once the fetch returns.
///
/// Workers also stop once the work channel is closed and empty, and the dispatcher stops
/// once every worker is gone, so a batch run finishes without an explicit stop.
///
/// # Failure isolation
///
/// Errors fetching or reading one site are logged by the worker that hit them and never
/// leave its loop. Errors that make the run meaningless (unreadable input, a locator that
/// is not a URL, a failed write) end the dispatcher and are returned from [`engine::run`].
pub mod dispatcher;
pub mod engine;
pub mod matcher;
pub mod shutdown;
pub mod work;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use engine::{run, run_with_config, ScanOutcome, WorkerPool};
pub use matcher::{MatchPredicate, PatternMatcher};
pub use shutdown::{InputExhausted, ShutdownSignal};
pub use work::{result_channel, work_channel, WorkItem};
pub use worker::Worker;
