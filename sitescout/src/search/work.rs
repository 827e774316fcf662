use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use url::Url;

use super::matcher::MatchPredicate;
use crate::errors::{ScoutError, ScoutResult};

/// One unit of work: a resource to fetch and the predicate to test its lines against.
///
/// Built by the dispatcher, consumed by exactly one worker.
#[derive(Debug, Clone)]
pub struct WorkItem {
    predicate: Arc<dyn MatchPredicate>,
    resource_id: String,
    url: Url,
}

impl WorkItem {
    /// Pairs a predicate with a resource locator, which must parse as a URL
    pub fn new(predicate: Arc<dyn MatchPredicate>, resource_id: impl Into<String>) -> ScoutResult<Self> {
        let resource_id = resource_id.into();
        let url = Url::parse(&resource_id).map_err(|e| ScoutError::invalid_url(&resource_id, e))?;
        Ok(Self {
            predicate,
            resource_id,
            url,
        })
    }

    pub fn predicate(&self) -> &dyn MatchPredicate {
        self.predicate.as_ref()
    }

    /// The locator exactly as it was enqueued; this is what gets reported on a match
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

pub type WorkSender = Sender<WorkItem>;
pub type WorkReceiver = Receiver<WorkItem>;

/// A matched resource id, as reported back to the dispatcher
pub type Match = String;
pub type ResultSender = Sender<Match>;
pub type ResultReceiver = Receiver<Match>;

/// Unbounded FIFO carrying work items from the dispatcher to the workers.
///
/// The receiver may be cloned once per worker; every item goes to exactly one of them.
pub fn work_channel() -> (WorkSender, WorkReceiver) {
    unbounded()
}

/// Unbounded FIFO carrying matched URLs from the workers back to the dispatcher
pub fn result_channel() -> (ResultSender, ResultReceiver) {
    unbounded()
}
