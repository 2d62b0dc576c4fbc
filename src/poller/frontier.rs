use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Default)]
struct FrontierState {
    initial: Option<u64>,
    last: Option<u64>,
}

/// Block numbers owned by the poller and shared read-only with everyone else.
///
/// `last` only moves forward, and only after the block has been handed to the queue.
#[derive(Debug, Clone, Default)]
pub struct Frontier(Arc<RwLock<FrontierState>>);

impl Frontier {
    /// Block number the poller started from, once known.
    pub fn initial(&self) -> Option<u64> {
        self.0.read().initial
    }

    /// Highest block number pushed to the queue, `None` until the first push.
    pub fn last(&self) -> Option<u64> {
        self.0.read().last
    }

    pub(crate) fn set_initial(&self, number: u64) {
        self.0.write().initial = Some(number);
    }

    /// Moves `last` to `number`. Returns `false` and leaves the state untouched when that
    /// would not be an advance.
    pub(crate) fn advance(&self, number: u64) -> bool {
        let mut state = self.0.write();
        if state.last.is_some_and(|last| number <= last) {
            return false;
        }
        state.last = Some(number);
        true
    }
}
