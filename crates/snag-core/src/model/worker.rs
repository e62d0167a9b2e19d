use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A maintenance worker and the fault types they can repair.
///
/// Capabilities are a proper set of fault-type ids, so eligibility is plain
/// set membership: type 1 never matches type 10 the way a substring test
/// over a comma-joined string would.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: i64,
    pub name: String,
    /// False iff the worker currently holds an active dispatch binding.
    pub available: bool,
    pub capabilities: BTreeSet<i64>,
}

impl Worker {
    /// Whether this worker can repair the given fault type.
    #[must_use]
    pub fn can_repair(&self, fault_type: i64) -> bool {
        self.capabilities.contains(&fault_type)
    }
}
