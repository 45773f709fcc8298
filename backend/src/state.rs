use std::sync::Arc;
use std::time::Instant;

use crate::inference::ModelInference;
use crate::knowledge::KnowledgeBase;
use crate::stats::InferenceStats;

/// Shared by every worker through `web::Data`. Nothing in here is mutated
/// per request except the statistics counters.
pub struct AppState {
    pub inference: Arc<ModelInference>,
    pub knowledge: KnowledgeBase,
    pub stats: InferenceStats,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(inference: Arc<ModelInference>) -> Self {
        Self {
            inference,
            knowledge: KnowledgeBase::builtin(),
            stats: InferenceStats::new(),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
