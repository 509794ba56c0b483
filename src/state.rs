use std::sync::Arc;

use crate::modules::job::service::JobTracker;
use crate::modules::transcode::orchestrator::TranscodeOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TranscodeOrchestrator>,
    pub jobs: JobTracker,
}

impl AppState {
    pub fn new(orchestrator: Arc<TranscodeOrchestrator>, jobs: JobTracker) -> Self {
        Self { orchestrator, jobs }
    }
}
