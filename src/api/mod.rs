// =============================================================================
// Read API
// =============================================================================
//
// JSON view of the latest published snapshot. Handlers only read shared
// state; nothing here can alter the pipeline.

pub mod rest;

use std::sync::Arc;

use crate::app_state::SharedState;
use crate::scheduler::PhaseHandle;

/// State handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub shared: Arc<SharedState>,
    pub phase: PhaseHandle,
}
