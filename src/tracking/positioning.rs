use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::LocationUnavailable;
use crate::models::{Position, PositionOptions};

/// Device positioning capability, queried once per sampling tick.
#[async_trait]
pub trait Positioning: Send + Sync {
    async fn current_position(&self, options: PositionOptions) -> Result<Position, LocationUnavailable>;
}

/// Replays a fixed sequence of fixes and failures, one per request.
pub struct ScriptedPositioning {
    script: Mutex<VecDeque<Result<Position, LocationUnavailable>>>,
    requests: AtomicUsize,
}

impl ScriptedPositioning {
    pub fn new(script: impl IntoIterator<Item = Result<Position, LocationUnavailable>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, fix: Result<Position, LocationUnavailable>) {
        self.script.lock().push_back(fix);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl Positioning for ScriptedPositioning {
    async fn current_position(&self, _options: PositionOptions) -> Result<Position, LocationUnavailable> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(LocationUnavailable::Other("no scripted fix left".to_string())))
    }
}
