//! Application state management

use std::sync::Arc;

use sift_core::CuratorHandle;

use crate::observer::ChannelObserver;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub curator: CuratorHandle,
    pub observer: Arc<ChannelObserver>,
}

impl AppState {
    pub fn new(curator: CuratorHandle, observer: Arc<ChannelObserver>) -> Self {
        Self { curator, observer }
    }
}
