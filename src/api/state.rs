use std::sync::Arc;

use crate::chat::Assistant;
use crate::config::DashboardConfig;
use crate::dashboard::Dashboard;
use crate::profile::ProfileStore;
use crate::storage::RecordStore;

/// Services shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub dashboard: Dashboard,
    pub assistant: Assistant,
    pub profiles: ProfileStore,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: Arc<DashboardConfig>) -> Self {
        Self {
            dashboard: Dashboard::new(store.clone(), config.clone()),
            assistant: Assistant::new(store.clone(), config),
            profiles: ProfileStore::new(store.clone()),
            store,
        }
    }
}
