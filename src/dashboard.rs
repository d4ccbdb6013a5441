use crate::api::types::{Analytics, SyncOutcome};

/// Network work the dashboard wants performed next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardRequest {
    LoadAnalytics,
    Sync,
}

/// Where the sync action is: idle -> syncing -> reloading -> idle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum SyncPhase {
    #[default]
    Idle,
    Syncing,
    Reloading,
}

/// Analytics summary plus the sync action.
#[derive(Debug, Default)]
pub struct Dashboard {
    analytics: Option<Analytics>,
    phase: SyncPhase,
    error: Option<String>,
    last_sync_message: Option<String>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial load when the dashboard is first shown.
    pub fn mount(&mut self) -> DashboardRequest {
        DashboardRequest::LoadAnalytics
    }

    /// Manual reload. Refused while a sync is in flight.
    pub fn reload(&mut self) -> Option<DashboardRequest> {
        if self.is_busy() {
            return None;
        }
        Some(DashboardRequest::LoadAnalytics)
    }

    pub fn is_busy(&self) -> bool {
        self.phase != SyncPhase::Idle
    }

    pub fn can_sync(&self) -> bool {
        !self.is_busy()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_sync_message(&self) -> Option<&str> {
        self.last_sync_message.as_deref()
    }

    /// Analytics to chart. An error replaces the charts entirely.
    pub fn visible_analytics(&self) -> Option<&Analytics> {
        if self.error.is_some() {
            None
        } else {
            self.analytics.as_ref()
        }
    }

    /// Start a sync unless one is already outstanding.
    pub fn begin_sync(&mut self) -> Option<DashboardRequest> {
        if self.is_busy() {
            return None;
        }
        self.phase = SyncPhase::Syncing;
        Some(DashboardRequest::Sync)
    }

    /// Sync finished. On success the analytics are reloaded before going idle.
    pub fn on_sync_result(&mut self, result: Result<SyncOutcome, String>) -> Option<DashboardRequest> {
        if self.phase != SyncPhase::Syncing {
            log_warn!("[Dashboard] sync result with no sync outstanding");
            return None;
        }
        match result {
            Ok(outcome) => {
                self.last_sync_message = outcome.message;
                self.phase = SyncPhase::Reloading;
                Some(DashboardRequest::LoadAnalytics)
            }
            Err(e) => {
                log_error!("[Dashboard] sync failed: {}", e);
                self.error = Some(e);
                self.phase = SyncPhase::Idle;
                None
            }
        }
    }

    /// Analytics load finished. Only the post-sync reload ends a sync.
    pub fn on_analytics(&mut self, result: Result<Analytics, String>) {
        match result {
            Ok(analytics) => {
                self.analytics = Some(analytics);
                self.error = None;
            }
            Err(e) => {
                log_error!("[Dashboard] analytics load failed: {}", e);
                self.error = Some(e);
            }
        }
        if self.phase == SyncPhase::Reloading {
            self.phase = SyncPhase::Idle;
        }
    }
}
