use fb_core::MissionId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::events::OrchestratorEvent;

/// Per-mission escalation timers. Each timer is a task that posts
/// [`OrchestratorEvent::EscalationTimeout`] once its threshold elapses; the handler re-checks
/// mission status, so a timer that loses a race with completion is harmless.
#[derive(Debug, Default)]
pub struct EscalationTimers {
    handles: HashMap<MissionId, JoinHandle<()>>,
}

impl EscalationTimers {
    pub fn arm(
        &mut self,
        mission_id: MissionId,
        after: Duration,
        events: UnboundedSender<OrchestratorEvent>,
    ) {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if events
                .send(OrchestratorEvent::EscalationTimeout { mission_id })
                .is_err()
            {
                debug!(mission_id = %mission_id, "Event loop closed before escalation timeout");
            }
        });
        if let Some(previous) = self.handles.insert(mission_id, handle) {
            previous.abort();
        }
    }

    pub fn cancel(&mut self, mission_id: MissionId) -> bool {
        match self.handles.remove(&mission_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Forgets a timer whose task already fired.
    pub fn disarm_fired(&mut self, mission_id: MissionId) {
        self.handles.remove(&mission_id);
    }

    pub fn armed(&self) -> usize {
        self.handles.len()
    }

    pub fn is_armed(&self, mission_id: MissionId) -> bool {
        self.handles.contains_key(&mission_id)
    }
}

impl Drop for EscalationTimers {
    fn drop(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn timer_posts_timeout_after_threshold() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = EscalationTimers::default();
        let mission_id = MissionId::new();
        let started = tokio::time::Instant::now();
        timers.arm(mission_id, Duration::from_secs(300), tx);

        match rx.recv().await {
            Some(OrchestratorEvent::EscalationTimeout { mission_id: fired }) => {
                assert_eq!(fired, mission_id)
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = EscalationTimers::default();
        let mission_id = MissionId::new();
        timers.arm(mission_id, Duration::from_secs(10), tx);
        assert!(timers.cancel(mission_id));
        assert!(!timers.cancel(mission_id));
        assert_eq!(timers.armed(), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }
}
