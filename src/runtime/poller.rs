use super::event::AppEvent;
use crate::api::KnowledgeBackend;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Repeating PR status poll. Dropping the task cancels it.
pub struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PollTask {
    pub fn spawn(
        backend: Arc<dyn KnowledgeBackend>,
        interval: Duration,
        events_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; polling starts one interval out.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let result = backend.fetch_submitted_prs().await;
                        if let Err(error) = &result {
                            tracing::warn!(error = %error, "PR status poll failed; retrying next interval");
                        }
                        if events_tx.send(AppEvent::PrStatusesPolled(result)).is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("PR status poller stopped");
        });
        tracing::info!(interval_secs = interval.as_secs(), "PR status poller started");
        Self { cancel, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
