use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::services::exam_session::ExamSessionController;

/// Handle to the ticker of one active session.
pub(crate) struct SessionTicker {
    epoch: u64,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SessionTicker {
    pub(crate) fn spawn(controller: ExamSessionController, epoch: u64, period: Duration) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(controller, epoch, period, shutdown_rx));
        Self { epoch, shutdown, handle }
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Signals the ticker to stop. The task is left to exit on its own since
    /// the caller may be running inside it.
    pub(crate) fn stop(self) {
        if self.shutdown.send(true).is_err() {
            tracing::debug!(epoch = self.epoch, "Session ticker already finished");
        }
        drop(self.handle);
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

async fn run(
    controller: ExamSessionController,
    epoch: u64,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!(epoch, period_ms = period.as_millis() as u64, "Session ticker started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                if !controller.tick_epoch(epoch).await {
                    break;
                }
            }
        }
    }

    tracing::debug!(epoch, "Session ticker stopped");
}
