//! Background maintenance: periodic sweep and refresh of queued entries.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::service::BalanceService;

/// Handle to the background worker. Dropping it signals shutdown; call
/// [`BackgroundHandle::stop`] to also wait for the task to exit.
pub struct BackgroundHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl BackgroundHandle {
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "background worker ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for BackgroundHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

pub(crate) fn spawn(
    service: &Arc<BalanceService>,
    sweep_every: Duration,
    refresh_every: Duration,
) -> BackgroundHandle {
    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(run(Arc::downgrade(service), rx, sweep_every, refresh_every));
    tracing::info!(
        sweep_ms = sweep_every.as_millis() as u64,
        refresh_ms = refresh_every.as_millis() as u64,
        "background worker started"
    );
    BackgroundHandle {
        shutdown: tx,
        task: Some(task),
    }
}

async fn run(
    service: Weak<BalanceService>,
    mut shutdown: watch::Receiver<bool>,
    sweep_every: Duration,
    refresh_every: Duration,
) {
    let now = Instant::now();
    let mut sweep = interval_at(now + sweep_every, sweep_every);
    let mut refresh = interval_at(now + refresh_every, refresh_every);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = sweep.tick() => {
                let Some(service) = service.upgrade() else { break };
                service.sweep();
            }
            _ = refresh.tick() => {
                let Some(service) = service.upgrade() else { break };
                service.refresh_queued().await;
            }
        }
    }
    tracing::info!("background worker stopped");
}
