use std::{sync::Weak, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::PlaygroundClient;

/// Background poll that periodically re-fetches the authoritative state.
///
/// The task only holds a weak reference to the client, so it never keeps a
/// torn-down client alive, and it is aborted when this handle is dropped.
pub struct RefreshLoop {
    task: JoinHandle<()>,
}

impl RefreshLoop {
    pub fn spawn(client: Weak<PlaygroundClient>, period: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(client) = client.upgrade() else {
                    debug!("refresh: client dropped, stopping loop");
                    break;
                };
                match client.refresh().await {
                    Ok(true) => debug!("refresh: snapshot replaced"),
                    Ok(false) => debug!("refresh: result discarded"),
                    // Already logged by the client; the loop keeps ticking.
                    Err(_) => {}
                }
            }
        });
        info!(?period, "refresh: loop started");
        Self { task }
    }

    pub fn stop(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        self.task.abort();
    }
}
