use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::RefreshTimer;

/// Interval timer backed by a tokio task
///
/// Each tick invokes the reload action. Cancelling aborts the task, so no
/// further ticks are delivered once [`RefreshTimer::cancel`] returns.
#[derive(Clone)]
pub struct TokioIntervalTimer {
    runtime: Handle,
    on_tick: Arc<dyn Fn() + Send + Sync>,
}

impl TokioIntervalTimer {
    /// Must be called from within a tokio runtime
    pub fn new<F>(on_tick: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_handle(Handle::current(), on_tick)
    }

    pub fn with_handle<F>(runtime: Handle, on_tick: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            runtime,
            on_tick: Arc::new(on_tick),
        }
    }

    /// Timer whose ticks are delivered as messages on `tx`
    pub fn sending<M>(tx: mpsc::UnboundedSender<M>, message: M) -> Self
    where
        M: Clone + Send + Sync + 'static,
    {
        Self::new(move || {
            if tx.send(message.clone()).is_err() {
                tracing::debug!(target: "refresh", "Reload receiver dropped, tick ignored");
            }
        })
    }
}

impl RefreshTimer for TokioIntervalTimer {
    type Handle = JoinHandle<()>;

    fn schedule(&mut self, period: Duration) -> JoinHandle<()> {
        let on_tick = Arc::clone(&self.on_tick);
        self.runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracing::trace!(target: "refresh", "Reload tick");
                on_tick();
            }
        })
    }

    fn cancel(&mut self, handle: JoinHandle<()>) {
        handle.abort();
    }
}
