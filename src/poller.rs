use crate::monitor::MetricsProvider;
use crate::state::{SampleOutcome, SharedState};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

pub const DEFAULT_PERIOD: Duration = Duration::from_millis(1000);
/// Shorter periods are raised to this; the timer rejects a zero period.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

// A finished sample on its way to the applier.
struct Completion {
    generation: u64,
    tick: u64,
    outcome: SampleOutcome,
}

/// Drives the provider on a fixed period and feeds the results to the state.
///
/// Samples run on tokio's blocking pool and are not awaited by the timer, so
/// a slow sample can overlap the next tick. Every result goes through one
/// channel to a single applier thread, which applies them in completion order.
///
/// Each `start` opens a new generation and `stop` closes it while holding the
/// state lock. The applier checks the generation under the same lock, so once
/// `stop` has returned no sample, finished or still running, can touch the
/// state. In-flight samples are left to finish on their own.
pub struct Poller {
    provider: Arc<dyn MetricsProvider>,
    state: SharedState,
    period: Duration,
    runtime: Handle,
    generation: Arc<AtomicU64>,
    ticker: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn new(
        provider: Arc<dyn MetricsProvider>,
        state: SharedState,
        period: Duration,
        runtime: Handle,
    ) -> Self {
        Self {
            provider,
            state,
            period: period.max(MIN_PERIOD),
            runtime,
            generation: Arc::new(AtomicU64::new(0)),
            ticker: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Dispatches tick 0 right away, then one tick per period.
    pub fn start(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (sender, receiver) = unbounded();
        spawn_applier(receiver, self.state.clone(), Arc::clone(&self.generation));

        dispatch(&self.runtime, &self.provider, &sender, generation, 0);

        let runtime = self.runtime.clone();
        let provider = Arc::clone(&self.provider);
        let period = self.period;
        self.ticker = Some(self.runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut tick = 1;
            loop {
                ticker.tick().await;
                dispatch(&runtime, &provider, &sender, generation, tick);
                tick += 1;
            }
        }));

        log::info!(
            "Polling {} every {} ms",
            self.provider.name(),
            self.period.as_millis()
        );
    }

    pub fn stop(&mut self) {
        let Some(ticker) = self.ticker.take() else {
            return;
        };
        ticker.abort();
        {
            let _state = self.state.lock();
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        log::info!("Polling of {} stopped", self.provider.name());
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn dispatch(
    runtime: &Handle,
    provider: &Arc<dyn MetricsProvider>,
    sender: &Sender<Completion>,
    generation: u64,
    tick: u64,
) {
    let provider = Arc::clone(provider);
    let sender = sender.clone();
    runtime.spawn_blocking(move || {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| provider.sample())) {
            Ok(result) => SampleOutcome::from(result),
            Err(payload) => SampleOutcome::Failed(panic_message(payload.as_ref())),
        };
        // Only fails if the applier thread has died.
        let _ = sender.send(Completion {
            generation,
            tick,
            outcome,
        });
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "metrics provider panicked".to_string()
    }
}

// Exits once the ticker and every in-flight sample have dropped their sender.
fn spawn_applier(receiver: Receiver<Completion>, state: SharedState, generation: Arc<AtomicU64>) {
    thread::spawn(move || {
        for completion in receiver {
            let mut guard = state.lock();
            if generation.load(Ordering::SeqCst) != completion.generation {
                log::debug!("Discarding tick {} from a stopped poller", completion.tick);
                continue;
            }
            match &completion.outcome {
                SampleOutcome::Snapshot(snapshot) => {
                    log::trace!("Tick {} sampled at {}", completion.tick, snapshot.timestamp)
                }
                SampleOutcome::Empty => log::warn!("Tick {} returned no data", completion.tick),
                SampleOutcome::Failed(reason) => {
                    log::warn!("Tick {} failed: {}", completion.tick, reason)
                }
            }
            guard.apply(completion.outcome);
        }
    });
}
