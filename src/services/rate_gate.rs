use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spacing applied between successive catalog detail fetches
pub const DETAIL_FETCH_INTERVAL: Duration = Duration::from_millis(100);

/// Self-imposed pacing toward an external service
#[async_trait::async_trait]
pub trait RateGate: Send + Sync {
    /// Waits until the caller may issue its next request
    async fn acquire(&self);
}

/// Builds a fresh gate for every recommendation pass
pub type GateFactory = Arc<dyn Fn() -> Box<dyn RateGate> + Send + Sync>;

/// Factory handing each pass its own [`IntervalGate`]
pub fn interval_gates(interval: Duration) -> GateFactory {
    Arc::new(move || Box::new(IntervalGate::new(interval)))
}

/// Fixed-interval gate: the first caller passes immediately, every later
/// caller is released no sooner than `interval` after the previous one
pub struct IntervalGate {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl IntervalGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for IntervalGate {
    fn default() -> Self {
        Self::new(DETAIL_FETCH_INTERVAL)
    }
}

#[async_trait::async_trait]
impl RateGate for IntervalGate {
    async fn acquire(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next_slot = Some(slot + self.interval);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}
