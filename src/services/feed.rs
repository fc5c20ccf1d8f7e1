use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::services::recommendations::RecommendationResult;

/// Upper bound on users whose feed is kept in memory
pub const MAX_TRACKED_FEEDS: usize = 10_000;

/// Handle for one in-flight recommendation pass
#[derive(Debug, Clone)]
pub struct FeedTicket {
    user_id: i64,
    generation: u64,
    token: CancellationToken,
}

impl FeedTicket {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Default)]
struct FeedSlot {
    generation: u64,
    touched: u64,
    token: Option<CancellationToken>,
    latest: Option<RecommendationResult>,
}

#[derive(Default)]
struct Slots {
    by_user: HashMap<i64, FeedSlot>,
    clock: u64,
}

impl Slots {
    /// Drops one slot to make room, preferring the least recently used idle one
    fn evict(&mut self) {
        let victim = self
            .by_user
            .iter()
            .min_by_key(|(_, slot)| (slot.token.is_some(), slot.touched))
            .map(|(user_id, _)| *user_id);

        if let Some(user_id) = victim {
            if let Some(slot) = self.by_user.remove(&user_id) {
                if let Some(token) = slot.token {
                    token.cancel();
                }
                tracing::debug!(user_id, "Evicted recommendation feed");
            }
        }
    }
}

/// Tracks the most recent recommendation pass per registered user
///
/// Starting a pass cancels the one before it. A finished pass is applied to
/// the user's feed only while it is still the latest, so a slow superseded
/// pass can never overwrite a newer feed. At most `capacity` users are
/// tracked; beyond that the least recently used feed is dropped.
pub struct FeedRegistry {
    slots: Mutex<Slots>,
    capacity: usize,
}

impl Default for FeedRegistry {
    fn default() -> Self {
        Self::with_capacity(MAX_TRACKED_FEEDS)
    }
}

impl FeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            capacity: capacity.max(1),
        }
    }

    /// Registers a new pass for `user_id`, cancelling any pass still running
    pub async fn begin(&self, user_id: i64) -> FeedTicket {
        let mut slots = self.slots.lock().await;
        if !slots.by_user.contains_key(&user_id) && slots.by_user.len() >= self.capacity {
            slots.evict();
        }

        slots.clock += 1;
        let touched = slots.clock;
        let slot = slots.by_user.entry(user_id).or_default();

        if let Some(previous) = slot.token.take() {
            previous.cancel();
        }

        slot.generation += 1;
        slot.touched = touched;
        let token = CancellationToken::new();
        slot.token = Some(token.clone());

        FeedTicket {
            user_id,
            generation: slot.generation,
            token,
        }
    }

    /// Stores `result` as the user's feed if `ticket` is still current
    ///
    /// Returns whether the result was applied.
    pub async fn apply(&self, ticket: &FeedTicket, result: RecommendationResult) -> bool {
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.by_user.get_mut(&ticket.user_id) else {
            return false;
        };

        if slot.generation != ticket.generation || ticket.token.is_cancelled() {
            tracing::debug!(
                user_id = ticket.user_id,
                generation = ticket.generation,
                current = slot.generation,
                "Discarding superseded recommendation pass"
            );
            return false;
        }

        slot.latest = Some(result);
        slot.token = None;
        true
    }

    /// The last applied feed for `user_id`
    pub async fn latest(&self, user_id: i64) -> Option<RecommendationResult> {
        self.slots
            .lock()
            .await
            .by_user
            .get(&user_id)
            .and_then(|slot| slot.latest.clone())
    }

    /// Number of users currently tracked
    pub async fn len(&self) -> usize {
        self.slots.lock().await.by_user.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(attempts: usize) -> RecommendationResult {
        RecommendationResult {
            items: Vec::new(),
            attempts,
            message: None,
        }
    }

    #[tokio::test]
    async fn test_new_pass_cancels_previous() {
        let registry = FeedRegistry::new();
        let first = registry.begin(1).await;
        let second = registry.begin(1).await;

        assert!(first.token().is_cancelled());
        assert!(!second.token().is_cancelled());
        assert!(second.generation() > first.generation());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_only_latest_pass_is_applied() {
        let registry = FeedRegistry::new();
        let stale = registry.begin(1).await;
        let fresh = registry.begin(1).await;

        assert!(registry.apply(&fresh, result(2)).await);
        assert!(!registry.apply(&stale, result(1)).await);

        assert_eq!(registry.latest(1).await, Some(result(2)));
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let registry = FeedRegistry::new();
        let ada = registry.begin(1).await;
        let bob = registry.begin(2).await;

        assert!(!ada.token().is_cancelled());
        assert!(registry.apply(&bob, result(3)).await);
        assert_eq!(registry.latest(1).await, None);
    }

    #[tokio::test]
    async fn test_cancelled_ticket_is_not_applied() {
        let registry = FeedRegistry::new();
        let ticket = registry.begin(1).await;
        ticket.token().cancel();

        assert!(!registry.apply(&ticket, result(1)).await);
        assert_eq!(registry.latest(1).await, None);
    }

    #[tokio::test]
    async fn test_slot_count_stays_bounded() {
        let registry = FeedRegistry::with_capacity(3);
        for user_id in 0..50 {
            let ticket = registry.begin(user_id).await;
            registry.apply(&ticket, result(1)).await;
        }

        assert_eq!(registry.len().await, 3);
        assert_eq!(registry.latest(49).await, Some(result(1)));
        assert_eq!(registry.latest(0).await, None);
    }

    #[tokio::test]
    async fn test_eviction_prefers_idle_feeds() {
        let registry = FeedRegistry::with_capacity(2);
        let running = registry.begin(1).await;
        let idle = registry.begin(2).await;
        registry.apply(&idle, result(1)).await;

        registry.begin(3).await;

        assert_eq!(registry.len().await, 2);
        assert!(!running.token().is_cancelled());
        assert_eq!(registry.latest(2).await, None);
        assert!(registry.apply(&running, result(4)).await);
    }

    #[tokio::test]
    async fn test_evicted_running_pass_is_cancelled() {
        let registry = FeedRegistry::with_capacity(1);
        let first = registry.begin(1).await;
        registry.begin(2).await;

        assert!(first.token().is_cancelled());
        assert!(!registry.apply(&first, result(1)).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_repeat_passes_do_not_evict_others() {
        let registry = FeedRegistry::with_capacity(2);
        let ada = registry.begin(1).await;
        registry.apply(&ada, result(1)).await;
        for _ in 0..5 {
            registry.begin(2).await;
        }

        assert_eq!(registry.len().await, 2);
        assert_eq!(registry.latest(1).await, Some(result(1)));
    }
}
