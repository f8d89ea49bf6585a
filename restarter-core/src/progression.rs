//! Badge progression: the award/promote state machine over a [`RankLedger`].
//!
//! The controller owns one user's [`ProgressionState`] and writes it through
//! the injected [`ProgressionStorage`] after every transition. Callers must
//! serialize awards for the same user; different users share nothing.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::ProgressionStorage;
use crate::display::AchievementTiers;
use crate::rank::{Rank, RankLedger};

/// Persisted progress of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgressionState {
    pub badge_count: u32,
    pub rank_id: u32,
}

impl ProgressionState {
    #[must_use]
    pub const fn new(badge_count: u32, rank_id: u32) -> Self {
        Self {
            badge_count,
            rank_id,
        }
    }
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

/// What a single award did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressionEvent {
    BadgeAwarded { badge_count: u32 },
    Promoted { rank: Rank },
}

/// A state change that could not be written; the change itself stands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("progress for {user_id} was not persisted: {reason}")]
pub struct PersistenceWarning {
    pub user_id: String,
    pub reason: String,
}

/// Result handed back from [`ProgressionController::award_badge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardOutcome {
    pub promoted: bool,
    pub event: ProgressionEvent,
    pub state: ProgressionState,
    pub persistence_warning: Option<PersistenceWarning>,
}

/// Celebration hook, fired once per promotion.
pub trait PromotionNotifier {
    fn on_promotion(&self, rank: &Rank);
}

/// Notifier that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl PromotionNotifier for NoopNotifier {
    fn on_promotion(&self, _rank: &Rank) {}
}

/// Notifier that logs promotions at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl PromotionNotifier for LogNotifier {
    fn on_promotion(&self, rank: &Rank) {
        log::info!("promoted to rank {} {}", rank.id, rank.icon);
    }
}

impl<F> PromotionNotifier for F
where
    F: Fn(&Rank),
{
    fn on_promotion(&self, rank: &Rank) {
        self(rank);
    }
}

/// Pure award transition: one badge, promoting when the threshold is reached.
#[must_use]
pub fn apply_award(
    ledger: &RankLedger,
    state: ProgressionState,
) -> (ProgressionState, ProgressionEvent) {
    let tentative = state.badge_count.saturating_add(1);
    if ledger.is_promotion_eligible(tentative, state.rank_id)
        && let Some(next) = ledger.get_next_rank(state.rank_id)
    {
        return (
            ProgressionState::new(0, next.id),
            ProgressionEvent::Promoted { rank: next.clone() },
        );
    }
    (
        ProgressionState::new(tentative, state.rank_id),
        ProgressionEvent::BadgeAwarded {
            badge_count: tentative,
        },
    )
}

/// Repair a restored state: clamp an unknown rank, then promote while the
/// badge count covers the threshold, carrying the surplus forward.
#[must_use]
pub fn normalize_state(ledger: &RankLedger, state: ProgressionState) -> ProgressionState {
    let mut rank_id = ledger.clamp_rank_id(state.rank_id);
    let mut badge_count = state.badge_count;
    while ledger.is_promotion_eligible(badge_count, rank_id) {
        let Some(next) = ledger.get_next_rank(rank_id) else {
            break;
        };
        badge_count -= ledger.rank_or_nearest(rank_id).promotion_threshold;
        rank_id = next.id;
    }
    ProgressionState::new(badge_count, rank_id)
}

/// Read-only view of a user's standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressionStatus {
    pub state: ProgressionState,
    pub rank: Rank,
    pub next_rank: Option<Rank>,
    /// Badges still needed for the next promotion; `None` at the terminal rank.
    pub badges_to_next: Option<u32>,
    pub tiers: AchievementTiers,
}

impl ProgressionStatus {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.next_rank.is_none()
    }
}

/// Owner of one user's progression.
#[derive(Debug)]
pub struct ProgressionController<S, N = NoopNotifier>
where
    S: ProgressionStorage,
    N: PromotionNotifier,
{
    ledger: Arc<RankLedger>,
    storage: S,
    notifier: N,
    user_id: String,
    state: ProgressionState,
    /// Set when the stored record exists but could not be read. Writes are
    /// withheld so the unread record is never overwritten.
    read_error: Option<String>,
}

impl<S, N> ProgressionController<S, N>
where
    S: ProgressionStorage,
    N: PromotionNotifier,
{
    /// Load the user's state from storage, normalising anything out of range.
    ///
    /// A read failure starts a fresh in-memory session that never writes, so
    /// the unreadable record survives; every award then carries a
    /// [`PersistenceWarning`]. A repaired state is written back.
    pub fn load(ledger: Arc<RankLedger>, storage: S, notifier: N, user_id: &str) -> Self {
        let (stored, read_error) = match storage.load_state(user_id) {
            Ok(found) => (found, None),
            Err(err) => {
                log::warn!(
                    "could not read progress for {user_id}, not saving this session: {err}"
                );
                (None, Some(err.to_string()))
            }
        };
        let raw = stored.unwrap_or_default();
        let state = normalize_state(&ledger, raw);
        log::debug!(
            "loaded progress for {user_id}: {} badges at rank {}",
            state.badge_count,
            state.rank_id
        );
        let controller = Self {
            ledger,
            storage,
            notifier,
            user_id: user_id.to_string(),
            state,
            read_error,
        };
        if stored.is_some() && state != raw {
            log::warn!("repaired stored progress for {user_id}: {raw:?} -> {state:?}");
            if controller.persist().is_some() {
                log::debug!("repaired progress for {user_id} kept in memory only");
            }
        }
        controller
    }

    /// Wrap an in-memory state without reading storage.
    pub fn with_state(
        ledger: Arc<RankLedger>,
        storage: S,
        notifier: N,
        user_id: &str,
        state: ProgressionState,
    ) -> Self {
        let state = normalize_state(&ledger, state);
        Self {
            ledger,
            storage,
            notifier,
            user_id: user_id.to_string(),
            state,
            read_error: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ProgressionState {
        self.state
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn ledger(&self) -> &RankLedger {
        &self.ledger
    }

    /// Whether the stored record could not be read, leaving this session unsaved.
    #[must_use]
    pub const fn read_failed(&self) -> bool {
        self.read_error.is_some()
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub fn current_rank(&self) -> &Rank {
        self.ledger.rank_or_nearest(self.state.rank_id)
    }

    #[must_use]
    pub fn next_rank(&self) -> Option<&Rank> {
        self.ledger.get_next_rank(self.state.rank_id)
    }

    /// Credit one badge, promote if the threshold is reached, and persist.
    pub fn award_badge(&mut self) -> AwardOutcome {
        let (state, event) = apply_award(&self.ledger, self.state);
        self.state = state;
        let persistence_warning = self.persist();
        let promoted = matches!(event, ProgressionEvent::Promoted { .. });
        if let ProgressionEvent::Promoted { rank } = &event {
            log::info!("{} promoted to rank {}", self.user_id, rank.id);
            self.notifier.on_promotion(rank);
        }
        AwardOutcome {
            promoted,
            event,
            state,
            persistence_warning,
        }
    }

    /// Apply [`Self::award_badge`] `count` times.
    pub fn award_badges(&mut self, count: u32) -> Vec<AwardOutcome> {
        (0..count).map(|_| self.award_badge()).collect()
    }

    #[must_use]
    pub fn status(&self) -> ProgressionStatus {
        let rank = self.current_rank().clone();
        let next_rank = self.next_rank().cloned();
        let badges_to_next = next_rank
            .as_ref()
            .map(|_| rank.promotion_threshold.saturating_sub(self.state.badge_count));
        ProgressionStatus {
            state: self.state,
            rank,
            next_rank,
            badges_to_next,
            tiers: AchievementTiers::from_badge_count(self.state.badge_count),
        }
    }

    fn persist(&self) -> Option<PersistenceWarning> {
        if let Some(reason) = &self.read_error {
            let warning = PersistenceWarning {
                user_id: self.user_id.clone(),
                reason: format!(
                    "stored progress could not be read ({reason}), leaving it untouched"
                ),
            };
            log::warn!("{warning}");
            return Some(warning);
        }
        match self.storage.save_state(&self.user_id, &self.state) {
            Ok(()) => None,
            Err(err) => {
                let warning = PersistenceWarning {
                    user_id: self.user_id.clone(),
                    reason: err.to_string(),
                };
                log::warn!("{warning}");
                Some(warning)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::storage::StorageError;
    use std::cell::{Cell, RefCell};
    use std::convert::Infallible;
    use std::rc::Rc;

    fn three_tier() -> Arc<RankLedger> {
        Arc::new(
            RankLedger::new(vec![
                Rank::new(1, "One", "1", 10),
                Rank::new(2, "Two", "2", 10),
                Rank::new(3, "Three", "3", 0),
            ])
            .unwrap(),
        )
    }

    #[derive(Debug, Default)]
    struct FailingStorage;

    #[derive(Debug, Error)]
    #[error("disk full")]
    struct DiskFull;

    impl ProgressionStorage for FailingStorage {
        type Error = DiskFull;

        fn load_state(&self, _user_id: &str) -> Result<Option<ProgressionState>, Self::Error> {
            Err(DiskFull)
        }

        fn save_state(&self, _user_id: &str, _state: &ProgressionState) -> Result<(), Self::Error> {
            Err(DiskFull)
        }
    }

    /// Fails the first read only, like a transient I/O error.
    #[derive(Debug)]
    struct FlakyRead {
        inner: MemoryStorage,
        failed_once: Cell<bool>,
    }

    impl ProgressionStorage for FlakyRead {
        type Error = StorageError;

        fn load_state(&self, user_id: &str) -> Result<Option<ProgressionState>, Self::Error> {
            if self.failed_once.replace(true) {
                self.inner.load_state(user_id)
            } else {
                Err(StorageError::Io(std::io::Error::other("transient")))
            }
        }

        fn save_state(&self, user_id: &str, state: &ProgressionState) -> Result<(), Self::Error> {
            self.inner.save_state(user_id, state)
        }
    }

    #[derive(Debug, Default)]
    struct NullStorage;

    impl ProgressionStorage for NullStorage {
        type Error = Infallible;

        fn load_state(&self, _user_id: &str) -> Result<Option<ProgressionState>, Self::Error> {
            Ok(None)
        }

        fn save_state(&self, _user_id: &str, _state: &ProgressionState) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn ninth_badge_plus_one_promotes() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut controller = ProgressionController::with_state(
            three_tier(),
            NullStorage,
            move |rank: &Rank| sink.borrow_mut().push(rank.id),
            "u1",
            ProgressionState::new(9, 1),
        );
        let outcome = controller.award_badge();
        assert!(outcome.promoted);
        assert_eq!(controller.state(), ProgressionState::new(0, 2));
        match outcome.event {
            ProgressionEvent::Promoted { rank } => assert_eq!(rank.id, 2),
            other @ ProgressionEvent::BadgeAwarded { .. } => panic!("unexpected {other:?}"),
        }
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn plain_award_increments() {
        let mut controller = ProgressionController::with_state(
            three_tier(),
            NullStorage,
            NoopNotifier,
            "u1",
            ProgressionState::default(),
        );
        let outcome = controller.award_badge();
        assert!(!outcome.promoted);
        assert_eq!(outcome.event, ProgressionEvent::BadgeAwarded { badge_count: 1 });
        assert!(outcome.persistence_warning.is_none());
    }

    #[test]
    fn storage_failure_still_applies_award() {
        let mut controller = ProgressionController::with_state(
            three_tier(),
            FailingStorage,
            NoopNotifier,
            "u1",
            ProgressionState::default(),
        );
        let outcome = controller.award_badge();
        assert_eq!(outcome.state, ProgressionState::new(1, 1));
        assert_eq!(controller.state(), ProgressionState::new(1, 1));
        let warning = outcome.persistence_warning.expect("warning surfaced");
        assert_eq!(warning.user_id, "u1");
        assert_eq!(warning.reason, "disk full");
    }

    #[test]
    fn unreadable_record_is_never_overwritten() {
        let inner = MemoryStorage::default();
        inner.save_state("u1", &ProgressionState::new(5, 3)).unwrap();
        let storage = FlakyRead {
            inner: inner.clone(),
            failed_once: Cell::new(false),
        };
        let mut controller =
            ProgressionController::load(three_tier(), storage, NoopNotifier, "u1");
        assert!(controller.read_failed());
        assert_eq!(controller.state(), ProgressionState::default());

        let outcome = controller.award_badge();
        assert_eq!(outcome.state, ProgressionState::new(1, 1));
        let warning = outcome.persistence_warning.expect("warning surfaced");
        assert!(warning.reason.contains("transient"));
        assert_eq!(
            inner.load_state("u1").unwrap(),
            Some(ProgressionState::new(5, 3))
        );

        let retried =
            ProgressionController::load(three_tier(), controller.storage, NoopNotifier, "u1");
        assert!(!retried.read_failed());
        assert_eq!(retried.state(), ProgressionState::new(5, 3));
    }

    #[test]
    fn load_repairs_overflowing_state_and_writes_back() {
        let storage = MemoryStorage::default();
        storage
            .save_state("u1", &ProgressionState::new(25, 1))
            .unwrap();
        let controller =
            ProgressionController::load(three_tier(), storage.clone(), NoopNotifier, "u1");
        assert_eq!(controller.state(), ProgressionState::new(5, 3));
        assert_eq!(
            storage.load_state("u1").unwrap(),
            Some(ProgressionState::new(5, 3))
        );
    }

    #[test]
    fn normalize_clamps_unknown_rank_ids() {
        let ledger = three_tier();
        assert_eq!(
            normalize_state(&ledger, ProgressionState::new(4, 99)),
            ProgressionState::new(4, 3)
        );
        assert_eq!(
            normalize_state(&ledger, ProgressionState::new(12, 0)),
            ProgressionState::new(2, 2)
        );
        assert_eq!(
            normalize_state(&ledger, ProgressionState::new(3, 2)),
            ProgressionState::new(3, 2)
        );
    }

    #[test]
    fn status_reports_remaining_badges() {
        let controller = ProgressionController::with_state(
            three_tier(),
            NullStorage,
            NoopNotifier,
            "u1",
            ProgressionState::new(7, 2),
        );
        let status = controller.status();
        assert_eq!(status.rank.id, 2);
        assert_eq!(status.next_rank.as_ref().map(|r| r.id), Some(3));
        assert_eq!(status.badges_to_next, Some(3));
        assert!(!status.is_terminal());

        let top = ProgressionController::with_state(
            three_tier(),
            NullStorage,
            NoopNotifier,
            "u1",
            ProgressionState::new(123, 3),
        );
        let status = top.status();
        assert!(status.is_terminal());
        assert_eq!(status.badges_to_next, None);
        assert_eq!(status.tiers.trophies, 2);
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let json = serde_json::to_value(ProgressionEvent::BadgeAwarded { badge_count: 3 }).unwrap();
        assert_eq!(json["kind"], "badge_awarded");
        assert_eq!(json["badge_count"], 3);
    }
}
