use restarter_core::{
    FileStorage, MemoryStorage, NoopNotifier, ProgressionController, ProgressionEvent,
    ProgressionState, ProgressionStorage, Rank, RankLedger,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

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

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "restarter-progress-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn promotion_from_nine_badges_lands_on_rank_two() {
    let promoted_to = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&promoted_to);
    let storage = MemoryStorage::default();
    let mut controller = ProgressionController::with_state(
        three_tier(),
        storage.clone(),
        move |rank: &Rank| sink.borrow_mut().push(rank.clone()),
        "scenario",
        ProgressionState::new(9, 1),
    );

    let outcome = controller.award_badge();

    assert!(outcome.promoted);
    assert_eq!(outcome.state, ProgressionState::new(0, 2));
    assert!(matches!(
        outcome.event,
        ProgressionEvent::Promoted { ref rank } if rank.id == 2
    ));
    assert_eq!(promoted_to.borrow().len(), 1);
    assert_eq!(promoted_to.borrow()[0].id, 2);
    assert_eq!(
        storage.load_state("scenario").unwrap(),
        Some(ProgressionState::new(0, 2))
    );
}

#[test]
fn rank_never_decreases_and_badges_stay_below_threshold() {
    let ledger = Arc::new(RankLedger::empire());
    let mut controller = ProgressionController::load(
        Arc::clone(&ledger),
        MemoryStorage::default(),
        NoopNotifier,
        "monotonic",
    );
    let mut last_rank = controller.state().rank_id;
    for _ in 0..1_000 {
        let outcome = controller.award_badge();
        assert!(outcome.state.rank_id >= last_rank);
        last_rank = outcome.state.rank_id;
        let rank = ledger.get_rank(outcome.state.rank_id).unwrap();
        if !outcome.promoted && !rank.is_terminal() {
            assert!(outcome.state.badge_count < rank.promotion_threshold);
        }
        if outcome.promoted {
            assert_eq!(outcome.state.badge_count, 0);
        }
    }
    assert_eq!(controller.state().rank_id, ledger.terminal().id);
    // 7 promotions at 10 badges each, the rest accumulate at the top.
    assert_eq!(controller.state().badge_count, 1_000 - 70);
}

#[test]
fn each_rank_promotes_on_exactly_the_threshold_award() {
    let ledger = Arc::new(RankLedger::empire());
    for rank in ledger.iter().filter(|rank| !rank.is_terminal()) {
        let mut controller = ProgressionController::with_state(
            Arc::clone(&ledger),
            MemoryStorage::default(),
            NoopNotifier,
            "exact",
            ProgressionState::new(0, rank.id),
        );
        let outcomes = controller.award_badges(rank.promotion_threshold);
        let promoted_at: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| outcome.promoted)
            .map(|(idx, _)| idx + 1)
            .collect();
        assert_eq!(promoted_at, vec![rank.promotion_threshold as usize]);
        let next = ledger.get_next_rank(rank.id).unwrap();
        assert_eq!(controller.state(), ProgressionState::new(0, next.id));
    }
}

#[test]
fn terminal_rank_never_promotes() {
    let ledger = Arc::new(RankLedger::empire());
    let terminal = ledger.terminal().id;
    let mut controller = ProgressionController::with_state(
        Arc::clone(&ledger),
        MemoryStorage::default(),
        NoopNotifier,
        "emperor",
        ProgressionState::new(0, terminal),
    );
    for outcome in controller.award_badges(500) {
        assert!(!outcome.promoted);
        assert_eq!(outcome.state.rank_id, terminal);
    }
    let status = controller.status();
    assert_eq!(status.state.badge_count, 500);
    assert_eq!(status.tiers.crowns, 5);
    assert!(status.is_terminal());
}

#[test]
fn file_backed_progress_survives_reload() {
    let dir = temp_path("reload");
    let storage = FileStorage::new(&dir);
    {
        let mut controller =
            ProgressionController::load(three_tier(), storage.clone(), NoopNotifier, "carol");
        controller.award_badges(12);
    }
    let reopened = ProgressionController::load(three_tier(), storage, NoopNotifier, "carol");
    assert_eq!(reopened.state(), ProgressionState::new(2, 2));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn corrupted_persisted_state_is_repaired_on_load() {
    let storage = MemoryStorage::default();
    storage
        .save_state("dave", &ProgressionState::new(25, 1))
        .unwrap();
    let controller = ProgressionController::load(three_tier(), storage.clone(), NoopNotifier, "dave");
    assert_eq!(controller.state(), ProgressionState::new(5, 3));

    storage
        .save_state("erin", &ProgressionState::new(4, 99))
        .unwrap();
    let controller = ProgressionController::load(three_tier(), storage, NoopNotifier, "erin");
    assert_eq!(controller.state(), ProgressionState::new(4, 3));
}
