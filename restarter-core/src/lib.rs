//! Restarter Progression Engine
//!
//! Platform-agnostic core logic for Restarter: the seeded daily mission and
//! scenario generator, the rank ladder, and the badge progression controller.
//! This crate has no UI, network, or platform-specific dependencies.

pub mod content;
pub mod data;
pub mod display;
pub mod locale;
pub mod progression;
pub mod rank;
pub mod seed;
pub mod storage;

use anyhow::Context;
use chrono::NaiveDate;
use std::sync::Arc;

// Re-export commonly used types
pub use content::{
    ConfigurationError, ContentCatalog, ContentCategory, ContentGenerator, DailyContent,
    DailyContentCache, placeholders_in,
};
pub use data::{EmbeddedLoader, LoaderError};
pub use display::{AchievementTiers, TierGlyphs, render_badges};
pub use locale::Locale;
pub use progression::{
    AwardOutcome, LogNotifier, NoopNotifier, PersistenceWarning, ProgressionController,
    ProgressionEvent, ProgressionState, ProgressionStatus, PromotionNotifier, apply_award,
    normalize_state,
};
pub use rank::{Rank, RankError, RankLedger};
pub use seed::DateKey;
pub use storage::{FileStorage, MemoryStorage, StorageError};

/// Trait for abstracting content and rank data loading
/// Platform-specific implementations should provide this
pub trait ContentLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the template catalog of a content category
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded or parsed.
    fn load_catalog(&self, category: ContentCategory) -> Result<ContentCatalog, Self::Error>;

    /// Load the rank ladder
    ///
    /// # Errors
    ///
    /// Returns an error if the rank table cannot be loaded or is invalid.
    fn load_ranks(&self) -> Result<RankLedger, Self::Error>;
}

/// Trait for abstracting per-user progress persistence
/// Platform-specific implementations should provide this
pub trait ProgressionStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load a user's progress, `None` if nothing was stored yet
    ///
    /// # Errors
    ///
    /// Returns an error if the stored progress cannot be read.
    fn load_state(&self, user_id: &str) -> Result<Option<ProgressionState>, Self::Error>;

    /// Store a user's progress
    ///
    /// # Errors
    ///
    /// Returns an error if the progress cannot be written.
    fn save_state(&self, user_id: &str, state: &ProgressionState) -> Result<(), Self::Error>;
}

/// Main engine tying data loading and storage together
pub struct RestarterEngine<L, S>
where
    L: ContentLoader,
    S: ProgressionStorage + Clone,
{
    loader: L,
    storage: S,
    ledger: Arc<RankLedger>,
}

impl<L, S> RestarterEngine<L, S>
where
    L: ContentLoader,
    S: ProgressionStorage + Clone,
{
    /// Create an engine, loading the rank ladder up front
    ///
    /// # Errors
    ///
    /// Returns an error if the rank table cannot be loaded.
    pub fn new(loader: L, storage: S) -> anyhow::Result<Self> {
        let ledger = loader
            .load_ranks()
            .map_err(anyhow::Error::new)
            .context("loading rank ladder")?;
        Ok(Self {
            loader,
            storage,
            ledger: Arc::new(ledger),
        })
    }

    #[must_use]
    pub fn ledger(&self) -> &RankLedger {
        &self.ledger
    }

    /// Build a generator for a content category
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub fn generator(&self, category: ContentCategory) -> anyhow::Result<ContentGenerator> {
        let catalog = self
            .loader
            .load_catalog(category)
            .map_err(anyhow::Error::new)
            .with_context(|| format!("loading {category} catalog"))?;
        Ok(ContentGenerator::new(catalog))
    }

    /// Render one day's content, falling back to neutral text on misconfiguration
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub fn daily_content(
        &self,
        category: ContentCategory,
        date: NaiveDate,
        locale: Locale,
    ) -> anyhow::Result<DailyContent> {
        Ok(self.generator(category)?.render_or_fallback(date, locale))
    }

    /// Open a user's progression with the given promotion notifier
    pub fn progression<N>(&self, user_id: &str, notifier: N) -> ProgressionController<S, N>
    where
        N: PromotionNotifier,
    {
        ProgressionController::load(
            Arc::clone(&self.ledger),
            self.storage.clone(),
            notifier,
            user_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl ContentLoader for FixtureLoader {
        type Error = Infallible;

        fn load_catalog(&self, category: ContentCategory) -> Result<ContentCatalog, Self::Error> {
            Ok(ContentCatalog::empty(category)
                .with_templates(Locale::En, ["You meet a {relation}"])
                .with_fillers("relation", Locale::En, ["friend", "boss"]))
        }

        fn load_ranks(&self) -> Result<RankLedger, Self::Error> {
            Ok(RankLedger::new(vec![
                Rank::new(1, "One", "1", 2),
                Rank::new(2, "Two", "2", 0),
            ])
            .unwrap_or_default())
        }
    }

    #[test]
    fn engine_shares_storage_between_sessions() {
        let engine = RestarterEngine::new(FixtureLoader, MemoryStorage::default()).unwrap();
        let mut first = engine.progression("alice", NoopNotifier);
        assert!(!first.award_badge().promoted);
        assert!(first.award_badge().promoted);

        let reopened = engine.progression("alice", NoopNotifier);
        assert_eq!(reopened.state(), ProgressionState::new(0, 2));
        assert_eq!(
            engine.progression("bob", NoopNotifier).state(),
            ProgressionState::default()
        );
    }

    #[test]
    fn engine_renders_and_falls_back() {
        let engine = RestarterEngine::new(FixtureLoader, MemoryStorage::default()).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let en = engine
            .daily_content(ContentCategory::Scenario, date, Locale::En)
            .unwrap();
        assert!(en.text.starts_with("You meet a "));
        let ja = engine
            .daily_content(ContentCategory::Mission, date, Locale::Ja)
            .unwrap();
        assert_eq!(ja.text, ContentCategory::Mission.fallback_text());
    }

    #[test]
    fn embedded_engine_loads_bundled_data() {
        let engine = RestarterEngine::new(EmbeddedLoader, MemoryStorage::default()).unwrap();
        assert_eq!(engine.ledger().len(), 8);
        let date = NaiveDate::from_ymd_opt(2025, 6, 13).unwrap();
        for category in ContentCategory::ALL {
            let content = engine.daily_content(*category, date, Locale::ZhTw).unwrap();
            assert_ne!(content.text, category.fallback_text());
            assert!(!content.text.contains('{'));
        }
    }
}
