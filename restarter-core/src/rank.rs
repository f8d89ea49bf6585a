//! Rank ladder: the static ordered tier table and pure lookups.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::locale::Locale;

/// One tier of the ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rank {
    pub id: u32,
    /// Display names keyed by primary language subtag (`en`, `zh`, ...).
    pub names: BTreeMap<String, String>,
    pub icon: String,
    /// Badges needed to leave this rank; `0` marks the terminal rank.
    pub promotion_threshold: u32,
}

impl Rank {
    #[must_use]
    pub fn new(id: u32, name_en: &str, icon: &str, promotion_threshold: u32) -> Self {
        let mut names = BTreeMap::new();
        names.insert("en".to_string(), name_en.to_string());
        Self {
            id,
            names,
            icon: icon.to_string(),
            promotion_threshold,
        }
    }

    #[must_use]
    pub fn with_name(mut self, language: &str, name: &str) -> Self {
        self.names.insert(language.to_string(), name.to_string());
        self
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.promotion_threshold == 0
    }

    /// Name for the locale, falling back to English and then to the id.
    #[must_use]
    pub fn display_name(&self, locale: Locale) -> String {
        self.names
            .get(locale.language())
            .or_else(|| self.names.get("en"))
            .cloned()
            .unwrap_or_else(|| format!("#{}", self.id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankError {
    #[error("rank {0} not found")]
    NotFound(u32),
    #[error("rank table is empty")]
    EmptyTable,
    #[error("rank ids must run 1..=n in order; found {found} at position {position}")]
    NonContiguous { position: usize, found: u32 },
    #[error("rank {0} has no promotion threshold but is not the last rank")]
    TerminalNotLast(u32),
    #[error("last rank {0} must have a zero promotion threshold")]
    MissingTerminal(u32),
}

/// Validated, immutable rank table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RankLedger {
    ranks: Vec<Rank>,
}

impl RankLedger {
    /// Build a ledger, checking the ordering invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`RankError`] when the table is empty, ids are not `1..=n`,
    /// or the terminal rank is missing or not last.
    pub fn new(ranks: Vec<Rank>) -> Result<Self, RankError> {
        let Some(last) = ranks.last() else {
            return Err(RankError::EmptyTable);
        };
        if !last.is_terminal() {
            return Err(RankError::MissingTerminal(last.id));
        }
        for (position, rank) in ranks.iter().enumerate() {
            let expected = u32::try_from(position + 1).unwrap_or(u32::MAX);
            if rank.id != expected {
                return Err(RankError::NonContiguous {
                    position,
                    found: rank.id,
                });
            }
            if rank.is_terminal() && position + 1 != ranks.len() {
                return Err(RankError::TerminalNotLast(rank.id));
            }
        }
        Ok(Self { ranks })
    }

    /// Load and validate a ledger from a JSON array of ranks
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the table is invalid.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let ranks: Vec<Rank> = serde_json::from_str(json)?;
        Ok(Self::new(ranks)?)
    }

    /// The eight-tier ladder shipped with the app.
    #[must_use]
    pub fn empire() -> Self {
        let ranks = vec![
            Rank::new(1, "Scribe", "📜", 10).with_name("zh", "書吏"),
            Rank::new(2, "County Clerk", "🪪", 10).with_name("zh", "縣丞"),
            Rank::new(3, "Overseer", "🧾", 10).with_name("zh", "通判"),
            Rank::new(4, "Inspector", "🛡️", 10).with_name("zh", "巡撫"),
            Rank::new(5, "Minister", "🏛️", 10).with_name("zh", "尚書"),
            Rank::new(6, "Imperial Counselor", "📯", 10).with_name("zh", "太保"),
            Rank::new(7, "Chancellor", "🏯", 10).with_name("zh", "宰相"),
            Rank::new(8, "Emperor", "🏰🫅", 0).with_name("zh", "皇帝"),
        ];
        Self { ranks }
    }

    /// Look up a rank by id.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::NotFound`] for ids outside the table.
    pub fn get_rank(&self, id: u32) -> Result<&Rank, RankError> {
        self.index_of(id)
            .map(|idx| &self.ranks[idx])
            .ok_or(RankError::NotFound(id))
    }

    /// Tier immediately above `id`; `None` at the terminal rank or for unknown ids.
    #[must_use]
    pub fn get_next_rank(&self, id: u32) -> Option<&Rank> {
        self.index_of(id).and_then(|idx| self.ranks.get(idx + 1))
    }

    #[must_use]
    pub fn is_promotion_eligible(&self, badge_count: u32, current_rank_id: u32) -> bool {
        self.get_rank(current_rank_id)
            .is_ok_and(|rank| !rank.is_terminal() && badge_count >= rank.promotion_threshold)
    }

    /// Nearest valid id: ids below the table clamp to the first rank, above to the terminal.
    #[must_use]
    pub fn clamp_rank_id(&self, id: u32) -> u32 {
        id.clamp(self.first().id, self.terminal().id)
    }

    /// Rank for `id`, or the nearest valid rank when `id` is outside the table.
    #[must_use]
    pub fn rank_or_nearest(&self, id: u32) -> &Rank {
        self.get_rank(self.clamp_rank_id(id))
            .unwrap_or_else(|_| self.terminal())
    }

    #[must_use]
    pub fn first(&self) -> &Rank {
        &self.ranks[0]
    }

    #[must_use]
    pub fn terminal(&self) -> &Rank {
        &self.ranks[self.ranks.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rank> {
        self.ranks.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    fn index_of(&self, id: u32) -> Option<usize> {
        let idx = usize::try_from(id.checked_sub(1)?).ok()?;
        (idx < self.ranks.len()).then_some(idx)
    }
}

impl Default for RankLedger {
    fn default() -> Self {
        Self::empire()
    }
}

impl<'de> Deserialize<'de> for RankLedger {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let ranks = Vec::<Rank>::deserialize(deserializer)?;
        Self::new(ranks).map_err(serde::de::Error::custom)
    }
}
