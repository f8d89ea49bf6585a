//! Decorative badge display: folds a raw badge count into tiers of ten.
//!
//! Purely presentational; nothing here feeds back into progression state.
use serde::{Deserialize, Serialize};

/// Badges per trophy, trophies per crown, and so on.
pub const TIER_BASE: u32 = 10;

/// Glyphs for each decorative tier, lowest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierGlyphs {
    pub badge: String,
    pub trophy: String,
    pub crown: String,
    pub castle: String,
    pub palace: String,
}

impl Default for TierGlyphs {
    fn default() -> Self {
        Self {
            badge: "🦸‍♂️".to_string(),
            trophy: "🏆".to_string(),
            crown: "👑".to_string(),
            castle: "🏯".to_string(),
            palace: "🏰🫅".to_string(),
        }
    }
}

/// Per-tier glyph counts. Every tier but `palaces` stays below [`TIER_BASE`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementTiers {
    pub badges: u32,
    pub trophies: u32,
    pub crowns: u32,
    pub castles: u32,
    pub palaces: u32,
}

impl AchievementTiers {
    #[must_use]
    pub const fn from_badge_count(badge_count: u32) -> Self {
        let trophy_total = badge_count / TIER_BASE;
        let crown_total = trophy_total / TIER_BASE;
        let castle_total = crown_total / TIER_BASE;
        Self {
            badges: badge_count % TIER_BASE,
            trophies: trophy_total % TIER_BASE,
            crowns: crown_total % TIER_BASE,
            castles: castle_total % TIER_BASE,
            palaces: castle_total / TIER_BASE,
        }
    }

    /// Badge count these tiers stand for.
    #[must_use]
    pub const fn total(self) -> u64 {
        let base = TIER_BASE as u64;
        self.badges as u64
            + self.trophies as u64 * base
            + self.crowns as u64 * base * base
            + self.castles as u64 * base * base * base
            + self.palaces as u64 * base * base * base * base
    }

    /// Glyph string, lowest tier first.
    #[must_use]
    pub fn render(self, glyphs: &TierGlyphs) -> String {
        [
            (self.badges, &glyphs.badge),
            (self.trophies, &glyphs.trophy),
            (self.crowns, &glyphs.crown),
            (self.castles, &glyphs.castle),
            (self.palaces, &glyphs.palace),
        ]
        .into_iter()
        .map(|(count, glyph)| glyph.repeat(count as usize))
        .collect()
    }
}

/// Render a badge count with the default glyphs.
#[must_use]
pub fn render_badges(badge_count: u32) -> String {
    AchievementTiers::from_badge_count(badge_count).render(&TierGlyphs::default())
}
