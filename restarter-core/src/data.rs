//! Content and rank data bundled with the crate.
use thiserror::Error;

use crate::ContentLoader;
use crate::content::{ContentCatalog, ContentCategory};
use crate::rank::RankLedger;

pub const MISSION_JSON: &str = include_str!("../assets/content/mission.json");
pub const SCENARIO_JSON: &str = include_str!("../assets/content/scenario.json");
pub const RANKS_JSON: &str = include_str!("../assets/ranks.json");

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalog for {expected} declares category {found}")]
    CategoryMismatch {
        expected: ContentCategory,
        found: ContentCategory,
    },
}

/// Loader serving the JSON compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedLoader;

impl ContentLoader for EmbeddedLoader {
    type Error = LoaderError;

    fn load_catalog(&self, category: ContentCategory) -> Result<ContentCatalog, Self::Error> {
        let json = match category {
            ContentCategory::Mission => MISSION_JSON,
            ContentCategory::Scenario => SCENARIO_JSON,
        };
        let catalog = ContentCatalog::from_json(json)?;
        if catalog.category != category {
            return Err(LoaderError::CategoryMismatch {
                expected: category,
                found: catalog.category,
            });
        }
        Ok(catalog)
    }

    fn load_ranks(&self) -> Result<RankLedger, Self::Error> {
        Ok(serde_json::from_str(RANKS_JSON)?)
    }
}
