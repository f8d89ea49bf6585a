//! Seeded daily content: one mission or practice scenario per day and locale.
//!
//! A catalog holds locale-indexed templates with `{placeholder}` slots and the
//! filler lists for each placeholder. The template and every placeholder are
//! chosen by independent slot seeds derived from the date, so the same
//! `(date, locale, category)` always renders the same text without storage.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::locale::Locale;
use crate::seed::{DateKey, derive_domain_seed, seeded_index, slot_seed};

/// Placeholder names referenced by a single template, in first-seen order.
pub type PlaceholderSet = SmallVec<[String; 4]>;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern compiles")
});

/// Content family; the two families use parallel but distinct catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    /// Daily restart mission.
    Mission,
    /// Social-skill practice scenario.
    Scenario,
}

impl ContentCategory {
    pub const ALL: &'static [Self] = &[Self::Mission, Self::Scenario];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Mission => "mission",
            Self::Scenario => "scenario",
        }
    }

    /// Locale-neutral text shown when the catalog cannot render.
    #[must_use]
    pub const fn fallback_text(self) -> &'static str {
        match self {
            Self::Mission => "No missions for today. Check back tomorrow!",
            Self::Scenario => "No scenario for today. Check back tomorrow!",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ContentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mission" | "missions" => Ok(Self::Mission),
            "scenario" | "scenarios" => Ok(Self::Scenario),
            other => Err(format!("unknown content category: {other}")),
        }
    }
}

/// Catalog misconfiguration detected while rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no {category} templates for locale {locale}")]
    MissingTemplates {
        category: ContentCategory,
        locale: Locale,
    },
    #[error("placeholder {{{placeholder}}} has no fillers for locale {locale}")]
    MissingFiller { placeholder: String, locale: Locale },
    #[error("placeholder {{{placeholder}}} is not declared in the {category} catalog")]
    UnknownPlaceholder {
        placeholder: String,
        category: ContentCategory,
    },
    #[error("fillers of {{{placeholder}}} for locale {locale} contain a placeholder")]
    NestedPlaceholder { placeholder: String, locale: Locale },
}

/// Literal rewrite applied to a chosen template before substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refinement {
    #[serde(rename = "match")]
    pub pattern: String,
    pub replace: String,
}

/// Filler values for one placeholder, per locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderFillers {
    pub name: String,
    #[serde(default)]
    pub values: BTreeMap<Locale, Vec<String>>,
}

/// Template and filler data for one content category.
///
/// The declaration order of `placeholders` fixes each placeholder's slot
/// offset; appending a placeholder never changes existing selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCatalog {
    pub category: ContentCategory,
    #[serde(default)]
    pub templates: BTreeMap<Locale, Vec<String>>,
    #[serde(default)]
    pub placeholders: Vec<PlaceholderFillers>,
    #[serde(default)]
    pub refinements: BTreeMap<Locale, Vec<Refinement>>,
}

impl ContentCatalog {
    /// Create an empty catalog (useful for tests)
    #[must_use]
    pub const fn empty(category: ContentCategory) -> Self {
        Self {
            category,
            templates: BTreeMap::new(),
            placeholders: Vec::new(),
            refinements: BTreeMap::new(),
        }
    }

    /// Load a catalog from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a catalog.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn with_templates<I, T>(mut self, locale: Locale, templates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.templates
            .insert(locale, templates.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_fillers<I, T>(mut self, name: &str, locale: Locale, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if let Some(entry) = self.placeholders.iter_mut().find(|p| p.name == name) {
            entry.values.insert(locale, values);
        } else {
            let mut by_locale = BTreeMap::new();
            by_locale.insert(locale, values);
            self.placeholders.push(PlaceholderFillers {
                name: name.to_string(),
                values: by_locale,
            });
        }
        self
    }

    #[must_use]
    pub fn with_refinement(mut self, locale: Locale, pattern: &str, replace: &str) -> Self {
        self.refinements.entry(locale).or_default().push(Refinement {
            pattern: pattern.to_string(),
            replace: replace.to_string(),
        });
        self
    }

    /// Locales that have at least one template.
    pub fn locales(&self) -> impl Iterator<Item = Locale> + '_ {
        self.templates
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(locale, _)| *locale)
    }

    fn refine(&self, template: &str, locale: Locale) -> String {
        let mut refined = template.to_string();
        if let Some(rules) = self.refinements.get(&locale) {
            for rule in rules {
                if refined.contains(&rule.pattern) {
                    refined = refined.replacen(&rule.pattern, &rule.replace, 1);
                }
            }
        }
        refined
    }

    fn slot_of(&self, name: &str) -> Option<(u32, &PlaceholderFillers)> {
        self.placeholders
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
            .and_then(|(idx, p)| u32::try_from(idx + 1).ok().map(|offset| (offset, p)))
    }

    fn fillers_for(
        &self,
        name: &str,
        locale: Locale,
    ) -> Result<(u32, &[String]), ConfigurationError> {
        let (offset, fillers) =
            self.slot_of(name)
                .ok_or_else(|| ConfigurationError::UnknownPlaceholder {
                    placeholder: name.to_string(),
                    category: self.category,
                })?;
        match fillers.values.get(&locale) {
            Some(values) if !values.is_empty() => Ok((offset, values.as_slice())),
            _ => Err(ConfigurationError::MissingFiller {
                placeholder: name.to_string(),
                locale,
            }),
        }
    }
}

/// Distinct placeholder names in a template, in order of first appearance.
#[must_use]
pub fn placeholders_in(template: &str) -> PlaceholderSet {
    let mut names = PlaceholderSet::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// One rendered piece of daily content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyContent {
    pub date: NaiveDate,
    pub locale: Locale,
    pub category: ContentCategory,
    pub text: String,
}

/// Pure renderer over a single catalog.
#[derive(Debug, Clone)]
pub struct ContentGenerator {
    catalog: ContentCatalog,
}

impl ContentGenerator {
    #[must_use]
    pub const fn new(catalog: ContentCatalog) -> Self {
        Self { catalog }
    }

    #[must_use]
    pub const fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn category(&self) -> ContentCategory {
        self.catalog.category
    }

    /// Render the text for a date key and locale.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] when the locale has no templates or the
    /// chosen template references a placeholder without fillers.
    pub fn render(&self, date_key: DateKey, locale: Locale) -> Result<String, ConfigurationError> {
        let base = derive_domain_seed(date_key, self.category().key().as_bytes());
        let templates = self
            .catalog
            .templates
            .get(&locale)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let template_idx = seeded_index(slot_seed(base, 0), templates.len()).ok_or(
            ConfigurationError::MissingTemplates {
                category: self.category(),
                locale,
            },
        )?;
        let template = self.catalog.refine(&templates[template_idx], locale);
        self.substitute(&template, base, locale)
    }

    fn substitute(
        &self,
        template: &str,
        base: u64,
        locale: Locale,
    ) -> Result<String, ConfigurationError> {
        let mut chosen: SmallVec<[(String, &str); 4]> = SmallVec::new();
        for name in placeholders_in(template) {
            let (offset, values) = self.catalog.fillers_for(&name, locale)?;
            let idx = seeded_index(slot_seed(base, offset), values.len()).unwrap_or(0);
            chosen.push((name, values[idx].as_str()));
        }
        // Single pass: inserted filler text is never scanned again.
        let text = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
            chosen
                .iter()
                .find(|(name, _)| name == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| (*value).to_string())
        });
        Ok(text.into_owned())
    }

    /// Render the content for a calendar date.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] under the same conditions as [`Self::render`].
    pub fn generate(
        &self,
        date: NaiveDate,
        locale: Locale,
    ) -> Result<DailyContent, ConfigurationError> {
        let text = self.render(DateKey::from_date(date), locale)?;
        Ok(DailyContent {
            date,
            locale,
            category: self.category(),
            text,
        })
    }

    /// Render, substituting the category's fallback text on misconfiguration.
    #[must_use]
    pub fn render_or_fallback(&self, date: NaiveDate, locale: Locale) -> DailyContent {
        self.generate(date, locale).unwrap_or_else(|err| {
            log::warn!(
                "falling back to default {} text for {date} ({locale}): {err}",
                self.category()
            );
            DailyContent {
                date,
                locale,
                category: self.category(),
                text: self.category().fallback_text().to_string(),
            }
        })
    }

    /// Check every template of every locale up front.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.catalog.locales().next().is_none() {
            return Err(ConfigurationError::MissingTemplates {
                category: self.category(),
                locale: Locale::default(),
            });
        }
        for (locale, templates) in &self.catalog.templates {
            if templates.is_empty() {
                return Err(ConfigurationError::MissingTemplates {
                    category: self.category(),
                    locale: *locale,
                });
            }
            for template in templates {
                let refined = self.catalog.refine(template, *locale);
                for name in placeholders_in(&refined) {
                    self.catalog.fillers_for(&name, *locale)?;
                }
            }
        }
        for fillers in &self.catalog.placeholders {
            for (locale, values) in &fillers.values {
                if values.iter().any(|value| PLACEHOLDER.is_match(value)) {
                    return Err(ConfigurationError::NestedPlaceholder {
                        placeholder: fillers.name.clone(),
                        locale: *locale,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Same-day cache of rendered content, one entry per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyContentCache {
    entries: BTreeMap<ContentCategory, DailyContent>,
}

impl DailyContentCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry for the category, regardless of date.
    #[must_use]
    pub fn get(&self, category: ContentCategory) -> Option<&DailyContent> {
        self.entries.get(&category)
    }

    /// Return today's entry, regenerating when the date or locale moved on.
    pub fn get_or_generate(
        &mut self,
        generator: &ContentGenerator,
        date: NaiveDate,
        locale: Locale,
    ) -> &DailyContent {
        let category = generator.category();
        let stale = self
            .entries
            .get(&category)
            .is_none_or(|entry| entry.date != date || entry.locale != locale);
        if stale {
            self.entries
                .insert(category, generator.render_or_fallback(date, locale));
        }
        &self.entries[&category]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
