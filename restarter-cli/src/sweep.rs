//! Determinism and distinctness sweeps over consecutive days.
use chrono::{Days, NaiveDate};
use restarter_core::{ContentCategory, ContentGenerator, Locale};
use serde::Serialize;
use std::collections::HashSet;
use std::hash::Hasher;
use twox_hash::XxHash64;

/// How many rendered texts each result keeps for display.
const SAMPLE_COUNT: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub category: ContentCategory,
    pub locale: Locale,
    pub start: NaiveDate,
    pub days: usize,
    pub deterministic: bool,
    pub unique: usize,
    pub repeat_ratio: f64,
    pub same_as_previous_day: usize,
    pub fallbacks: usize,
    pub fingerprint: String,
    pub samples: Vec<String>,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub max_repeat_ratio: f64,
    pub results: Vec<SweepResult>,
    /// `category/locale` pairs without templates, left out of the sweep.
    pub skipped: Vec<String>,
}

impl SweepReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }
}

fn dates_from(start: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..u64::from(days))
        .map_while(|offset| start.checked_add_days(Days::new(offset)))
        .collect()
}

fn render_all(
    generator: &ContentGenerator,
    dates: &[NaiveDate],
    locale: Locale,
) -> (Vec<String>, usize) {
    let mut fallbacks = 0;
    let texts = dates
        .iter()
        .map(|date| match generator.generate(*date, locale) {
            Ok(content) => content.text,
            Err(err) => {
                log::debug!("{date} {locale}: {err}");
                fallbacks += 1;
                generator.category().fallback_text().to_string()
            }
        })
        .collect();
    (texts, fallbacks)
}

fn fingerprint(texts: &[String]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    for text in texts {
        hasher.write(text.as_bytes());
        hasher.write_u8(0);
    }
    hasher.finish()
}

/// Render `days` consecutive dates twice with independent generators and
/// measure how often the text repeats.
#[must_use]
pub fn sweep(
    generator: &ContentGenerator,
    locale: Locale,
    start: NaiveDate,
    days: u32,
    max_repeat_ratio: f64,
) -> SweepResult {
    let dates = dates_from(start, days);
    let (texts, fallbacks) = render_all(generator, &dates, locale);
    let replay = ContentGenerator::new(generator.catalog().clone());
    let (replayed, _) = render_all(&replay, &dates, locale);

    let deterministic = texts == replayed;
    let unique = texts.iter().collect::<HashSet<_>>().len();
    #[allow(clippy::cast_precision_loss)]
    let repeat_ratio = if texts.is_empty() {
        0.0
    } else {
        1.0 - unique as f64 / texts.len() as f64
    };
    let same_as_previous_day = texts.windows(2).filter(|pair| pair[0] == pair[1]).count();

    SweepResult {
        category: generator.category(),
        locale,
        start,
        days: texts.len(),
        deterministic,
        unique,
        repeat_ratio,
        same_as_previous_day,
        fallbacks,
        fingerprint: format!("{:016x}", fingerprint(&texts)),
        samples: texts.iter().take(SAMPLE_COUNT).cloned().collect(),
        passed: deterministic && fallbacks == 0 && repeat_ratio <= max_repeat_ratio,
    }
}
