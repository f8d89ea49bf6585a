use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use restarter_core::{ContentCategory, Locale};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse `YYYY-MM-DD`, defaulting to today's UTC date.
pub fn parse_date(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        Some(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid date (expected YYYY-MM-DD): {text}")),
        None => Ok(Utc::now().date_naive()),
    }
}

/// Comma-separated locale tags; `all` expands to every supported locale.
pub fn parse_locales(raw: &str) -> Result<Vec<Locale>> {
    let mut locales = Vec::new();
    for token in split_csv(raw) {
        if token.eq_ignore_ascii_case("all") {
            locales.extend_from_slice(Locale::ALL);
            continue;
        }
        locales.push(token.parse::<Locale>()?);
    }
    dedupe(&mut locales);
    if locales.is_empty() {
        bail!("no locales given");
    }
    Ok(locales)
}

/// Comma-separated categories; `all` expands to every category.
pub fn parse_categories(raw: &str) -> Result<Vec<ContentCategory>> {
    let mut categories = Vec::new();
    for token in split_csv(raw) {
        if token.eq_ignore_ascii_case("all") {
            categories.extend_from_slice(ContentCategory::ALL);
            continue;
        }
        categories.push(token.parse::<ContentCategory>().map_err(anyhow::Error::msg)?);
    }
    dedupe(&mut categories);
    if categories.is_empty() {
        bail!("no content categories given");
    }
    Ok(categories)
}

fn dedupe<T: PartialEq + Copy>(items: &mut Vec<T>) {
    let mut seen: Vec<T> = Vec::with_capacity(items.len());
    items.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(*item);
            true
        }
    });
}
