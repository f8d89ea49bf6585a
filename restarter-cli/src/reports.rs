use anyhow::Result;
use colored::Colorize;
use restarter_core::{
    AwardOutcome, DailyContent, Locale, ProgressionEvent, ProgressionState, ProgressionStatus,
    TierGlyphs,
};
use serde::Serialize;
use std::io::Write;

use crate::sweep::SweepReport;

/// Serializable view of one award.
#[derive(Debug, Clone, Serialize)]
pub struct AwardRecord {
    pub promoted: bool,
    pub event: ProgressionEvent,
    pub state: ProgressionState,
    pub warning: Option<String>,
}

impl From<AwardOutcome> for AwardRecord {
    fn from(outcome: AwardOutcome) -> Self {
        Self {
            promoted: outcome.promoted,
            event: outcome.event,
            state: outcome.state,
            warning: outcome.persistence_warning.map(|w| w.to_string()),
        }
    }
}

pub fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_daily_console(out: &mut dyn Write, contents: &[DailyContent]) -> Result<()> {
    for content in contents {
        writeln!(
            out,
            "📅 {} [{}] {}",
            content.date,
            content.locale.tag().cyan(),
            content.category.to_string().bold()
        )?;
        writeln!(out, "   {}", content.text)?;
    }
    Ok(())
}

pub fn write_daily_markdown(out: &mut dyn Write, contents: &[DailyContent]) -> Result<()> {
    writeln!(out, "# Restarter Daily Content\n")?;
    writeln!(out, "| Date | Locale | Category | Text |")?;
    writeln!(out, "|------|--------|----------|------|")?;
    for content in contents {
        writeln!(
            out,
            "| {} | {} | {} | {} |",
            content.date,
            content.locale,
            content.category,
            content.text.replace('|', "\\|")
        )?;
    }
    Ok(())
}

pub fn write_awards_console(
    out: &mut dyn Write,
    user: &str,
    records: &[AwardRecord],
    status: &ProgressionStatus,
    locale: Locale,
) -> Result<()> {
    for record in records {
        match &record.event {
            ProgressionEvent::Promoted { rank } => writeln!(
                out,
                "🎉 {} promoted to {} {}",
                user.bold(),
                rank.display_name(locale).bright_yellow().bold(),
                rank.icon
            )?,
            ProgressionEvent::BadgeAwarded { badge_count } => {
                writeln!(out, "🏅 {user} earned a badge ({badge_count} held)")?;
            }
        }
        if let Some(warning) = &record.warning {
            writeln!(out, "   ⚠️  {}", warning.yellow())?;
        }
    }
    write_status_console(out, user, status, locale)
}

pub fn write_awards_markdown(
    out: &mut dyn Write,
    user: &str,
    records: &[AwardRecord],
    status: &ProgressionStatus,
    locale: Locale,
) -> Result<()> {
    writeln!(out, "# Badges awarded to {user}\n")?;
    writeln!(out, "| # | Event | Badges | Rank |")?;
    writeln!(out, "|---|-------|--------|------|")?;
    for (idx, record) in records.iter().enumerate() {
        let event = if record.promoted { "promoted" } else { "badge" };
        writeln!(
            out,
            "| {} | {event} | {} | {} |",
            idx + 1,
            record.state.badge_count,
            record.state.rank_id
        )?;
    }
    writeln!(out)?;
    write_status_markdown(out, user, status, locale)
}

pub fn write_status_console(
    out: &mut dyn Write,
    user: &str,
    status: &ProgressionStatus,
    locale: Locale,
) -> Result<()> {
    writeln!(out, "{}", format!("👤 {user}").bright_cyan().bold())?;
    writeln!(
        out,
        "   Rank: {} {} (#{})",
        status.rank.display_name(locale).bold(),
        status.rank.icon,
        status.rank.id
    )?;
    match (&status.next_rank, status.badges_to_next) {
        (Some(next), Some(remaining)) => writeln!(
            out,
            "   Badges: {}/{} ({remaining} to {} {})",
            status.state.badge_count,
            status.rank.promotion_threshold,
            next.display_name(locale),
            next.icon
        )?,
        _ => writeln!(
            out,
            "   Badges: {} {}",
            status.state.badge_count,
            "(top rank reached)".green()
        )?,
    }
    let glyphs = status.tiers.render(&TierGlyphs::default());
    if !glyphs.is_empty() {
        writeln!(out, "   {glyphs}")?;
    }
    Ok(())
}

pub fn write_status_markdown(
    out: &mut dyn Write,
    user: &str,
    status: &ProgressionStatus,
    locale: Locale,
) -> Result<()> {
    writeln!(out, "## Status of {user}\n")?;
    writeln!(
        out,
        "- Rank: {} {} (#{})",
        status.rank.display_name(locale),
        status.rank.icon,
        status.rank.id
    )?;
    writeln!(out, "- Badges: {}", status.state.badge_count)?;
    match &status.next_rank {
        Some(next) => writeln!(
            out,
            "- Next: {} after {} more",
            next.display_name(locale),
            status.badges_to_next.unwrap_or_default()
        )?,
        None => writeln!(out, "- Next: none (top rank)")?,
    }
    Ok(())
}

pub fn write_sweep_console(out: &mut dyn Write, report: &SweepReport) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Content Sweep Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "========================".cyan())?;
    let passed = report.results.iter().filter(|r| r.passed).count();
    writeln!(out, "Total sweeps: {}", report.results.len())?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(
        out,
        "Failed: {}",
        (report.results.len() - passed).to_string().red()
    )?;
    writeln!(out, "Max repeat ratio: {:.2}", report.max_repeat_ratio)?;
    writeln!(out)?;

    for result in &report.results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            out,
            "{status} {}/{}",
            result.category.to_string().bold(),
            result.locale
        )?;
        writeln!(
            out,
            "   Days: {} from {} | unique {} | repeat ratio {:.3} | same as previous day {}",
            result.days,
            result.start,
            result.unique,
            result.repeat_ratio,
            result.same_as_previous_day
        )?;
        writeln!(
            out,
            "   Deterministic: {} | fallbacks {} | fingerprint {}",
            result.deterministic, result.fallbacks, result.fingerprint
        )?;
        for sample in &result.samples {
            writeln!(out, "     • {sample}")?;
        }
        writeln!(out)?;
    }

    for skipped in &report.skipped {
        writeln!(out, "⏭️  Skipped {skipped} (no templates)")?;
    }
    Ok(())
}

pub fn write_sweep_markdown(out: &mut dyn Write, report: &SweepReport) -> Result<()> {
    writeln!(out, "# Restarter Content Sweep\n")?;
    writeln!(
        out,
        "| Category | Locale | Days | Unique | Repeat ratio | Deterministic | Fingerprint | Status |"
    )?;
    writeln!(
        out,
        "|----------|--------|------|--------|--------------|---------------|-------------|--------|"
    )?;
    for result in &report.results {
        writeln!(
            out,
            "| {} | {} | {} | {} | {:.3} | {} | `{}` | {} |",
            result.category,
            result.locale,
            result.days,
            result.unique,
            result.repeat_ratio,
            result.deterministic,
            result.fingerprint,
            if result.passed { "✅" } else { "❌" }
        )?;
    }
    if !report.skipped.is_empty() {
        writeln!(out, "\nSkipped: {}", report.skipped.join(", "))?;
    }
    Ok(())
}
