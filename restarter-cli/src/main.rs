mod reports;
mod sweep;
mod util;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use restarter_core::{
    ContentCategory, DailyContent, EmbeddedLoader, FileStorage, Locale, LogNotifier,
    ProgressionStatus, RestarterEngine,
};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;

use reports::AwardRecord;
use sweep::{SweepReport, sweep};
use util::{parse_categories, parse_date, parse_locales};

type Engine = RestarterEngine<EmbeddedLoader, FileStorage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Print the daily mission and scenario
    Daily,
    /// Award badges to a user and persist the result
    Award,
    /// Show a user's rank and badge count
    Status,
    /// Check determinism and repetition over a run of days
    Sweep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "restarter-cli", version = "0.1.0")]
#[command(about = "Daily missions, scenarios and badge progression for Restarter")]
struct Args {
    /// What to do
    #[arg(long, value_enum, default_value_t = Mode::Daily)]
    mode: Mode,

    /// Date as YYYY-MM-DD (defaults to today, UTC)
    #[arg(long)]
    date: Option<String>,

    /// Locales (comma-separated, or `all`)
    #[arg(long, default_value = "zh-TW")]
    locale: String,

    /// Content categories (comma-separated, or `all`)
    #[arg(long, default_value = "mission,scenario")]
    category: String,

    /// User whose progress is read or updated
    #[arg(long, default_value = "guest")]
    user: String,

    /// Badges to award in award mode
    #[arg(long, default_value_t = 1)]
    count: u32,

    /// Directory holding per-user progress files
    #[arg(long, default_value = ".restarter")]
    store_dir: PathBuf,

    /// Days covered by a sweep
    #[arg(long, default_value_t = 365)]
    days: u32,

    /// Highest repeat ratio a sweep accepts
    #[arg(long, default_value_t = 0.9)]
    max_repeat_ratio: f64,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct AwardSummary<'a> {
    user: &'a str,
    awards: &'a [AwardRecord],
    status: &'a ProgressionStatus,
}

#[derive(Debug, Serialize)]
struct StatusSummary<'a> {
    user: &'a str,
    status: &'a ProgressionStatus,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let engine = RestarterEngine::new(EmbeddedLoader, FileStorage::new(&args.store_dir))?;
    let mut output_target = OutputTarget::new(args.output.clone())?;

    if args.report == ReportFormat::Console && args.output.is_none() && args.verbose {
        announce_banner();
    }

    let passed = match args.mode {
        Mode::Daily => run_daily(&args, &engine, output_target.writer())?,
        Mode::Award => run_award(&args, &engine, output_target.writer())?,
        Mode::Status => run_status(&args, &engine, output_target.writer())?,
        Mode::Sweep => run_sweep(&args, &engine, output_target.writer())?,
    };
    output_target.flush_inner()?;

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

fn announce_banner() {
    println!("{}", "🌱 Restarter".bright_cyan().bold());
    println!("{}", "============".cyan());
}

/// First requested locale, used for rank names.
fn display_locale(args: &Args) -> Result<Locale> {
    Ok(parse_locales(&args.locale)?
        .first()
        .copied()
        .unwrap_or_default())
}

fn collect_daily(args: &Args, engine: &Engine) -> Result<Vec<DailyContent>> {
    let date = parse_date(args.date.as_deref())?;
    let locales = parse_locales(&args.locale)?;
    let categories = parse_categories(&args.category)?;
    let mut contents = Vec::with_capacity(locales.len() * categories.len());
    for category in &categories {
        let generator = engine.generator(*category)?;
        for locale in &locales {
            contents.push(generator.render_or_fallback(date, *locale));
        }
    }
    Ok(contents)
}

fn run_daily(args: &Args, engine: &Engine, out: &mut dyn Write) -> Result<bool> {
    let contents = collect_daily(args, engine)?;
    match args.report {
        ReportFormat::Json => reports::write_json(out, &contents)?,
        ReportFormat::Markdown => reports::write_daily_markdown(out, &contents)?,
        ReportFormat::Console => reports::write_daily_console(out, &contents)?,
    }
    Ok(true)
}

fn run_award(args: &Args, engine: &Engine, out: &mut dyn Write) -> Result<bool> {
    let locale = display_locale(args)?;
    let mut progression = engine.progression(&args.user, LogNotifier);
    let records: Vec<AwardRecord> = progression
        .award_badges(args.count)
        .into_iter()
        .map(AwardRecord::from)
        .collect();
    let status = progression.status();
    match args.report {
        ReportFormat::Json => reports::write_json(
            out,
            &AwardSummary {
                user: &args.user,
                awards: &records,
                status: &status,
            },
        )?,
        ReportFormat::Markdown => {
            reports::write_awards_markdown(out, &args.user, &records, &status, locale)?;
        }
        ReportFormat::Console => {
            reports::write_awards_console(out, &args.user, &records, &status, locale)?;
        }
    }
    Ok(true)
}

fn run_status(args: &Args, engine: &Engine, out: &mut dyn Write) -> Result<bool> {
    let locale = display_locale(args)?;
    let status = engine.progression(&args.user, LogNotifier).status();
    match args.report {
        ReportFormat::Json => reports::write_json(
            out,
            &StatusSummary {
                user: &args.user,
                status: &status,
            },
        )?,
        ReportFormat::Markdown => reports::write_status_markdown(out, &args.user, &status, locale)?,
        ReportFormat::Console => reports::write_status_console(out, &args.user, &status, locale)?,
    }
    Ok(true)
}

fn build_sweep_report(args: &Args, engine: &Engine) -> Result<SweepReport> {
    let start = parse_date(args.date.as_deref())?;
    let locales = parse_locales(&args.locale)?;
    let categories = parse_categories(&args.category)?;
    let mut report = SweepReport {
        max_repeat_ratio: args.max_repeat_ratio,
        results: Vec::new(),
        skipped: Vec::new(),
    };
    for category in &categories {
        let generator = engine.generator(*category)?;
        for locale in &locales {
            if !generator.catalog().locales().any(|l| l == *locale) {
                log::info!("skipping {category}/{locale}: no templates");
                report.skipped.push(format!("{category}/{locale}"));
                continue;
            }
            if args.verbose {
                eprintln!("🔎 Sweeping {category}/{locale} over {} days", args.days);
            }
            report.results.push(sweep(
                &generator,
                *locale,
                start,
                args.days,
                args.max_repeat_ratio,
            ));
        }
    }
    Ok(report)
}

fn run_sweep(args: &Args, engine: &Engine, out: &mut dyn Write) -> Result<bool> {
    let report = build_sweep_report(args, engine)?;
    match args.report {
        ReportFormat::Json => reports::write_json(out, &report)?,
        ReportFormat::Markdown => reports::write_sweep_markdown(out, &report)?,
        ReportFormat::Console => reports::write_sweep_console(out, &report)?,
    }
    Ok(report.passed())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restarter_core::ProgressionState;

    fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "restarter-main-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    fn base_args(store_dir: PathBuf) -> Args {
        Args {
            mode: Mode::Daily,
            date: Some("2024-01-01".to_string()),
            locale: "en".to_string(),
            category: "mission,scenario".to_string(),
            user: "tester".to_string(),
            count: 1,
            store_dir,
            days: 30,
            max_repeat_ratio: 0.9,
            report: ReportFormat::Json,
            verbose: false,
            output: None,
        }
    }

    fn engine(args: &Args) -> Engine {
        RestarterEngine::new(EmbeddedLoader, FileStorage::new(&args.store_dir)).unwrap()
    }

    #[test]
    fn daily_collects_every_category_locale_pair() {
        let args = Args {
            locale: "en,ko".to_string(),
            ..base_args(temp_dir("daily"))
        };
        let contents = collect_daily(&args, &engine(&args)).unwrap();
        assert_eq!(contents.len(), 4);
        let korean_mission = contents
            .iter()
            .find(|c| c.category == ContentCategory::Mission && c.locale == Locale::Ko)
            .unwrap();
        assert_eq!(
            korean_mission.text,
            ContentCategory::Mission.fallback_text()
        );
    }

    #[test]
    fn award_mode_persists_between_runs() {
        let args = Args {
            mode: Mode::Award,
            count: 12,
            ..base_args(temp_dir("award"))
        };
        let engine = engine(&args);
        let mut sink = Vec::new();
        assert!(run_award(&args, &engine, &mut sink).unwrap());
        let reopened = engine.progression(&args.user, LogNotifier);
        assert_eq!(reopened.state(), ProgressionState::new(2, 2));
        let json = String::from_utf8(sink).unwrap();
        assert!(json.contains("\"promoted\": true"));
    }

    #[test]
    fn sweep_skips_locales_without_templates() {
        let args = Args {
            mode: Mode::Sweep,
            locale: "en,vi".to_string(),
            category: "mission".to_string(),
            ..base_args(temp_dir("sweep"))
        };
        let report = build_sweep_report(&args, &engine(&args)).unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.skipped, vec!["mission/vi".to_string()]);
    }

    #[test]
    fn display_locale_uses_first_entry() {
        let args = Args {
            locale: "ja,en".to_string(),
            ..base_args(temp_dir("locale"))
        };
        assert_eq!(display_locale(&args).unwrap(), Locale::Ja);
    }

    #[test]
    fn output_target_writes_file() {
        let path = temp_dir("output").with_extension("txt");
        let mut target = OutputTarget::new(Some(path.clone())).unwrap();
        writeln!(target, "hello").unwrap();
        target.flush_inner().unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello\n");
    }
}
