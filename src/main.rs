mod config;
mod layout;
mod logging;
mod pdf;
mod stamp;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use config::{
    load_file, load_settings, resolve_path, ClauseStyle, ConfigError, Dimension, FontSource,
    NameTemplate, Settings, StampJob, DEFAULT_CLAUSE, DEFAULT_FONT_SIZE, DEFAULT_LINE_HEIGHT,
    DEFAULT_MARGIN_BOTTOM, DEFAULT_MARGIN_SIDES, DEFAULT_PAGE, NAME_TOKEN,
};
use pdf::{load_font_source, EmbeddedFont};
use stamp::stamp_all;

/// Stamp a consent clause naming each company onto a copy of a PDF.
#[derive(Parser, Debug)]
#[command(name = "clause_stamp", version)]
#[command(about = "Stamp a consent clause naming each company onto a copy of a PDF.", long_about = None)]
struct Args {
    /// The PDF file to take in
    #[arg(short = 'i', long = "in", value_name = "IN_FILE")]
    input: PathBuf,

    /// The output file name. Must include a wildcard "{name}" to replace with
    /// company name. When omitted, files are written to the current directory
    /// as the company name, a dash, then the input file name
    /// [default: {name}-<IN_FILE name>]
    #[arg(short, long, value_name = "OUT_FILE")]
    out: Option<String>,

    /// The text to use for the clause. Must include a "{name}" wildcard
    /// [default: Polish recruitment consent clause]
    #[arg(short, long)]
    clause: Option<String>,

    /// The company names to include in the clause, one output file each
    #[arg(short = 'n', long = "companyNames", value_name = "NAMES", num_args = 1.., required = true)]
    company_names: Vec<String>,

    /// Margin left at the bottom of the page (points, or with mm/cm/in/pt) [default: 60]
    #[arg(long = "marginBottom", value_name = "MB")]
    margin_bottom: Option<Dimension>,

    /// Margin left at the left/right edge of the page [default: 43]
    #[arg(long = "marginSides", value_name = "MS")]
    margin_sides: Option<Dimension>,

    /// Clause font size [default: 11]
    #[arg(long = "fontSize", value_name = "FS")]
    font_size: Option<Dimension>,

    /// Clause line height [default: 17]
    #[arg(long = "fontHeight", value_name = "FH")]
    font_height: Option<Dimension>,

    /// Center each line horizontally [default: true]
    #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
    center: Option<bool>,

    /// Path to the font .ttf/.otf file, or an installed font family name
    #[arg(short, long)]
    font: Option<String>,

    /// Page receiving the clause, counting from 1 [default: 1]
    #[arg(short, long)]
    page: Option<u32>,

    /// JSON file with default values for the options above
    #[arg(short, long, value_name = "SETTINGS_JSON")]
    settings: Option<PathBuf>,
}

fn default_output_name(input: &Path) -> String {
    match input.file_name() {
        Some(name) => format!("{}-{}", NAME_TOKEN, name.to_string_lossy()),
        None => format!("{}.pdf", NAME_TOKEN),
    }
}

/// Resolve flags, settings file and defaults into a job.
///
/// Nothing but the settings file is read here.
fn build_job(args: Args, cwd: &Path) -> Result<StampJob, ConfigError> {
    let input = resolve_path(cwd, &args.input);
    let out = match args.out {
        Some(out) => resolve_path(cwd, out),
        None => cwd.join(default_output_name(&input)),
    };
    let output = NameTemplate::parse("--out", out.to_string_lossy().into_owned())?;

    let settings = match &args.settings {
        Some(path) => load_settings(&resolve_path(cwd, path))?,
        None => Settings::default(),
    };

    let clause = args
        .clause
        .or(settings.clause)
        .unwrap_or_else(|| DEFAULT_CLAUSE.to_string());
    let clause = NameTemplate::parse("--clause", clause)?;

    let points = |flag: Option<Dimension>, file: Option<Dimension>, default: f64| {
        flag.or(file).map(|d| d.as_points()).unwrap_or(default)
    };
    let style = ClauseStyle {
        font_size: points(args.font_size, settings.font_size, DEFAULT_FONT_SIZE),
        line_height: points(args.font_height, settings.line_height, DEFAULT_LINE_HEIGHT),
        margin_bottom: points(args.margin_bottom, settings.margin_bottom, DEFAULT_MARGIN_BOTTOM),
        margin_sides: points(args.margin_sides, settings.margin_sides, DEFAULT_MARGIN_SIDES),
        centered: args.center.or(settings.center).unwrap_or(true),
    }
    .validate()?;

    let page = args.page.or(settings.page).unwrap_or(DEFAULT_PAGE);
    if page == 0 {
        return Err(ConfigError::PageZero);
    }

    let font = args
        .font
        .or(settings.font)
        .ok_or(ConfigError::MissingOption("--font"))?;

    Ok(StampJob {
        input,
        output,
        clause,
        company_names: args.company_names,
        style,
        page,
        font: FontSource::from_arg(&font, cwd),
    })
}

fn run(args: Args) -> Result<()> {
    let started = Instant::now();
    let cwd = std::env::current_dir()
        .with_context(|| "Failed to read the current directory")?;

    let job = build_job(args, &cwd)?;
    debug!(?job, "resolved stamp job");

    // Read once, shared read-only by every company
    let template = load_file(&job.input, "input PDF")?;
    let (font_data, face_index) = load_font_source(&job.font)?;
    let font = EmbeddedFont::parse(&font_data, face_index)
        .with_context(|| format!("Failed to load font {:?}", job.font))?;
    info!(
        font = font.name(),
        output = job.output.as_str(),
        companies = job.company_names.len(),
        "stamping clause"
    );

    stamp_all(&job, &template, &font)?;

    println!("Done in {:.1}s", started.elapsed().as_secs_f64());
    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(e) = logging::init() {
        eprintln!("Warning: {}", e);
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        for cause in e.chain().skip(1) {
            eprintln!("Caused by: {}", cause);
        }
        std::process::exit(1);
    }
}
