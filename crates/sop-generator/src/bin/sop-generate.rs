//! CLI for generating SOP documents.
//!
//! # Usage
//!
//! ```bash
//! # Generate and render to DOCX
//! cargo run -p sop-generator --bin sop-generate -- generate --title "Calibration of Scale X" \
//!     --field procedure="Step A; Step B" --output scale-x.docx
//!
//! # Ground the draft in reference files
//! cargo run -p sop-generator --bin sop-generate -- generate --title X \
//!     --source manual.docx --structure template.docx --content-type sources-only
//!
//! # Render existing Markdown, list and compare stored versions
//! cargo run -p sop-generator --bin sop-generate -- render draft.md --output draft.docx
//! cargo run -p sop-generator --bin sop-generate -- versions --dir out/
//! cargo run -p sop-generator --bin sop-generate -- diff --dir out/ 1 2
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sop_core::{sanitize_markdown, ContentMode, GenerationRequest, ReviewOutcome};
use sop_generator::{
    extract_path, source_document, unified_diff, GeneratorConfig, SopGenerator, VersionStore,
};
use sop_render::{render_to_path, Language, RenderMetadata};
use sop_transport::SecretStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sop-generate", version, about = "Generate standard operating procedures")]
struct Cli {
    /// Flat TOML file with credentials
    #[arg(long, global = true, env = "SOP_SECRETS_FILE")]
    secrets: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the author/critic pipeline and render the result
    Generate(GenerateArgs),
    /// Render a Markdown file to DOCX
    Render(RenderArgs),
    /// List stored versions
    Versions {
        #[arg(long)]
        dir: PathBuf,
    },
    /// Unified diff between two stored versions
    Diff {
        #[arg(long)]
        dir: PathBuf,
        from: u32,
        to: u32,
    },
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "")]
    sop_number: String,
    #[arg(long, default_value = "")]
    equipment_type: String,
    /// Free-text section list or description
    #[arg(long, default_value = "")]
    sections: String,
    /// ai-with-sources, ai-only or sources-only (form labels also accepted)
    #[arg(long, default_value = "")]
    content_type: String,
    #[arg(long, default_value = "")]
    structure_description: String,
    /// Extra input field, e.g. `--field procedure="Step A; Step B"`
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<(String, String)>,
    /// Reference file (.txt, .csv, .docx, .xlsx, .xls, .pdf); repeatable
    #[arg(long = "source")]
    sources: Vec<PathBuf>,
    /// Document whose structure the draft should follow
    #[arg(long)]
    structure: Option<PathBuf>,
    /// DOCX output path
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Save as the next numbered version in this directory
    #[arg(long)]
    versions: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Lang::Ru)]
    lang: Lang,
    /// Smaller budgets, at most 5 sections
    #[arg(long, conflicts_with = "thorough")]
    quick: bool,
    /// Larger budgets
    #[arg(long)]
    thorough: bool,
    /// Print the full outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RenderArgs {
    input: PathBuf,
    #[arg(short, long)]
    output: PathBuf,
    #[arg(long, default_value = "")]
    title: String,
    /// Document date, YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long, value_enum, default_value_t = Lang::Ru)]
    lang: Lang,
}

#[derive(Clone, Copy, ValueEnum)]
enum Lang {
    En,
    Ru,
}

impl From<Lang> for Language {
    fn from(lang: Lang) -> Self {
        match lang {
            Lang::En => Language::En,
            Lang::Ru => Language::Ru,
        }
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got `{raw}`")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SOP_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Generate(args) => generate(cli.secrets.as_deref(), args).await,
        Command::Render(args) => render(args),
        Command::Versions { dir } => list_versions(&dir),
        Command::Diff { dir, from, to } => diff(&dir, from, to),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

async fn generate(secrets_path: Option<&Path>, args: GenerateArgs) -> CliResult {
    let secrets = match secrets_path {
        Some(path) => SecretStore::load(path)?,
        None => SecretStore::empty(),
    };

    let mut builder = GenerationRequest::builder()
        .field("title", args.title.as_str())
        .field("sop_number", args.sop_number.as_str())
        .field("equipment_type", args.equipment_type.as_str())
        .field("sections", args.sections.as_str())
        .field("content_type", args.content_type.as_str())
        .field("structure_description", args.structure_description.as_str());
    for (key, value) in &args.fields {
        builder = builder.field(key.as_str(), value.as_str());
    }
    for path in &args.sources {
        builder = builder.source(source_document(path)?);
    }
    if let Some(path) = &args.structure {
        builder = builder.field("structure_text", extract_path(path)?.preview);
    }
    let request = builder.build();

    if request.content_mode() == ContentMode::SourcesOnly && request.sources().is_empty() {
        return Err("content type `sources-only` needs at least one --source file".into());
    }

    let config = if args.quick {
        GeneratorConfig::quick()
    } else if args.thorough {
        GeneratorConfig::thorough()
    } else {
        GeneratorConfig::default()
    };

    let generator = SopGenerator::from_env(&secrets, config);
    let outcome = generator.run(&request).await;
    let final_text = sanitize_markdown(&outcome.final_text);

    println!("{}", report(&outcome, args.json)?);
    if outcome.used_fallback {
        eprintln!("Warning: remote generation unavailable, the document was built from the local template");
    }

    let meta = RenderMetadata::titled(request.field("title")).with_language(args.lang.into());

    if let Some(dir) = &args.versions {
        let store = VersionStore::open(dir)?;
        let entry = store.save(&final_text, &meta, outcome.status.version_label())?;
        println!("Version {} written to: {}", entry.index, entry.docx_path.display());
    }
    match &args.output {
        Some(path) => {
            render_to_path(&final_text, &meta, path)?;
            println!("Document written to: {}", path.display());
        }
        None if args.versions.is_none() && !args.json => {
            println!();
            println!("{final_text}");
        }
        None => {}
    }
    Ok(())
}

/// Run report for stdout. The JSON form carries the model's text as
/// returned, before document sanitizing.
fn report(outcome: &ReviewOutcome, json: bool) -> Result<String, serde_json::Error> {
    if json {
        serde_json::to_string_pretty(outcome)
    } else {
        Ok(outcome.format_summary())
    }
}

fn render(args: RenderArgs) -> CliResult {
    let text = std::fs::read_to_string(&args.input)?;
    let mut meta = RenderMetadata::titled(args.title).with_language(args.lang.into());
    meta.date = args.date;
    meta.asset_dir = args.input.parent().map(Path::to_path_buf);

    render_to_path(&text, &meta, &args.output)?;
    println!("Document written to: {}", args.output.display());
    Ok(())
}

fn list_versions(dir: &Path) -> CliResult {
    let store = VersionStore::open(dir)?;
    let entries = store.list()?;
    if entries.is_empty() {
        println!("No versions in {}", dir.display());
    }
    for entry in entries {
        println!("{:03}  {:<12} {}", entry.index, entry.label, entry.docx_path.display());
    }
    Ok(())
}

fn diff(dir: &Path, from: u32, to: u32) -> CliResult {
    let store = VersionStore::open(dir)?;
    let old = store.get(from)?;
    let new = store.get(to)?;
    let patch = unified_diff(
        &store.read_text(&old)?,
        &store.read_text(&new)?,
        &format!("v{from}"),
        &format!("v{to}"),
    );
    if patch.is_empty() {
        println!("Versions {from} and {to} are identical");
    } else {
        print!("{patch}");
    }
    Ok(())
}
