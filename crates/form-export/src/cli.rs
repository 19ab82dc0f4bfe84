use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use form_model::{ElementKind, FormDefinition, FormSpec, NdjsonSubmissions, form_spec_schema};

use crate::config::ExportConfig;
use crate::export::{ExportDriver, FailurePolicy};
use crate::kml::KmlFormatter;

#[derive(Parser, Debug)]
#[command(
    name = "form-export",
    about = "Export form submissions as KML placemarks",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write submissions as a KML document
    Kml(KmlArgs),
    /// List the element paths of a form definition
    Elements(ElementsArgs),
    /// Print the JSON Schema of form definition files
    Schema,
}

#[derive(Args, Debug, Clone)]
pub struct KmlArgs {
    /// Form definition (JSON)
    #[arg(long, value_name = "form.json")]
    pub form: PathBuf,
    /// Submissions, one JSON record per line
    #[arg(long, value_name = "records.ndjson")]
    pub submissions: PathBuf,
    /// Export settings (TOML)
    #[arg(long, value_name = "export.toml")]
    pub config: Option<PathBuf>,
    /// Output file; KML goes to stdout when omitted
    #[arg(long, short = 'o', value_name = "out.kml")]
    pub output: Option<PathBuf>,
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,
    /// Path of the geopoint field, e.g. `visits/gps`
    #[arg(long, value_name = "PATH")]
    pub location: Option<String>,
    #[arg(long, value_name = "PATH")]
    pub title: Option<String>,
    #[arg(long, value_name = "PATH")]
    pub image: Option<String>,
    /// Field shown in the data table; repeat for several (default: all)
    #[arg(long = "column", value_name = "PATH")]
    pub columns: Vec<String>,
    #[arg(long = "on-error", value_enum)]
    pub on_error: Option<FailurePolicy>,
}

#[derive(Args, Debug, Clone)]
pub struct ElementsArgs {
    #[arg(long, value_name = "form.json")]
    pub form: PathBuf,
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Kml(args) => run_kml(args),
        Commands::Elements(args) => run_elements(args),
        Commands::Schema => run_schema(),
    }
}

fn run_kml(args: KmlArgs) -> Result<()> {
    let form = load_form(&args.form)?;
    let mut config = match &args.config {
        Some(path) => ExportConfig::load(path)?,
        None => ExportConfig::default(),
    };
    apply_overrides(&mut config, &args);
    let resolved = config.resolve(&form)?;

    let records = File::open(&args.submissions)
        .with_context(|| format!("failed to open {}", args.submissions.display()))?;
    let source = NdjsonSubmissions::new(BufReader::new(records));

    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut formatter = KmlFormatter::new(
        &form,
        &resolved.base_url,
        resolved.anchors,
        output,
        resolved.columns,
    )
    .context("invalid KML export configuration")?;
    let summary = ExportDriver::new(resolved.on_error)
        .run(&mut formatter, &source, &form)
        .context("KML export failed")?;

    eprintln!(
        "exported {} record(s) as {} placemark(s), skipped {}",
        summary.records,
        summary.placemarks,
        summary.skipped.len()
    );
    Ok(())
}

fn apply_overrides(config: &mut ExportConfig, args: &KmlArgs) {
    if let Some(base_url) = &args.base_url {
        config.base_url = Some(base_url.clone());
    }
    if let Some(location) = &args.location {
        config.kml.location = Some(location.clone());
    }
    if let Some(title) = &args.title {
        config.kml.title = Some(title.clone());
    }
    if let Some(image) = &args.image {
        config.kml.image = Some(image.clone());
    }
    if !args.columns.is_empty() {
        config.columns = args.columns.clone();
    }
    if let Some(on_error) = args.on_error {
        config.on_error = on_error;
    }
}

fn run_elements(args: ElementsArgs) -> Result<()> {
    let form = load_form(&args.form)?;
    let mut stdout = io::stdout().lock();
    for element in form.elements() {
        let kind = match element.kind() {
            ElementKind::Group => "group".to_string(),
            ElementKind::Repeat => "repeat".to_string(),
            ElementKind::Field(field_type) => format!("{:?}", field_type).to_lowercase(),
        };
        writeln!(stdout, "{}\t{}", form.path(element.id()), kind)?;
    }
    Ok(())
}

fn run_schema() -> Result<()> {
    let schema = serde_json::to_string_pretty(&form_spec_schema()?)?;
    println!("{}", schema);
    Ok(())
}

fn load_form(path: &Path) -> Result<FormDefinition> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read form definition {}", path.display()))?;
    let spec: FormSpec = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid form definition", path.display()))?;
    FormDefinition::from_spec(&spec)
        .with_context(|| format!("form definition {} is inconsistent", path.display()))
}
