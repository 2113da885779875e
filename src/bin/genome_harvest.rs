use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use genome_harvest::app::{App, reconcile};
use genome_harvest::checkm::QualityLayout;
use genome_harvest::config::ConfigLoader;
use genome_harvest::error::HarvestError;
use genome_harvest::ncbi::NcbiHttpClient;
use genome_harvest::output::{JsonOutput, LogSink, OutputMode, TextOutput};
use genome_harvest::store::Store;

#[derive(Parser)]
#[command(name = "genome-harvest")]
#[command(about = "Download NCBI genome assemblies for a taxon and reconcile assembly metadata")]
#[command(version, author, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Search a taxon, download its assemblies and write assembly_summary.tsv")]
    Fetch(FetchArgs),
    #[command(about = "Join CheckM statistics onto a metadata table, sorted by quality")]
    Reconcile(ReconcileArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// Contact email sent to NCBI E-utilities
    #[arg(short = 'e', long = "email")]
    email: String,

    /// Taxon search term, e.g. "Rokubacteria"
    #[arg(short = 't', long = "taxon")]
    taxon: String,

    /// Output directory for FASTA files and the summary table
    #[arg(short = 'o', long = "outdir")]
    outdir: Utf8PathBuf,

    #[arg(long)]
    max_records: Option<usize>,

    #[arg(long)]
    config: Option<String>,

    /// Print the result as JSON instead of a text summary
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ReconcileArgs {
    /// Tab-separated metadata table with one row per identifier
    metadata: PathBuf,

    #[arg(long, default_value = "id")]
    id_column: String,

    /// Quality file path template; `{id}` and `{lineage}` are substituted
    #[arg(long)]
    checkm_path: Option<String>,

    #[arg(long)]
    lineage: Option<String>,

    /// Write the report here instead of stdout
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<HarvestError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &HarvestError) -> u8 {
    match error {
        HarvestError::InvalidName(_)
        | HarvestError::TooManyDuplicates { .. }
        | HarvestError::NameCollision(_)
        | HarvestError::MissingConfig(_)
        | HarvestError::ConfigRead(_)
        | HarvestError::ConfigParse(_)
        | HarvestError::InvalidConfig(_)
        | HarvestError::MissingColumn(_) => 2,
        HarvestError::NcbiHttp(_)
        | HarvestError::NcbiStatus { .. }
        | HarvestError::NcbiResponse(_)
        | HarvestError::InvalidAccession(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Fetch(args) => run_fetch(args),
        Commands::Reconcile(args) => run_reconcile(args),
    }
}

fn run_fetch(args: FetchArgs) -> miette::Result<()> {
    let mut config = ConfigLoader::resolve(args.config.as_deref())?;
    if let Some(max_records) = args.max_records {
        if max_records == 0 {
            return Err(HarvestError::InvalidConfig(
                "--max-records must be greater than zero".to_string(),
            )
            .into());
        }
        config.max_records = max_records;
    }

    let output_mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let ncbi = NcbiHttpClient::new(&config, &args.email)?;
    let app = App::new(Store::new(args.outdir), ncbi);

    match output_mode {
        OutputMode::Json => {
            let result = app.fetch(&args.taxon, &JsonOutput)?;
            JsonOutput::print_fetch(&result).into_diagnostic()?;
        }
        OutputMode::Text => {
            let result = app.fetch(&args.taxon, &LogSink)?;
            TextOutput::print_fetch(&result, io::stdout().lock()).into_diagnostic()?;
        }
    }
    Ok(())
}

fn run_reconcile(args: ReconcileArgs) -> miette::Result<()> {
    let mut config = ConfigLoader::resolve(args.config.as_deref())?;
    if let Some(template) = args.checkm_path {
        if !template.contains("{id}") {
            return Err(HarvestError::InvalidConfig(format!(
                "--checkm-path must contain {{id}}: {template}"
            ))
            .into());
        }
        config.checkm_path_template = template;
    }
    if let Some(lineage) = args.lineage {
        config.lineage = lineage;
    }

    let layout = QualityLayout::from_config(&config);
    let table = reconcile(&args.metadata, &args.id_column, &layout, &LogSink)?;

    match args.output {
        Some(path) => {
            let file = File::create(&path)
                .map_err(|err| HarvestError::Filesystem(format!("create {}: {err}", path.display())))?;
            table.write_tsv(BufWriter::new(file))?;
        }
        None => table.write_tsv(io::stdout().lock())?,
    }
    Ok(())
}
