use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use cmip6_cite::app::{App, Delivery};
use cmip6_cite::completeness::CompletenessQuery;
use cmip6_cite::config::{ConfigLoader, ResolvedConfig};
use cmip6_cite::credentials::{CredentialResolver, NetrcResolver};
use cmip6_cite::domain::{CoordinateFields, Doi, ExperimentId};
use cmip6_cite::error::CiteError;
use cmip6_cite::output::OutputMode;
use cmip6_cite::registry::RegistryHttpClient;
use cmip6_cite::roster::JsonRoster;
use cmip6_cite::store::{RecordSource, Store};

#[derive(Parser)]
#[command(name = "cmip6-cite")]
#[command(about = "Keep CMIP6 data citation records in sync with the citation registry")]
#[command(version, author)]
struct Cli {
    /// Print results as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch a citation record and save it as <drs>.json")]
    Fetch(FetchArgs),
    #[command(about = "Derive experiment-level records from a MIP-level record")]
    Derive(DeriveArgs),
    #[command(about = "Derive experiment-level records and submit them")]
    Submit(SubmitArgs),
    #[command(about = "Replace the creators of a record file from a roster")]
    Creators(CreatorsArgs),
    #[command(about = "Add a DOI reference to a record")]
    Reference(ReferenceArgs),
    #[command(about = "Check and commit a record file")]
    Post(PostArgs),
    #[command(about = "List citation completion status")]
    Completeness(CompletenessArgs),
}

#[derive(Args, Clone)]
struct CoordinateArgs {
    #[arg(short = 'a', long = "activity-id", visible_alias = "mip")]
    activity_id: Option<String>,

    #[arg(short = 'i', long = "institution-id", visible_alias = "inst")]
    institution_id: Option<String>,

    #[arg(short = 's', long = "source-id", visible_alias = "model")]
    source_id: Option<String>,
}

#[derive(Args, Clone)]
struct SourceArgs {
    #[command(flatten)]
    coordinate: CoordinateArgs,

    /// Read the record from PATH, or from the cached <drs>.json when PATH is omitted.
    #[arg(short = 'l', long = "load-file", num_args = 0..=1, value_name = "PATH")]
    load_file: Option<Option<String>>,
}

#[derive(Args)]
struct FetchArgs {
    #[command(flatten)]
    coordinate: CoordinateArgs,

    #[arg(short = 'e', long = "experiment-id", visible_alias = "exp")]
    experiment_id: Option<String>,

    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Args)]
struct DeriveArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(required = true, value_name = "EXPERIMENT")]
    experiments: Vec<String>,
}

#[derive(Args)]
struct SubmitArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(value_name = "EXPERIMENT", required_unless_present = "get_only")]
    experiments: Vec<String>,

    #[arg(short = 'c', long)]
    check_only: bool,

    /// Only save the base record.
    #[arg(short, long)]
    get_only: bool,
}

#[derive(Args)]
struct CreatorsArgs {
    file: String,

    #[arg(short, long)]
    roster: String,

    #[arg(long)]
    do_post: bool,

    #[arg(short = 'c', long)]
    check_only: bool,

    #[arg(short, long, conflicts_with = "do_post")]
    output: Option<String>,
}

#[derive(Args)]
struct ReferenceArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(short = 'e', long = "experiment-id", visible_alias = "exp")]
    experiment_id: Option<String>,

    #[arg(short = 'r', long)]
    doi: String,

    #[arg(long)]
    do_post: bool,

    #[arg(short = 'c', long)]
    check_only: bool,

    #[arg(short, long, conflicts_with = "do_post")]
    output: Option<String>,
}

#[derive(Args)]
struct PostArgs {
    file: String,

    #[arg(short = 'c', long)]
    check_only: bool,
}

#[derive(Args)]
struct CompletenessArgs {
    #[arg(short = 'i', long = "institution-id", visible_alias = "inst")]
    institution_id: Option<String>,

    #[arg(short = 's', long = "source-id", visible_alias = "model")]
    source_id: Option<String>,

    #[arg(short, long = "drs-id")]
    drs_id: Option<String>,

    #[arg(short, long)]
    complete: Option<bool>,

    #[arg(short = 'l', long = "load-file", value_name = "PATH")]
    load_file: Option<String>,

    /// Save the listing to PATH, or to a dated snapshot file when PATH is omitted.
    #[arg(long, num_args = 0..=1, value_name = "PATH")]
    save: Option<Option<String>>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(cite) = report.downcast_ref::<CiteError>() {
                return ExitCode::from(map_exit_code(cite));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &CiteError) -> u8 {
    match error {
        CiteError::MissingCoordinate(_)
        | CiteError::InvalidCoordinate { .. }
        | CiteError::InvalidDrs(_)
        | CiteError::InvalidExperimentId(_)
        | CiteError::InvalidDoi(_)
        | CiteError::NotFound { .. }
        | CiteError::RosterNotFound { .. } => 2,
        CiteError::Rejected { .. } | CiteError::Transport { .. } => 3,
        CiteError::MissingCredentials { .. } | CiteError::CredentialRead { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) if cli.verbose => EnvFilter::new("debug"),
        Err(_) => EnvFilter::new("warn"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let store = match &config.store_dir {
        Some(dir) => Store::new_with_root(dir.clone()),
        None => Store::new()?,
    };
    let registry = RegistryHttpClient::new(config.endpoints.clone())?;
    let app = App::new(store, registry).with_check_flag(config.check_flag);

    match cli.command {
        Commands::Fetch(args) => {
            let fields = coordinate_fields(&args.coordinate, args.experiment_id.as_deref());
            let coordinate = fields.resolve()?;
            let destination = args.output.map(Utf8PathBuf::from);
            let result = app.fetch(&coordinate, destination.as_deref())?;
            output_mode.print(&result).into_diagnostic()?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Derive(args) => {
            let source = record_source(&args.source, None)?;
            let experiments = parse_experiments(&args.experiments)?;
            let result = app.derive_experiments(&source, &experiments)?;
            output_mode.print(&result).into_diagnostic()?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Submit(args) => {
            let source = record_source(&args.source, None)?;
            if args.get_only {
                let result = app.snapshot(&source, None)?;
                output_mode.print(&result).into_diagnostic()?;
                return Ok(ExitCode::SUCCESS);
            }
            let experiments = parse_experiments(&args.experiments)?;
            let app = with_credentials(app, &config)?;
            let result = app.submit_experiments(&source, &experiments, args.check_only)?;
            output_mode.print(&result).into_diagnostic()?;
            Ok(exit_for(result.is_success()))
        }
        Commands::Creators(args) => {
            let roster = JsonRoster::load(&Utf8PathBuf::from(&args.roster))?;
            let delivery = delivery(args.do_post, args.check_only, args.output);
            let app = match delivery {
                Delivery::Submit { .. } => with_credentials(app, &config)?,
                Delivery::Save(_) => app,
            };
            let result =
                app.modify_creators(&Utf8PathBuf::from(&args.file), &roster, delivery)?;
            output_mode.print(&result).into_diagnostic()?;
            Ok(exit_for(result.delivery.is_success()))
        }
        Commands::Reference(args) => {
            let source = record_source(&args.source, args.experiment_id.as_deref())?;
            let doi: Doi = args.doi.parse()?;
            let delivery = delivery(args.do_post, args.check_only, args.output);
            let app = match delivery {
                Delivery::Submit { .. } => with_credentials(app, &config)?,
                Delivery::Save(_) => app,
            };
            let result = app.add_reference(&source, &doi, delivery)?;
            output_mode.print(&result).into_diagnostic()?;
            let success = result
                .delivery
                .as_ref()
                .is_none_or(|delivery| delivery.is_success());
            Ok(exit_for(success))
        }
        Commands::Post(args) => {
            let app = with_credentials(app, &config)?;
            let report = app.post(&Utf8PathBuf::from(&args.file), args.check_only)?;
            output_mode.print(&report).into_diagnostic()?;
            Ok(exit_for(report.is_success()))
        }
        Commands::Completeness(args) => {
            let query = CompletenessQuery {
                institution_id: args.institution_id,
                source_id: args.source_id,
                drs_id: args.drs_id,
                complete: args.complete,
            };
            let load = args.load_file.map(Utf8PathBuf::from);
            let (save, dated) = match args.save {
                Some(Some(path)) => (Some(Utf8PathBuf::from(path)), false),
                Some(None) => (None, true),
                None => (None, false),
            };
            let result = app.completeness(&query, load.as_deref(), save.as_deref(), dated)?;
            output_mode.print(&result).into_diagnostic()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn coordinate_fields(args: &CoordinateArgs, experiment_id: Option<&str>) -> CoordinateFields {
    CoordinateFields::new(
        args.activity_id.as_deref(),
        args.institution_id.as_deref(),
        args.source_id.as_deref(),
        experiment_id,
    )
}

fn record_source(args: &SourceArgs, experiment_id: Option<&str>) -> Result<RecordSource, CiteError> {
    match &args.load_file {
        Some(Some(path)) => Ok(RecordSource::File(Utf8PathBuf::from(path))),
        Some(None) => Ok(RecordSource::Cache(
            coordinate_fields(&args.coordinate, experiment_id).resolve()?,
        )),
        None => Ok(RecordSource::Registry(
            coordinate_fields(&args.coordinate, experiment_id).resolve()?,
        )),
    }
}

fn parse_experiments(values: &[String]) -> Result<Vec<ExperimentId>, CiteError> {
    values.iter().map(|value| value.parse()).collect()
}

fn delivery(do_post: bool, check_only: bool, output: Option<String>) -> Delivery {
    if do_post || check_only {
        Delivery::Submit { check_only }
    } else {
        Delivery::Save(output.map(Utf8PathBuf::from))
    }
}

fn with_credentials(
    app: App<RegistryHttpClient>,
    config: &ResolvedConfig,
) -> Result<App<RegistryHttpClient>, CiteError> {
    let resolver = match &config.netrc_path {
        Some(path) => NetrcResolver::with_path(path.clone()),
        None => NetrcResolver::new()?,
    };
    let credentials = resolver.resolve(&config.credential_service)?;
    Ok(app.with_credentials(credentials))
}

fn exit_for(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(3)
    }
}
