use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::builder::PossibleValuesParser;
use clap::{Args, Command, CommandFactory, FromArgMatches, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use cms_workflow_factory::app::{App, CreateWorkflowRequest, WorkflowStatus};
use cms_workflow_factory::config::{ConfigLoader, ValidationData};
use cms_workflow_factory::error::FactoryError;
use cms_workflow_factory::opendata::{DEFAULT_BASE_URL, OpenDataHttpClient};
use cms_workflow_factory::output::{HumanOutput, JsonOutput, OutputMode};
use cms_workflow_factory::render::CookiecutterRenderer;
use cms_workflow_factory::resolver::Overrides;
use cms_workflow_factory::selection::IndexFormat;
use cms_workflow_factory::store::{DEFAULT_CONFIG_FILE, Workspace};

const VALIDATION_FILE_ENV: &str = "CMS_RECO_VALIDATION_FILE";

#[derive(Parser)]
#[command(name = "cms-reco")]
#[command(about = "Workflow factory for the CMS reconstruction analysis")]
#[command(version)]
struct Cli {
    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// No diagnostic output
    #[arg(long, global = true)]
    quiet: bool,

    #[arg(long, global = true, env = "CMS_RECO_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download the record metadata used as config file")]
    LoadConfig(LoadConfigArgs),
    #[command(about = "Create a workflow from the config file and the given arguments")]
    CreateWorkflow(CreateWorkflowArgs),
}

#[derive(Args)]
struct LoadConfigArgs {
    /// Record id of the data set to be reconstructed
    #[arg(long)]
    recid: String,

    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config_file: Utf8PathBuf,
}

#[derive(Args)]
struct CreateWorkflowArgs {
    /// Config file the parameters are extracted from
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config_file: Utf8PathBuf,

    #[arg(long, default_value = "kubernetes")]
    compute_backend: String,

    /// Directory for the analysis to be executed
    #[arg(long)]
    directory: Option<String>,

    /// Choose a specific file from the index
    #[arg(long, default_value = "first")]
    files: String,

    #[arg(long, value_enum, default_value_t = IndexFormat::Json)]
    index_format: IndexFormat,

    /// Number of events to be reconstructed
    #[arg(long, default_value = "1")]
    nevents: String,

    #[arg(long, default_value = "serial")]
    workflow_engine: String,

    /// Year the data set was recorded
    #[arg(long, default_value = "2011")]
    year: String,

    /// CMSSW version to use (e.g. 5_3_32, 7_6_7)
    #[arg(long)]
    cmssw_version: Option<String>,

    /// Custom container image (overrides the default cmsopendata image)
    #[arg(long)]
    container_image: Option<String>,

    /// Record id to download the config file from before resolving
    #[arg(long)]
    recid: Option<String>,

    /// Global tag for the conditions data
    #[arg(long)]
    global_tag: Option<String>,

    /// Comma-separated list of run numbers to process
    #[arg(long)]
    run_filter: Option<String>,

    /// Directory holding one template per workflow engine
    #[arg(long)]
    template_root: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(error) = report.downcast_ref::<FactoryError>() {
                return ExitCode::from(map_exit_code(error));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &FactoryError) -> u8 {
    match error {
        FactoryError::ConfigRead(_) | FactoryError::TemplateNotFound(_) => 2,
        FactoryError::Http(_) | FactoryError::HttpStatus { .. } => 3,
        _ => 1,
    }
}

/// Restricts the enumerated options to the values listed in the validation data.
fn build_command(validation: &ValidationData) -> Command {
    Cli::command().mut_subcommand("create-workflow", |cmd| {
        cmd.mut_arg("compute_backend", |arg| {
            arg.value_parser(PossibleValuesParser::new(validation.compute_backends.clone()))
        })
        .mut_arg("files", |arg| {
            arg.value_parser(PossibleValuesParser::new(validation.file_selection.clone()))
        })
        .mut_arg("workflow_engine", |arg| {
            arg.value_parser(PossibleValuesParser::new(validation.workflow_engines.clone()))
        })
        .mut_arg("year", |arg| {
            arg.value_parser(PossibleValuesParser::new(validation.years.clone()))
        })
    })
}

fn run() -> miette::Result<ExitCode> {
    let validation_file = std::env::var_os(VALIDATION_FILE_ENV).map(PathBuf::from);
    let validation = ConfigLoader::load_validation(validation_file.as_deref())?;
    let matches = build_command(&validation).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());

    let default_level = if cli.quiet { "info" } else { "debug" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let workspace = Workspace::new()?;
    let client = OpenDataHttpClient::with_base_url(&cli.base_url)?;
    let renderer = CookiecutterRenderer::new()?;
    let app = App::new(workspace, client, renderer);

    match cli.command {
        Commands::LoadConfig(args) => run_load_config(args, &app, output_mode),
        Commands::CreateWorkflow(args) => run_create_workflow(args, &app, output_mode),
    }
}

fn run_load_config(
    args: LoadConfigArgs,
    app: &App<OpenDataHttpClient, CookiecutterRenderer>,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    match output_mode {
        OutputMode::Json => {
            let result = app.load_config(&args.recid, &args.config_file, &JsonOutput)?;
            JsonOutput::print_load(&result).into_diagnostic()?;
        }
        OutputMode::Human => {
            let result = app.load_config(&args.recid, &args.config_file, &HumanOutput)?;
            HumanOutput::print_load(&result);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_create_workflow(
    args: CreateWorkflowArgs,
    app: &App<OpenDataHttpClient, CookiecutterRenderer>,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    tracing::debug!("run year {}", args.year);
    let request = CreateWorkflowRequest {
        config_file: args.config_file,
        recid: args.recid,
        file_selection: args.files,
        index_format: args.index_format,
        workflow_engine: args.workflow_engine,
        template_root: args.template_root,
        overrides: Overrides {
            compute_backend: args.compute_backend,
            cmssw_version: args.cmssw_version,
            global_tag: args.global_tag,
            container_image: args.container_image,
            nevents: Some(args.nevents),
            directory: args.directory,
            run_filter: args.run_filter,
        },
    };

    let result = match output_mode {
        OutputMode::Json => {
            let result = app.create_workflow(request, &JsonOutput)?;
            JsonOutput::print_workflow(&result).into_diagnostic()?;
            result
        }
        OutputMode::Human => {
            let result = app.create_workflow(request, &HumanOutput)?;
            HumanOutput::print_workflow(&result);
            result
        }
    };

    if result.status == WorkflowStatus::ConfigError {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}
