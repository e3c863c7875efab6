mod report;
mod source;

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use miette::{Context as _, IntoDiagnostic as _, Result};
use splice_model::{DefinitionGraph, MessageTemplates, TypeTable};
use splice_store::{DirStore, ModelStore as _};
use splice_verifier::{Verifier, VerifyOptions};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, prelude::*};

#[derive(Parser)]
#[command(name = "splice")]
#[command(version)]
#[command(about = "Verify dependency-injection definition graphs")]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv, -vvvv).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Check(CheckArgs),
    Show(ShowArgs),
}

#[derive(Args)]
struct StoreArgs {
    /// Directory analyzed definitions are written to and read from.
    #[arg(long = "store", value_name = "DIR")]
    store: PathBuf,

    /// Additional read-only directories searched for previously analyzed definitions.
    #[arg(long = "search", value_name = "DIR")]
    search: Vec<PathBuf>,
}

impl StoreArgs {
    fn open(&self) -> DirStore {
        self.search
            .iter()
            .fold(DirStore::new(&self.store), |store, path| {
                store.with_search_path(path)
            })
    }
}

#[derive(Args)]
struct CheckArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// JSON5 map of type names to their supertypes, used for assignability checks.
    #[arg(long = "types", value_name = "FILE")]
    types: Option<PathBuf>,

    /// Report at most this many cycles per inspected graph.
    #[arg(long = "cycle-limit", value_name = "N")]
    cycle_limit: Option<usize>,

    /// Definition sources to verify together.
    #[arg(value_name = "SOURCE", required = true)]
    sources: Vec<PathBuf>,
}

#[derive(Args)]
struct ShowArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Identity of the stored definition to print.
    #[arg(value_name = "IDENTITY")]
    identity: String,
}

fn main() -> Result<()> {
    miette::set_panic_hook();
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Command::Check(args) => check(args),
        Command::Show(args) => show(args),
    }
}

fn init_tracing(verbose: u8) -> Result<()> {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::try_from_default_env().into_diagnostic()?
    } else {
        let splice_level = match verbose {
            0 => "error",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("error,splice={splice_level},splice_={splice_level}"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_fmt::layer().with_writer(std::io::stderr))
        .with(ErrorLayer::default())
        .init();

    Ok(())
}

fn check(args: CheckArgs) -> Result<()> {
    let store = args.store.open();
    let oracle = match &args.types {
        Some(path) => source::load_type_table(path)?,
        None => TypeTable::new(),
    };

    let mut graph = DefinitionGraph::new();
    for path in &args.sources {
        graph.add(source::load_definition(path)?);
    }
    tracing::info!(sources = args.sources.len(), "loaded definition sources");

    let options = match args.cycle_limit {
        Some(limit) => VerifyOptions::default().with_cycle_limit(limit),
        None => VerifyOptions::default(),
    };
    let verifier = Verifier::with_options(store, oracle, options);
    let diagnostics = verifier
        .verify(&mut graph)
        .wrap_err("verification failed")?;

    report::print_diagnostics(&diagnostics, &MessageTemplates::default())?;
    if !diagnostics.is_empty() {
        return Err(miette::miette!(
            "verification failed with {} diagnostic(s)",
            diagnostics.len()
        ));
    }

    let verified = graph.batch().len();
    println!("verified {verified} definition(s)");
    Ok(())
}

fn show(args: ShowArgs) -> Result<()> {
    let store = args.store.open();
    let definitions = store
        .lookup(&args.identity)
        .wrap_err_with(|| format!("failed to read `{}`", args.identity))?;
    if definitions.is_empty() {
        return Err(miette::miette!(
            "no analyzed definition named `{}`",
            args.identity
        ));
    }

    for definition in &definitions {
        println!("// {}", definition.location());
        let json = serde_json::to_string_pretty(&definition.to_record()).into_diagnostic()?;
        println!("{json}");
    }
    Ok(())
}
