use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use forma_serialization::Protocol;
use object_store::ObjectStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod cat;
pub mod chunk_pail;
pub mod ingest;
pub mod list;
pub mod route;

#[derive(Debug, Parser)]
#[command(name = "pail-toolbox", version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv). Use -q to quiet.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease output. Overrides -v.
    #[arg(short = 'q', long, action = ArgAction::SetTrue, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encode every file under the ingest directory as one chunk record of a pail.
    Ingest {
        #[arg(value_name = "PAIL", short, long, required = true, help = "Name of the pail")]
        pail: String,

        #[arg(
            value_name = "SOURCE",
            short,
            long,
            help = "Subdirectory of the ingest directory to read",
            default_value = ""
        )]
        source: String,

        #[arg(
            value_name = "SPLIT",
            long,
            num_args = 0..=1,
            default_missing_value = "true",
            help = "Split records of a newly created pail into one directory per dataset [default: false]"
        )]
        split: Option<bool>,

        #[arg(
            value_name = "PROTOCOL",
            short = 'P',
            long,
            help = "Record protocol of a newly created pail (verbose, compact) [default: FORMA_RECORD_PROTOCOL]",
            value_parser = parse_protocol
        )]
        protocol: Option<Protocol>,

        #[arg(
            value_name = "FAIL_FAST",
            short = 'f',
            long,
            help = "Fail fast on undecodable files [default: false]",
            default_value = "false"
        )]
        fail_fast: bool,
    },
    /// Show the descriptor, targets and files of a pail.
    List {
        #[arg(value_name = "PAIL", short, long, required = true, help = "Name of the pail")]
        pail: String,
    },
    /// Print the records of a pail as JSON lines.
    Cat {
        #[arg(value_name = "PAIL", short, long, required = true, help = "Name of the pail")]
        pail: String,

        #[arg(
            value_name = "TARGET",
            short,
            long,
            help = "Only print records under this target (e.g. ndvi)"
        )]
        target: Option<String>,

        #[arg(
            value_name = "LIMIT",
            short,
            long,
            help = "Limit the number of records"
        )]
        limit: Option<usize>,
    },
    /// Show the target a split pail would place an encoded chunk under.
    Route {
        #[arg(
            value_name = "FILE",
            short,
            long,
            required = true,
            help = "Path of the encoded chunk relative to the ingest directory"
        )]
        file: String,

        #[arg(
            value_name = "PROTOCOL",
            short = 'P',
            long,
            help = "Record protocol the chunk is encoded with",
            default_value = "verbose",
            value_parser = parse_protocol
        )]
        protocol: Protocol,
    },
}

fn parse_protocol(s: &str) -> Result<Protocol, String> {
    s.parse()
}

fn setup_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "warn".to_string()
    } else {
        match verbose {
            0 => forma_config::CONFIG.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose, cli.quiet);

    std::fs::create_dir_all(forma_config::PAILS_DIR_PATH.as_path())?;
    std::fs::create_dir_all(forma_config::INGEST_DIR_PATH.as_path())?;
    let store = forma_config::OBJECT_STORE_LOCAL_FS.clone() as Arc<dyn ObjectStore>;

    match cli.command {
        Commands::Ingest {
            pail,
            source,
            split,
            protocol,
            fail_fast,
        } => {
            ingest::ingest(store, pail, source, split, protocol, fail_fast).await?;
        }
        Commands::List { pail } => {
            list::list(store, pail).await?;
        }
        Commands::Cat {
            pail,
            target,
            limit,
        } => {
            cat::cat(store, pail, target, limit).await?;
        }
        Commands::Route { file, protocol } => {
            route::route(store, file, protocol).await?;
        }
    }

    Ok(())
}
