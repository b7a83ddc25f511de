//! Helmet CLI - render Kubernetes manifests for a generic application chart

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;
mod util;

use commands::show::ShowTarget;
use commands::template::TemplateOptions;

#[derive(Parser)]
#[command(name = "helmet")]
#[command(author = "Helmet Contributors")]
#[command(version)]
#[command(about = "Render Kubernetes manifests for a generic application chart", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render chart manifests locally
    Template {
        /// Release name
        name: String,

        /// Chart path
        chart: PathBuf,

        /// Values file(s) to merge, later files win
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,

        /// Set values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Target namespace
        #[arg(short, long, env = "HELMET_NAMESPACE", default_value = "default")]
        namespace: String,

        /// Kubernetes version to render for (e.g. 1.29 or v1.30.2)
        #[arg(long, env = "HELMET_KUBE_VERSION")]
        kube_version: Option<String>,

        /// API versions served by the target cluster (e.g. monitoring.coreos.com/v1)
        #[arg(short = 'a', long = "api-versions")]
        api_versions: Vec<String>,

        /// Additional dotted value keys that must be set
        #[arg(long)]
        require: Vec<String>,

        /// Output directory (if not set, outputs to stdout)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Only show manifests whose source contains this text
        #[arg(short = 's', long)]
        show_only: Vec<String>,

        /// Print the computed values before the manifests
        #[arg(long)]
        show_values: bool,

        /// Skip values.schema.json validation before rendering
        #[arg(long)]
        skip_schema: bool,
    },

    /// Check a chart for problems
    Lint {
        /// Chart path
        #[arg(default_value = ".")]
        chart: PathBuf,

        /// Values file(s) to merge, later files win
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,

        /// Set values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Fail on warnings too
        #[arg(long)]
        strict: bool,
    },

    /// Show chart information
    Show {
        /// What to show
        #[arg(value_enum)]
        what: ShowTarget,

        /// Chart path
        #[arg(default_value = ".")]
        chart: PathBuf,
    },

    /// Create a new chart
    Create {
        /// Chart name
        name: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> error::Result<()> {
    match cli.command {
        Commands::Template {
            name,
            chart,
            values,
            set,
            namespace,
            kube_version,
            api_versions,
            require,
            output_dir,
            show_only,
            show_values,
            skip_schema,
        } => commands::template::run(
            &name,
            &chart,
            &TemplateOptions {
                values_files: values,
                set_values: set,
                namespace,
                kube_version,
                api_versions,
                require,
                output_dir,
                show_only,
                show_values,
                skip_schema,
            },
        ),

        Commands::Lint {
            chart,
            values,
            set,
            strict,
        } => commands::lint::run(&chart, &values, &set, strict),

        Commands::Show { what, chart } => commands::show::run(what, &chart),

        Commands::Create { name, output } => commands::create::run(&name, &output),
    }
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}
