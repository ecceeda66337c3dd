use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pyarch::cli::commands::analyze::AnalyzeOptions;
use pyarch::diagram::DiagramFormat;

/// Parse diagram format from string
fn parse_diagram_format(s: &str) -> Result<DiagramFormat, String> {
    s.parse::<DiagramFormat>()
        .map_err(|_| format!("Invalid format '{}'. Valid values: plantuml, mermaid", s))
}

#[derive(Parser)]
#[command(name = "pyarch")]
#[command(
    version,
    about = "Static class-structure analyzer and diagram generator for Python projects"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a Python project and print its class diagram
    Analyze {
        #[arg(help = "Project root (default: current directory)")]
        path: Option<PathBuf>,
        #[arg(long, short, value_parser = parse_diagram_format, help = "Diagram notation: plantuml, mermaid")]
        format: Option<DiagramFormat>,
        #[arg(long, help = "Keep only the N most important classes (0 = all)")]
        max_classes: Option<usize>,
        #[arg(long, help = "Hide _private and __dunder__ methods")]
        public_only: bool,
        #[arg(long, help = "Do not group classes by module")]
        no_group: bool,
        #[arg(long, help = "Omit inheritance and composition edges")]
        no_relations: bool,
        #[arg(long, help = "Skip tech-stack classification")]
        no_tech_stack: bool,
        #[arg(long, help = "Print the full analysis report as JSON")]
        json: bool,
        #[arg(long, short, help = "Write output to a file instead of stdout")]
        output: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(long, help = "Print as JSON instead of TOML")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mpyarch encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            if e
                .downcast_ref::<pyarch::PyarchError>()
                .is_some_and(|e| e.is_user_error())
            {
                eprintln!("Run 'pyarch --help' for usage.");
            }
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze {
            path,
            format,
            max_classes,
            public_only,
            no_group,
            no_relations,
            no_tech_stack,
            json,
            output,
        } => {
            pyarch::cli::commands::analyze::run(
                path,
                AnalyzeOptions {
                    format,
                    max_classes,
                    public_only,
                    no_group,
                    no_relations,
                    no_tech_stack,
                    json,
                    output,
                },
            )?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => {
                pyarch::cli::commands::config::show(json)?;
            }
            ConfigAction::Path => {
                pyarch::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                pyarch::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
