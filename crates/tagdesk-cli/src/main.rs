#![forbid(unsafe_code)]

mod ado;
mod backend;
mod cmd;
mod demo;
mod output;
mod tui;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use tagdesk_core::config::resolve_config;
use tagdesk_core::error::ErrorCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use backend::BackendOptions;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tagdesk: edit Azure DevOps work item tags",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Config file (default: <config dir>/tagdesk/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Project to load, overriding TAGDESK_PROJECT and config.
    #[arg(long, global = true, value_name = "NAME")]
    project: Option<String>,

    /// Use a seeded in-memory store instead of Azure DevOps.
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "List Epics and Issues",
        long_about = "List the project's Epics and Issues, most recently changed first.",
        after_help = "EXAMPLES:\n    # List the catalog\n    tagdesk list\n\n    # Only items tagged 'bug'\n    tagdesk list --tag bug\n\n    # Emit machine-readable output\n    tagdesk list --format json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one work item",
        after_help = "EXAMPLES:\n    # Show an item\n    tagdesk show 42"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Add or remove tags on a work item",
        long_about = "Add or remove tags on a work item. Removals apply first, then additions; \
                      the whole tag field is written back in one update.",
        after_help = "EXAMPLES:\n    # Print current tags\n    tagdesk tags 42\n\n    # Add two tags\n    tagdesk tags 42 --add bug --add p1\n\n    # Preview a change\n    tagdesk tags 42 --remove p1 --add p2 --dry-run"
    )]
    Tags(cmd::tags::TagsArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Open the interactive tag panel"
    )]
    Edit,

    #[command(
        next_help_heading = "Project Maintenance",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    tagdesk completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

/// Filter used when `TAGDESK_LOG` is unset.
///
/// The panel shares stderr's terminal with its alternate screen, so it logs
/// nothing unless asked to explicitly.
fn default_log_filter(verbose: bool, debug_env: bool, interactive: bool) -> &'static str {
    if interactive {
        "off"
    } else if verbose || debug_env {
        "tagdesk=debug,info"
    } else {
        "tagdesk=info,warn"
    }
}

fn init_tracing(verbose: bool, interactive: bool) {
    let filter = EnvFilter::try_from_env("TAGDESK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(default_log_filter(
            verbose,
            env::var("DEBUG").is_ok(),
            interactive,
        ))
    });

    let format = env::var("TAGDESK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, matches!(cli.command, Commands::Edit));

    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let config = match resolve_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let output = resolve_output_mode(cli.format, cli.json, None);
            let code = ErrorCode::ConfigParseError;
            render_error(
                output,
                &CliError::with_details(
                    format!("{e:#}"),
                    code.hint().unwrap_or_default(),
                    code.code(),
                ),
            )?;
            return Err(e);
        }
    };
    let output = resolve_output_mode(cli.format, cli.json, config.output.as_deref());
    debug!(demo = cli.demo, ?output, "resolved settings");

    let options = BackendOptions {
        demo: cli.demo,
        project: cli.project.clone(),
        config,
    };

    match cli.command {
        Commands::List(ref args) => cmd::list::run_list(args, &options, output),
        Commands::Show(ref args) => cmd::show::run_show(args, &options, output),
        Commands::Tags(ref args) => cmd::tags::run_tags(args, &options, output),
        Commands::Edit => cmd::edit::run_edit(&options, output),
        Commands::Completions(_) => Ok(()),
    }
}
