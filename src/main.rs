use std::io;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::env::CompleteEnv;
use clap_complete::{Shell, generate};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod archive;
mod args;
mod block;
mod classify;
mod cmd;
mod config;
mod cycle;
mod detect;
mod document;
mod editor;
mod error;
mod git;
mod output;
mod relocate;
mod timestamp;
mod workspace;

#[derive(Parser)]
#[command(name = "automove")]
#[command(version = env!("AUTOMOVE_VERSION"))]
#[command(about = "Move completed markdown tasks into an archive section")]
#[command(
    long_about = "automove - Keep markdown task lists tidy.\n\nChecked top-level tasks, and parents whose subtasks are all done, are\nstamped with a completion marker and moved under an archive heading.\nChecked subtasks of open parents are stamped in place.\n\nA document opts in with `automove: true` in its front matter."
)]
struct Cli {
    /// Debug logging to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move completed tasks to the archive section
    #[command(alias = "mv")]
    Move(cmd::move_cmd::MoveArgs),

    /// Clear the completed tasks section
    Clear(cmd::clear::ClearArgs),

    /// Show what the next move would do
    #[command(alias = "ls")]
    Scan(cmd::scan::ScanArgs),

    /// Move completed tasks whenever the file changes
    Watch(cmd::watch::WatchArgs),

    /// Generate shell completion script
    Completion(CompletionArgs),

    /// Configuration introspection
    Config(cmd::config_cmd::ConfigArgs),
}

#[derive(clap::Args)]
struct CompletionArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Clone, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "automove=debug"
    } else {
        "automove=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    // Handle dynamic shell completions
    CompleteEnv::with_factory(Cli::command).complete();

    // Use try_parse to catch errors and normalize exit code
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Exit with 0 for help/version, 1 for actual errors
            let exit_code = if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion
            {
                0
            } else {
                1
            };
            process::exit(exit_code);
        }
    };

    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Move(args) => {
            let ctx = cmd::Context::for_document(args.file());
            cmd::move_cmd::run(args, &ctx)
        }
        Commands::Clear(args) => {
            let ctx = cmd::Context::for_document(args.file());
            cmd::clear::run(args, &ctx)
        }
        Commands::Scan(args) => {
            let ctx = cmd::Context::for_document(args.file());
            cmd::scan::run(args, &ctx)
        }
        Commands::Watch(args) => {
            let ctx = cmd::Context::for_document(args.file());
            cmd::watch::run(args, &ctx)
        }
        Commands::Config(args) => cmd::config_cmd::run(args),
        Commands::Completion(args) => {
            let shell = match args.shell {
                CompletionShell::Bash => Shell::Bash,
                CompletionShell::Zsh => Shell::Zsh,
                CompletionShell::Fish => Shell::Fish,
                CompletionShell::Powershell => Shell::PowerShell,
            };
            generate(shell, &mut Cli::command(), "automove", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        process::exit(1);
    }
}
