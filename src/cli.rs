use crate::command::{self, ExecuteCommand, TriggerCommand};
use crate::executioner::{ConsoleOutput, NullOutput, Output, SystemClock};
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cadence", version)]
#[command(
    about = "Execute scheduled campaign events whose time has come",
    long_about = "cadence drains due campaign event logs in bounded batches, re-validates each log's schedule, executes the ones still due and reschedules the rest."
)]
#[command(arg_required_else_help = true)]
#[command(after_long_help = "Examples:
  cadence trigger --campaign 12
  cadence trigger --campaign 12 --batch-limit 250 --thread-id 1 --max-threads 4
  cadence execute --scheduled-log-ids 101,102,103
  cadence completion zsh > ~/.zsh/completions/_cadence
  cadence man > cadence.1")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Execute all due scheduled events of a campaign",
        long_about = "Execute all due scheduled events of a campaign. Logs whose schedule moved into the future are rescheduled instead of executed."
    )]
    #[command(arg_required_else_help = true)]
    #[command(after_long_help = "Examples:
  cadence trigger --campaign 12
  cadence trigger --campaign 12 --min-contact-id 1 --max-contact-id 5000
  cadence trigger --campaign 12 --contact-ids 4,8,15 --log run.ndjson")]
    Trigger {
        #[arg(long = "campaign", value_name = "ID", help = "Campaign to process")]
        campaign_id: i64,
        #[arg(
            long,
            value_name = "N",
            value_parser = clap::value_parser!(u32).range(1..),
            help = "Contacts per batch (default: [limiter].batch_limit or 100)"
        )]
        batch_limit: Option<u32>,
        #[arg(long, value_name = "ID", help = "Only process this contact")]
        contact_id: Option<i64>,
        #[arg(long, value_name = "ID", help = "Lowest contact id to process")]
        min_contact_id: Option<i64>,
        #[arg(long, value_name = "ID", help = "Highest contact id to process")]
        max_contact_id: Option<i64>,
        #[arg(
            long,
            value_name = "CSV",
            help = "Comma-separated contact ids to process"
        )]
        contact_ids: Option<String>,
        #[arg(
            long,
            value_name = "N",
            requires = "max_threads",
            help = "This process's shard (1-based) when splitting contacts"
        )]
        thread_id: Option<u32>,
        #[arg(
            long,
            value_name = "N",
            requires = "thread_id",
            help = "Number of processes sharing the contacts"
        )]
        max_threads: Option<u32>,
        #[arg(
            long,
            value_name = "PATH",
            help = "Path to state DB (default: $XDG_STATE_HOME/cadence/state.db)"
        )]
        state_db: Option<PathBuf>,
        #[arg(long, value_name = "PATH", help = "Write NDJSON run log to file")]
        log: Option<PathBuf>,
        #[arg(long, help = "Suppress progress output")]
        quiet: bool,
    },
    #[command(
        about = "Execute specific scheduled logs now",
        long_about = "Execute specific scheduled logs by id. Logs whose schedule moved into the future are rescheduled together to the latest due time."
    )]
    #[command(arg_required_else_help = true)]
    #[command(after_long_help = "Example:
  cadence execute --scheduled-log-ids 101,102,103")]
    Execute {
        #[arg(long, value_name = "CSV", help = "Comma-separated log ids")]
        scheduled_log_ids: String,
        #[arg(
            long,
            value_name = "PATH",
            help = "Path to state DB (default: $XDG_STATE_HOME/cadence/state.db)"
        )]
        state_db: Option<PathBuf>,
        #[arg(long, value_name = "PATH", help = "Write NDJSON run log to file")]
        log: Option<PathBuf>,
        #[arg(long, help = "Suppress progress output")]
        quiet: bool,
    },
    #[command(
        about = "Generate shell completion script",
        long_about = "Generate shell completion script for your shell. Redirect output to your shell completion directory."
    )]
    #[command(arg_required_else_help = true)]
    #[command(after_long_help = "Examples:
  cadence completion bash > ~/.local/share/bash-completion/completions/cadence
  cadence completion zsh > ~/.zsh/completions/_cadence
  cadence completion fish > ~/.config/fish/completions/cadence.fish")]
    Completion {
        #[arg(value_enum, value_name = "SHELL", help = "Target shell")]
        shell: Shell,
    },
    #[command(
        about = "Generate a man page",
        long_about = "Generate a roff man page for cadence."
    )]
    #[command(after_long_help = "Examples:
  cadence man > cadence.1
  cadence man --output docs/cadence.1")]
    Man {
        #[arg(
            long,
            value_name = "PATH",
            help = "Write man page to file (stdout when omitted)"
        )]
        output: Option<PathBuf>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Trigger {
            campaign_id,
            batch_limit,
            contact_id,
            min_contact_id,
            max_contact_id,
            contact_ids,
            thread_id,
            max_threads,
            state_db,
            log,
            quiet,
        } => {
            let cmd = TriggerCommand {
                campaign_id,
                batch_limit: batch_limit.map(|n| n as usize),
                contact_id,
                min_contact_id,
                max_contact_id,
                contact_ids,
                thread_id,
                max_threads,
                state_db,
                log,
            };
            let repo_root = std::env::current_dir().context("resolve working directory")?;
            let mut console = console_output(quiet);
            command::trigger_campaign(cmd, &repo_root, &SystemClock, console.as_mut())?;
            Ok(())
        }
        Commands::Execute {
            scheduled_log_ids,
            state_db,
            log,
            quiet,
        } => {
            let cmd = ExecuteCommand {
                scheduled_log_ids,
                state_db,
                log,
            };
            let repo_root = std::env::current_dir().context("resolve working directory")?;
            let mut console = console_output(quiet);
            command::execute_scheduled_logs(cmd, &repo_root, &SystemClock, console.as_mut())?;
            Ok(())
        }
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Man { output } => {
            let man = clap_mangen::Man::new(Cli::command());
            match output {
                Some(path) => {
                    let mut bytes = Vec::new();
                    man.render(&mut bytes)?;
                    fs::write(path, bytes)?;
                }
                None => {
                    man.render(&mut io::stdout())?;
                }
            }
            Ok(())
        }
    }
}

fn console_output(quiet: bool) -> Box<dyn Output> {
    if quiet {
        Box::new(NullOutput)
    } else {
        Box::new(ConsoleOutput::new(io::stdout()))
    }
}
