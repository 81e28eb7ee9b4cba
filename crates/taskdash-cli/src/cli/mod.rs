//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use taskdash_core::tasks::TaskStatus;
use taskdash_core::{TaskClient, config, logging};

mod commands;

#[derive(Parser)]
#[command(name = "taskdash")]
#[command(version)]
#[command(about = "Task dashboard client for the TodoTask REST API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        /// Account email (prompted when omitted)
        #[arg(long, env = "TASKDASH_EMAIL")]
        email: Option<String>,
        /// Account password (prompted when omitted)
        #[arg(long, env = "TASKDASH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account (does not log in)
    Register {
        /// Display name
        #[arg(long)]
        name: String,
        /// Account email
        #[arg(long)]
        email: String,
        /// Account password (prompted when omitted)
        #[arg(long, env = "TASKDASH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Clear the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Check that the API is reachable
    Health,

    /// Manage tasks
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum TaskCommands {
    /// List tasks
    List {
        /// Only show tasks with this status (pending, in-progress, completed)
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show a single task from the server
    Show {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },
    /// Create a task
    Add {
        /// What needs doing
        #[arg(value_name = "DETAILS")]
        details: String,
        /// Initial status (default: pending)
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
    },
    /// Change a task's details and/or status
    Update {
        #[arg(value_name = "TASK_ID")]
        id: String,
        #[arg(long)]
        details: Option<String>,
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
    },
    /// Delete a task
    Delete {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },
    /// Mark a task as completed
    Complete {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },
    /// Flip a task between completed and pending
    Toggle {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },
    /// Show counts per status
    Stats,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults (for xtask)
    Generate,
    /// Show the settings in effect, including environment overrides
    Show,
}

fn parse_status(raw: &str) -> Result<TaskStatus, taskdash_core::Error> {
    raw.parse()
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("load config")?;

    // Config commands must work even when logging or the API URL is broken.
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
            ConfigCommands::Show => commands::config::show(&config),
        };
    }

    let _log_guard = logging::init(&config.log).context("initialize logging")?;
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "taskdash starting");

    let mut client = TaskClient::from_config(&config).context("create API client")?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(&mut client, commands::auth::LoginArgs { email, password })
                .await
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            commands::auth::register(
                &mut client,
                commands::auth::RegisterArgs {
                    name,
                    email,
                    password,
                },
            )
            .await
        }
        Commands::Logout => {
            commands::auth::logout(&mut client);
            Ok(())
        }
        Commands::Whoami => commands::auth::whoami(&mut client),
        Commands::Health => commands::auth::health(&client).await,

        Commands::Tasks { command } => match command {
            TaskCommands::List { status, json } => {
                commands::tasks::list(&mut client, status, json).await
            }
            TaskCommands::Show { id } => commands::tasks::show(&mut client, &id).await,
            TaskCommands::Add { details, status } => {
                commands::tasks::add(&mut client, &details, status).await
            }
            TaskCommands::Update {
                id,
                details,
                status,
            } => commands::tasks::update(&mut client, &id, details, status).await,
            TaskCommands::Delete { id } => commands::tasks::delete(&mut client, &id).await,
            TaskCommands::Complete { id } => commands::tasks::complete(&mut client, &id).await,
            TaskCommands::Toggle { id } => commands::tasks::toggle(&mut client, &id).await,
            TaskCommands::Stats => commands::tasks::stats(&mut client).await,
        },

        // Handled above.
        Commands::Config { .. } => Ok(()),
    }
}
