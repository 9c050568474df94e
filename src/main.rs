//! logdeck - stream and page remote application logs from the terminal
//!
//! This is the binary entry point. All logic lives in the library and crates.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};

use logdeck::{run_tail, Console, ServiceUpdate, TailOptions};
use logdeck_app::config::{default_settings_path, load_settings, load_settings_strict};
use logdeck_app::CredentialStore;
use logdeck_client::ServiceRecord;
use logdeck_core::LogTarget;

/// logdeck - stream and page remote application logs
#[derive(Parser, Debug)]
#[command(name = "logdeck")]
#[command(about = "Stream and page remote application logs", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.config/logdeck/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and save the access credential
    Login {
        #[arg(long, short)]
        username: String,
        /// Read from LOGDECK_PASSWORD when omitted
        #[arg(long, short, env = "LOGDECK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the saved credential
    Logout,
    /// List or edit registered services
    Apps {
        #[command(subcommand)]
        action: Option<AppsCommand>,
    },
    /// Show whether a service is running
    Status(ServiceArgs),
    /// List a service's log files
    Logs {
        #[command(flatten)]
        service: ServiceArgs,
        /// Log file name filter, applied by the console
        #[arg(long)]
        filter: Option<String>,
    },
    /// Download a log file
    Download {
        #[command(flatten)]
        target: TargetArgs,
        /// Directory to save into
        #[arg(long = "out", short, default_value = ".")]
        output: PathBuf,
    },
    /// Stream a log file live
    Tail {
        #[command(flatten)]
        target: TargetArgs,
        /// Server-side line filter
        #[arg(long)]
        search: Option<String>,
        /// Scroll to the newest line on every update
        #[arg(long)]
        auto_scroll: bool,
        /// Emit NDJSON events instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum AppsCommand {
    /// Register a service
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        host: String,
        #[arg(long)]
        port: String,
        /// Deployment path on the host
        #[arg(long)]
        path: Option<String>,
    },
    /// Change a registered service; omitted fields are kept
    Update {
        /// Service id as shown by `logdeck apps`
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<String>,
        /// Deployment path; pass an empty value to clear it
        #[arg(long)]
        path: Option<String>,
    },
    /// Remove registered services
    Delete {
        /// Service ids as shown by `logdeck apps`
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

/// A service, by registered name or by address
#[derive(Args, Debug)]
struct ServiceArgs {
    /// Registered service name
    #[arg(long, conflicts_with_all = ["host", "port"])]
    app: Option<String>,
    #[arg(long, required_unless_present = "app")]
    host: Option<String>,
    #[arg(long, required_unless_present = "app")]
    port: Option<String>,
    /// Deployment path on the host
    #[arg(long, conflicts_with = "app")]
    path: Option<String>,
}

/// One log file of a service
#[derive(Args, Debug)]
struct TargetArgs {
    #[command(flatten)]
    service: ServiceArgs,
    /// Log file name as listed by `logdeck logs`
    #[arg(long)]
    log_name: String,
}

impl ServiceArgs {
    async fn resolve(&self, console: &Console, log_name: &str) -> Result<LogTarget> {
        if let Some(app) = &self.app {
            let entry = console.find_app(app).await?;
            return Ok(entry.target(log_name));
        }
        match (&self.host, &self.port) {
            (Some(host), Some(port)) => {
                let target = LogTarget::new(host.clone(), port.clone(), log_name);
                Ok(match &self.path {
                    Some(path) => target.with_path(path.clone()),
                    None => target,
                })
            }
            _ => Err(eyre!("either --app or both --host and --port are required")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    logdeck_core::logging::init()?;

    let settings = match &cli.config {
        Some(path) => load_settings_strict(path)?,
        None => load_settings(&default_settings_path()),
    };
    let console = Console::new(settings, CredentialStore::open_default())?;

    match cli.command {
        Command::Login { username, password } => {
            console.login(&username, &password).await?;
            eprintln!("✅ Logged in as {username}");
        }
        Command::Logout => {
            console.logout()?;
            eprintln!("Logged out.");
        }
        Command::Apps { action: None } => {
            let apps = console.apps().await?;
            if apps.is_empty() {
                eprintln!("No registered services.");
            }
            for app in apps {
                let status = app
                    .status
                    .map_or_else(|| "-".to_string(), |s| s.to_string());
                println!(
                    "{:<6} {:<24} {:<8} {}:{}  {}",
                    app.id.as_deref().unwrap_or("-"),
                    app.name,
                    status,
                    app.ip,
                    app.port.as_deref().unwrap_or("-"),
                    app.path.as_deref().unwrap_or("")
                );
            }
        }
        Command::Apps {
            action:
                Some(AppsCommand::Add {
                    name,
                    host,
                    port,
                    path,
                }),
        } => {
            let record = ServiceRecord {
                id: None,
                name,
                ip: host,
                port,
                path,
            };
            let label = record.name.clone();
            console.add_app(record).await?;
            eprintln!("✅ Registered {label}");
        }
        Command::Apps {
            action:
                Some(AppsCommand::Update {
                    id,
                    name,
                    host,
                    port,
                    path,
                }),
        } => {
            let changes = ServiceUpdate {
                name,
                ip: host,
                port,
                path,
            };
            if changes.is_empty() {
                return Err(eyre!("nothing to update; pass --name, --host, --port, or --path"));
            }
            let saved = console.update_app(&id, changes).await?;
            eprintln!("✅ Updated {} ({}:{})", saved.name, saved.ip, saved.port);
        }
        Command::Apps {
            action: Some(AppsCommand::Delete { ids }),
        } => {
            let count = ids.len();
            console.delete_apps(ids).await?;
            eprintln!("✅ Deleted {count} service(s)");
        }
        Command::Status(service) => {
            let target = service.resolve(&console, "").await?;
            let running = console.status(&target).await?;
            println!(
                "{}: {}",
                target.label(),
                if running { "running" } else { "stopped" }
            );
        }
        Command::Logs { service, filter } => {
            let target = service
                .resolve(&console, filter.as_deref().unwrap_or(""))
                .await?;
            for file in console.log_files(&target).await? {
                println!("{}", file.log_name);
            }
        }
        Command::Download { target, output } => {
            let resolved = target.service.resolve(&console, &target.log_name).await?;
            let path = console.download(&resolved, &output).await?;
            eprintln!("✅ Saved {}", path.display());
        }
        Command::Tail {
            target,
            search,
            auto_scroll,
            json,
        } => {
            let resolved = target.service.resolve(&console, &target.log_name).await?;
            let options = TailOptions {
                search,
                auto_scroll,
                json,
            };
            run_tail(&console, resolved, options).await?;
        }
    }

    Ok(())
}
