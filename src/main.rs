use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use mailcast::datetime::{format_utc_datetime, CONSOLE_FORMAT};
use mailcast::db::{GroupRepository, UserRepository, MANAGERS_GROUP};
use mailcast::{build_mailer, Config, Database, DispatchEngine, MailcastError, Result, WebServer};

#[derive(Parser)]
#[command(name = "mailcast", version, about = "Bulk email campaigns")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve,

    /// Send every mailing that is due and exit.
    SendMailings,

    /// Create the managers group and optionally add users to it.
    CreateGroups {
        /// Usernames to add to the managers group.
        #[arg(long = "member", value_name = "USERNAME")]
        members: Vec<String>,
    },
}

fn load_config(path: &Path) -> Config {
    match Config::load_with_env(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", path.display());
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = load_config(&cli.config);

    match cli.command {
        Command::Serve => {
            if let Err(e) = mailcast::logging::init(&config.logging) {
                eprintln!("Failed to initialize logging: {e}");
                mailcast::logging::init_console_only(&config.logging.level);
            }
        }
        // One-shot commands keep stdout for their own output.
        Command::SendMailings | Command::CreateGroups { .. } => {
            mailcast::logging::init_console_only(&config.logging.level);
        }
    }

    let result = match cli.command {
        Command::Serve => serve(&config).await,
        Command::SendMailings => send_mailings(&config).await,
        Command::CreateGroups { members } => create_groups(&config, &members).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "mailcast failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn open_database(config: &Config) -> Result<Database> {
    Database::open_with_max_connections(&config.database.path, config.database.max_connections)
        .await
}

fn build_engine(config: &Config, db: &Database) -> Result<DispatchEngine> {
    let mailer = build_mailer(&config.mail)?;
    Ok(DispatchEngine::new(db.clone(), mailer, &config.mail))
}

async fn serve(config: &Config) -> Result<()> {
    config.validate()?;
    if !config.web.enabled {
        warn!("Web API is disabled in the configuration, nothing to serve");
        return Ok(());
    }

    info!("Mailcast starting");
    let db = open_database(config).await?;
    let mailer = build_mailer(&config.mail)?;
    let engine = DispatchEngine::new(db.clone(), mailer.clone(), &config.mail);

    WebServer::new(&config.web, db, mailer, engine)?
        .with_scheduler(&config.scheduler)
        .run()
        .await?;
    Ok(())
}

async fn send_mailings(config: &Config) -> Result<()> {
    let db = open_database(config).await?;
    let engine = build_engine(config, &db)?;

    println!(
        "Запуск отправки рассылок: {}",
        format_utc_datetime(&Utc::now(), &config.server.timezone, CONSOLE_FORMAT)
    );
    let mut stdout = std::io::stdout();
    let results = engine.dispatch_scheduled(&mut stdout).await?;
    info!(mailings = results.len(), "send-mailings finished");
    Ok(())
}

async fn create_groups(config: &Config, members: &[String]) -> Result<()> {
    let db = open_database(config).await?;
    let groups = GroupRepository::new(db.pool());

    let (group, created) = groups.get_or_create(MANAGERS_GROUP).await?;
    if created {
        println!("Группа \"{}\" создана.", group.name);
    } else {
        println!("Группа \"{}\" уже существует.", group.name);
    }

    let users = UserRepository::new(db.pool());
    for username in members {
        let user = users
            .get_by_username(username)
            .await?
            .ok_or_else(|| MailcastError::NotFound(format!("user {username}")))?;
        if groups.add_member(group.id, user.id).await? {
            println!("Пользователь {} добавлен в группу \"{}\".", user.username, group.name);
        } else {
            println!("Пользователь {} уже состоит в группе \"{}\".", user.username, group.name);
        }
    }
    Ok(())
}
