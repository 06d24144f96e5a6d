//! `mailroom`: HTTP server and operator commands.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use mailroom_core::models::audit::SYSTEM_ACTOR;
use mailroom_core::models::user::UserFilter;
use mailroom_core::repository::UserRepository;
use mailroom_db::DbManager;
use mailroom_db::repository::SurrealUserRepository;
use mailroom_server::{AppState, ServerConfig, router, spawn_session_sweeper};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailroom", version, about = "Webmail administration service")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Run migrations, then serve the HTTP API.
    Serve {
        /// Overrides MAILROOM_BIND.
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Apply pending schema migrations and exit.
    Migrate,
    /// Create the first super admin.
    BootstrapAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "MAILROOM_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Replace a user's password and revoke their sessions.
    ResetPassword {
        #[arg(long)]
        username: String,
        #[arg(long, env = "MAILROOM_NEW_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print every account's username, role and active flag.
    ListUsers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let mut config = ServerConfig::from_env().context("invalid configuration")?;

    let db = DbManager::connect(&config.db)
        .await
        .context("failed to connect to SurrealDB")?;
    let applied = mailroom_db::run_migrations(db.client())
        .await
        .context("failed to apply migrations")?;
    if applied > 0 {
        info!(applied, "schema migrations applied");
    }

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            serve(db, config).await
        }
        Commands::Migrate => {
            info!(
                version = mailroom_db::latest_version(),
                "schema is up to date"
            );
            Ok(())
        }
        Commands::BootstrapAdmin {
            username,
            email,
            password,
        } => {
            let state = AppState::new(db.client().clone(), &config);
            let user = state
                .users
                .bootstrap_super_admin(username, email, password)
                .await
                .context("bootstrap failed")?;
            println!("created super admin {} ({})", user.username, user.id);
            Ok(())
        }
        Commands::ResetPassword { username, password } => {
            let state = AppState::new(db.client().clone(), &config);
            let user = state
                .users
                .reset_password(SYSTEM_ACTOR, &username, &password)
                .await
                .context("password reset failed")?;
            state
                .auth
                .revoke_all_sessions(user.id)
                .await
                .context("failed to revoke sessions")?;
            println!("password reset for {}; sessions revoked", user.username);
            Ok(())
        }
        Commands::ListUsers => {
            let users = SurrealUserRepository::new(db.client().clone())
                .list(UserFilter::default())
                .await
                .context("failed to list users")?;
            for user in users {
                let status = if user.is_active { "active" } else { "inactive" };
                println!("{:<24} {:<12} {}", user.username, user.role.as_str(), status);
            }
            Ok(())
        }
    }
}

async fn serve(db: DbManager, config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::new(db.client().clone(), &config);
    let sweeper = spawn_session_sweeper(
        state.clone(),
        Duration::from_secs(config.sweep_interval_secs),
    );

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "mailroom listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    sweeper.abort();
    info!("mailroom stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("mailroom=info,tower_http=info"))
        .context("invalid log filter")?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    Ok(())
}
