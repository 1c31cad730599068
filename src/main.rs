//! dagwatch - trigger and monitor Airflow DAG runs.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dagwatch::auth::{
    AuthError, AuthMethod, BasicCredentials, CredentialSupplier, KeycloakSupplier,
};
use dagwatch::client::{AirflowClient, ClientError};
use dagwatch::monitor::{
    is_terminal, ConsoleProgress, Monitor, MonitorResult, RunHandle, RunOutcome,
};

/// Exit code for monitoring interrupted by Ctrl-C (128 + SIGINT).
const EXIT_CANCELLED: i32 = 130;

#[derive(Parser)]
#[command(
    name = "dagwatch",
    about = "Trigger and monitor Airflow DAG runs",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Connection and authentication flags shared by every subcommand.
#[derive(Args)]
struct ConnectionArgs {
    /// Base URL of the Airflow instance.
    #[arg(long)]
    url: String,

    /// DAG ID to operate on.
    #[arg(long)]
    dag: String,

    /// Airflow (or identity provider) username.
    #[arg(long)]
    username: String,

    /// Airflow (or identity provider) password.
    #[arg(long)]
    password: String,

    /// Skip TLS certificate verification.
    #[arg(long)]
    insecure: bool,

    /// Keycloak base URL; switches authentication to an OAuth2 password grant.
    #[arg(long, requires_all = ["realm", "client_id", "client_secret"])]
    keycloak_url: Option<String>,

    /// Keycloak realm.
    #[arg(long, requires = "keycloak_url")]
    realm: Option<String>,

    /// Keycloak client id.
    #[arg(long, requires = "keycloak_url")]
    client_id: Option<String>,

    /// Keycloak client secret.
    #[arg(long, requires = "keycloak_url")]
    client_secret: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger a DAG run and monitor it until it completes.
    Run {
        #[command(flatten)]
        connection: ConnectionArgs,
        /// JSON string for the DAG run configuration.
        #[arg(long, default_value = "{}")]
        conf: String,
        /// Seconds between status polls.
        #[arg(long, default_value_t = 10)]
        interval: u64,
    },
    /// Trigger a DAG run and exit without monitoring.
    Trigger {
        #[command(flatten)]
        connection: ConnectionArgs,
        /// JSON string for the DAG run configuration.
        #[arg(long, default_value = "{}")]
        conf: String,
    },
    /// Print the state of a DAG run (the latest run when --run-id is omitted).
    Status {
        #[command(flatten)]
        connection: ConnectionArgs,
        /// Run ID to inspect.
        #[arg(long)]
        run_id: Option<String>,
    },
}

/// Errors that abort the program before or instead of monitoring.
#[derive(Debug, thiserror::Error)]
enum FatalError {
    #[error("Invalid JSON provided for --conf argument: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // Keep stdout clean for the spinner line; diagnostics go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn auth_method(connection: &ConnectionArgs) -> AuthMethod {
    match (
        &connection.keycloak_url,
        &connection.realm,
        &connection.client_id,
        &connection.client_secret,
    ) {
        (Some(url), Some(realm), Some(client_id), Some(client_secret)) => {
            AuthMethod::Keycloak(KeycloakSupplier::new(
                url.clone(),
                realm.clone(),
                client_id.clone(),
                client_secret.clone(),
                connection.username.clone(),
                connection.password.clone(),
            ))
        }
        _ => AuthMethod::Basic(BasicCredentials::new(
            connection.username.clone(),
            connection.password.clone(),
        )),
    }
}

async fn build_client(connection: &ConnectionArgs) -> Result<AirflowClient, FatalError> {
    let credentials = auth_method(connection).credentials().await?;
    Ok(AirflowClient::new(
        &connection.url,
        credentials,
        connection.insecure,
    )?)
}

/// Report the terminal outcome and return the matching exit code.
fn report_outcome(outcome: &RunOutcome) -> i32 {
    match outcome {
        RunOutcome::Success => tracing::info!("DAG completed successfully"),
        RunOutcome::Failed | RunOutcome::UpstreamFailed => tracing::error!("DAG failed"),
        other => tracing::warn!(state = %other, "DAG ended with unexpected state"),
    }
    outcome.exit_code()
}

async fn cmd_run(connection: ConnectionArgs, conf: String, interval: u64) -> Result<i32, FatalError> {
    let conf: Value = serde_json::from_str(&conf)?;
    let client = build_client(&connection).await?;
    let handle = client.trigger_run(&connection.dag, &conf).await?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            cancel.cancel();
        }
    });

    let monitor = Monitor::new(client)
        .with_interval(Duration::from_secs(interval))
        .with_cancellation(cancel);
    let mut sink = ConsoleProgress;

    match monitor.monitor(&handle, &mut sink).await {
        MonitorResult::Finished { outcome, .. } => Ok(report_outcome(&outcome)),
        MonitorResult::Cancelled => {
            tracing::warn!("Monitoring cancelled");
            Ok(EXIT_CANCELLED)
        }
    }
}

async fn cmd_trigger(connection: ConnectionArgs, conf: String) -> Result<i32, FatalError> {
    let conf: Value = serde_json::from_str(&conf)?;
    let client = build_client(&connection).await?;
    let handle = client.trigger_run(&connection.dag, &conf).await?;
    println!("{}", handle.run_id);
    Ok(0)
}

async fn cmd_status(connection: ConnectionArgs, run_id: Option<String>) -> Result<i32, FatalError> {
    let client = build_client(&connection).await?;
    let status = match run_id {
        Some(run_id) => {
            let handle = RunHandle {
                dag_id: connection.dag.clone(),
                run_id,
            };
            client.run_status(&handle).await?
        }
        None => client.latest_run(&connection.dag).await?,
    };

    let state = status.state.to_lowercase();
    println!("{state}");
    if is_terminal(&state) {
        Ok(report_outcome(&RunOutcome::from_state(&state)))
    } else {
        Ok(0)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            connection,
            conf,
            interval,
        } => cmd_run(connection, conf, interval).await,
        Commands::Trigger { connection, conf } => cmd_trigger(connection, conf).await,
        Commands::Status { connection, run_id } => cmd_status(connection, run_id).await,
    };

    let code = match result {
        Ok(code) => code,
        Err(error) => {
            tracing::error!(error = %error, "Error");
            1
        }
    };
    std::process::exit(code);
}
