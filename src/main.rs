use std::fmt::{Debug, Display};

use campus_support::campus_support_service::CampusSupport;
use campus_support::core::{get_subscriber, init_subscriber, AppConfig};
use tokio::task::JoinError;

use colored::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::new()?;

    let file_appender =
        tracing_appender::rolling::daily(&config.telemetry.log_directory, "campus_support");
    let subscriber = get_subscriber(
        config.application.name.clone(),
        config.telemetry.level.clone(),
        file_appender,
    );
    init_subscriber(subscriber)?;

    let support = CampusSupport::build(&config)?;
    let monitor = support.start_jobs();

    println!("{}", "-----------------------------------------".green());
    println!(
        "🚀 {} started on namespace `{}` ({:?} store)",
        config.application.name, config.store.namespace, config.store.backend
    );
    println!("{}", "-----------------------------------------".green());

    tokio::select! {
        o = monitor => { report_exit("Stale request monitor", o.map(Ok::<(), anyhow::Error>)); }
        _ = tokio::signal::ctrl_c() => { tracing::info!("Shutdown requested"); }
    }
    Ok(())
}

fn report_exit(task_name: &str, outcome: Result<Result<(), impl Debug + Display>, JoinError>) {
    match outcome {
        Ok(Ok(())) => {
            tracing::info!("{} has exited", task_name)
        }
        Ok(Err(e)) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "{} failed",
                task_name
            )
        }
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "{} task failed to complete",
                task_name
            )
        }
    }
}
