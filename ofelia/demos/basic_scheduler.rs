//! A minimal end-to-end wiring of the scheduler against the in-memory mock
//! adapter: register two jobs, let the cron wheel fire a few times, print
//! the metrics export, and shut down cleanly.

use std::sync::Arc;
use std::time::Duration;

use ofelia::{ContainerAdapter, JobBuilder, OfeliaBuilder};
use ofelia_client::MockAdapter;

#[tokio::main]
async fn main() -> ofelia::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let adapter: Arc<dyn ContainerAdapter> = MockAdapter::new();
    let builder = OfeliaBuilder::new(adapter).with_default_metrics();
    let scheduler = builder.build();
    scheduler.start();

    scheduler.add_job(
        JobBuilder::new("heartbeat", "@every 2s")?
            .local_process("echo heartbeat")
            .build(),
    )?;

    scheduler.add_job(
        JobBuilder::new("dependent-report", "@every 2s")?
            .depends_on(["heartbeat"])
            .local_process("echo report")
            .build(),
    )?;

    tokio::time::sleep(Duration::from_secs(5)).await;

    scheduler.stop().await;
    Ok(())
}
