use std::sync::Arc;
use std::time::Duration;

use ofelia_client::{ContainerAdapter, ExecConfig, PullOptions, RemoveOptions, ServiceSpec, TaskWaitOptions};
use ofelia_core::JobKind;

use crate::error::{Error, Result};
use crate::monitor::ContainerMonitor;
use crate::observability::ObservabilityHooks;
use crate::resilience::ResilienceTriplet;

const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs one `JobKind`'s I/O to completion (§4.1 delegation, §3 Job). Never
/// retries on its own — the caller wraps this in [`compose`].
pub async fn run_job_kind(
    kind: &JobKind,
    adapter: &dyn ContainerAdapter,
    monitor: &ContainerMonitor,
) -> Result<()> {
    match kind {
        JobKind::ExecInContainer { container, command } => {
            // Liveness is checked by the caller (`Scheduler::dispatch`)
            // ahead of resilience composition, so a dead container is a
            // skip rather than a circuit-breaker trip. By the time we get
            // here the container was already confirmed running.
            let args = shlex::split(command)
                .ok_or_else(|| Error::Core(ofelia_core::Error::InvalidCommand(
                    command.clone(),
                    "could not tokenize command".to_string(),
                )))?;
            let mut stdout = std::io::stdout();
            let mut stderr = std::io::stderr();
            let outcome = adapter
                .exec_run(
                    container,
                    ExecConfig {
                        command: args,
                        attach_stdout: true,
                        attach_stderr: true,
                        ..Default::default()
                    },
                    &mut stdout,
                    &mut stderr,
                )
                .await?;
            if outcome.exit_code != 0 {
                return Err(Error::Adapter(ofelia_client::Error::Permanent(format!(
                    "exec exited with code {}",
                    outcome.exit_code
                ))));
            }
            Ok(())
        }
        JobKind::RunContainer {
            image,
            command,
            remove_after,
        } => {
            let spec = ofelia_client::ContainerSpec {
                image: image.clone(),
                command: command
                    .as_deref()
                    .map(|c| shlex::split(c).unwrap_or_default()),
                ..Default::default()
            };
            let id = adapter.containers_create(&spec).await?;
            adapter.containers_start(&id).await?;
            let outcome = monitor
                .wait_for_termination(&id, DEFAULT_EXECUTION_TIMEOUT)
                .await
                .map_err(|_| Error::Timeout)?;
            if *remove_after {
                let _ = adapter.containers_remove(&id, RemoveOptions::default()).await;
            }
            if outcome.exit_code != 0 {
                return Err(Error::Adapter(ofelia_client::Error::Permanent(format!(
                    "container exited with code {}",
                    outcome.exit_code
                ))));
            }
            Ok(())
        }
        JobKind::ServiceRun { image, command } => {
            let spec = ServiceSpec {
                name: format!("ofelia-{}", uuid_like()),
                image: image.clone(),
                command: command.as_deref().map(|c| shlex::split(c).unwrap_or_default()),
            };
            let id = adapter.services_create(spec).await?;
            adapter
                .services_wait_for_service_tasks(
                    &id,
                    TaskWaitOptions {
                        timeout: DEFAULT_EXECUTION_TIMEOUT,
                    },
                )
                .await?;
            adapter.services_remove(&id).await?;
            Ok(())
        }
        JobKind::LocalProcess { command } => {
            let args = shlex::split(command)
                .ok_or_else(|| Error::Core(ofelia_core::Error::InvalidCommand(
                    command.clone(),
                    "could not tokenize command".to_string(),
                )))?;
            let Some((program, rest)) = args.split_first() else {
                return Err(Error::Core(ofelia_core::Error::InvalidCommand(
                    command.clone(),
                    "empty command".to_string(),
                )));
            };
            let status = tokio::process::Command::new(program)
                .args(rest)
                .status()
                .await
                .map_err(|e| Error::Adapter(ofelia_client::Error::Transient(e.to_string())))?;
            if !status.success() {
                return Err(Error::Adapter(ofelia_client::Error::Permanent(format!(
                    "local process exited with status {status}"
                ))));
            }
            Ok(())
        }
        JobKind::Composite { .. } => {
            // Composite steps are sequenced by the caller (§9: composite is
            // an ordering concern over other named jobs, not I/O in its
            // own right) — see `Scheduler::dispatch_composite`.
            Err(Error::Core(ofelia_core::Error::InvalidCommand(
                "<composite>".to_string(),
                "composite jobs must be dispatched via dispatch_composite".to_string(),
            )))
        }
    }
}

fn uuid_like() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{nanos:x}")
}

/// Applies the §4.2 composition order (outer to inner): rate-limit check,
/// bulkhead acquire, circuit breaker, retry loop, then `body`.
pub async fn compose<F, Fut>(
    resilience: &ResilienceTriplet,
    hooks: &ObservabilityHooks,
    body: F,
) -> Result<()>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<()>> + Send,
{
    if !resilience.rate_limiter.allow() {
        return Err(Error::RateLimitExceeded);
    }
    resilience
        .bulkhead
        .execute(|| async {
            resilience.circuit_breaker.before_call()?;
            let attempt_count = Arc::new(std::sync::atomic::AtomicU32::new(0));
            let result = resilience
                .retry
                .run(|attempt| {
                    attempt_count.store(attempt, std::sync::atomic::Ordering::SeqCst);
                    if attempt > 1 {
                        hooks.retry_attempted(resilience.retry.delay_for_attempt(attempt));
                    }
                    body()
                })
                .await;
            match &result {
                Ok(()) => {
                    resilience.circuit_breaker.on_success();
                    if attempt_count.load(std::sync::atomic::Ordering::SeqCst) > 1 {
                        hooks.retry_outcome(true);
                    }
                }
                Err(_) => {
                    resilience.circuit_breaker.on_failure();
                    if attempt_count.load(std::sync::atomic::Ordering::SeqCst) > 1 {
                        hooks.retry_outcome(false);
                    }
                }
            }
            result
        })
        .await
}
