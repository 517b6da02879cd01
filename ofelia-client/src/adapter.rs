use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::*;

/// Uniform contract over the container engine (§4.1).
///
/// A single capability surface composed of seven sub-services, rather
/// than seven separate traits — every concrete
/// implementation (the real engine, the in-memory mock) needs all of them
/// together, and the scheduler holds one `Arc<dyn ContainerAdapter>` for
/// the lifetime of the process. Every operation is idempotent with respect
/// to call duplication except `containers_create`/`exec_create`, which mint
/// fresh IDs, and `exec_run`, which mints a fresh exec (§4.1 Contract).
#[async_trait]
pub trait ContainerAdapter: Send + Sync {
    // --- Containers ---
    async fn containers_create(&self, spec: &ContainerSpec) -> Result<String>;
    async fn containers_start(&self, id: &str) -> Result<()>;
    async fn containers_stop(&self, id: &str, timeout: Option<std::time::Duration>)
        -> Result<()>;
    async fn containers_remove(&self, id: &str, opts: RemoveOptions) -> Result<()>;
    async fn containers_inspect(&self, id: &str) -> Result<bool>; // true == running
    async fn containers_list(&self) -> Result<Vec<String>>;
    async fn containers_wait(&self, id: &str) -> Result<WaitOutcome>;
    async fn containers_logs(
        &self,
        id: &str,
        opts: LogOptions,
    ) -> Result<BoxStream<'static, Result<LogLine>>>;
    async fn containers_kill(&self, id: &str, signal: &str) -> Result<()>;
    async fn containers_pause(&self, id: &str) -> Result<()>;
    async fn containers_unpause(&self, id: &str) -> Result<()>;
    async fn containers_rename(&self, id: &str, new_name: &str) -> Result<()>;

    // --- Exec ---
    async fn exec_create(&self, container_id: &str, config: ExecConfig) -> Result<String>;
    async fn exec_start(
        &self,
        exec_id: &str,
    ) -> Result<BoxStream<'static, Result<LogLine>>>;
    async fn exec_inspect(&self, exec_id: &str) -> Result<ExecState>;
    /// Convenience combining create+start+inspect, writing stdout/stderr to
    /// the caller-provided writers and returning the exit code (§4.1).
    async fn exec_run(
        &self,
        container_id: &str,
        config: ExecConfig,
        stdout: &mut (dyn std::io::Write + Send),
        stderr: &mut (dyn std::io::Write + Send),
    ) -> Result<ExecOutcome>;

    // --- Images ---
    async fn images_pull(
        &self,
        opts: PullOptions,
    ) -> Result<BoxStream<'static, Result<PullProgress>>>;
    async fn images_pull_and_wait(&self, opts: PullOptions) -> Result<()>;
    async fn images_list(&self) -> Result<Vec<String>>;
    async fn images_inspect(&self, reference: &str) -> Result<bool>;
    async fn images_remove(&self, reference: &str, force: bool, prune_children: bool)
        -> Result<()>;
    async fn images_tag(&self, reference: &str, tag: &str) -> Result<()>;
    async fn images_exists(&self, reference: &str) -> Result<bool>;

    // --- Events ---
    async fn events_subscribe(
        &self,
        filter: EventFilter,
    ) -> Result<BoxStream<'static, Result<ContainerEvent>>>;

    // --- Services ---
    async fn services_create(&self, spec: ServiceSpec) -> Result<String>;
    async fn services_inspect(&self, id: &str) -> Result<bool>;
    async fn services_list(&self) -> Result<Vec<String>>;
    async fn services_remove(&self, id: &str) -> Result<()>;
    async fn services_list_tasks(&self, service_id: &str) -> Result<Vec<String>>;
    async fn services_wait_for_task(&self, task_id: &str, opts: TaskWaitOptions) -> Result<()>;
    async fn services_wait_for_service_tasks(
        &self,
        service_id: &str,
        opts: TaskWaitOptions,
    ) -> Result<()>;

    // --- Networks ---
    async fn networks_connect(&self, network: &str, container_id: &str) -> Result<()>;
    async fn networks_disconnect(&self, network: &str, container_id: &str, force: bool)
        -> Result<()>;
    async fn networks_list(&self) -> Result<Vec<String>>;
    async fn networks_inspect(&self, network: &str) -> Result<bool>;
    async fn networks_create(&self, name: &str) -> Result<String>;
    async fn networks_remove(&self, network: &str) -> Result<()>;

    // --- System ---
    async fn system_info(&self) -> Result<SystemInfo>;
    async fn system_ping(&self) -> Result<()>;
    async fn system_version(&self) -> Result<String>;
    async fn system_disk_usage(&self) -> Result<SystemInfo>;
}
