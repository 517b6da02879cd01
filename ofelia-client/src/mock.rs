use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use parking_lot::Mutex;

use crate::adapter::ContainerAdapter;
use crate::error::Result;
use crate::types::*;

/// A pure in-memory `ContainerAdapter` for tests (§4.1: "the adapter admits
/// a pure in-memory implementation behind the same surface, with per-call
/// hooks ... and call-log tracking").
///
/// Every method appends its name to the call log before consulting an
/// optional override; without an override, calls succeed with a bland
/// default result so tests only need to stub the behavior they care about.
pub struct MockAdapter {
    calls: Mutex<Vec<String>>,
    exec_run_hook: Mutex<Option<ExecRunHook>>,
    wait_hook: Mutex<Option<WaitHook>>,
    inspect_hook: Mutex<Option<InspectHook>>,
    next_id: Mutex<u64>,
}

type ExecRunHook = Box<dyn Fn(&str, &ExecConfig) -> Result<ExecOutcome> + Send + Sync>;
type WaitHook = Box<dyn Fn(&str) -> Result<WaitOutcome> + Send + Sync>;
type InspectHook = Box<dyn Fn(&str) -> Result<bool> + Send + Sync>;

impl Default for MockAdapter {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            exec_run_hook: Mutex::new(None),
            wait_hook: Mutex::new(None),
            inspect_hook: Mutex::new(None),
            next_id: Mutex::new(0),
        }
    }
}

impl MockAdapter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_exec_run<F>(&self, hook: F)
    where
        F: Fn(&str, &ExecConfig) -> Result<ExecOutcome> + Send + Sync + 'static,
    {
        *self.exec_run_hook.lock() = Some(Box::new(hook));
    }

    pub fn on_wait<F>(&self, hook: F)
    where
        F: Fn(&str) -> Result<WaitOutcome> + Send + Sync + 'static,
    {
        *self.wait_hook.lock() = Some(Box::new(hook));
    }

    pub fn on_inspect<F>(&self, hook: F)
    where
        F: Fn(&str) -> Result<bool> + Send + Sync + 'static,
    {
        *self.inspect_hook.lock() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == method).count()
    }

    fn log(&self, method: &str) {
        self.calls.lock().push(method.to_string());
    }

    fn fresh_id(&self) -> String {
        let mut n = self.next_id.lock();
        *n += 1;
        format!("mock-{n}")
    }
}

#[async_trait]
impl ContainerAdapter for MockAdapter {
    async fn containers_create(&self, _spec: &ContainerSpec) -> Result<String> {
        self.log("containers_create");
        Ok(self.fresh_id())
    }

    async fn containers_start(&self, _id: &str) -> Result<()> {
        self.log("containers_start");
        Ok(())
    }

    async fn containers_stop(&self, _id: &str, _timeout: Option<std::time::Duration>) -> Result<()> {
        self.log("containers_stop");
        Ok(())
    }

    async fn containers_remove(&self, _id: &str, _opts: RemoveOptions) -> Result<()> {
        self.log("containers_remove");
        Ok(())
    }

    async fn containers_inspect(&self, id: &str) -> Result<bool> {
        self.log("containers_inspect");
        if let Some(hook) = self.inspect_hook.lock().as_ref() {
            return hook(id);
        }
        Ok(true)
    }

    async fn containers_list(&self) -> Result<Vec<String>> {
        self.log("containers_list");
        Ok(Vec::new())
    }

    async fn containers_wait(&self, id: &str) -> Result<WaitOutcome> {
        self.log("containers_wait");
        if let Some(hook) = self.wait_hook.lock().as_ref() {
            return hook(id);
        }
        Ok(WaitOutcome {
            status_code: 0,
            error: None,
        })
    }

    async fn containers_logs(
        &self,
        _id: &str,
        _opts: LogOptions,
    ) -> Result<BoxStream<'static, Result<LogLine>>> {
        self.log("containers_logs");
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn containers_kill(&self, _id: &str, _signal: &str) -> Result<()> {
        self.log("containers_kill");
        Ok(())
    }

    async fn containers_pause(&self, _id: &str) -> Result<()> {
        self.log("containers_pause");
        Ok(())
    }

    async fn containers_unpause(&self, _id: &str) -> Result<()> {
        self.log("containers_unpause");
        Ok(())
    }

    async fn containers_rename(&self, _id: &str, _new_name: &str) -> Result<()> {
        self.log("containers_rename");
        Ok(())
    }

    async fn exec_create(&self, _container_id: &str, _config: ExecConfig) -> Result<String> {
        self.log("exec_create");
        Ok(self.fresh_id())
    }

    async fn exec_start(&self, _exec_id: &str) -> Result<BoxStream<'static, Result<LogLine>>> {
        self.log("exec_start");
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn exec_inspect(&self, _exec_id: &str) -> Result<ExecState> {
        self.log("exec_inspect");
        Ok(ExecState {
            running: false,
            exit_code: Some(0),
        })
    }

    async fn exec_run(
        &self,
        container_id: &str,
        config: ExecConfig,
        _stdout: &mut (dyn std::io::Write + Send),
        _stderr: &mut (dyn std::io::Write + Send),
    ) -> Result<ExecOutcome> {
        self.log("exec_run");
        if let Some(hook) = self.exec_run_hook.lock().as_ref() {
            return hook(container_id, &config);
        }
        Ok(ExecOutcome { exit_code: 0 })
    }

    async fn images_pull(
        &self,
        _opts: PullOptions,
    ) -> Result<BoxStream<'static, Result<PullProgress>>> {
        self.log("images_pull");
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn images_pull_and_wait(&self, _opts: PullOptions) -> Result<()> {
        self.log("images_pull_and_wait");
        Ok(())
    }

    async fn images_list(&self) -> Result<Vec<String>> {
        self.log("images_list");
        Ok(Vec::new())
    }

    async fn images_inspect(&self, _reference: &str) -> Result<bool> {
        self.log("images_inspect");
        Ok(true)
    }

    async fn images_remove(&self, _reference: &str, _force: bool, _prune_children: bool) -> Result<()> {
        self.log("images_remove");
        Ok(())
    }

    async fn images_tag(&self, _reference: &str, _tag: &str) -> Result<()> {
        self.log("images_tag");
        Ok(())
    }

    async fn images_exists(&self, _reference: &str) -> Result<bool> {
        self.log("images_exists");
        Ok(true)
    }

    async fn events_subscribe(
        &self,
        _filter: EventFilter,
    ) -> Result<BoxStream<'static, Result<ContainerEvent>>> {
        self.log("events_subscribe");
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn services_create(&self, _spec: ServiceSpec) -> Result<String> {
        self.log("services_create");
        Ok(self.fresh_id())
    }

    async fn services_inspect(&self, _id: &str) -> Result<bool> {
        self.log("services_inspect");
        Ok(true)
    }

    async fn services_list(&self) -> Result<Vec<String>> {
        self.log("services_list");
        Ok(Vec::new())
    }

    async fn services_remove(&self, _id: &str) -> Result<()> {
        self.log("services_remove");
        Ok(())
    }

    async fn services_list_tasks(&self, _service_id: &str) -> Result<Vec<String>> {
        self.log("services_list_tasks");
        Ok(Vec::new())
    }

    async fn services_wait_for_task(&self, _task_id: &str, _opts: TaskWaitOptions) -> Result<()> {
        self.log("services_wait_for_task");
        Ok(())
    }

    async fn services_wait_for_service_tasks(
        &self,
        _service_id: &str,
        _opts: TaskWaitOptions,
    ) -> Result<()> {
        self.log("services_wait_for_service_tasks");
        Ok(())
    }

    async fn networks_connect(&self, _network: &str, _container_id: &str) -> Result<()> {
        self.log("networks_connect");
        Ok(())
    }

    async fn networks_disconnect(&self, _network: &str, _container_id: &str, _force: bool) -> Result<()> {
        self.log("networks_disconnect");
        Ok(())
    }

    async fn networks_list(&self) -> Result<Vec<String>> {
        self.log("networks_list");
        Ok(Vec::new())
    }

    async fn networks_inspect(&self, _network: &str) -> Result<bool> {
        self.log("networks_inspect");
        Ok(true)
    }

    async fn networks_create(&self, _name: &str) -> Result<String> {
        self.log("networks_create");
        Ok(self.fresh_id())
    }

    async fn networks_remove(&self, _network: &str) -> Result<()> {
        self.log("networks_remove");
        Ok(())
    }

    async fn system_info(&self) -> Result<SystemInfo> {
        self.log("system_info");
        Ok(SystemInfo {
            fields: HashMap::new(),
        })
    }

    async fn system_ping(&self) -> Result<()> {
        self.log("system_ping");
        Ok(())
    }

    async fn system_version(&self) -> Result<String> {
        self.log("system_version");
        Ok("mock-0.0.0".to_string())
    }

    async fn system_disk_usage(&self) -> Result<SystemInfo> {
        self.log("system_disk_usage");
        Ok(SystemInfo {
            fields: HashMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_in_order() {
        let mock = MockAdapter::new();
        mock.containers_create(&ContainerSpec::default()).await.unwrap();
        mock.containers_start("c1").await.unwrap();
        assert_eq!(mock.calls(), vec!["containers_create", "containers_start"]);
    }

    #[tokio::test]
    async fn exec_run_hook_overrides_default() {
        let mock = MockAdapter::new();
        mock.on_exec_run(|_container, _cfg| Ok(ExecOutcome { exit_code: 7 }));
        let mut out = Vec::new();
        let mut err = Vec::new();
        let outcome = mock
            .exec_run("c1", ExecConfig::default(), &mut out, &mut err)
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, 7);
    }

    #[tokio::test]
    async fn inspect_hook_controls_liveness() {
        let mock = MockAdapter::new();
        mock.on_inspect(|_id| Ok(false));
        assert!(!mock.containers_inspect("c1").await.unwrap());
        assert_eq!(mock.call_count("containers_inspect"), 1);
    }
}
