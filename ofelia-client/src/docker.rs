use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, EventsOptions, InspectContainerOptions,
    KillContainerOptions, ListContainersOptions, ListImagesOptions, RemoveContainerOptions,
    RemoveImageOptions, StartContainerOptions, StopContainerOptions, TagImageOptions,
};
use bollard::Docker;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::io::Write;

use crate::adapter::ContainerAdapter;
use crate::error::{Error, Result};
use crate::types::*;

/// The real adapter, backed by a live connection to the Docker Engine API.
///
/// The engine connection is shared for the whole process (§3 Ownership
/// summary: "the scheduler holds a shared reference to it via an
/// interface"); `bollard::Docker` is itself cheap to clone and safe for
/// concurrent use, so this wrapper holds it by value.
#[derive(Clone)]
pub struct DockerAdapter {
    docker: Docker,
}

impl DockerAdapter {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    pub fn connect_with_local_defaults() -> Result<Self> {
        Docker::connect_with_local_defaults()
            .map(Self::new)
            .map_err(Error::from_bollard)
    }
}

fn map_err(e: bollard::errors::Error) -> Error {
    Error::from_bollard(e)
}

#[async_trait]
impl ContainerAdapter for DockerAdapter {
    async fn containers_create(&self, spec: &ContainerSpec) -> Result<String> {
        let options = CreateContainerOptions::default();
        let config = bollard::container::Config {
            image: Some(spec.image.clone()),
            cmd: spec.command.clone(),
            env: if spec.env.is_empty() {
                None
            } else {
                Some(spec.env.clone())
            },
            labels: if spec.labels.is_empty() {
                None
            } else {
                Some(spec.labels.clone())
            },
            ..Default::default()
        };
        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(map_err)?;
        Ok(created.id)
    }

    async fn containers_start(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions>)
            .await
            .map_err(map_err)
    }

    async fn containers_stop(
        &self,
        id: &str,
        timeout: Option<std::time::Duration>,
    ) -> Result<()> {
        let options = timeout.map(|t| StopContainerOptions {
            t: Some(t.as_secs() as i32),
            ..Default::default()
        });
        self.docker
            .stop_container(id, options)
            .await
            .map_err(map_err)
    }

    async fn containers_remove(&self, id: &str, opts: RemoveOptions) -> Result<()> {
        let options = RemoveContainerOptions {
            force: opts.force,
            v: opts.remove_volumes,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(map_err)
    }

    async fn containers_inspect(&self, id: &str) -> Result<bool> {
        let details = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(map_err)?;
        Ok(details
            .state
            .as_ref()
            .and_then(|s| s.running)
            .unwrap_or(false))
    }

    async fn containers_list(&self) -> Result<Vec<String>> {
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions {
                all: true,
                ..Default::default()
            }))
            .await
            .map_err(map_err)?;
        Ok(containers.into_iter().filter_map(|c| c.id).collect())
    }

    async fn containers_wait(&self, id: &str) -> Result<WaitOutcome> {
        let mut stream = self.docker.wait_container(id, None::<bollard::query_parameters::WaitContainerOptions>);
        match stream.next().await {
            Some(Ok(response)) => Ok(WaitOutcome {
                status_code: response.status_code,
                error: response.error.and_then(|e| e.message),
            }),
            Some(Err(e)) => Err(map_err(e)),
            None => Err(Error::Transient("wait stream closed with no result".into())),
        }
    }

    async fn containers_logs(
        &self,
        id: &str,
        opts: LogOptions,
    ) -> Result<BoxStream<'static, Result<LogLine>>> {
        let options = bollard::query_parameters::LogsOptions {
            follow: opts.follow,
            stdout: opts.stdout,
            stderr: opts.stderr,
            tail: opts.tail.unwrap_or_else(|| "all".to_string()),
            ..Default::default()
        };
        let stream = self
            .docker
            .logs(id, Some(options))
            .map(|item| item.map(log_output_to_line).map_err(map_err));
        Ok(Box::pin(stream))
    }

    async fn containers_kill(&self, id: &str, signal: &str) -> Result<()> {
        self.docker
            .kill_container(
                id,
                Some(KillContainerOptions {
                    signal: signal.to_string(),
                }),
            )
            .await
            .map_err(map_err)
    }

    async fn containers_pause(&self, id: &str) -> Result<()> {
        self.docker.pause_container(id).await.map_err(map_err)
    }

    async fn containers_unpause(&self, id: &str) -> Result<()> {
        self.docker.unpause_container(id).await.map_err(map_err)
    }

    async fn containers_rename(&self, id: &str, new_name: &str) -> Result<()> {
        self.docker
            .rename_container(
                id,
                bollard::query_parameters::RenameContainerOptions {
                    name: new_name.to_string(),
                },
            )
            .await
            .map_err(map_err)
    }

    async fn exec_create(&self, container_id: &str, config: ExecConfig) -> Result<String> {
        let created = self
            .docker
            .create_exec(
                container_id,
                CreateExecOptions {
                    cmd: Some(config.command),
                    env: Some(config.env),
                    attach_stdout: Some(config.attach_stdout),
                    attach_stderr: Some(config.attach_stderr),
                    ..Default::default()
                },
            )
            .await
            .map_err(map_err)?;
        Ok(created.id)
    }

    async fn exec_start(&self, exec_id: &str) -> Result<BoxStream<'static, Result<LogLine>>> {
        match self.docker.start_exec(exec_id, None).await.map_err(map_err)? {
            StartExecResults::Attached { output, .. } => {
                let stream = output.map(|item| item.map(log_output_to_line).map_err(map_err));
                Ok(Box::pin(stream))
            }
            StartExecResults::Detached => Ok(Box::pin(futures::stream::empty())),
        }
    }

    async fn exec_inspect(&self, exec_id: &str) -> Result<ExecState> {
        let inspect = self.docker.inspect_exec(exec_id).await.map_err(map_err)?;
        Ok(ExecState {
            running: inspect.running.unwrap_or(false),
            exit_code: inspect.exit_code,
        })
    }

    async fn exec_run(
        &self,
        container_id: &str,
        config: ExecConfig,
        stdout: &mut (dyn Write + Send),
        stderr: &mut (dyn Write + Send),
    ) -> Result<ExecOutcome> {
        let exec_id = self.exec_create(container_id, config).await?;
        let mut stream = self.exec_start(&exec_id).await?;
        while let Some(line) = stream.next().await {
            match line? {
                LogLine::Stdout(bytes) => {
                    let _ = stdout.write_all(&bytes);
                }
                LogLine::Stderr(bytes) => {
                    let _ = stderr.write_all(&bytes);
                }
            }
        }
        let state = self.exec_inspect(&exec_id).await?;
        Ok(ExecOutcome {
            exit_code: state.exit_code.unwrap_or(-1),
        })
    }

    async fn images_pull(
        &self,
        opts: PullOptions,
    ) -> Result<BoxStream<'static, Result<PullProgress>>> {
        let options = CreateImageOptions {
            from_image: Some(opts.image),
            tag: opts.tag,
            ..Default::default()
        };
        let stream = self.docker.create_image(Some(options), None, None).map(|item| {
            item.map(|info| PullProgress {
                status: info.status.unwrap_or_default(),
                progress_detail: info.progress,
            })
            .map_err(map_err)
        });
        Ok(Box::pin(stream))
    }

    async fn images_pull_and_wait(&self, opts: PullOptions) -> Result<()> {
        let mut stream = self.images_pull(opts).await?;
        while let Some(item) = stream.next().await {
            item?;
        }
        Ok(())
    }

    async fn images_list(&self) -> Result<Vec<String>> {
        let images = self
            .docker
            .list_images(Some(ListImagesOptions {
                all: true,
                ..Default::default()
            }))
            .await
            .map_err(map_err)?;
        Ok(images.into_iter().map(|i| i.id).collect())
    }

    async fn images_inspect(&self, reference: &str) -> Result<bool> {
        self.docker
            .inspect_image(reference)
            .await
            .map(|_| true)
            .map_err(map_err)
    }

    async fn images_remove(
        &self,
        reference: &str,
        force: bool,
        prune_children: bool,
    ) -> Result<()> {
        self.docker
            .remove_image(
                reference,
                Some(RemoveImageOptions {
                    force,
                    noprune: !prune_children,
                }),
                None,
            )
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn images_tag(&self, reference: &str, tag: &str) -> Result<()> {
        self.docker
            .tag_image(
                reference,
                Some(TagImageOptions {
                    repo: tag.to_string(),
                    ..Default::default()
                }),
            )
            .await
            .map_err(map_err)
    }

    async fn images_exists(&self, reference: &str) -> Result<bool> {
        match self.docker.inspect_image(reference).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError { status_code, .. })
                if status_code == 404 =>
            {
                Ok(false)
            }
            Err(e) => Err(map_err(e)),
        }
    }

    async fn events_subscribe(
        &self,
        filter: EventFilter,
    ) -> Result<BoxStream<'static, Result<ContainerEvent>>> {
        let mut filters: HashMap<String, Vec<String>> = HashMap::new();
        filters.insert("type".to_string(), vec!["container".to_string()]);
        if !filter.container_ids.is_empty() {
            filters.insert("container".to_string(), filter.container_ids);
        }
        let stream = self
            .docker
            .events(Some(EventsOptions {
                filters: Some(filters),
                ..Default::default()
            }))
            .map(|item| item.map(message_to_event).map_err(map_err));
        Ok(Box::pin(stream))
    }

    async fn services_create(&self, spec: ServiceSpec) -> Result<String> {
        let service_spec = bollard::service::ServiceSpec {
            name: Some(spec.name),
            task_template: Some(bollard::service::TaskSpec {
                container_spec: Some(bollard::service::ContainerSpec {
                    image: Some(spec.image),
                    command: spec.command,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let created = self
            .docker
            .create_service(service_spec, None)
            .await
            .map_err(map_err)?;
        Ok(created.id.unwrap_or_default())
    }

    async fn services_inspect(&self, id: &str) -> Result<bool> {
        self.docker
            .inspect_service(id, None)
            .await
            .map(|_| true)
            .map_err(map_err)
    }

    async fn services_list(&self) -> Result<Vec<String>> {
        let services = self.docker.list_services(None).await.map_err(map_err)?;
        Ok(services.into_iter().filter_map(|s| s.id).collect())
    }

    async fn services_remove(&self, id: &str) -> Result<()> {
        self.docker.delete_service(id).await.map_err(map_err)
    }

    async fn services_list_tasks(&self, service_id: &str) -> Result<Vec<String>> {
        let mut filters = HashMap::new();
        filters.insert("service".to_string(), vec![service_id.to_string()]);
        let tasks = self
            .docker
            .list_tasks(Some(bollard::query_parameters::ListTasksOptions {
                filters: Some(filters),
            }))
            .await
            .map_err(map_err)?;
        Ok(tasks.into_iter().filter_map(|t| t.id).collect())
    }

    async fn services_wait_for_task(&self, task_id: &str, opts: TaskWaitOptions) -> Result<()> {
        tokio::time::timeout(opts.timeout, async {
            loop {
                let task = self.docker.inspect_task(task_id).await.map_err(map_err)?;
                let state = task
                    .status
                    .as_ref()
                    .and_then(|s| s.state.as_ref())
                    .map(|s| format!("{s:?}"));
                if matches!(state.as_deref(), Some("Complete") | Some("Failed") | Some("Shutdown")) {
                    return Ok(());
                }
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            }
        })
        .await
        .map_err(|_| Error::Timeout)?
    }

    async fn services_wait_for_service_tasks(
        &self,
        service_id: &str,
        opts: TaskWaitOptions,
    ) -> Result<()> {
        let tasks = self.services_list_tasks(service_id).await?;
        for task_id in tasks {
            self.services_wait_for_task(&task_id, opts).await?;
        }
        Ok(())
    }

    async fn networks_connect(&self, network: &str, container_id: &str) -> Result<()> {
        self.docker
            .connect_network(
                network,
                bollard::network::ConnectNetworkOptions {
                    container: container_id.to_string(),
                    ..Default::default()
                },
            )
            .await
            .map_err(map_err)
    }

    async fn networks_disconnect(
        &self,
        network: &str,
        container_id: &str,
        force: bool,
    ) -> Result<()> {
        self.docker
            .disconnect_network(
                network,
                bollard::network::DisconnectNetworkOptions {
                    container: container_id.to_string(),
                    force,
                },
            )
            .await
            .map_err(map_err)
    }

    async fn networks_list(&self) -> Result<Vec<String>> {
        let networks = self.docker.list_networks(None::<bollard::query_parameters::ListNetworksOptions>).await.map_err(map_err)?;
        Ok(networks.into_iter().filter_map(|n| n.id).collect())
    }

    async fn networks_inspect(&self, network: &str) -> Result<bool> {
        self.docker
            .inspect_network(network, None::<bollard::query_parameters::InspectNetworkOptions>)
            .await
            .map(|_| true)
            .map_err(map_err)
    }

    async fn networks_create(&self, name: &str) -> Result<String> {
        let created = self
            .docker
            .create_network(bollard::network::CreateNetworkOptions {
                name: name.to_string(),
                ..Default::default()
            })
            .await
            .map_err(map_err)?;
        Ok(created.id.unwrap_or_default())
    }

    async fn networks_remove(&self, network: &str) -> Result<()> {
        self.docker.remove_network(network).await.map_err(map_err)
    }

    async fn system_info(&self) -> Result<SystemInfo> {
        let info = self.docker.info().await.map_err(map_err)?;
        let mut fields = HashMap::new();
        if let Some(v) = info.containers {
            fields.insert("containers".to_string(), v.to_string());
        }
        if let Some(v) = info.images {
            fields.insert("images".to_string(), v.to_string());
        }
        Ok(SystemInfo { fields })
    }

    async fn system_ping(&self) -> Result<()> {
        self.docker.ping().await.map_err(map_err)?;
        Ok(())
    }

    async fn system_version(&self) -> Result<String> {
        let version = self.docker.version().await.map_err(map_err)?;
        Ok(version.version.unwrap_or_default())
    }

    async fn system_disk_usage(&self) -> Result<SystemInfo> {
        let df = self.docker.df().await.map_err(map_err)?;
        let mut fields = HashMap::new();
        fields.insert(
            "layers_size".to_string(),
            df.layers_size.unwrap_or_default().to_string(),
        );
        Ok(SystemInfo { fields })
    }
}

fn log_output_to_line(output: LogOutput) -> LogLine {
    match output {
        LogOutput::StdOut { message } => LogLine::Stdout(message.to_vec()),
        LogOutput::StdErr { message } => LogLine::Stderr(message.to_vec()),
        LogOutput::StdIn { message } => LogLine::Stdout(message.to_vec()),
        LogOutput::Console { message } => LogLine::Stdout(message.to_vec()),
    }
}

fn message_to_event(message: bollard::models::EventMessage) -> ContainerEvent {
    let action = message.action.unwrap_or_default();
    let kind = match action.as_str() {
        "die" => EventKind::Die,
        "stop" => EventKind::Stop,
        "start" => EventKind::Start,
        _ => EventKind::Other,
    };
    let exit_code = message
        .actor
        .and_then(|actor| actor.attributes)
        .and_then(|attrs| attrs.get("exitCode").cloned())
        .and_then(|s| s.parse::<i64>().ok());
    ContainerEvent {
        container_id: message.id.unwrap_or_default(),
        kind,
        exit_code,
    }
}
