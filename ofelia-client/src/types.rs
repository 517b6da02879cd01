use std::collections::HashMap;
use std::time::Duration;

/// Options accepted by `Containers::remove` (§4.1).
#[derive(Debug, Clone, Default)]
pub struct RemoveOptions {
    pub force: bool,
    pub remove_volumes: bool,
}

/// A minimal container creation spec — enough for the `RunContainer` job
/// variant, not a full port of every Docker option.
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    pub image: String,
    pub command: Option<Vec<String>>,
    pub env: Vec<String>,
    pub labels: HashMap<String, String>,
}

/// A single line of exec/container log output, tagged by stream.
#[derive(Debug, Clone)]
pub enum LogLine {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
}

/// Options controlling `Logs`/`CopyLogs`.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub follow: bool,
    pub stdout: bool,
    pub stderr: bool,
    pub tail: Option<String>,
}

/// Config for `Exec::Create`.
#[derive(Debug, Clone, Default)]
pub struct ExecConfig {
    pub command: Vec<String>,
    pub env: Vec<String>,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
}

/// Result of `Exec::Inspect`.
#[derive(Debug, Clone, Copy)]
pub struct ExecState {
    pub running: bool,
    pub exit_code: Option<i64>,
}

/// Result of the convenience `Exec::run` (create+start+inspect).
#[derive(Debug, Clone, Copy)]
pub struct ExecOutcome {
    pub exit_code: i64,
}

/// Result of `Containers::wait` (§4.1): a terminal status paired with the
/// error channel the engine reported alongside it, if any.
#[derive(Debug, Clone)]
pub struct WaitOutcome {
    pub status_code: i64,
    pub error: Option<String>,
}

/// Options for `Images::pull`.
#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    pub image: String,
    pub tag: Option<String>,
}

/// One message from an image pull's progress stream.
#[derive(Debug, Clone)]
pub struct PullProgress {
    pub status: String,
    pub progress_detail: Option<String>,
}

/// Filter applied to `Events::subscribe`.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub container_ids: Vec<String>,
    pub kinds: Vec<EventKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Die,
    Stop,
    Start,
    Other,
}

/// A single container lifecycle event, trimmed to what the Container
/// Monitor (§4.6) actually needs.
#[derive(Debug, Clone)]
pub struct ContainerEvent {
    pub container_id: String,
    pub kind: EventKind,
    pub exit_code: Option<i64>,
}

/// Spec for a one-off Swarm service (§4.1 Services).
#[derive(Debug, Clone, Default)]
pub struct ServiceSpec {
    pub name: String,
    pub image: String,
    pub command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy)]
pub struct TaskWaitOptions {
    pub timeout: Duration,
}

/// Result of `System::info`/`version`/`disk_usage` — kept as opaque
/// key-value bags rather than a full port of the engine's schemas, since
/// the core scheduler only ever logs or exposes these, never branches on
/// their fields.
#[derive(Debug, Clone, Default)]
pub struct SystemInfo {
    pub fields: HashMap<String, String>,
}
