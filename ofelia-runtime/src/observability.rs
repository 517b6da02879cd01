use std::sync::Arc;
use std::time::Duration;

use crate::metrics::{defaults, MetricsSink};

/// Bridges `{jobStart, jobComplete, jobScheduled}` from the scheduler into
/// the [`MetricsSink`] (§4.7). Safe to construct with no sink — `hooks_for`
/// accepts `Option<Arc<MetricsSink>>` upstream and every method here is a
/// cheap no-op dispatch when wrapped that way, matching "safe to call with
/// a nil sink (no-op)".
#[derive(Clone)]
pub struct ObservabilityHooks {
    sink: Option<Arc<MetricsSink>>,
}

impl ObservabilityHooks {
    pub fn new(sink: Option<Arc<MetricsSink>>) -> Self {
        Self { sink }
    }

    pub fn noop() -> Self {
        Self { sink: None }
    }

    pub fn job_scheduled(&self) {
        if let Some(sink) = &self.sink {
            sink.increment(defaults::CRON_SCHEDULED_TOTAL, 1.0);
        }
    }

    pub fn job_start(&self) {
        if let Some(sink) = &self.sink {
            sink.increment(defaults::CRON_STARTED_TOTAL, 1.0);
            sink.increment(defaults::JOBS_TOTAL, 1.0);
            // ±1 running-jobs gauge (§4.7): bump on start, drop on complete.
            let running = sink.gauge_value(defaults::JOBS_RUNNING).unwrap_or(0.0);
            sink.set(defaults::JOBS_RUNNING, running + 1.0);
        }
    }

    pub fn job_complete(&self, duration: Duration, failed: bool, panicked: bool) {
        if let Some(sink) = &self.sink {
            sink.increment(defaults::CRON_COMPLETED_TOTAL, 1.0);
            if panicked {
                sink.increment(defaults::CRON_PANICKED_TOTAL, 1.0);
            }
            if failed {
                sink.increment(defaults::JOBS_FAILED_TOTAL, 1.0);
            }
            sink.observe(defaults::JOB_DURATION_SECONDS, duration.as_secs_f64());
            let running = sink.gauge_value(defaults::JOBS_RUNNING).unwrap_or(1.0);
            sink.set(defaults::JOBS_RUNNING, (running - 1.0).max(0.0));
        }
    }

    pub fn retry_attempted(&self, delay: Duration) {
        if let Some(sink) = &self.sink {
            sink.increment(defaults::RETRY_ATTEMPTED_TOTAL, 1.0);
            sink.observe(defaults::RETRY_DELAY_SECONDS, delay.as_secs_f64());
        }
    }

    pub fn retry_outcome(&self, succeeded: bool) {
        if let Some(sink) = &self.sink {
            if succeeded {
                sink.increment(defaults::RETRY_SUCCESS_TOTAL, 1.0);
            } else {
                sink.increment(defaults::RETRY_FAILED_TOTAL, 1.0);
            }
        }
    }

    pub fn monitor_event_observed(&self) {
        if let Some(sink) = &self.sink {
            sink.increment(defaults::MONITOR_EVENTS_TOTAL, 1.0);
        }
    }

    pub fn monitor_fallback_engaged(&self) {
        if let Some(sink) = &self.sink {
            sink.increment(defaults::MONITOR_FALLBACKS_TOTAL, 1.0);
            sink.set(defaults::MONITOR_METHOD, 0.0);
        }
    }

    pub fn monitor_using_events(&self) {
        if let Some(sink) = &self.sink {
            sink.set(defaults::MONITOR_METHOD, 1.0);
        }
    }

    pub fn monitor_wait_duration(&self, duration: Duration) {
        if let Some(sink) = &self.sink {
            sink.observe(defaults::MONITOR_WAIT_DURATION_SECONDS, duration.as_secs_f64());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_hooks_never_panic() {
        let hooks = ObservabilityHooks::noop();
        hooks.job_scheduled();
        hooks.job_start();
        hooks.job_complete(Duration::from_secs(1), true, false);
    }

    #[test]
    fn job_lifecycle_updates_running_gauge() {
        let sink = Arc::new(MetricsSink::new());
        defaults::register_defaults(&sink);
        let hooks = ObservabilityHooks::new(Some(sink.clone()));
        hooks.job_start();
        assert_eq!(sink.gauge_value(defaults::JOBS_RUNNING), Some(1.0));
        hooks.job_complete(Duration::from_millis(50), false, false);
        assert_eq!(sink.gauge_value(defaults::JOBS_RUNNING), Some(0.0));
        assert_eq!(sink.histogram_count(defaults::JOB_DURATION_SECONDS), Some(1));
    }
}
