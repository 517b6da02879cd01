use super::registry::MetricsSink;

// Metric names, kept as constants so the scheduler, monitor, and
// observability hooks agree on them without string duplication.
pub const JOBS_TOTAL: &str = "ofelia_jobs_total";
pub const JOBS_FAILED_TOTAL: &str = "ofelia_jobs_failed_total";
pub const JOBS_RUNNING: &str = "ofelia_jobs_running";
pub const JOB_DURATION_SECONDS: &str = "ofelia_job_duration_seconds";
pub const UP: &str = "ofelia_up";
pub const RESTARTS_TOTAL: &str = "ofelia_restarts_total";

pub const HTTP_REQUESTS_TOTAL: &str = "ofelia_http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "ofelia_http_request_duration_seconds";

pub const MONITOR_EVENTS_TOTAL: &str = "ofelia_container_monitor_events_total";
pub const MONITOR_FALLBACKS_TOTAL: &str = "ofelia_container_monitor_fallbacks_total";
pub const MONITOR_METHOD: &str = "ofelia_container_monitor_method";
pub const MONITOR_WAIT_DURATION_SECONDS: &str = "ofelia_container_monitor_wait_duration_seconds";

pub const RETRY_ATTEMPTED_TOTAL: &str = "ofelia_retry_attempted_total";
pub const RETRY_SUCCESS_TOTAL: &str = "ofelia_retry_success_total";
pub const RETRY_FAILED_TOTAL: &str = "ofelia_retry_failed_total";
pub const RETRY_DELAY_SECONDS: &str = "ofelia_retry_delay_seconds";

pub const CRON_STARTED_TOTAL: &str = "ofelia_cron_started_total";
pub const CRON_COMPLETED_TOTAL: &str = "ofelia_cron_completed_total";
pub const CRON_PANICKED_TOTAL: &str = "ofelia_cron_panicked_total";
pub const CRON_SCHEDULED_TOTAL: &str = "ofelia_cron_scheduled_total";

const DURATION_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

/// Registers the default metric set from §4.3 at scheduler startup.
pub fn register_defaults(sink: &MetricsSink) {
    sink.register_counter(JOBS_TOTAL, "total job executions dispatched");
    sink.register_counter(JOBS_FAILED_TOTAL, "total failed job executions");
    sink.register_gauge(JOBS_RUNNING, "job executions currently running");
    sink.register_histogram(
        JOB_DURATION_SECONDS,
        "job execution duration in seconds",
        DURATION_BUCKETS.to_vec(),
    );
    sink.register_gauge(UP, "1 if the scheduler is running");
    sink.register_counter(RESTARTS_TOTAL, "total scheduler restarts");

    sink.register_counter(HTTP_REQUESTS_TOTAL, "total HTTP requests served");
    sink.register_histogram(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds",
        DURATION_BUCKETS.to_vec(),
    );

    sink.register_counter(MONITOR_EVENTS_TOTAL, "container monitor events observed");
    sink.register_counter(
        MONITOR_FALLBACKS_TOTAL,
        "container monitor polling fallbacks engaged",
    );
    sink.register_gauge(
        MONITOR_METHOD,
        "1 if using the event stream, 0 if polling",
    );
    sink.register_histogram(
        MONITOR_WAIT_DURATION_SECONDS,
        "container monitor wait duration in seconds",
        DURATION_BUCKETS.to_vec(),
    );

    sink.register_counter(RETRY_ATTEMPTED_TOTAL, "total retry attempts made");
    sink.register_counter(RETRY_SUCCESS_TOTAL, "total retry attempts that succeeded");
    sink.register_counter(RETRY_FAILED_TOTAL, "total retry budgets exhausted");
    sink.register_histogram(
        RETRY_DELAY_SECONDS,
        "retry delay in seconds",
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0],
    );

    sink.register_counter(CRON_STARTED_TOTAL, "cron hooks started");
    sink.register_counter(CRON_COMPLETED_TOTAL, "cron hooks completed");
    sink.register_counter(CRON_PANICKED_TOTAL, "cron hooks that panicked");
    sink.register_counter(CRON_SCHEDULED_TOTAL, "cron hooks scheduled");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_is_queryable_immediately_after_registration() {
        let sink = MetricsSink::new();
        register_defaults(&sink);
        assert_eq!(sink.counter_value(JOBS_TOTAL), Some(0.0));
        assert_eq!(sink.gauge_value(UP), Some(0.0));
        assert_eq!(sink.histogram_count(JOB_DURATION_SECONDS), Some(0));
    }
}
