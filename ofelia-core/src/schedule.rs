use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule as CronSchedule;

use crate::error::{Error, Result};

/// A job's firing rule.
///
/// Accepts a classic cron expression (5-field, or 6-field with a leading
/// seconds column), the `@every <duration>` form, the `@daily`/`@hourly`/
/// `@weekly`/`@monthly` descriptors, and the three virtual tokens that never
/// produce a fire.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Backed by the `cron` time wheel.
    Cron(Box<CronSchedule>),
    /// Fixed-interval ticking, independent of wall-clock alignment.
    Every(Duration),
    /// Registered but only ever fired by an explicit `RunJob` call.
    Triggered,
    /// Registered but only ever fired by an explicit `RunJob` call. Synonym
    /// of `Triggered` kept distinct because the source vocabularies differ.
    Manual,
    /// Registered but never fires, by any means, until the schedule is
    /// changed.
    None,
}

const EVERY_PREFIX: &str = "@every ";

impl Schedule {
    /// Whether the time wheel should carry an entry for this schedule at
    /// all. `@none` jobs are admitted into the registry but never wheeled.
    pub fn is_wheeled(&self) -> bool {
        !matches!(self, Schedule::Triggered | Schedule::Manual | Schedule::None)
    }

    /// The next fire instant strictly after `from`, or `None` for
    /// non-wheeled schedules.
    pub fn next_after(&self, from: chrono::DateTime<Utc>) -> Option<chrono::DateTime<Utc>> {
        match self {
            Schedule::Cron(s) => s.after(&from).next(),
            Schedule::Every(d) => Some(from + chrono::Duration::from_std(*d).ok()?),
            Schedule::Triggered | Schedule::Manual | Schedule::None => None,
        }
    }

    /// Used by the workflow orchestrator's GCD window computation (§4.5):
    /// the nominal period of a wheeled schedule, or `None` for schedules
    /// whose period isn't a fixed duration (general cron expressions).
    pub fn fixed_period(&self) -> Option<Duration> {
        match self {
            Schedule::Every(d) => Some(*d),
            _ => None,
        }
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Cron(s) => write!(f, "{s}"),
            Schedule::Every(d) => write!(f, "{EVERY_PREFIX}{}", humantime::format_duration(*d)),
            Schedule::Triggered => write!(f, "@triggered"),
            Schedule::Manual => write!(f, "@manual"),
            Schedule::None => write!(f, "@none"),
        }
    }
}

impl FromStr for Schedule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::EmptySchedule);
        }

        match trimmed {
            "@triggered" => return Ok(Schedule::Triggered),
            "@manual" => return Ok(Schedule::Manual),
            "@none" => return Ok(Schedule::None),
            "@hourly" => return parse_cron_fields(trimmed, "0 0 * * * *"),
            "@daily" => return parse_cron_fields(trimmed, "0 0 0 * * *"),
            "@weekly" => return parse_cron_fields(trimmed, "0 0 0 * * SUN"),
            "@monthly" => return parse_cron_fields(trimmed, "0 0 0 1 * *"),
            _ => {}
        }

        if let Some(rest) = trimmed.strip_prefix(EVERY_PREFIX) {
            let dur = humantime::parse_duration(rest)
                .map_err(|e| Error::InvalidSchedule(s.to_string(), e.to_string()))?;
            if dur.is_zero() {
                return Err(Error::InvalidSchedule(
                    s.to_string(),
                    "@every duration must be non-zero".to_string(),
                ));
            }
            return Ok(Schedule::Every(dur));
        }

        let field_count = trimmed.split_whitespace().count();
        if !(5..=6).contains(&field_count) {
            return Err(Error::InvalidSchedule(
                s.to_string(),
                format!("expected 5 or 6 whitespace-separated fields, found {field_count}"),
            ));
        }

        // The `cron` crate requires a leading seconds field; splice one in
        // for the classic 5-field form.
        let with_seconds = if field_count == 5 {
            format!("0 {trimmed}")
        } else {
            trimmed.to_string()
        };
        parse_cron_fields(s, &with_seconds)
    }
}

fn parse_cron_fields(original: &str, expr: &str) -> Result<Schedule> {
    let parsed = CronSchedule::from_str(expr)
        .map_err(|e| Error::InvalidSchedule(original.to_string(), e.to_string()))?;
    Ok(Schedule::Cron(Box::new(parsed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_tokens_parse_and_are_not_wheeled() {
        assert!(!"@triggered".parse::<Schedule>().unwrap().is_wheeled());
        assert!(!"@manual".parse::<Schedule>().unwrap().is_wheeled());
        assert!(!"@none".parse::<Schedule>().unwrap().is_wheeled());
    }

    #[test]
    fn empty_schedule_rejected() {
        assert!(matches!("".parse::<Schedule>(), Err(Error::EmptySchedule)));
        assert!(matches!(
            "   ".parse::<Schedule>(),
            Err(Error::EmptySchedule)
        ));
    }

    #[test]
    fn every_zero_rejected_nonzero_accepted() {
        assert!("@every 0s".parse::<Schedule>().is_err());
        assert!("@every 1s".parse::<Schedule>().is_ok());
    }

    #[test]
    fn field_count_boundaries() {
        assert!("* * * *".parse::<Schedule>().is_err()); // 4 fields
        assert!("* * * * *".parse::<Schedule>().is_ok()); // 5
        assert!("* * * * * *".parse::<Schedule>().is_ok()); // 6
        assert!("* * * * * * *".parse::<Schedule>().is_err()); // 7
    }

    #[test]
    fn descriptors_parse() {
        for d in ["@hourly", "@daily", "@weekly", "@monthly"] {
            assert!(d.parse::<Schedule>().is_ok(), "{d} should parse");
        }
    }

    #[test]
    fn every_formats_back_with_prefix() {
        let s = Schedule::Every(Duration::from_secs(90));
        assert_eq!(s.to_string(), "@every 1m 30s");
    }
}
