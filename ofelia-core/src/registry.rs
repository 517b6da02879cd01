use std::collections::HashMap;

use thiserror::Error;

use crate::job::Job;

/// Errors raised purely by registry bookkeeping — name collisions and
/// dependency-graph problems. Distinct from [`crate::Error`] because these
/// are specifically about the three-map invariant (§3), not schedule
/// grammar or command parsing.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("job {0:?} is already active")]
    AlreadyActive(String),
    #[error("job {0:?} is not active")]
    NotActive(String),
    #[error("job {0:?} is not disabled")]
    NotDisabled(String),
    #[error("job {0:?} not found in any registry")]
    NotFound(String),
    #[error("dependency cycle detected involving job {0:?}")]
    DependencyCycle(String),
}

type RResult<T> = std::result::Result<T, RegistryError>;

/// The three disjoint, name-keyed mappings from §3 Data Model.
///
/// A bare data structure with no async and no time wheel — `ofelia-runtime`
/// wraps this with the cron time wheel, dispatcher, and concurrency gate.
/// Every mutating method is `&mut self`; callers serialize access with a
/// single mutex exactly as §5 requires ("all mutations ... serialized by a
/// single mutex").
#[derive(Debug, Default)]
pub struct Registry {
    active: HashMap<String, Job>,
    disabled: HashMap<String, Job>,
    removed: HashMap<String, Job>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_known(&self, name: &str) -> bool {
        self.active.contains_key(name)
            || self.disabled.contains_key(name)
            || self.removed.contains_key(name)
    }

    /// Admits `job` into `active`. Rejects a name collision across any of
    /// the three maps (idempotent re-registration is the caller's
    /// responsibility, per §4.4) and rejects dependency cycles by walking
    /// the graph formed by `active ∪ disabled ∪ {job}`.
    pub fn add(&mut self, job: Job) -> RResult<()> {
        if self.is_known(job.name()) {
            return Err(RegistryError::AlreadyActive(job.name().to_string()));
        }
        self.check_no_cycle(&job)?;
        self.active.insert(job.name().to_string(), job);
        Ok(())
    }

    fn check_no_cycle(&self, candidate: &Job) -> RResult<()> {
        // Missing predecessors are allowed to remain unresolved (§4.5,
        // "flagged on walk but remain resolvable until dispatch") — only an
        // actual cycle is rejected here.
        let mut visiting: Vec<String> = vec![candidate.name().to_string()];
        let mut stack = vec![candidate.name().to_string()];
        while let Some(name) = stack.pop() {
            let deps: Vec<String> = if name == candidate.name() {
                candidate.dependencies().to_vec()
            } else if let Some(job) = self.active.get(&name).or_else(|| self.disabled.get(&name))
            {
                job.dependencies().to_vec()
            } else {
                continue;
            };
            for dep in deps {
                if dep == candidate.name() {
                    return Err(RegistryError::DependencyCycle(candidate.name().to_string()));
                }
                if !visiting.contains(&dep) {
                    visiting.push(dep.clone());
                    stack.push(dep);
                }
            }
        }
        Ok(())
    }

    pub fn disable(&mut self, name: &str) -> RResult<()> {
        let job = self
            .active
            .remove(name)
            .ok_or_else(|| RegistryError::NotActive(name.to_string()))?;
        self.disabled.insert(name.to_string(), job);
        Ok(())
    }

    pub fn enable(&mut self, name: &str) -> RResult<()> {
        let job = self
            .disabled
            .remove(name)
            .ok_or_else(|| RegistryError::NotDisabled(name.to_string()))?;
        self.active.insert(name.to_string(), job);
        Ok(())
    }

    /// Moves the job to `removed`. `removed` is append-only within a
    /// scheduler lifetime (§3) — this method never removes from `removed`.
    pub fn remove(&mut self, name: &str) -> RResult<()> {
        let job = self
            .active
            .remove(name)
            .or_else(|| self.disabled.remove(name))
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        self.removed.insert(name.to_string(), job);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Job> {
        self.active.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Job> {
        self.active.get_mut(name)
    }

    pub fn get_disabled(&self, name: &str) -> Option<&Job> {
        self.disabled.get(name)
    }

    pub fn removed_jobs(&self) -> impl Iterator<Item = &Job> {
        self.removed.values()
    }

    pub fn active_jobs(&self) -> impl Iterator<Item = &Job> {
        self.active.values()
    }

    pub fn active_names(&self) -> impl Iterator<Item = &str> {
        self.active.keys().map(String::as_str)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobKind;

    fn job(name: &str, deps: Vec<&str>) -> Job {
        Job::new(
            name,
            "@manual".parse().unwrap(),
            JobKind::LocalProcess {
                command: "true".into(),
            },
        )
        .with_dependencies(deps.into_iter().map(String::from).collect())
    }

    #[test]
    fn disjointness_holds_across_transitions() {
        let mut r = Registry::new();
        r.add(job("a", vec![])).unwrap();
        assert!(r.is_active("a"));
        r.disable("a").unwrap();
        assert!(!r.is_active("a"));
        assert!(r.get_disabled("a").is_some());
        r.enable("a").unwrap();
        assert!(r.is_active("a"));
        r.remove("a").unwrap();
        assert!(!r.is_active("a"));
        assert!(r.get_disabled("a").is_none());
        assert_eq!(r.removed_jobs().count(), 1);
    }

    #[test]
    fn add_remove_round_trip_preserves_history_in_removed() {
        let mut r = Registry::new();
        r.add(job("a", vec![])).unwrap();
        r.remove("a").unwrap();
        assert!(r.get("a").is_none());
        assert!(r.removed_jobs().any(|j| j.name() == "a"));
    }

    #[test]
    fn direct_cycle_rejected() {
        let mut r = Registry::new();
        r.add(job("a", vec!["b"])).unwrap();
        let err = r.add(job("b", vec!["a"])).unwrap_err();
        assert!(matches!(err, RegistryError::DependencyCycle(_)));
    }

    #[test]
    fn forward_declared_missing_dependency_is_allowed() {
        let mut r = Registry::new();
        // "b" depends on "a" which doesn't exist yet — allowed per §4.5.
        r.add(job("b", vec!["a"])).unwrap();
        assert!(r.is_active("b"));
    }

    #[test]
    fn duplicate_name_across_registries_rejected() {
        let mut r = Registry::new();
        r.add(job("a", vec![])).unwrap();
        r.remove("a").unwrap();
        let err = r.add(job("a", vec![])).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyActive(_)));
    }
}
