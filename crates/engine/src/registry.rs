//! Reference registry: the two single-writer/many-reader maps that let a
//! later task find the object type or instance a prior task produced.
//!
//! Grounded on `Eng.objTypeMap`/`objInfoMap` (`pkg/engine/engine.go`) and on
//! the teacher's preference for a plain `std::sync::Mutex` over an actor
//! channel for small shared maps (see `controller::tasks::types::Context`,
//! which threads a `Client` the same way).

use crate::error::{Error, Result};
use crate::types::{InstanceInfo, RegisteredType};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct RegistryState {
    type_by_task_id: HashMap<String, RegisteredType>,
    info_by_task_id: HashMap<String, InstanceInfo>,
}

/// Process-lifetime, one per engine. Entries are added monotonically and
/// never mutated after first write (invariant 1, spec §3).
#[derive(Default)]
pub struct Registry {
    state: Mutex<RegistryState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_type(&self, task_id: &str, params: RegisteredType) -> Result<()> {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        if state.type_by_task_id.contains_key(task_id) {
            return Err(Error::DuplicateTaskId(task_id.to_string()));
        }
        tracing::debug!(task_id, "registering object type");
        state.type_by_task_id.insert(task_id.to_string(), params);
        Ok(())
    }

    pub fn get_type(&self, task_id: &str) -> Result<RegisteredType> {
        let state = self.state.lock().expect("registry mutex poisoned");
        state
            .type_by_task_id
            .get(task_id)
            .cloned()
            .ok_or_else(|| Error::MissingTaskId(task_id.to_string()))
    }

    pub fn has_type(&self, task_id: &str) -> bool {
        let state = self.state.lock().expect("registry mutex poisoned");
        state.type_by_task_id.contains_key(task_id)
    }

    pub fn set_info(&self, task_id: &str, info: InstanceInfo) -> Result<()> {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        if state.info_by_task_id.contains_key(task_id) {
            return Err(Error::DuplicateTaskId(task_id.to_string()));
        }
        tracing::debug!(task_id, "recording instance info");
        state.info_by_task_id.insert(task_id.to_string(), info);
        Ok(())
    }

    pub fn get_info(&self, task_id: &str) -> Result<InstanceInfo> {
        let state = self.state.lock().expect("registry mutex poisoned");
        state
            .info_by_task_id
            .get(task_id)
            .cloned()
            .ok_or_else(|| Error::MissingTaskId(task_id.to_string()))
    }

    pub fn has_info(&self, task_id: &str) -> bool {
        let state = self.state.lock().expect("registry mutex poisoned");
        state.info_by_task_id.contains_key(task_id)
    }

    /// Snapshot of every recorded instance, used by the cleanup pass.
    pub fn all_info(&self) -> Vec<InstanceInfo> {
        let state = self.state.lock().expect("registry mutex poisoned");
        state.info_by_task_id.values().cloned().collect()
    }

    pub fn len(&self) -> (usize, usize) {
        let state = self.state.lock().expect("registry mutex poisoned");
        (state.type_by_task_id.len(), state.info_by_task_id.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Gvr;

    fn dummy_type() -> RegisteredType {
        RegisteredType {
            template_path: "t.yml".into(),
            documents: vec![],
            gvr: vec![],
            name_format: "job{{_ENUM_}}".into(),
            pod_name_format: None,
            pod_count_expr: None,
        }
    }

    fn dummy_info() -> InstanceInfo {
        InstanceInfo {
            names: vec!["job1".into()],
            namespace: "default".into(),
            gvr: vec![Gvr {
                group: "batch".into(),
                version: "v1".into(),
                resource: "jobs".into(),
            }],
            expected_pod_count: 0,
            pod_name_regexes: vec![],
        }
    }

    #[test]
    fn rejects_duplicate_type_registration() {
        let reg = Registry::new();
        reg.set_type("t1", dummy_type()).unwrap();
        assert!(reg.set_type("t1", dummy_type()).is_err());
    }

    #[test]
    fn missing_lookups_fail() {
        let reg = Registry::new();
        assert!(reg.get_type("missing").is_err());
        assert!(reg.get_info("missing").is_err());
    }

    #[test]
    fn round_trips_info() {
        let reg = Registry::new();
        reg.set_info("s1", dummy_info()).unwrap();
        let info = reg.get_info("s1").unwrap();
        assert_eq!(info.names, vec!["job1"]);
        assert!(reg.set_info("s1", dummy_info()).is_err());
    }

    #[test]
    fn all_info_collects_every_instance() {
        let reg = Registry::new();
        reg.set_info("s1", dummy_info()).unwrap();
        reg.set_info("s2", dummy_info()).unwrap();
        assert_eq!(reg.all_info().len(), 2);
    }
}
