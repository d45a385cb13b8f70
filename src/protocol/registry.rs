use std::sync::Arc;

use horoskop_core::services::instance::Instance;
use tokio::task::JoinHandle;

/// Running instances by name, in config order. Commands are routed through
/// here.
pub struct Registry {
    instances: Vec<Arc<Instance>>,
    schedules: Vec<JoinHandle<()>>,
}

impl Registry {
    pub fn new(instances: Vec<Arc<Instance>>) -> Self {
        Self {
            instances,
            schedules: Vec::new(),
        }
    }

    pub fn instances(&self) -> &[Arc<Instance>] {
        &self.instances
    }

    /// Named instance, or the only one when no name is given.
    pub fn resolve(&self, name: Option<&str>) -> Result<&Arc<Instance>, String> {
        match name {
            Some(name) => self
                .instances
                .iter()
                .find(|i| i.name() == name)
                .ok_or_else(|| format!("unknown instance `{name}`")),
            None => match self.instances.as_slice() {
                [only] => Ok(only),
                [] => Err("no instances configured".to_string()),
                _ => Err("payload.instance is required when several instances run".to_string()),
            },
        }
    }

    pub fn start_schedules(&mut self) {
        self.schedules = self.instances.iter().map(|i| i.spawn_schedule()).collect();
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        for handle in &self.schedules {
            handle.abort();
        }
    }
}
