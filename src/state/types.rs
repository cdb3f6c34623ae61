//! Snapshot, application and task records.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// A complete point-in-time view of every application in the cluster.
///
/// Keyed by application id. Iteration is in ascending id order, which is
/// what makes pool name collisions resolve the same way on every update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    apps: BTreeMap<String, Application>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an application under the given id.
    pub fn insert(&mut self, id: impl Into<String>, app: Application) -> Option<Application> {
        self.apps.insert(id.into(), app)
    }

    /// Builder-style variant of [`Snapshot::insert`].
    pub fn with_app(mut self, id: impl Into<String>, app: Application) -> Self {
        self.insert(id, app);
        self
    }

    /// Look up an application by id.
    pub fn get(&self, id: &str) -> Option<&Application> {
        self.apps.get(id)
    }

    /// Iterate applications in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Application)> {
        self.apps.iter().map(|(id, app)| (id.as_str(), app))
    }

    /// Number of applications in the snapshot.
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Whether the snapshot holds no applications.
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

/// One application as reported by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Application {
    /// Human readable application name.
    pub name: String,

    /// Service ports assigned to the application, in order.
    pub ports: Vec<u16>,

    /// Operator supplied metadata.
    pub labels: HashMap<String, String>,

    /// Running instances, in the order the scheduler reported them.
    pub tasks: Vec<Task>,
}

impl Application {
    /// Create an application with the given name and no ports, labels or tasks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the assigned ports.
    pub fn with_ports(mut self, ports: impl Into<Vec<u16>>) -> Self {
        self.ports = ports.into();
        self
    }

    /// Set a single label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Append a task.
    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }
}

/// One running instance of an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Task {
    /// Unique instance identifier.
    pub id: String,

    /// Host the instance runs on.
    pub host: String,

    /// Host ports mapped to the instance, in order.
    pub ports: Vec<u16>,
}

impl Task {
    pub fn new(id: impl Into<String>, host: impl Into<String>, ports: impl Into<Vec<u16>>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            ports: ports.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_from_json() {
        let json = r#"{
            "/cache": {
                "name": "cache",
                "ports": [6379],
                "labels": {"twemproxy_pool": "cache"},
                "tasks": [{"id": "t1", "host": "10.0.0.5", "ports": [30000]}]
            },
            "/bare": {"name": "bare"}
        }"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.len(), 2);

        let cache = snapshot.get("/cache").unwrap();
        assert_eq!(cache.ports, vec![6379]);
        assert_eq!(cache.tasks[0], Task::new("t1", "10.0.0.5", [30000]));

        let bare = snapshot.get("/bare").unwrap();
        assert!(bare.ports.is_empty());
        assert!(bare.labels.is_empty());
        assert!(bare.tasks.is_empty());
    }

    #[test]
    fn test_iteration_is_ordered_by_id() {
        let snapshot = Snapshot::new()
            .with_app("b", Application::new("b"))
            .with_app("a", Application::new("a"))
            .with_app("c", Application::new("c"));

        let ids: Vec<&str> = snapshot.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
