//! Task template registry.

use dayflow_core::{Pillar, PillarId, Priority, TaskAction, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use tracing::debug;

/// Errors raised while authoring or loading a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Two pillars share an id
    #[error("duplicate pillar: {0}")]
    DuplicatePillar(PillarId),

    /// Display orders are repeated or have gaps
    #[error("pillar display order must be unique and contiguous, got {0:?}")]
    NonContiguousOrder(Vec<u32>),

    /// Two templates share a key
    #[error("duplicate task: {0}")]
    DuplicateTask(TaskId),

    /// Template names an undeclared pillar
    #[error("task {task} references unknown pillar {pillar}")]
    UnknownPillar {
        /// Template key
        task: TaskId,
        /// Missing pillar
        pillar: PillarId,
    },

    /// Template depends on an unknown key
    #[error("task {task} depends on unknown task {dependency}")]
    UnknownDependency {
        /// Template key
        task: TaskId,
        /// Missing dependency
        dependency: TaskId,
    },

    /// Template depends on a task in a later pillar
    #[error("task {task} depends on {dependency} from a later pillar")]
    ForwardDependency {
        /// Template key
        task: TaskId,
        /// Dependency in a later pillar
        dependency: TaskId,
    },

    /// Dependencies form a cycle
    #[error("dependency cycle among {0:?}")]
    Cycle(Vec<TaskId>),

    /// Registry file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Template a workflow task is instantiated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    /// Key, becomes the task id
    pub key: TaskId,

    /// Owning pillar
    pub pillar_id: PillarId,

    /// Title
    pub title: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Estimated effort in minutes
    pub estimated_time_minutes: u32,

    /// Keys this template depends on
    #[serde(default)]
    pub depends_on: Vec<TaskId>,

    /// Priority
    #[serde(default)]
    pub priority: Priority,

    /// Whether tasks built from this template are enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Opaque action reference
    #[serde(default)]
    pub action: Option<TaskAction>,
}

fn default_enabled() -> bool {
    true
}

impl TaskTemplate {
    /// Create an enabled, medium-priority template.
    pub fn new(
        key: impl Into<String>,
        pillar: impl Into<String>,
        title: impl Into<String>,
        estimated_time_minutes: u32,
    ) -> Self {
        Self {
            key: TaskId::new(key),
            pillar_id: PillarId::new(pillar),
            title: title.into(),
            description: String::new(),
            estimated_time_minutes,
            depends_on: Vec::new(),
            priority: Priority::Medium,
            enabled: true,
            action: None,
        }
    }

    /// Set description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Add a dependency.
    pub fn depends_on(mut self, key: impl Into<String>) -> Self {
        self.depends_on.push(TaskId::new(key));
        self
    }

    /// Set priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set action.
    pub fn with_action(mut self, action: TaskAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Disable by default.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// On-disk registry document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    /// Pillars (any order)
    pub pillars: Vec<Pillar>,

    /// Task templates in registry order
    pub tasks: Vec<TaskTemplate>,
}

/// Validated catalog of task templates per pillar.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    pillars: Vec<Pillar>,
    templates: Vec<TaskTemplate>,
    by_key: HashMap<TaskId, usize>,
}

impl TaskRegistry {
    /// Build a registry, checking every structural invariant.
    pub fn new(mut pillars: Vec<Pillar>, templates: Vec<TaskTemplate>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for pillar in &pillars {
            if !seen.insert(pillar.id.clone()) {
                return Err(RegistryError::DuplicatePillar(pillar.id.clone()));
            }
        }

        pillars.sort_by_key(|p| p.display_order);
        let orders: Vec<u32> = pillars.iter().map(|p| p.display_order).collect();
        if orders.windows(2).any(|w| w[1] != w[0] + 1) {
            return Err(RegistryError::NonContiguousOrder(orders));
        }

        let pillar_rank: HashMap<&PillarId, usize> =
            pillars.iter().enumerate().map(|(i, p)| (&p.id, i)).collect();

        let mut by_key = HashMap::new();
        for (i, template) in templates.iter().enumerate() {
            if !pillar_rank.contains_key(&template.pillar_id) {
                return Err(RegistryError::UnknownPillar {
                    task: template.key.clone(),
                    pillar: template.pillar_id.clone(),
                });
            }
            if by_key.insert(template.key.clone(), i).is_some() {
                return Err(RegistryError::DuplicateTask(template.key.clone()));
            }
        }

        for template in &templates {
            let rank = pillar_rank[&template.pillar_id];
            for dep in &template.depends_on {
                let Some(&j) = by_key.get(dep) else {
                    return Err(RegistryError::UnknownDependency {
                        task: template.key.clone(),
                        dependency: dep.clone(),
                    });
                };
                if pillar_rank[&templates[j].pillar_id] > rank {
                    return Err(RegistryError::ForwardDependency {
                        task: template.key.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        check_acyclic(&templates, &by_key)?;

        debug!(pillars = pillars.len(), tasks = templates.len(), "Task registry validated");

        Ok(Self { pillars, templates, by_key })
    }

    /// Parse and validate a JSON registry document.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        Self::new(file.pillars, file.tasks)
    }

    /// Read, parse and validate a JSON registry file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    /// Serializable form of this registry.
    pub fn to_file(&self) -> RegistryFile {
        RegistryFile {
            pillars: self.pillars.clone(),
            tasks: self.templates.clone(),
        }
    }

    /// Pillars in display order.
    pub fn pillars(&self) -> &[Pillar] {
        &self.pillars
    }

    /// Look up a template.
    pub fn get(&self, key: &TaskId) -> Option<&TaskTemplate> {
        self.by_key.get(key).map(|&i| &self.templates[i])
    }

    /// Templates of one pillar, in registry order.
    pub fn templates_for<'a>(&'a self, pillar: &'a PillarId) -> impl Iterator<Item = &'a TaskTemplate> + 'a {
        self.templates.iter().filter(move |t| &t.pillar_id == pillar)
    }

    /// All templates in pillar-then-registry order.
    pub fn ordered(&self) -> Vec<&TaskTemplate> {
        self.pillars
            .iter()
            .flat_map(|p| self.templates_for(&p.id))
            .collect()
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the registry has no templates.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Kahn's algorithm over template dependencies.
fn check_acyclic(templates: &[TaskTemplate], by_key: &HashMap<TaskId, usize>) -> Result<(), RegistryError> {
    let mut indegree: Vec<usize> = templates.iter().map(|t| t.depends_on.len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); templates.len()];
    for (i, template) in templates.iter().enumerate() {
        for dep in &template.depends_on {
            dependents[by_key[dep]].push(i);
        }
    }

    let mut queue: VecDeque<usize> = (0..templates.len()).filter(|&i| indegree[i] == 0).collect();
    let mut visited = 0;
    while let Some(i) = queue.pop_front() {
        visited += 1;
        for &d in &dependents[i] {
            indegree[d] -= 1;
            if indegree[d] == 0 {
                queue.push_back(d);
            }
        }
    }

    if visited == templates.len() {
        return Ok(());
    }

    let stuck = templates
        .iter()
        .enumerate()
        .filter(|(i, _)| indegree[*i] > 0)
        .map(|(_, t)| t.key.clone())
        .collect();
    Err(RegistryError::Cycle(stuck))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pillars() -> Vec<Pillar> {
        vec![Pillar::new("b", "B", 2), Pillar::new("a", "A", 1)]
    }

    #[test]
    fn test_pillars_sorted_by_display_order() {
        let registry = TaskRegistry::new(pillars(), vec![TaskTemplate::new("a1", "a", "A1", 5)]).unwrap();
        let ids: Vec<_> = registry.pillars().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_non_contiguous_order_rejected() {
        let result = TaskRegistry::new(
            vec![Pillar::new("a", "A", 1), Pillar::new("b", "B", 3)],
            vec![],
        );
        assert!(matches!(result, Err(RegistryError::NonContiguousOrder(_))));

        let result = TaskRegistry::new(
            vec![Pillar::new("a", "A", 1), Pillar::new("b", "B", 1)],
            vec![],
        );
        assert!(matches!(result, Err(RegistryError::NonContiguousOrder(_))));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let result = TaskRegistry::new(
            pillars(),
            vec![TaskTemplate::new("a1", "a", "A1", 5).depends_on("ghost")],
        );
        assert!(matches!(result, Err(RegistryError::UnknownDependency { .. })));
    }

    #[test]
    fn test_forward_dependency_rejected() {
        let result = TaskRegistry::new(
            pillars(),
            vec![
                TaskTemplate::new("a1", "a", "A1", 5).depends_on("b1"),
                TaskTemplate::new("b1", "b", "B1", 5),
            ],
        );
        assert!(matches!(result, Err(RegistryError::ForwardDependency { .. })));
    }

    #[test]
    fn test_cycle_rejected() {
        let result = TaskRegistry::new(
            pillars(),
            vec![
                TaskTemplate::new("a0", "a", "A0", 5),
                TaskTemplate::new("a1", "a", "A1", 5).depends_on("a2"),
                TaskTemplate::new("a2", "a", "A2", 5).depends_on("a1"),
            ],
        );
        match result {
            Err(RegistryError::Cycle(keys)) => {
                assert_eq!(keys, vec![TaskId::new("a1"), TaskId::new("a2")]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let result = TaskRegistry::new(
            pillars(),
            vec![TaskTemplate::new("a1", "a", "A1", 5).depends_on("a1")],
        );
        assert!(matches!(result, Err(RegistryError::Cycle(_))));
    }

    #[test]
    fn test_ordered_groups_by_pillar() {
        let registry = TaskRegistry::new(
            pillars(),
            vec![
                TaskTemplate::new("b1", "b", "B1", 5),
                TaskTemplate::new("a1", "a", "A1", 5),
                TaskTemplate::new("a2", "a", "A2", 5),
            ],
        )
        .unwrap();
        let keys: Vec<_> = registry.ordered().iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn test_from_json_defaults() {
        let json = r#"{
            "pillars": [{"id": "plan", "title": "Plan", "display_order": 1}],
            "tasks": [
                {"key": "plan.topics", "pillar_id": "plan", "title": "Pick topics", "estimated_time_minutes": 10,
                 "action": {"kind": "navigate", "target": "/topics"}}
            ]
        }"#;
        let registry = TaskRegistry::from_json(json).unwrap();
        let template = registry.get(&TaskId::new("plan.topics")).unwrap();
        assert!(template.enabled);
        assert_eq!(template.priority, Priority::Medium);
        assert_eq!(template.action, Some(TaskAction::Navigate { target: "/topics".to_string() }));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let source = crate::default_registry();
        tokio::fs::write(&path, serde_json::to_string(&source.to_file()).unwrap())
            .await
            .unwrap();

        let loaded = TaskRegistry::load(&path).await.unwrap();
        assert_eq!(loaded.pillars(), source.pillars());
        assert_eq!(loaded.ordered().len(), source.ordered().len());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            TaskRegistry::load(dir.path().join("absent.json")).await,
            Err(RegistryError::Io(_))
        ));
    }
}
