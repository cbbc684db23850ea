//! Task allow-list enforcement.
//!
//! Tenants may only use backend system tasks and a handful of sandboxed
//! GLOBAL simple tasks. The lists are loaded once at startup and handed to
//! the transformers explicitly.

use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

use super::{Task, WorkflowDef, SIMPLE};
use crate::config::TasksConfig;
use crate::error::{ProxyError, Result};

/// Backend primitives tenants may use freely.
pub const DEFAULT_SYSTEM_TASK_TYPES: &[&str] = &[
    "SUB_WORKFLOW",
    "DECISION",
    "EVENT",
    "HTTP",
    "FORK",
    "FORK_JOIN",
    "FORK_JOIN_DYNAMIC",
    "JOIN",
    "EXCLUSIVE_JOIN",
    "WAIT",
    "DYNAMIC",
    "LAMBDA",
    "TERMINATE",
    "KAFKA_PUBLISH",
    "DO_WHILE",
];

/// `SIMPLE` tasks served by shared, sandboxed workers.
pub const DEFAULT_WHITELISTED_SIMPLE_TASKS: &[&str] =
    &["GLOBAL___js", "GLOBAL___py", "GLOBAL___HTTP_task"];

/// Deepest task nesting accepted by default. A top-level task has depth 1.
pub const DEFAULT_MAX_TASK_DEPTH: usize = 32;

/// Immutable task allow-list.
#[derive(Debug, Clone)]
pub struct TaskPolicy {
    system_task_types: HashSet<String>,
    whitelisted_simple_tasks: HashSet<String>,
    max_depth: usize,
}

impl TaskPolicy {
    pub fn new<S, W>(system_task_types: S, whitelisted_simple_tasks: W, max_depth: usize) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        W: IntoIterator,
        W::Item: Into<String>,
    {
        if max_depth == 0 {
            warn!("Task depth bound of 0 raised to 1");
        }
        Self {
            system_task_types: system_task_types.into_iter().map(Into::into).collect(),
            whitelisted_simple_tasks: whitelisted_simple_tasks.into_iter().map(Into::into).collect(),
            max_depth: max_depth.max(1),
        }
    }

    pub fn from_config(config: &TasksConfig) -> Self {
        Self::new(
            config.system_task_types.iter().cloned(),
            config.whitelisted_simple_tasks.iter().cloned(),
            config.max_depth,
        )
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_allowed_system_task(&self, task: &Task) -> bool {
        self.system_task_types.contains(task.task_type())
    }

    pub fn is_whitelisted_simple_task(&self, task: &Task) -> bool {
        task.is_type(SIMPLE) && self.whitelisted_simple_tasks.contains(task.name())
    }

    /// Reject the task, or any task reachable below it, unless it is a system
    /// task or a whitelisted simple task.
    pub fn assert_allowed_task(&self, task: &Task) -> Result<()> {
        self.check(task, 1)
    }

    /// Same as [`TaskPolicy::assert_allowed_task`] for an untyped payload.
    pub fn assert_allowed_value(&self, task: &Value) -> Result<()> {
        let task: Task = serde_json::from_value(task.clone())?;
        self.assert_allowed_task(&task)
    }

    /// Validate every top-level task of a definition.
    pub fn assert_allowed_workflow(&self, workflow: &WorkflowDef) -> Result<()> {
        workflow
            .tasks
            .iter()
            .try_for_each(|task| self.assert_allowed_task(task))
    }

    fn check(&self, task: &Task, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            warn!(max_depth = self.max_depth, "Task tree is nested too deeply");
            return Err(ProxyError::TaskTreeTooDeep {
                max_depth: self.max_depth,
            });
        }

        if !self.is_allowed_system_task(task) && !self.is_whitelisted_simple_task(task) {
            warn!(
                task_type = task.task_type(),
                name = task.name(),
                "Task type is not allowed"
            );
            return Err(ProxyError::DisallowedTaskType {
                task_type: task.task_type().to_string(),
                name: task.name().to_string(),
            });
        }

        task.children()
            .into_iter()
            .try_for_each(|child| self.check(child, depth + 1))
    }
}

impl Default for TaskPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_SYSTEM_TASK_TYPES.iter().copied(),
            DEFAULT_WHITELISTED_SIMPLE_TASKS.iter().copied(),
            DEFAULT_MAX_TASK_DEPTH,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::workflow::{DECISION, DO_WHILE, FORK_JOIN};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn policy() -> TaskPolicy {
        TaskPolicy::default()
    }

    #[test]
    fn test_system_tasks_allowed() {
        for task_type in DEFAULT_SYSTEM_TASK_TYPES {
            assert!(policy().assert_allowed_task(&Task::new(*task_type, "any")).is_ok());
        }
    }

    #[test]
    fn test_whitelisted_simple_task() {
        assert!(policy()
            .assert_allowed_task(&Task::new(SIMPLE, "GLOBAL___js"))
            .is_ok());

        let err = policy()
            .assert_allowed_task(&Task::new(SIMPLE, "arbitrary"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisallowedTaskType);
    }

    #[test]
    fn test_whitelist_does_not_apply_to_other_types() {
        let err = policy()
            .assert_allowed_task(&Task::new("CUSTOM", "GLOBAL___js"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisallowedTaskType);
    }

    #[test]
    fn test_missing_type_rejected() {
        let err = policy().assert_allowed_value(&json!({"name": "x"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisallowedTaskType);
    }

    #[test]
    fn test_decision_branch_validated() {
        let task = json!({
            "type": "DECISION",
            "name": "decide",
            "decisionCases": {
                "ok": [{"type": "WAIT", "name": "w"}],
                "bad": [{"type": "SIMPLE", "name": "arbitrary"}]
            }
        });
        let err = policy().assert_allowed_value(&task).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisallowedTaskType);
    }

    #[test]
    fn test_default_case_validated() {
        let mut task = Task::new(DECISION, "decide");
        task.default_case = Some(vec![Task::new(SIMPLE, "rogue")]);
        assert!(policy().assert_allowed_task(&task).is_err());
    }

    #[test]
    fn test_decision_without_branches() {
        assert!(policy().assert_allowed_task(&Task::new(DECISION, "d")).is_ok());
    }

    #[test]
    fn test_fork_and_loop_bodies_validated() {
        let mut fork = Task::new(FORK_JOIN, "fork");
        fork.fork_tasks = Some(vec![vec![Task::new(SIMPLE, "rogue")]]);
        assert!(policy().assert_allowed_task(&fork).is_err());

        let mut looped = Task::new(DO_WHILE, "loop");
        looped.loop_over = Some(vec![Task::new(SIMPLE, "rogue")]);
        assert!(policy().assert_allowed_task(&looped).is_err());
    }

    #[test]
    fn test_depth_bound() {
        let policy = TaskPolicy::new(DEFAULT_SYSTEM_TASK_TYPES.iter().copied(), Vec::<String>::new(), 3);

        let nest = |levels: usize| {
            let mut task = Task::new("WAIT", "leaf");
            for _ in 1..levels {
                let mut parent = Task::new(DECISION, "d");
                parent.decision_cases = Some(BTreeMap::from([("k".to_string(), vec![task])]));
                task = parent;
            }
            task
        };

        assert!(policy.assert_allowed_task(&nest(3)).is_ok());
        let err = policy.assert_allowed_task(&nest(4)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TaskTreeTooDeep);
    }

    #[test]
    fn test_zero_depth_bound_raised() {
        let policy = TaskPolicy::new(["WAIT"], Vec::<String>::new(), 0);
        assert_eq!(policy.max_depth(), 1);
        assert!(policy.assert_allowed_task(&Task::new("WAIT", "leaf")).is_ok());
    }

    #[test]
    fn test_workflow_validation() {
        let def = WorkflowDef::new("flow")
            .with_task(Task::new("HTTP", "call"))
            .with_task(Task::new(SIMPLE, "GLOBAL___py"));
        assert!(policy().assert_allowed_workflow(&def).is_ok());

        let def = def.with_task(Task::new(SIMPLE, "own_worker"));
        assert!(policy().assert_allowed_workflow(&def).is_err());
    }
}
