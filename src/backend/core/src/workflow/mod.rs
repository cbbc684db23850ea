//! Typed views of workflow definitions and their task trees.
//!
//! Only the members this layer inspects or rewrites are modelled; every other
//! member is carried through `extra` so a definition survives a
//! deserialize/serialize cycle unchanged.

pub mod labels;
pub mod policy;

pub use labels::{is_labeled_with_group, labels_of};
pub use policy::{TaskPolicy, DEFAULT_MAX_TASK_DEPTH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const SIMPLE: &str = "SIMPLE";
pub const SUB_WORKFLOW: &str = "SUB_WORKFLOW";
pub const DECISION: &str = "DECISION";
pub const FORK: &str = "FORK";
pub const FORK_JOIN: &str = "FORK_JOIN";
pub const DO_WHILE: &str = "DO_WHILE";

/// A node of a workflow's task tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_workflow_param: Option<SubWorkflowParam>,

    /// Decision branches keyed by case value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_cases: Option<BTreeMap<String, Vec<Task>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_case: Option<Vec<Task>>,

    /// Parallel branches of a fork.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_tasks: Option<Vec<Vec<Task>>>,

    /// Loop body of a `DO_WHILE` task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_over: Option<Vec<Task>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    pub fn new(task_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            task_type: Some(task_type.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn task_type(&self) -> &str {
        self.task_type.as_deref().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn is_type(&self, task_type: &str) -> bool {
        self.task_type.as_deref() == Some(task_type)
    }

    pub fn is_decision(&self) -> bool {
        self.is_type(DECISION)
    }

    pub fn is_sub_workflow(&self) -> bool {
        self.is_type(SUB_WORKFLOW)
    }

    pub fn is_fork(&self) -> bool {
        self.is_type(FORK) || self.is_type(FORK_JOIN)
    }

    pub fn is_loop(&self) -> bool {
        self.is_type(DO_WHILE)
    }

    /// Tasks nested directly below this one that the backend will schedule,
    /// according to this task's type.
    pub fn children(&self) -> Vec<&Task> {
        let mut children = Vec::new();
        if self.is_decision() {
            children.extend(self.default_case.iter().flatten());
            children.extend(self.decision_cases.iter().flat_map(|cases| cases.values().flatten()));
        }
        if self.is_fork() {
            children.extend(self.fork_tasks.iter().flatten().flatten());
        }
        if self.is_loop() {
            children.extend(self.loop_over.iter().flatten());
        }
        children
    }

    /// Mutable counterpart of [`Task::children`].
    pub fn children_mut(&mut self) -> Vec<&mut Task> {
        let is_decision = self.is_decision();
        let is_fork = self.is_fork();
        let is_loop = self.is_loop();

        let mut children = Vec::new();
        if is_decision {
            children.extend(self.default_case.iter_mut().flatten());
            children.extend(
                self.decision_cases
                    .iter_mut()
                    .flat_map(|cases| cases.values_mut().flatten()),
            );
        }
        if is_fork {
            children.extend(self.fork_tasks.iter_mut().flatten().flatten());
        }
        if is_loop {
            children.extend(self.loop_over.iter_mut().flatten());
        }
        children
    }
}

/// Parameters of a `SUB_WORKFLOW` task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubWorkflowParam {
    pub name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A workflow definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Labels encoded in the description, see [`labels_of`].
    pub fn labels(&self) -> Vec<String> {
        self.description.as_deref().map(labels_of).unwrap_or_default()
    }

    /// Visit every task reachable from the top-level list.
    pub fn for_each_task_mut<F>(&mut self, mut f: F) -> crate::Result<()>
    where
        F: FnMut(&mut Task) -> crate::Result<()>,
    {
        let mut stack: Vec<&mut Task> = self.tasks.iter_mut().collect();
        while let Some(task) = stack.pop() {
            f(task)?;
            stack.extend(task.children_mut());
        }
        Ok(())
    }
}
