use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    error::{ModelError, ModelResult},
    properties::RawProperties,
};

/// Position of a task in its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskRole {
    /// First block of a job file; the chain is entered here.
    Event,
    /// Every later block, executed in declaration order.
    Action,
}

/// One task of a job as it travels from the dispatcher to a runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    /// Zero-based position in the chain.
    pub index: usize,
    /// Resource title, unique within the job.
    pub title: String,
    /// Provider name from the DSL block header (e.g. `"ticker"`).
    pub provider: String,
    /// Tasks of one job with the same key are bound to one provider instance.
    pub instance_key: String,
    /// Entry or action task.
    pub role: TaskRole,
    /// Promoted property object.
    pub properties: RawProperties,
}

/// A parsed job file: a named, ordered task chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDefinition {
    /// Job name, taken from the source file name.
    pub name: String,
    /// Ordered task chain; the first task is the event task.
    pub tasks: Vec<TaskSpec>,
}

impl JobDefinition {
    /// Returns the entry task of the chain.
    pub fn entry(&self) -> Option<&TaskSpec> {
        self.tasks.first()
    }

    /// Looks up a task by title.
    pub fn task(&self, title: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.title == title)
    }

    /// Check structural invariants of a received job.
    ///
    /// Rules:
    /// - at least one task;
    /// - `index` matches the position in the chain;
    /// - only the first task has [`TaskRole::Event`];
    /// - titles are unique.
    pub fn validate(&self) -> ModelResult<()> {
        if self.tasks.is_empty() {
            return Err(ModelError::EmptyJob(self.name.clone()));
        }

        let mut seen = HashSet::with_capacity(self.tasks.len());
        for (pos, task) in self.tasks.iter().enumerate() {
            let expected_role = if pos == 0 {
                TaskRole::Event
            } else {
                TaskRole::Action
            };
            if task.index != pos || task.role != expected_role {
                return Err(ModelError::TaskOrder {
                    job: self.name.clone(),
                    index: pos,
                });
            }
            if !seen.insert(task.title.as_str()) {
                return Err(ModelError::DuplicateTitle {
                    job: self.name.clone(),
                    title: task.title.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_task(index: usize, title: &str, provider: &str) -> TaskSpec {
        TaskSpec {
            index,
            title: title.to_string(),
            provider: provider.to_string(),
            instance_key: provider.to_string(),
            role: if index == 0 {
                TaskRole::Event
            } else {
                TaskRole::Action
            },
            properties: RawProperties::default(),
        }
    }

    #[test]
    fn validate_accepts_well_formed_chain() {
        let job = JobDefinition {
            name: "hello.job".into(),
            tasks: vec![mk_task(0, "T1", "ticker"), mk_task(1, "T2", "localexec")],
        };
        job.validate().unwrap();
        assert_eq!(job.entry().map(|t| t.title.as_str()), Some("T1"));
        assert_eq!(job.task("T2").map(|t| t.provider.as_str()), Some("localexec"));
    }

    #[test]
    fn validate_rejects_empty_job() {
        let job = JobDefinition {
            name: "empty.job".into(),
            tasks: Vec::new(),
        };
        match job.validate() {
            Err(ModelError::EmptyJob(name)) => assert_eq!(name, "empty.job"),
            other => panic!("expected EmptyJob, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_duplicate_titles() {
        let job = JobDefinition {
            name: "dup.job".into(),
            tasks: vec![mk_task(0, "T1", "ticker"), mk_task(1, "T1", "localexec")],
        };
        match job.validate() {
            Err(ModelError::DuplicateTitle { title, .. }) => assert_eq!(title, "T1"),
            other => panic!("expected DuplicateTitle, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_second_event_task() {
        let mut second = mk_task(1, "T2", "ticker");
        second.role = TaskRole::Event;
        let job = JobDefinition {
            name: "order.job".into(),
            tasks: vec![mk_task(0, "T1", "ticker"), second],
        };
        assert!(matches!(
            job.validate(),
            Err(ModelError::TaskOrder { index: 1, .. })
        ));
    }

    #[test]
    fn serde_uses_camel_case() {
        let job = JobDefinition {
            name: "hello.job".into(),
            tasks: vec![mk_task(0, "T1", "ticker")],
        };
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"instanceKey\":\"ticker\""));
        assert!(json.contains("\"role\":\"event\""));

        let back: JobDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }
}
