use super::producer::{ContentProducer, PlaceholderProducer};
use super::{Worker, decode_result};
use crate::model::{Task, WorkerResult};
use crate::role::AgentRole;
use crate::stage::Stage;
use crate::store::FeatureStore;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// What a [`MockWorker`] does for one dispatch.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Succeed with this raw text (decoded like real worker output)
    Output(String),
    /// Fail with this error message
    Fail(String),
    /// Panic inside the worker. Only built for tests of panic trapping.
    #[cfg(any(test, feature = "test-util"))]
    Panic,
}

#[derive(Default)]
struct Script {
    once: HashMap<(Stage, AgentRole), VecDeque<MockReply>>,
    sticky: HashMap<(Stage, AgentRole), MockReply>,
}

/// Scripted worker that records every dispatch.
///
/// Unscripted tasks get the placeholder producer's output. Replies queued
/// with [`MockWorker::once`] are used first, then the sticky reply set with
/// [`MockWorker::always`].
pub struct MockWorker {
    script: Mutex<Script>,
    dispatched: Mutex<Vec<(Stage, AgentRole)>>,
    store: Option<Arc<dyn FeatureStore>>,
    tokens_per_task: u64,
}

impl Default for MockWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWorker {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            dispatched: Mutex::new(Vec::new()),
            store: None,
            tokens_per_task: 10,
        }
    }

    /// Persist decoded artifacts like the real bridge does.
    pub fn with_store(mut self, store: Arc<dyn FeatureStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_tokens_per_task(mut self, tokens: u64) -> Self {
        self.tokens_per_task = tokens;
        self
    }

    pub fn always(self, stage: Stage, role: AgentRole, reply: MockReply) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.sticky.insert((stage, role), reply);
        }
        self
    }

    pub fn once(self, stage: Stage, role: AgentRole, reply: MockReply) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.once.entry((stage, role)).or_default().push_back(reply);
        }
        self
    }

    /// Every (stage, role) dispatched so far, in dispatch order.
    pub fn dispatched(&self) -> Vec<(Stage, AgentRole)> {
        self.dispatched
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn dispatch_count(&self, stage: Stage, role: AgentRole) -> usize {
        self.dispatched()
            .iter()
            .filter(|&&entry| entry == (stage, role))
            .count()
    }

    pub fn stages_dispatched(&self) -> Vec<Stage> {
        let mut stages: Vec<Stage> = Vec::new();
        for (stage, _) in self.dispatched() {
            if stages.last() != Some(&stage) {
                stages.push(stage);
            }
        }
        stages
    }

    fn next_reply(&self, key: (Stage, AgentRole)) -> Option<MockReply> {
        let mut script = self.script.lock().ok()?;
        if let Some(reply) = script.once.get_mut(&key).and_then(|q| q.pop_front()) {
            return Some(reply);
        }
        script.sticky.get(&key).cloned()
    }
}

#[async_trait]
impl Worker for MockWorker {
    async fn execute(&self, task: &Task) -> WorkerResult {
        let key = (task.stage, task.assigned_role);
        if let Ok(mut dispatched) = self.dispatched.lock() {
            dispatched.push(key);
        }

        let reply = match self.next_reply(key) {
            Some(reply) => reply,
            None => match PlaceholderProducer.produce(task) {
                Ok(text) => MockReply::Output(text),
                Err(e) => MockReply::Fail(e.to_string()),
            },
        };

        let mut result = match reply {
            MockReply::Output(text) => decode_result(task, text, self.store.as_deref()),
            MockReply::Fail(message) => WorkerResult::failure(task.assigned_role, message),
            #[cfg(any(test, feature = "test-util"))]
            MockReply::Panic => panic!("scripted panic for {}", task.assigned_role),
        };
        result.tokens_used = self.tokens_per_task;
        result.duration_ms = 1;
        result
    }
}
