//! In-memory [`ProcessClient`] double shared by the unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::{Player, ProcessId},
    protocol::{DryRunOptions, ProcessResult, Tag, ACTION_TAG},
};

use crate::{
    process::ProcessClient,
    store::{Store, Transition},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    DryRun,
    Message,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub mode: CallMode,
    pub process: ProcessId,
    pub tags: Vec<Tag>,
    pub owner: Option<String>,
}

impl RecordedCall {
    pub fn action(&self) -> &str {
        action_of(&self.tags)
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.name == name)
            .map(|tag| tag.value.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Result(ProcessResult),
    Delayed(Duration, ProcessResult),
    Fail(String),
}

impl Reply {
    pub fn json(value: Value) -> Self {
        Reply::Result(ProcessResult::json(&value))
    }

    pub fn data(data: &str) -> Self {
        Reply::Result(ProcessResult::single(data))
    }

    pub fn empty() -> Self {
        Reply::Result(ProcessResult::default())
    }

    pub fn fail(message: &str) -> Self {
        Reply::Fail(message.to_string())
    }
}

/// Replies are queued per action name; the last queued reply for an action
/// keeps answering once the queue is down to it.
#[derive(Default)]
pub struct ScriptedProcess {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProcess {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, action: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .expect("lock")
            .entry(action.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Drops whatever is queued for `action` and answers with `reply` from
    /// now on.
    pub fn set_reply(&self, action: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .expect("lock")
            .insert(action.to_string(), VecDeque::from([reply]));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn calls_for(&self, action: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.action() == action)
            .collect()
    }

    async fn answer(&self, call: RecordedCall) -> Result<ProcessResult> {
        let action = call.action().to_string();
        self.calls.lock().expect("lock").push(call);

        let reply = {
            let mut replies = self.replies.lock().expect("lock");
            let queue = replies.get_mut(&action);
            match queue {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Result(result)) => Ok(result),
            Some(Reply::Delayed(delay, result)) => {
                tokio::time::sleep(delay).await;
                Ok(result)
            }
            Some(Reply::Fail(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted reply for {action}")),
        }
    }
}

#[async_trait]
impl ProcessClient for ScriptedProcess {
    async fn dry_run(
        &self,
        process: &ProcessId,
        tags: &[Tag],
        options: &DryRunOptions,
    ) -> Result<ProcessResult> {
        self.answer(RecordedCall {
            mode: CallMode::DryRun,
            process: process.clone(),
            tags: tags.to_vec(),
            owner: options.owner.clone(),
        })
        .await
    }

    async fn message(&self, process: &ProcessId, tags: &[Tag]) -> Result<ProcessResult> {
        self.answer(RecordedCall {
            mode: CallMode::Message,
            process: process.clone(),
            tags: tags.to_vec(),
            owner: None,
        })
        .await
    }
}

fn action_of(tags: &[Tag]) -> &str {
    tags.iter()
        .find(|tag| tag.name == ACTION_TAG)
        .map(|tag| tag.value.as_str())
        .unwrap_or_default()
}

pub fn process() -> ProcessId {
    ProcessId::new("game-process")
}

/// Store for a player who already joined [`process`], with the loading
/// flag cleared.
pub async fn joined_store(player: Player) -> Arc<Store> {
    let store = Store::new();
    store
        .apply_all(vec![
            Transition::SessionJoined {
                player,
                process: process(),
            },
            Transition::LoadingChanged(false),
        ])
        .await;
    store
}
