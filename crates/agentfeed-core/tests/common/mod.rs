//! Shared harness for orchestration integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentfeed_core::{
    AgentDescriptor, AgentExecutor, AgentHandle, ExecutorError, FeedEvent, InputContext,
    Orchestrator, OrchestratorConfig, RunStatus, StaticAgentRegistry, Subscription,
};
use async_trait::async_trait;
use feed_state::fakes::MemoryPostStore;
use feed_state::{NewPost, Post, PostId, PostStore, StorageError, StorageResult, ThreadId, ThreadSnapshot};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub fn descriptor(handle: &str) -> AgentDescriptor {
    AgentDescriptor {
        handle: AgentHandle::parse(handle).unwrap(),
        name: handle.to_uppercase(),
        role: format!("{handle} role"),
        policy: String::new(),
        style: String::new(),
        tools: vec![],
        enabled: true,
    }
}

pub fn registry(handles: &[&str]) -> Arc<StaticAgentRegistry> {
    Arc::new(StaticAgentRegistry::new(handles.iter().map(|h| descriptor(h))).unwrap())
}

// ---------------------------------------------------------------------------
// Scripted executor
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum Script {
    Reply(String),
    Fail(ExecutorError),
    /// Sleep, then reply.
    Slow(Duration, String),
    Panic,
}

/// Executor whose behaviour is fixed per agent handle. Unscripted agents
/// answer `"<handle> says hi"`.
#[derive(Default)]
pub struct ScriptedExecutor {
    scripts: HashMap<String, Script>,
    pub calls: Mutex<Vec<(String, InputContext)>>,
    current: AtomicUsize,
    pub peak: AtomicUsize,
    pub delay: Option<Duration>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handle: &str, script: Script) -> Self {
        self.scripts.insert(handle.to_string(), script);
        self
    }

    /// Every call sleeps this long before its script runs.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        agent: &AgentDescriptor,
        input: &InputContext,
        _deadline: Duration,
    ) -> Result<String, ExecutorError> {
        let handle = agent.handle.to_string();
        self.calls
            .lock()
            .unwrap()
            .push((handle.clone(), input.clone()));

        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let script = self.scripts.get(&handle).cloned();
        let result = match script {
            None => Ok(format!("{handle} says hi")),
            Some(Script::Reply(text)) => Ok(text),
            Some(Script::Fail(e)) => Err(e),
            Some(Script::Slow(wait, text)) => {
                tokio::time::sleep(wait).await;
                Ok(text)
            }
            Some(Script::Panic) => {
                self.current.fetch_sub(1, Ordering::SeqCst);
                panic!("scripted executor panic for {handle}");
            }
        };

        self.current.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ---------------------------------------------------------------------------
// Store that refuses replies from chosen agents
// ---------------------------------------------------------------------------

pub struct FlakyStore {
    inner: MemoryPostStore,
    refuse: Vec<String>,
}

impl FlakyStore {
    pub fn refusing(handles: &[&str]) -> Self {
        Self {
            inner: MemoryPostStore::new(),
            refuse: handles.iter().map(|h| h.to_string()).collect(),
        }
    }
}

#[async_trait]
impl PostStore for FlakyStore {
    async fn create_post(&self, post: NewPost) -> StorageResult<Post> {
        self.inner.create_post(post).await
    }

    async fn get_post(&self, post_id: &PostId) -> StorageResult<Post> {
        self.inner.get_post(post_id).await
    }

    async fn append_reply(
        &self,
        thread_id: &ThreadId,
        trigger_post_id: &PostId,
        agent_handle: &str,
        text: &str,
    ) -> StorageResult<Post> {
        if self.refuse.iter().any(|h| h == agent_handle) {
            return Err(StorageError::Backend("disk full".to_string()));
        }
        self.inner
            .append_reply(thread_id, trigger_post_id, agent_handle, text)
            .await
    }

    async fn get_thread(&self, thread_id: &ThreadId) -> StorageResult<ThreadSnapshot> {
        self.inner.get_thread(thread_id).await
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> StorageResult<()> {
        self.inner.delete_thread(thread_id).await
    }
}

// ---------------------------------------------------------------------------
// Store with slow or unanswered calls
// ---------------------------------------------------------------------------

/// Store whose appends for chosen agents never complete, and whose deletes
/// can take a while to be acknowledged after the data is gone.
#[derive(Default)]
pub struct StallingStore {
    inner: MemoryPostStore,
    hang_appends: Vec<String>,
    delete_ack: Option<Duration>,
}

impl StallingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hanging_appends(mut self, handles: &[&str]) -> Self {
        self.hang_appends = handles.iter().map(|h| h.to_string()).collect();
        self
    }

    pub fn slow_delete_ack(mut self, ack: Duration) -> Self {
        self.delete_ack = Some(ack);
        self
    }
}

#[async_trait]
impl PostStore for StallingStore {
    async fn create_post(&self, post: NewPost) -> StorageResult<Post> {
        self.inner.create_post(post).await
    }

    async fn get_post(&self, post_id: &PostId) -> StorageResult<Post> {
        self.inner.get_post(post_id).await
    }

    async fn append_reply(
        &self,
        thread_id: &ThreadId,
        trigger_post_id: &PostId,
        agent_handle: &str,
        text: &str,
    ) -> StorageResult<Post> {
        if self.hang_appends.iter().any(|h| h == agent_handle) {
            std::future::pending::<()>().await;
        }
        self.inner
            .append_reply(thread_id, trigger_post_id, agent_handle, text)
            .await
    }

    async fn get_thread(&self, thread_id: &ThreadId) -> StorageResult<ThreadSnapshot> {
        self.inner.get_thread(thread_id).await
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> StorageResult<()> {
        self.inner.delete_thread(thread_id).await?;
        if let Some(ack) = self.delete_ack {
            tokio::time::sleep(ack).await;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub store: Arc<dyn PostStore>,
    pub executor: Arc<ScriptedExecutor>,
}

impl Harness {
    pub fn new(agents: &[&str], executor: ScriptedExecutor) -> Self {
        Self::with_store(agents, executor, Arc::new(MemoryPostStore::new()), OrchestratorConfig::default())
    }

    pub fn with_config(agents: &[&str], executor: ScriptedExecutor, config: OrchestratorConfig) -> Self {
        Self::with_store(agents, executor, Arc::new(MemoryPostStore::new()), config)
    }

    pub fn with_store(
        agents: &[&str],
        executor: ScriptedExecutor,
        store: Arc<dyn PostStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let executor = Arc::new(executor);
        let orchestrator = Orchestrator::builder(
            registry(agents),
            Arc::clone(&store),
            Arc::clone(&executor) as Arc<dyn AgentExecutor>,
        )
        .config(config)
        .build()
        .unwrap();
        Self {
            orchestrator,
            store,
            executor,
        }
    }

    pub async fn post(&self, text: &str) -> Post {
        self.store.create_post(NewPost::root("@me", text)).await.unwrap()
    }

    pub async fn reply(&self, parent: &Post, text: &str) -> Post {
        self.store
            .create_post(NewPost::reply("@me", text, parent.id.clone()))
            .await
            .unwrap()
    }
}

/// Drain everything already buffered in a subscription.
pub fn drain(feed: &mut Subscription) -> Vec<FeedEvent> {
    let mut events = Vec::new();
    while let Some(event) = feed.try_recv() {
        events.push(event);
    }
    events
}

/// Status sequence of run events for one run id.
pub fn statuses_for(events: &[FeedEvent], run_id: &agentfeed_core::RunId) -> Vec<RunStatus> {
    events
        .iter()
        .filter(|e| e.run_id() == run_id)
        .filter_map(|e| e.run().map(|r| r.status))
        .collect()
}
