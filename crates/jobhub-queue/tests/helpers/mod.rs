//! In-memory doubles for the dispatch engine's collaborators.
//!
//! Not every test binary uses every double.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use jobhub_core::models::{EmailEvent, EmailJob, EventStatus};
use jobhub_core::{EmailEventStore, Mailer};
use jobhub_queue::{QueueChannel, QueueHandler, QueueMessage};

pub fn pending_event(name: &str) -> EmailEvent {
    event_with(
        name,
        json!({"email": "x@y.com", "link": "https://jobs.example/l"}),
    )
}

pub fn event_with(name: &str, payload: serde_json::Value) -> EmailEvent {
    EmailEvent {
        id: Uuid::new_v4(),
        event_name: name.to_string(),
        payload,
        status: EventStatus::Pending,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        processed_at: None,
    }
}

/// Store double that keeps events in insertion order and records every
/// status transition it is asked to persist.
#[derive(Default)]
pub struct InMemoryStore {
    events: Mutex<Vec<EmailEvent>>,
    transitions: Mutex<Vec<(Uuid, EventStatus)>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, event: EmailEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn status_of(&self, id: Uuid) -> Option<EventStatus> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.status)
    }

    /// Status transitions recorded for one event, in order.
    pub fn transitions_for(&self, id: Uuid) -> Vec<EventStatus> {
        self.transitions
            .lock()
            .unwrap()
            .iter()
            .filter(|(event_id, _)| *event_id == id)
            .map(|(_, status)| *status)
            .collect()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailEventStore for InMemoryStore {
    async fn list_pending(&self) -> anyhow::Result<Vec<EmailEvent>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status == EventStatus::Pending)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: Uuid, status: EventStatus) -> anyhow::Result<()> {
        let mut events = self.events.lock().unwrap();
        let event = events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| anyhow::anyhow!("no such event: {}", id))?;
        event.status = status;
        drop(events);
        self.transitions.lock().unwrap().push((id, status));
        Ok(())
    }
}

/// Mailer double that fails the first `fail_first` sends, then succeeds.
pub struct FakeMailer {
    fail_first: usize,
    calls: AtomicUsize,
}

impl FakeMailer {
    pub fn always_ok() -> Arc<Self> {
        Arc::new(Self {
            fail_first: 0,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always_failing() -> Arc<Self> {
        Arc::new(Self {
            fail_first: usize::MAX,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing_times(fail_first: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_first,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, job: &EmailJob) -> anyhow::Result<()> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            anyhow::bail!("smtp unavailable for {}", job.recipient());
        }
        Ok(())
    }
}

/// Channel double that returns a fixed batch on every poll.
pub struct StaticChannel {
    name: String,
    messages: Vec<QueueMessage>,
}

impl StaticChannel {
    pub fn new(name: &str, events: Vec<EmailEvent>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            messages: events.into_iter().map(QueueMessage::from_event).collect(),
        })
    }
}

#[async_trait]
impl QueueChannel for StaticChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn poll(&self) -> anyhow::Result<Vec<QueueMessage>> {
        Ok(self.messages.clone())
    }
}

/// Channel double whose reads always fail.
pub struct BrokenChannel;

#[async_trait]
impl QueueChannel for BrokenChannel {
    fn name(&self) -> &str {
        "broken"
    }

    async fn poll(&self) -> anyhow::Result<Vec<QueueMessage>> {
        anyhow::bail!("connection reset")
    }
}

/// Handler double that records the events it sees and optionally fails on
/// one specific event id.
pub struct RecordingHandler {
    pub seen: Mutex<Vec<Uuid>>,
    fail_on: Option<Uuid>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            fail_on: None,
        })
    }

    pub fn failing_on(id: Uuid) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            fail_on: Some(id),
        })
    }

    pub fn seen_ids(&self) -> Vec<Uuid> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueHandler for RecordingHandler {
    async fn handle(&self, event: &EmailEvent) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(event.id);
        if self.fail_on == Some(event.id) {
            anyhow::bail!("handler exploded on {}", event.id);
        }
        Ok(())
    }
}

/// Controller double wiring arbitrary routes and channels into the router.
pub struct TestController {
    pub routes: Vec<(String, Arc<dyn QueueHandler>)>,
    pub channels: Vec<Arc<dyn QueueChannel>>,
}

impl jobhub_queue::QueueController for TestController {
    fn routes(&self) -> Vec<(String, Arc<dyn QueueHandler>)> {
        self.routes.clone()
    }

    fn channels(&self) -> Vec<Arc<dyn QueueChannel>> {
        self.channels.clone()
    }
}
