use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use chrono::TimeZone;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::sync::Notify;

use crate::domain::models::AgentExecutor;
use crate::domain::models::Message;
use crate::domain::models::MessageRecord;
use crate::domain::models::NewSession;
use crate::domain::models::Progress;
use crate::domain::models::Role;
use crate::domain::models::SendOutcome;
use crate::domain::models::Session;
use crate::domain::models::SessionKind;
use crate::domain::models::SessionStore;

/// In-memory session store that renames placeholder titles on the first user
/// message, the way the backend does. Listing ignores the kind filter.
#[derive(Default)]
pub struct MemoryStore {
    pub sessions: Mutex<Vec<Session>>,
    pub records: Mutex<Vec<MessageRecord>>,
    pub fail_list: AtomicBool,
    pub fail_get: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_append: AtomicBool,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn with_sessions(ids: &[&str]) -> MemoryStore {
        let store = MemoryStore::default();
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        *store.sessions.lock().unwrap() = ids
            .iter()
            .map(|id| return Session::new(id, &format!("Chat {id}"), timestamp, timestamp))
            .collect();

        return store;
    }

    pub fn add_record(&self, session_id: &str, role: Role, content: &str) {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        self.records.lock().unwrap().push(MessageRecord {
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            timestamp,
        });
    }

    pub fn titles(&self) -> Vec<String> {
        return self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .map(|e| return e.title.to_string())
            .collect();
    }

    pub fn contents(&self, session_id: &str) -> Vec<String> {
        return self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|e| return e.session_id == session_id)
            .map(|e| return e.content.to_string())
            .collect();
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn list_sessions(&self, _kind: SessionKind) -> Result<Vec<Session>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_list.load(Ordering::SeqCst) {
            bail!("connection refused");
        }

        return Ok(self.sessions.lock().unwrap().clone());
    }

    async fn get_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        tokio::task::yield_now().await;
        if self.fail_get.load(Ordering::SeqCst) {
            bail!("connection refused");
        }

        return Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .filter(|(_, e)| return e.session_id == session_id)
            .map(|(idx, e)| return Message::from_store(&idx.to_string(), e.role, &e.content, e.timestamp))
            .collect());
    }

    async fn create_session(&self, session: &NewSession) -> Result<Session> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_create.load(Ordering::SeqCst) {
            bail!("server error");
        }

        let now = Utc::now();
        let created = Session::new(&session.id, &session.title, now, now);
        self.sessions.lock().unwrap().insert(0, created.clone());

        return Ok(created);
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_delete.load(Ordering::SeqCst) {
            bail!("server error");
        }

        self.sessions.lock().unwrap().retain(|e| return e.id != session_id);
        self.records
            .lock()
            .unwrap()
            .retain(|e| return e.session_id != session_id);

        return Ok(());
    }

    async fn append_message(&self, record: &MessageRecord) -> Result<()> {
        if self.fail_append.load(Ordering::SeqCst) {
            bail!("disk full");
        }

        if record.role == Role::User {
            let mut sessions = self.sessions.lock().unwrap();
            if let Some(session) = sessions.iter_mut().find(|e| return e.id == record.session_id) {
                if session.has_placeholder_title() {
                    session.title = record.content.to_string();
                }
            }
        }
        self.records.lock().unwrap().push(record.clone());

        return Ok(());
    }
}

/// Executor replaying a fixed exchange. With a gate set, it waits for the
/// gate after emitting progress and before answering.
pub struct ScriptedExecutor {
    pub progress: Vec<Progress>,
    pub outcome: Result<SendOutcome, String>,
    pub gate: Option<Arc<Notify>>,
    pub received: Mutex<Vec<(String, String)>>,
}

impl ScriptedExecutor {
    pub fn replying(progress: Vec<Progress>, text: &str) -> ScriptedExecutor {
        return ScriptedExecutor {
            progress,
            outcome: Ok(SendOutcome::Reply {
                assistant_text: text.to_string(),
            }),
            gate: None,
            received: Mutex::new(vec![]),
        };
    }

    pub fn failing(error: &str) -> ScriptedExecutor {
        return ScriptedExecutor {
            progress: vec![],
            outcome: Err(error.to_string()),
            gate: None,
            received: Mutex::new(vec![]),
        };
    }

    pub fn with_outcome(mut self, outcome: SendOutcome) -> ScriptedExecutor {
        self.outcome = Ok(outcome);
        return self;
    }

    pub fn with_gate(mut self, gate: Arc<Notify>) -> ScriptedExecutor {
        self.gate = Some(gate);
        return self;
    }
}

#[async_trait]
impl AgentExecutor for ScriptedExecutor {
    async fn send<'a>(
        &self,
        session_id: &str,
        message: &str,
        tx: &'a mpsc::UnboundedSender<Progress>,
    ) -> Result<SendOutcome> {
        self.received
            .lock()
            .unwrap()
            .push((session_id.to_string(), message.to_string()));

        for item in &self.progress {
            tx.send(item.clone())?;
            tokio::task::yield_now().await;
        }

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match &self.outcome {
            Ok(outcome) => return Ok(outcome.clone()),
            Err(error) => bail!("{error}"),
        }
    }
}

pub fn progress(step: u32, total: u32, message: &str) -> Progress {
    return Progress {
        step,
        total,
        message: message.to_string(),
    };
}
