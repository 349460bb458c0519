//! In-memory registry of live conversations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::flow::catalog::Catalog;
use crate::flow::controller::FlowController;
use crate::flow::reveal::Conversation;
use crate::flow::state::FlowSnapshot;
use crate::flow::transcript::FormTranscript;
use crate::submit::LeadSubmitter;

/// Idle time after which an HTTP conversation is dropped.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Longest wait between two idle sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Session {
    conversation: Arc<Conversation>,
    last_active: Instant,
}

/// Owns every conversation served over HTTP. All of them share one catalog
/// and submitter but nothing else.
pub struct SessionRegistry {
    catalog: Arc<Catalog>,
    submitter: Arc<dyn LeadSubmitter>,
    reveal_delay: Duration,
    form_transcript: FormTranscript,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionRegistry {
    pub fn new(
        catalog: Arc<Catalog>,
        submitter: Arc<dyn LeadSubmitter>,
        reveal_delay: Duration,
    ) -> Self {
        Self {
            catalog,
            submitter,
            reveal_delay,
            form_transcript: FormTranscript::default(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_form_transcript(mut self, policy: FormTranscript) -> Self {
        self.form_transcript = policy;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Open and start a new conversation.
    pub async fn create(&self) -> (Uuid, FlowSnapshot) {
        let controller =
            FlowController::new(Arc::clone(&self.catalog), Arc::clone(&self.submitter))
                .with_form_transcript(self.form_transcript);
        let conversation = Arc::new(Conversation::new(controller, self.reveal_delay));
        let snapshot = conversation.start().await;

        let id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            id,
            Session {
                conversation,
                last_active: Instant::now(),
            },
        );
        info!(flow_id = %id, active = sessions.len(), "Conversation opened");
        (id, snapshot)
    }

    /// Look up a conversation and mark it active.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Conversation>> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id)?;
        session.last_active = Instant::now();
        Some(Arc::clone(&session.conversation))
    }

    /// Close a conversation. Its pending reveal, if any, is cancelled once
    /// the last in-flight request holding it finishes.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(flow_id = %id, "Conversation closed");
        } else {
            debug!(flow_id = %id, "Close requested for unknown conversation");
        }
        removed
    }

    /// Drop conversations with no request for longer than `ttl`.
    /// Returns the number dropped.
    pub async fn expire_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = session.last_active.elapsed() <= ttl;
            if !keep {
                debug!(flow_id = %id, "Conversation expired");
            }
            keep
        });
        let expired = before - sessions.len();
        if expired > 0 {
            info!(count = expired, active = sessions.len(), "Expired idle conversations");
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Spawn a background task that periodically drops idle conversations.
pub fn spawn_expiry_task(
    registry: Arc<SessionRegistry>,
    ttl: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ttl.min(SWEEP_INTERVAL));
        loop {
            interval.tick().await;
            registry.expire_idle(ttl).await;
        }
    })
}
