//! Lead submission: the engine's only outbound write.
//!
//! The controller hands a validated `Lead` to a `LeadSubmitter` exactly once
//! per accepted form and moves on without waiting. Delivery, retries and
//! acknowledgement belong to the submitter.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::SubmitError;
use crate::flow::responses::ResponseValue;

/// A validated contact submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    /// Catalog the lead came through.
    pub flow: String,
    pub submitted_at: DateTime<Utc>,
    /// Form fields, in declaration order.
    pub fields: IndexMap<String, ResponseValue>,
    /// Qualification answers keyed by step id, in answer order.
    pub answers: IndexMap<String, ResponseValue>,
}

impl Lead {
    pub fn new(
        flow: impl Into<String>,
        fields: IndexMap<String, ResponseValue>,
        answers: IndexMap<String, ResponseValue>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            flow: flow.into(),
            submitted_at: Utc::now(),
            fields,
            answers,
        }
    }
}

/// Receives leads. Implementations must not block the caller.
pub trait LeadSubmitter: Send + Sync {
    fn name(&self) -> &str;

    fn submit(&self, lead: Lead);
}

/// Logs leads and drops them.
pub struct LogSubmitter;

impl LogSubmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl LeadSubmitter for LogSubmitter {
    fn name(&self) -> &str {
        "log"
    }

    fn submit(&self, lead: Lead) {
        info!(
            lead_id = %lead.id,
            flow = %lead.flow,
            fields = lead.fields.len(),
            answers = lead.answers.len(),
            "Lead captured"
        );
    }
}

/// Forwards leads into a tokio channel for an embedding application.
pub struct ChannelSubmitter {
    tx: mpsc::UnboundedSender<Lead>,
}

impl ChannelSubmitter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Lead>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LeadSubmitter for ChannelSubmitter {
    fn name(&self) -> &str {
        "channel"
    }

    fn submit(&self, lead: Lead) {
        let lead_id = lead.id;
        if self.tx.send(lead).is_err() {
            warn!(lead_id = %lead_id, "Lead receiver dropped, lead discarded");
        }
    }
}

/// POSTs each lead as JSON to a configured URL from a background task.
pub struct WebhookSubmitter {
    client: reqwest::Client,
    url: String,
}

impl WebhookSubmitter {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

async fn deliver(client: &reqwest::Client, url: &str, lead: &Lead) -> Result<(), SubmitError> {
    let response = client.post(url).json(lead).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SubmitError::Rejected {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(())
}

impl LeadSubmitter for WebhookSubmitter {
    fn name(&self) -> &str {
        "webhook"
    }

    fn submit(&self, lead: Lead) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(lead_id = %lead.id, "No async runtime, webhook delivery skipped");
            return;
        };
        let client = self.client.clone();
        let url = self.url.clone();
        runtime.spawn(async move {
            match deliver(&client, &url, &lead).await {
                Ok(()) => info!(lead_id = %lead.id, url = %url, "Lead delivered"),
                Err(e) => warn!(lead_id = %lead.id, url = %url, error = %e, "Lead delivery failed"),
            }
        });
    }
}
