use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ids::StudentId;

/// Outbound notification hook (e-mail, SMS, or a message queue adapter).
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice) -> Result<(), NotifyError>;
}

/// Notification payload so routes and tests can assert integration boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub template: String,
    pub student: StudentId,
    pub details: BTreeMap<String, String>,
}

impl Notice {
    pub fn new(template: &str, student: &StudentId) -> Self {
        Self {
            template: template.to_string(),
            student: student.clone(),
            details: BTreeMap::new(),
        }
    }

    pub fn detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Fire and forget: a failed notification never undoes a committed mutation.
pub(crate) fn dispatch<N: Notifier + ?Sized>(notifier: &N, notice: Notice) {
    let template = notice.template.clone();
    let student = notice.student.clone();
    if let Err(err) = notifier.notify(notice) {
        warn!(%template, %student, error = %err, "notification failed");
    }
}
