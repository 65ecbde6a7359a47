//! One row of the list: a checkbox bound to `is_completed`, the title and
//! the last-updated label.
//!
//! The checkbox flips the moment the user clicks it. The write runs behind
//! it, tagged with a version token that grows with every click, so only the
//! newest click decides what the row settles on. A write rejected because
//! storage already holds a newer version resyncs to that record and is sent
//! again with a fresh token. If the newest write fails otherwise, the row
//! falls back to the last state storage confirmed and keeps the error around
//! for display.

use shared::domain::{Todo, TodoId};
use tracing::{debug, warn};

use crate::{error::GatewayError, gateway::MutationGateway};

/// Sends a toggle at most this many times when storage keeps reporting a
/// newer version.
pub const MAX_TOGGLE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleRequest {
    pub id: TodoId,
    pub completed: bool,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleStatus {
    Confirmed,
    Pending { version: u64 },
    Failed { error: GatewayError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Confirmed,
    /// A newer toggle was issued before this one resolved.
    Superseded,
    /// Storage held a newer version; the item adopted it and the click must
    /// be sent again as this request.
    Retry(ToggleRequest),
    Reverted(GatewayError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    Plain,
    Struck,
}

#[derive(Debug, Clone)]
pub struct TodoListItem {
    confirmed: Todo,
    checked: bool,
    next_version: u64,
    status: ToggleStatus,
}

impl TodoListItem {
    pub fn new(todo: Todo) -> Self {
        Self {
            checked: todo.is_completed,
            next_version: todo.version + 1,
            confirmed: todo,
            status: ToggleStatus::Confirmed,
        }
    }

    pub fn id(&self) -> TodoId {
        self.confirmed.id
    }

    /// Last record state storage acknowledged.
    pub fn todo(&self) -> &Todo {
        &self.confirmed
    }

    pub fn title(&self) -> &str {
        &self.confirmed.title
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn status(&self) -> &ToggleStatus {
        &self.status
    }

    pub fn error(&self) -> Option<&GatewayError> {
        match &self.status {
            ToggleStatus::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn label_style(&self) -> LabelStyle {
        if self.checked {
            LabelStyle::Struck
        } else {
            LabelStyle::Plain
        }
    }

    pub fn updated_at_label(&self) -> String {
        self.confirmed.updated_at_label()
    }

    pub fn begin_toggle(&mut self, new_value: bool) -> ToggleRequest {
        let version = self.next_version;
        self.next_version += 1;
        self.checked = new_value;
        self.status = ToggleStatus::Pending { version };
        ToggleRequest {
            id: self.confirmed.id,
            completed: new_value,
            version,
        }
    }

    /// Settles the write tagged `version`. A conflict on the newest write
    /// yields [`ToggleOutcome::Retry`]; the caller decides whether to send it.
    pub fn finish_toggle(
        &mut self,
        version: u64,
        result: Result<Todo, GatewayError>,
    ) -> ToggleOutcome {
        self.settle(version, result, true)
    }

    /// Sends the click, resending with fresh tokens while storage reports a
    /// newer version, up to [`MAX_TOGGLE_ATTEMPTS`] sends in total.
    pub async fn toggle(&mut self, gateway: &dyn MutationGateway, new_value: bool) -> ToggleOutcome {
        let mut request = self.begin_toggle(new_value);
        let mut attempt = 1;
        loop {
            let result = gateway
                .set_completed(request.id, request.completed, Some(request.version))
                .await;
            match self.settle(request.version, result, attempt < MAX_TOGGLE_ATTEMPTS) {
                ToggleOutcome::Retry(next) => {
                    attempt += 1;
                    request = next;
                }
                outcome => return outcome,
            }
        }
    }

    fn settle(
        &mut self,
        version: u64,
        result: Result<Todo, GatewayError>,
        may_retry: bool,
    ) -> ToggleOutcome {
        let is_latest =
            matches!(self.status, ToggleStatus::Pending { version: latest } if latest == version);

        match result {
            Ok(todo) => {
                self.adopt(todo);
                if !is_latest {
                    debug!(todo_id = %self.confirmed.id, version, "toggle superseded");
                    return ToggleOutcome::Superseded;
                }
                self.checked = self.confirmed.is_completed;
                self.status = ToggleStatus::Confirmed;
                ToggleOutcome::Confirmed
            }
            Err(mut error) => {
                if let GatewayError::Stale { current, .. } = &mut error {
                    if let Some(current) = current.take() {
                        self.adopt(*current);
                        if is_latest && may_retry {
                            debug!(
                                todo_id = %self.confirmed.id,
                                version,
                                stored = self.confirmed.version,
                                "toggle conflicted; resending"
                            );
                            return ToggleOutcome::Retry(self.begin_toggle(self.checked));
                        }
                    }
                }
                if !is_latest {
                    debug!(todo_id = %self.confirmed.id, version, %error, "superseded toggle failed");
                    return ToggleOutcome::Superseded;
                }
                warn!(todo_id = %self.confirmed.id, version, %error, "toggle failed; reverting");
                self.checked = self.confirmed.is_completed;
                self.status = ToggleStatus::Failed {
                    error: error.clone(),
                };
                ToggleOutcome::Reverted(error)
            }
        }
    }

    /// Takes `todo` as the confirmed record unless a newer one is known, and
    /// keeps the next token ahead of it.
    fn adopt(&mut self, todo: Todo) {
        if todo.version >= self.confirmed.version {
            self.confirmed = todo;
        }
        self.next_version = self.next_version.max(self.confirmed.version + 1);
    }
}
