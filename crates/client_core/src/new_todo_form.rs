use shared::domain::Todo;
use tracing::{debug, warn};

use crate::{error::GatewayError, gateway::MutationGateway};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File { filename: String, bytes: Vec<u8> },
}

/// Submitted form fields in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, FormValue::Text(value.into()));
        self
    }

    pub fn append(&mut self, name: impl Into<String>, value: FormValue) {
        self.entries.push((name.into(), value));
    }

    /// First value submitted under `name`.
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(Todo),
    /// Title missing, not text, or blank; nothing was sent.
    Ignored,
    Failed(GatewayError),
}

#[derive(Debug, Clone, Default)]
pub struct NewTodoForm {
    title: String,
    error: Option<GatewayError>,
}

impl NewTodoForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn error(&self) -> Option<&GatewayError> {
        self.error.as_ref()
    }

    pub fn form_data(&self) -> FormData {
        FormData::new().with_text("title", self.title.clone())
    }

    pub fn reset(&mut self) {
        self.title.clear();
        self.error = None;
    }

    /// Sends `title` to the gateway; `&mut self` keeps one submission in
    /// flight per form.
    pub async fn submit(
        &mut self,
        gateway: &dyn MutationGateway,
        data: &FormData,
    ) -> SubmitOutcome {
        let Some(FormValue::Text(title)) = data.get("title") else {
            debug!("ignoring submission without a text title");
            return SubmitOutcome::Ignored;
        };
        if title.trim().is_empty() {
            debug!("ignoring submission with a blank title");
            return SubmitOutcome::Ignored;
        }

        match gateway.create_todo(title).await {
            Ok(todo) => {
                self.reset();
                SubmitOutcome::Created(todo)
            }
            Err(error) => {
                warn!(%error, "creating todo failed");
                self.error = Some(error.clone());
                SubmitOutcome::Failed(error)
            }
        }
    }
}
