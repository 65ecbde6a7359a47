use shared::domain::{Todo, TodoId};
use tracing::{info, warn};

use crate::{
    error::GatewayError,
    gateway::MutationGateway,
    new_todo_form::{NewTodoForm, SubmitOutcome},
    todo_item::{ToggleOutcome, TodoListItem},
};

/// The single page: every todo followed by the creation form.
#[derive(Debug, Clone, Default)]
pub struct TodoList {
    items: Vec<TodoListItem>,
    form: NewTodoForm,
}

impl TodoList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_todos(todos: Vec<Todo>) -> Self {
        Self {
            items: todos.into_iter().map(TodoListItem::new).collect(),
            form: NewTodoForm::new(),
        }
    }

    /// Replaces every item with fresh records from the gateway.
    pub async fn load(&mut self, gateway: &dyn MutationGateway) -> Result<(), GatewayError> {
        let todos = gateway.list_todos().await.map_err(|error| {
            warn!(%error, "loading todos failed");
            error
        })?;
        info!(count = todos.len(), "todos loaded");
        self.items = todos.into_iter().map(TodoListItem::new).collect();
        Ok(())
    }

    pub fn items(&self) -> &[TodoListItem] {
        &self.items
    }

    pub fn item(&self, id: TodoId) -> Option<&TodoListItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn item_mut(&mut self, id: TodoId) -> Option<&mut TodoListItem> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    pub fn form(&self) -> &NewTodoForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut NewTodoForm {
        &mut self.form
    }

    pub fn push_created(&mut self, todo: Todo) {
        if self.item(todo.id).is_none() {
            self.items.push(TodoListItem::new(todo));
        }
    }

    /// Submits the form's current title and appends the created todo.
    pub async fn submit_form(&mut self, gateway: &dyn MutationGateway) -> SubmitOutcome {
        let data = self.form.form_data();
        let outcome = self.form.submit(gateway, &data).await;
        if let SubmitOutcome::Created(todo) = &outcome {
            self.push_created(todo.clone());
        }
        outcome
    }

    pub async fn toggle(
        &mut self,
        gateway: &dyn MutationGateway,
        id: TodoId,
        new_value: bool,
    ) -> Option<ToggleOutcome> {
        let item = self.item_mut(id)?;
        Some(item.toggle(gateway, new_value).await)
    }
}
