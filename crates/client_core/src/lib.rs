//! Component models for the todo page and the gateway they mutate through.

pub mod error;
pub mod gateway;
pub mod new_todo_form;
pub mod todo_item;
pub mod todo_list;

pub use error::GatewayError;
pub use gateway::{HttpGateway, MutationGateway};
pub use new_todo_form::{FormData, FormValue, NewTodoForm, SubmitOutcome};
pub use todo_item::{
    LabelStyle, ToggleOutcome, ToggleRequest, ToggleStatus, TodoListItem, MAX_TOGGLE_ATTEMPTS,
};
pub use todo_list::TodoList;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
