use shared::{
    domain::{Todo, TodoId},
    error::{ApiError, ErrorCode},
    protocol::{validate_title, MutationRequest},
};
use storage::{SetCompletedOutcome, Storage};
use tracing::{info, warn};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub async fn list_todos(ctx: &ApiContext) -> Result<Vec<Todo>, ApiError> {
    let todos = ctx.storage.list_todos().await.map_err(internal)?;
    Ok(todos.into_iter().map(Todo::from).collect())
}

pub async fn create_todo(ctx: &ApiContext, raw_title: &str) -> Result<Todo, ApiError> {
    let title = validate_title(raw_title)?;
    let todo = ctx.storage.create_todo(&title).await.map_err(internal)?;
    info!(todo_id = %todo.id, "todo created");
    Ok(todo.into())
}

pub async fn set_completed(
    ctx: &ApiContext,
    id: TodoId,
    completed: bool,
    version: Option<u64>,
) -> Result<Todo, ApiError> {
    match ctx
        .storage
        .set_completed(id, completed, version)
        .await
        .map_err(internal)?
    {
        SetCompletedOutcome::Applied(todo) => {
            info!(
                todo_id = %todo.id,
                completed,
                version = todo.version,
                "todo completion updated"
            );
            Ok(todo.into())
        }
        SetCompletedOutcome::Stale { current } => Err(ApiError::conflict(
            format!(
                "version {} is not newer than stored version {}",
                version.unwrap_or_default(),
                current.version
            ),
            current.into(),
        )),
        SetCompletedOutcome::NotFound => Err(ApiError::new(ErrorCode::NotFound, "todo not found")),
    }
}

pub async fn dispatch(ctx: &ApiContext, request: MutationRequest) -> Result<Todo, ApiError> {
    match request {
        MutationRequest::CreateTodo { title } => create_todo(ctx, &title).await,
        MutationRequest::SetCompleted {
            id,
            completed,
            version,
        } => set_completed(ctx, id, completed, version).await,
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    warn!(error = %err, "storage failure");
    ApiError::new(ErrorCode::Internal, err.to_string())
}
