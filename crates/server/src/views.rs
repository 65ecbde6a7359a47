//! Server-rendered markup for the todo page.
//!
//! The page works without scripts: the form posts to `/todos` and the
//! checkboxes render their stored state. `assets/todo.js` layers the
//! in-place toggle and create flows on top.

use shared::domain::Todo;

pub(crate) const TODO_JS: &str = include_str!("assets/todo.js");
pub(crate) const APP_CSS: &str = include_str!("assets/app.css");

pub(crate) fn render_page(todos: &[Todo]) -> String {
    let items: String = todos.iter().map(render_todo_item).collect();
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Todos</title>
<link rel="stylesheet" href="/assets/app.css">
</head>
<body>
<main>
<h1>Todos</h1>
<ul id="todo-list">
{items}</ul>
{form}
</main>
<script src="/assets/todo.js" defer></script>
</body>
</html>
"#,
        form = render_new_todo_form(),
    )
}

pub(crate) fn render_todo_item(todo: &Todo) -> String {
    let id = todo.id;
    format!(
        r#"<li class="todo-item" data-id="{id}" data-version="{version}" data-completed="{completed}">
<input type="checkbox" id="todo-{id}"{checked}>
<label for="todo-{id}">{title}</label>
<span class="updated-at">{updated_at}</span>
<span class="toggle-error" role="alert" hidden></span>
</li>
"#,
        version = todo.version,
        completed = todo.is_completed,
        checked = if todo.is_completed { " checked" } else { "" },
        title = escape_html(&todo.title),
        updated_at = todo.updated_at_label(),
    )
}

pub(crate) fn render_new_todo_form() -> String {
    r#"<form id="new-todo" method="post" action="/todos">
<h2>Create a new Todo</h2>
<input type="text" name="title" autocomplete="off">
<button type="submit">Add Todo</button>
<p class="form-error" role="alert" hidden></p>
</form>"#
        .to_string()
}

pub(crate) fn render_error_page(message: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Todos</title><link rel="stylesheet" href="/assets/app.css"></head>
<body><main><h1>Something went wrong</h1><p class="form-error">{}</p><p><a href="/">Back to the list</a></p></main></body>
</html>
"#,
        escape_html(message)
    )
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
