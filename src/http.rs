use crate::store::{Store, StoreError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;

const ADD_FORM: &str = r#"<html><body>
<form method="POST" action="/add">
URL: <input type="text" name="url">
<input type="submit" value="add">
</form>
</body></html>"#;

/// HTTP front end: a thin translation of form fields to store calls.
#[derive(Clone)]
pub struct HttpHandler {
    store: Arc<dyn Store>,
}

impl HttpHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/", get(|| async { Html(ADD_FORM) }))
            .route("/add", post(add))
            .route("/:key", get(redirect))
            .with_state(self.store)
    }
}

#[derive(Debug, Deserialize)]
struct AddForm {
    #[serde(default)]
    url: String,
}

#[derive(Debug)]
struct HttpError(StoreError);

impl From<StoreError> for HttpError {
    fn from(e: StoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self.0 {
            StoreError::NotFound(key) => {
                (StatusCode::NOT_FOUND, format!("key not found: {key}")).into_response()
            }
            StoreError::AlreadyExists(key) => (
                StatusCode::CONFLICT,
                format!("key already bound to a different url: {key}"),
            )
                .into_response(),
            StoreError::RemoteUnavailable(m) => {
                (StatusCode::BAD_GATEWAY, format!("master unavailable: {m}")).into_response()
            }
            e => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }
}

async fn add(
    State(store): State<Arc<dyn Store>>,
    Form(form): Form<AddForm>,
) -> Result<Response, HttpError> {
    if form.url.is_empty() {
        return Ok(Html(ADD_FORM).into_response());
    }
    let key = store.put(&form.url).await?;
    Ok(key.into_response())
}

async fn redirect(
    State(store): State<Arc<dyn Store>>,
    Path(key): Path<String>,
) -> Result<Redirect, HttpError> {
    let url = store.get(&key).await?;
    Ok(Redirect::temporary(&url))
}
