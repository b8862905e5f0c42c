//! Confirmation dialog dismissal.
//!
//! Opening a dialog is done by the page that owns the destructive action;
//! the dialog itself is rendered by the base layout from the client store.

use axum::{
    Form,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::store::Store;
use crate::views::local_path;

#[derive(Debug, Deserialize)]
pub struct DismissForm {
    pub return_to: Option<String>,
}

/// Close the dialog without doing anything.
#[instrument(skip(store))]
pub async fn dismiss(store: Store, Form(form): Form<DismissForm>) -> Result<Response, AppError> {
    store.close_modal().await?;
    Ok(Redirect::to(&local_path(form.return_to.as_deref(), "/")).into_response())
}
