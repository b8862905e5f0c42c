//! Category management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use emporium_core::CategoryId;
use emporium_core::models::Category;
use emporium_core::validation::ValidationErrors;
use emporium_core::validation::forms::CategoryForm;

use crate::api::Caller;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::{flash_failure, form_failure};
use crate::state::AppState;
use crate::store::{Chrome, CurrentUser, ModalKind, Store};

const CATEGORIES_PATH: &str = "/admin/categories";

#[derive(Template, WebTemplate)]
#[template(path = "admin/categories.html")]
pub struct CategoriesTemplate {
    pub chrome: Chrome,
    pub categories: Vec<Category>,
    pub form: CategoryForm,
    pub errors: ValidationErrors,
    pub form_error: Option<String>,
}

async fn render(
    state: &AppState,
    store: &Store,
    user: &CurrentUser,
    form: CategoryForm,
    errors: ValidationErrors,
    form_error: Option<String>,
) -> Result<Response, AppError> {
    let categories = state.api().categories(Caller::user(user)).await?;
    let status = if errors.is_empty() && form_error.is_none() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    let page = CategoriesTemplate {
        categories,
        form,
        errors,
        form_error,
        chrome: store.chrome().await,
    };
    Ok((status, page).into_response())
}

#[instrument(skip(state, store, user))]
pub async fn index(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
) -> Result<Response, AppError> {
    render(
        &state,
        &store,
        &user,
        CategoryForm::default(),
        ValidationErrors::default(),
        None,
    )
    .await
}

/// Add a category. Invalid names re-render the page without a request.
#[instrument(skip(state, store, user, form))]
pub async fn create(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
    Form(form): Form<CategoryForm>,
) -> Result<Response, AppError> {
    let category = match form.validate() {
        Ok(category) => category,
        Err(errors) => return render(&state, &store, &user, form, errors, None).await,
    };

    match state
        .api()
        .create_category(Caller::user(&user), &category)
        .await
    {
        Ok(created) => {
            tracing::info!(category_id = %created.id, slug = %created.slug, "Category created");
            store
                .flash_success(format!("Added category \"{}\".", created.name))
                .await?;
            Ok(Redirect::to(CATEGORIES_PATH).into_response())
        }
        Err(e) => {
            let message = form_failure(e)?;
            render(
                &state,
                &store,
                &user,
                form,
                ValidationErrors::default(),
                Some(message),
            )
            .await
        }
    }
}

#[instrument(skip(store, _user))]
pub async fn confirm_delete(
    store: Store,
    RequireAdmin(_user): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Response, AppError> {
    store
        .open_modal(ModalKind::DeleteCategory, id.to_string())
        .await?;
    Ok(Redirect::to(CATEGORIES_PATH).into_response())
}

#[instrument(skip(state, store, user))]
pub async fn delete(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Response, AppError> {
    if store
        .take_modal_if(ModalKind::DeleteCategory, &id.to_string())
        .await?
    {
        match state.api().delete_category(Caller::user(&user), id).await {
            Ok(()) => {
                tracing::info!(category_id = %id, "Category deleted");
                store.flash_success("Category deleted.").await?;
            }
            Err(e) => flash_failure(&store, e).await?,
        }
    }
    Ok(Redirect::to(CATEGORIES_PATH).into_response())
}
