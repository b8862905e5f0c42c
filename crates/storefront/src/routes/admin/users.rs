//! User administration: filters, role changes, bulk block and delete.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::models::User;
use emporium_core::pagination::PageRequest;
use emporium_core::parse_id_list;
use emporium_core::validation::forms::UserUpdate;
use emporium_core::{UserId, UserRole, UserStatus};

use super::{
    BulkForm, ReturnForm, SelectAllForm, SelectForm, back_to, bulk_targets, finish_bulk, id_param,
    nothing_selected, select_rows, toggle_row,
};
use crate::api::{Caller, UserQuery};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::flash_failure;
use crate::services::bulk::run_sequential;
use crate::state::AppState;
use crate::store::{BulkTable, Chrome, ModalKind, Store};
use crate::views::{Pager, SelectOption};

const USERS_PER_PAGE: u32 = 25;
const USERS_PATH: &str = "/admin/users";

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub role: Option<String>,
    pub status: Option<String>,
    pub q: Option<String>,
    pub page: Option<String>,
}

impl UserListParams {
    fn role(&self) -> Option<UserRole> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }

    fn status(&self) -> Option<UserStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }

    fn q(&self) -> String {
        self.q.as_deref().map(str::trim).unwrap_or_default().to_string()
    }

    fn page(&self) -> Option<u32> {
        self.page.as_deref().and_then(|p| p.trim().parse().ok())
    }

    /// Query string that reproduces these filters, used as `return_to`.
    fn filters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("role", self.role().map_or_else(String::new, |r| r.as_str().to_string())),
            ("status", self.status().map_or_else(String::new, |s| s.as_str().to_string())),
            ("q", self.q()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: &'static str,
    pub blocked: bool,
    pub joined: String,
    pub selected: bool,
    pub roles: Vec<SelectOption>,
}

impl UserRow {
    fn new(user: &User, selected: bool) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.to_string(),
            role: user.role.label(),
            blocked: user.is_blocked(),
            joined: user.created_at.format("%b %d, %Y").to_string(),
            selected,
            roles: UserRole::ALL
                .into_iter()
                .map(|r| SelectOption::new(r.as_str(), r.label(), user.role.as_str()))
                .collect(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub chrome: Chrome,
    pub users: Vec<UserRow>,
    pub pager: Pager,
    pub q: String,
    pub roles: Vec<SelectOption>,
    pub statuses: Vec<SelectOption>,
    /// Ids on this page, for "select all".
    pub page_ids: String,
    pub selected: usize,
    pub return_to: String,
}

/// User list with filters and selection checkboxes.
#[instrument(skip(state, store, user))]
pub async fn index(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
    Query(params): Query<UserListParams>,
) -> Result<UsersTemplate, AppError> {
    let query = UserQuery {
        page: PageRequest::new(params.page(), Some(USERS_PER_PAGE)),
        role: params.role(),
        status: params.status(),
        q: Some(params.q()),
    };
    let page = state.api().users(Caller::user(&user), &query).await?;
    let selection = store.selection::<UserId>(BulkTable::Users).await;

    let filters = params.filters();
    let pager = Pager::new(&page, USERS_PATH, &filters);
    let role = query.role.map_or("", UserRole::as_str);
    let status = query.status.map_or("", UserStatus::as_str);

    let mut roles = vec![SelectOption::any("All roles", role)];
    roles.extend(
        UserRole::ALL
            .into_iter()
            .map(|r| SelectOption::new(r.as_str(), r.label(), role)),
    );
    let statuses = vec![
        SelectOption::any("Any status", status),
        SelectOption::new("active", "Active", status),
        SelectOption::new("blocked", "Blocked", status),
    ];

    let ids: Vec<UserId> = page.items.iter().map(|u| u.id).collect();
    Ok(UsersTemplate {
        users: page
            .items
            .iter()
            .map(|u| UserRow::new(u, selection.contains(u.id)))
            .collect(),
        return_to: pager
            .links
            .iter()
            .find(|l| l.current)
            .map_or_else(|| USERS_PATH.to_string(), |l| l.href.clone()),
        pager,
        q: params.q(),
        roles,
        statuses,
        page_ids: id_param(&ids),
        selected: selection.len(),
        chrome: store.chrome().await,
    })
}

#[instrument(skip(store, _user))]
pub async fn select(
    store: Store,
    RequireAdmin(_user): RequireAdmin,
    Form(form): Form<SelectForm>,
) -> Result<Response, AppError> {
    toggle_row::<UserId>(&store, BulkTable::Users, &form.id).await?;
    Ok(back_to(form.return_to.as_deref(), USERS_PATH))
}

#[instrument(skip(store, _user))]
pub async fn select_all(
    store: Store,
    RequireAdmin(_user): RequireAdmin,
    Form(form): Form<SelectAllForm>,
) -> Result<Response, AppError> {
    select_rows::<UserId>(&store, BulkTable::Users, &form.ids).await?;
    Ok(back_to(form.return_to.as_deref(), USERS_PATH))
}

#[instrument(skip(store, _user))]
pub async fn clear_selection(
    store: Store,
    RequireAdmin(_user): RequireAdmin,
    Form(form): Form<ReturnForm>,
) -> Result<Response, AppError> {
    store.clear_selection(BulkTable::Users).await?;
    Ok(back_to(form.return_to.as_deref(), USERS_PATH))
}

/// Set every selected user's status, one PATCH per user.
async fn set_status(
    state: &AppState,
    store: &Store,
    user: &crate::store::CurrentUser,
    raw_ids: &str,
    status: UserStatus,
) -> Result<Response, AppError> {
    let ids: Vec<UserId> = bulk_targets(store, BulkTable::Users, raw_ids).await?;
    if ids.is_empty() {
        nothing_selected(store).await?;
        return Ok(Redirect::to(USERS_PATH).into_response());
    }

    let api = state.api();
    let caller = Caller::user(user);
    let update = UserUpdate {
        status: Some(status),
        ..UserUpdate::default()
    };
    let (label, verb) = match status {
        UserStatus::Blocked => ("block users", "Blocked"),
        UserStatus::Active => ("unblock users", "Unblocked"),
    };
    let outcome = run_sequential(label, &ids, |id| async move {
        api.update_user(caller, id, &update).await.map(drop)
    })
    .await;

    api.invalidate_users().await;
    finish_bulk(store, BulkTable::Users, &outcome, verb, "user").await?;
    Ok(Redirect::to(USERS_PATH).into_response())
}

#[instrument(skip(state, store, user))]
pub async fn bulk_block(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
    Form(form): Form<BulkForm>,
) -> Result<Response, AppError> {
    set_status(&state, &store, &user, &form.ids, UserStatus::Blocked).await
}

#[instrument(skip(state, store, user))]
pub async fn bulk_unblock(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
    Form(form): Form<BulkForm>,
) -> Result<Response, AppError> {
    set_status(&state, &store, &user, &form.ids, UserStatus::Active).await
}

/// Ask for confirmation before deleting the selected users.
#[instrument(skip(store, _user))]
pub async fn confirm_bulk_delete(
    store: Store,
    RequireAdmin(_user): RequireAdmin,
    Form(form): Form<BulkForm>,
) -> Result<Response, AppError> {
    let ids: Vec<UserId> = bulk_targets(&store, BulkTable::Users, &form.ids).await?;
    if ids.is_empty() {
        nothing_selected(&store).await?;
    } else {
        store.open_modal(ModalKind::DeleteUsers, id_param(&ids)).await?;
    }
    Ok(Redirect::to(USERS_PATH).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ConfirmForm {
    #[serde(default)]
    pub target: String,
}

/// Delete the users named by the confirmed dialog.
#[instrument(skip(state, store, user))]
pub async fn bulk_delete(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
    Form(form): Form<ConfirmForm>,
) -> Result<Response, AppError> {
    if !store
        .take_modal_if(ModalKind::DeleteUsers, &form.target)
        .await?
    {
        return Ok(Redirect::to(USERS_PATH).into_response());
    }

    let ids: Vec<UserId> = parse_id_list(&form.target)
        .map_err(|_| AppError::BadRequest(format!("Invalid id list: {}", form.target)))?;
    let api = state.api();
    let caller = Caller::user(&user);
    let outcome = run_sequential("delete users", &ids, |id| async move {
        api.delete_user(caller, id).await
    })
    .await;

    api.invalidate_users().await;
    finish_bulk(&store, BulkTable::Users, &outcome, "Deleted", "user").await?;
    Ok(Redirect::to(USERS_PATH).into_response())
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: UserRole,
    pub return_to: Option<String>,
}

/// Change one user's role. Cached list pages are patched in place.
#[instrument(skip(state, store, user))]
pub async fn change_role(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<UserId>,
    Form(form): Form<RoleForm>,
) -> Result<Response, AppError> {
    let update = UserUpdate {
        role: Some(form.role),
        ..UserUpdate::default()
    };
    match state.api().update_user(Caller::user(&user), id, &update).await {
        Ok(updated) => {
            let patched = state.api().apply_user_update(&updated).await;
            tracing::info!(user_id = %id, role = %updated.role, patched, "User role changed");
            store
                .flash_success(format!("{} is now {}.", updated.name, updated.role.label()))
                .await?;
        }
        Err(e) => flash_failure(&store, e).await?,
    }
    Ok(back_to(form.return_to.as_deref(), USERS_PATH))
}
