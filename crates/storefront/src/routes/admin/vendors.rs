//! Vendor directory.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use emporium_core::models::Vendor;

use crate::api::Caller;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::state::AppState;
use crate::store::{Chrome, Store};

#[derive(Debug, Clone)]
pub struct VendorRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub approved: bool,
    pub joined: String,
}

impl From<&Vendor> for VendorRow {
    fn from(vendor: &Vendor) -> Self {
        Self {
            id: vendor.id.to_string(),
            name: vendor.name.clone(),
            email: vendor.email.clone(),
            approved: vendor.approved,
            joined: vendor.created_at.format("%b %d, %Y").to_string(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/vendors.html")]
pub struct VendorsTemplate {
    pub chrome: Chrome,
    pub vendors: Vec<VendorRow>,
    pub pending: usize,
}

#[instrument(skip(state, store, user))]
pub async fn index(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
) -> Result<VendorsTemplate, AppError> {
    let vendors = state.api().vendors(Caller::user(&user)).await?;
    Ok(VendorsTemplate {
        pending: vendors.iter().filter(|v| !v.approved).count(),
        vendors: vendors.iter().map(VendorRow::from).collect(),
        chrome: store.chrome().await,
    })
}
