//! Submitted forms and the request bodies they validate into.
//!
//! Form structs hold the raw strings exactly as typed so a failed submit can
//! re-render them. `validate()` either yields the typed body for the API call
//! or the field errors.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ValidationErrors, Validator};
use crate::models::Address;
use crate::types::{CategoryId, Email, Money, OrderStatus, ReviewStatus, UserRole};

const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 128;
const PRICE_MAX: u32 = 100_000;
const STOCK_MAX: u32 = 100_000;

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

fn password_rules(v: &mut Validator, password: &str, confirm: &str) {
    v.required("new_password", "Password", password)
        .range(
            "new_password",
            "Password length",
            password.chars().count(),
            PASSWORD_MIN,
            PASSWORD_MAX,
        )
        .matches(
            "confirm_password",
            confirm,
            password,
            "Passwords do not match",
        );
}

// =============================================================================
// Wishlists
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WishlistForm {
    #[serde(default)]
    pub name: String,
}

/// Body of `POST /wishlists`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewWishlist {
    pub name: String,
}

impl WishlistForm {
    /// # Errors
    ///
    /// Fails when the name is blank or longer than 50 characters.
    pub fn validate(&self) -> Result<NewWishlist, ValidationErrors> {
        let mut v = Validator::new();
        v.required("name", "Name", &self.name)
            .length("name", "Name", &self.name, 1, 50);
        v.finish()?;
        Ok(NewWishlist {
            name: trimmed(&self.name),
        })
    }
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub compare_at_price: String,
    #[serde(default)]
    pub stock: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub image_url: String,
}

/// Body of `POST /products` and `PATCH /products/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub stock: u32,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
}

impl ProductForm {
    /// Prefill the edit form from an existing product.
    #[must_use]
    pub fn from_product(product: &crate::models::Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.amount.to_string(),
            compare_at_price: product
                .compare_at_price
                .map(|m| m.amount.to_string())
                .unwrap_or_default(),
            stock: product.stock.to_string(),
            category_id: product
                .category_id
                .map(|c| c.to_string())
                .unwrap_or_default(),
            image_url: product.image_url.clone().unwrap_or_default(),
        }
    }

    /// # Errors
    ///
    /// Fails on a short/long name, an over-long description, a price outside
    /// `(0, 100000]`, a "was" price below the price, or stock outside
    /// `0..=100000`.
    pub fn validate(&self) -> Result<ProductInput, ValidationErrors> {
        let mut v = Validator::new();
        v.required("name", "Name", &self.name)
            .length("name", "Name", &self.name, 3, 120)
            .length("description", "Description", &self.description, 0, 2000);

        let price = self.price.trim().parse::<Decimal>().ok();
        v.check("price", price.is_some(), "Price must be a number");
        if let Some(price) = price {
            v.check(
                "price",
                price > Decimal::ZERO && price <= Decimal::from(PRICE_MAX),
                "Price must be greater than 0 and at most 100000",
            );
        }

        let compare_at = non_blank(Some(&self.compare_at_price));
        let compare_at_price = compare_at.as_deref().and_then(|s| s.parse::<Decimal>().ok());
        if compare_at.is_some() {
            v.check(
                "compare_at_price",
                compare_at_price.is_some(),
                "Compare-at price must be a number",
            );
        }
        if let (Some(was), Some(price)) = (compare_at_price, price) {
            v.check(
                "compare_at_price",
                was >= price,
                "Compare-at price must not be below the price",
            );
        }

        let stock = self.stock.trim().parse::<u32>().ok();
        v.check("stock", stock.is_some(), "Stock must be a whole number");
        if let Some(stock) = stock {
            v.range("stock", "Stock", stock, 0, STOCK_MAX);
        }

        let category_id = non_blank(Some(&self.category_id)).map(|s| s.parse::<CategoryId>());
        v.check(
            "category_id",
            !matches!(category_id, Some(Err(_))),
            "Choose a valid category",
        );

        v.finish()?;

        Ok(ProductInput {
            name: trimmed(&self.name),
            description: trimmed(&self.description),
            price: Money::new(price.unwrap_or_default().round_dp(2), Default::default()),
            compare_at_price: compare_at_price
                .map(|was| Money::new(was.round_dp(2), Default::default())),
            stock: stock.unwrap_or_default(),
            category_id: category_id.and_then(Result::ok),
            image_url: non_blank(Some(&self.image_url)),
        })
    }
}

// =============================================================================
// Reviews
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Body of `POST /products/{id}/reviews`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReview {
    pub rating: u8,
    pub title: String,
    pub body: String,
}

impl ReviewForm {
    /// # Errors
    ///
    /// Fails on a rating outside 1-5, a title outside 3-100 characters or a
    /// body outside 10-2000 characters.
    pub fn validate(&self) -> Result<NewReview, ValidationErrors> {
        let mut v = Validator::new();
        let rating = self.rating.trim().parse::<u8>().ok();
        v.check("rating", rating.is_some(), "Choose a rating");
        if let Some(rating) = rating {
            v.range("rating", "Rating", rating, 1, 5);
        }
        v.required("title", "Title", &self.title)
            .length("title", "Title", &self.title, 3, 100)
            .required("body", "Review", &self.body)
            .length("body", "Review", &self.body, 10, 2000);
        v.finish()?;

        Ok(NewReview {
            rating: rating.unwrap_or_default(),
            title: trimmed(&self.title),
            body: trimmed(&self.body),
        })
    }
}

/// Body of `PATCH /reviews/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewModeration {
    pub status: ReviewStatus,
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /auth/login`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: Email,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl LoginForm {
    /// # Errors
    ///
    /// Fails on a malformed email or an empty password.
    pub fn validate(&self) -> Result<Credentials, ValidationErrors> {
        let mut v = Validator::new();
        v.email("email", &self.email)
            .required("password", "Password", &self.password);
        v.finish()?;
        Ok(Credentials {
            email: Email::parse(&self.email).map_err(|_| ValidationErrors::default())?,
            password: self.password.clone(),
        })
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl fmt::Debug for RegisterForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Body of `POST /auth/register`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl RegisterForm {
    /// # Errors
    ///
    /// Fails on a name outside 2-80 characters, a malformed email, a password
    /// outside 8-128 characters or a mismatched confirmation.
    pub fn validate(&self) -> Result<Registration, ValidationErrors> {
        let mut v = Validator::new();
        v.required("name", "Name", &self.name)
            .length("name", "Name", &self.name, 2, 80)
            .email("email", &self.email);
        password_rules(&mut v, &self.new_password, &self.confirm_password);
        v.finish()?;
        Ok(Registration {
            name: trimmed(&self.name),
            email: Email::parse(&self.email).map_err(|_| ValidationErrors::default())?,
            password: self.new_password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Body of `PATCH /users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: Email,
}

impl ProfileForm {
    /// # Errors
    ///
    /// Fails on a name outside 2-80 characters or a malformed email.
    pub fn validate(&self) -> Result<ProfileUpdate, ValidationErrors> {
        let mut v = Validator::new();
        v.required("name", "Name", &self.name)
            .length("name", "Name", &self.name, 2, 80)
            .email("email", &self.email);
        v.finish()?;
        Ok(ProfileUpdate {
            name: trimmed(&self.name),
            email: Email::parse(&self.email).map_err(|_| ValidationErrors::default())?,
        })
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct PasswordChangeForm {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl fmt::Debug for PasswordChangeForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordChangeForm").finish_non_exhaustive()
    }
}

/// Body of `POST /users/me/password`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordChange").finish_non_exhaustive()
    }
}

impl PasswordChangeForm {
    /// # Errors
    ///
    /// Fails on a blank current password or a new password that breaks the
    /// length/confirmation rules.
    pub fn validate(&self) -> Result<PasswordChange, ValidationErrors> {
        let mut v = Validator::new();
        v.required("current_password", "Current password", &self.current_password);
        password_rules(&mut v, &self.new_password, &self.confirm_password);
        v.finish()?;
        Ok(PasswordChange {
            current_password: self.current_password.clone(),
            new_password: self.new_password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PasswordResetRequestForm {
    #[serde(default)]
    pub email: String,
}

/// Body of `POST /auth/password-reset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordResetRequest {
    pub email: Email,
}

impl PasswordResetRequestForm {
    /// # Errors
    ///
    /// Fails on a malformed email.
    pub fn validate(&self) -> Result<PasswordResetRequest, ValidationErrors> {
        let mut v = Validator::new();
        v.email("email", &self.email);
        v.finish()?;
        Ok(PasswordResetRequest {
            email: Email::parse(&self.email).map_err(|_| ValidationErrors::default())?,
        })
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct PasswordResetForm {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl fmt::Debug for PasswordResetForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordResetForm").finish_non_exhaustive()
    }
}

/// Body of `POST /auth/password-reset/confirm`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct PasswordReset {
    pub token: String,
    pub new_password: String,
}

impl fmt::Debug for PasswordReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordReset").finish_non_exhaustive()
    }
}

impl PasswordResetForm {
    /// # Errors
    ///
    /// Fails on a missing token or a new password that breaks the
    /// length/confirmation rules.
    pub fn validate(&self) -> Result<PasswordReset, ValidationErrors> {
        let mut v = Validator::new();
        v.required("token", "Reset token", &self.token);
        password_rules(&mut v, &self.new_password, &self.confirm_password);
        v.finish()?;
        Ok(PasswordReset {
            token: trimmed(&self.token),
            new_password: self.new_password.clone(),
        })
    }
}

// =============================================================================
// Checkout
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub shipping_address: Address,
}

impl CheckoutForm {
    /// # Errors
    ///
    /// Fails when a required address field is blank or the postal code is
    /// outside 3-12 characters.
    pub fn validate(&self) -> Result<NewOrder, ValidationErrors> {
        let mut v = Validator::new();
        v.required("full_name", "Full name", &self.full_name)
            .required("line1", "Address", &self.line1)
            .required("city", "City", &self.city)
            .required("postal_code", "Postal code", &self.postal_code)
            .length("postal_code", "Postal code", &self.postal_code, 3, 12)
            .required("country", "Country", &self.country);
        v.finish()?;
        Ok(NewOrder {
            shipping_address: Address {
                full_name: trimmed(&self.full_name),
                line1: trimmed(&self.line1),
                line2: non_blank(Some(&self.line2)),
                city: trimmed(&self.city),
                postal_code: trimmed(&self.postal_code),
                country: trimmed(&self.country),
            },
        })
    }
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
}

/// Body of `POST /categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
}

impl CategoryForm {
    /// # Errors
    ///
    /// Fails on a name outside 2-60 characters.
    pub fn validate(&self) -> Result<NewCategory, ValidationErrors> {
        let mut v = Validator::new();
        v.required("name", "Name", &self.name)
            .length("name", "Name", &self.name, 2, 60);
        v.finish()?;
        Ok(NewCategory {
            name: trimmed(&self.name),
            slug: slugify(&self.name),
        })
    }
}

/// Lowercase ASCII slug: alphanumerics kept, runs of anything else become one `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Body of `PATCH /users/{id}` for role changes and blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<crate::types::UserStatus>,
}

/// Body of `PATCH /orders/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}
