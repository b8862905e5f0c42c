//! View models shared by several templates.
//!
//! Templates stay logic-free: anything that needs formatting, comparisons or
//! URL building is computed here first.

use url::form_urlencoded;

use emporium_core::models::analytics::RevenueBar;
use emporium_core::models::{AnalyticsSnapshot, Order, OrderItem, Product};
use emporium_core::pagination::Page;
use emporium_core::{OrderStatus, ProductId};

use crate::store::{Modal, ModalKind};

/// Page numbers shown around the current page.
const PAGER_WIDTH: u32 = 5;

#[derive(Debug, Clone)]
pub struct PageLink {
    pub number: u32,
    pub href: String,
    pub current: bool,
}

/// Pagination links that keep the active filters.
#[derive(Debug, Clone)]
pub struct Pager {
    pub page: u32,
    pub total_pages: u32,
    pub total: u64,
    pub prev: Option<String>,
    pub next: Option<String>,
    pub links: Vec<PageLink>,
}

fn page_href(path: &str, filters: &[(&str, String)], page: u32) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in filters.iter().filter(|(_, v)| !v.is_empty()) {
        query.append_pair(key, value);
    }
    query.append_pair("page", &page.to_string());
    format!("{path}?{}", query.finish())
}

impl Pager {
    #[must_use]
    pub fn new<T>(page: &Page<T>, path: &str, filters: &[(&str, String)]) -> Self {
        Self {
            page: page.page,
            total_pages: page.total_pages(),
            total: page.total,
            prev: page
                .has_prev()
                .then(|| page_href(path, filters, page.prev_page())),
            next: page
                .has_next()
                .then(|| page_href(path, filters, page.next_page())),
            links: page
                .window(PAGER_WIDTH)
                .into_iter()
                .map(|number| PageLink {
                    number,
                    href: page_href(path, filters, number),
                    current: number == page.page,
                })
                .collect(),
        }
    }

    /// Whether there is more than one page to link between.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.total_pages > 1
    }
}

/// One `<option>` of a `<select>`.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>, current: &str) -> Self {
        let value = value.into();
        Self {
            selected: value == current,
            label: label.into(),
            value,
        }
    }

    /// An "All" option with an empty value, selected when nothing is chosen.
    #[must_use]
    pub fn any(label: &str, current: &str) -> Self {
        Self::new("", label, current)
    }
}

/// Options for an order status `<select>`.
#[must_use]
pub fn order_status_options(statuses: &[OrderStatus], current: &str) -> Vec<SelectOption> {
    statuses
        .iter()
        .map(|status| SelectOption::new(status.as_str(), status.label(), current))
        .collect()
}

/// The order's own status followed by the ones it may move to.
#[must_use]
pub fn order_transition_options(status: OrderStatus) -> Vec<SelectOption> {
    let mut statuses = vec![status];
    statuses.extend_from_slice(status.next_statuses());
    order_status_options(&statuses, status.as_str())
}

/// Filled and empty stars for a 0-5 rating.
#[must_use]
pub fn stars(filled: u8) -> String {
    let filled = usize::from(filled.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

/// A product tile in grids and lists.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub price: String,
    pub was_price: Option<String>,
    pub stars: String,
    pub review_count: u32,
    pub stock: u32,
    pub in_stock: bool,
    pub low_stock: bool,
    pub active: bool,
    pub image_url: Option<String>,
    pub wishlisted: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, wishlisted: &[ProductId]) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price.to_string(),
            was_price: product
                .on_sale()
                .then(|| product.compare_at_price.map(|m| m.to_string()))
                .flatten(),
            stars: stars(product.stars()),
            review_count: product.review_count,
            stock: product.stock,
            in_stock: product.in_stock(),
            low_stock: product.low_stock(),
            active: product.active,
            image_url: product.image_url.clone(),
            wishlisted: wishlisted.contains(&product.id),
        }
    }
}

/// One row of an order table.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub id: String,
    pub placed: String,
    pub status: &'static str,
    pub status_class: &'static str,
    pub items: u32,
    pub total: String,
    pub ship_to: String,
    pub cancellable: bool,
    /// Delivered, cancelled and refunded orders no longer change status.
    pub terminal: bool,
    pub selected: bool,
    pub status_options: Vec<SelectOption>,
}

impl OrderRow {
    #[must_use]
    pub fn new(order: &Order, selected: bool) -> Self {
        Self {
            id: order.id.to_string(),
            placed: order.created_at.format("%b %d, %Y").to_string(),
            status: order.status.label(),
            status_class: order.status.as_str(),
            items: order.item_count(),
            total: order.total.to_string(),
            ship_to: order
                .shipping_address
                .as_ref()
                .map(emporium_core::models::Address::one_line)
                .unwrap_or_default(),
            cancellable: order.status.is_cancellable(),
            terminal: order.status.is_terminal(),
            selected,
            status_options: order_transition_options(order.status),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.to_string(),
            line_total: item.line_total().to_string(),
        }
    }
}

/// A single order with its items and totals.
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub row: OrderRow,
    pub items: Vec<OrderItemView>,
    pub subtotal: String,
    pub shipping: String,
    pub updated: String,
}

impl OrderDetail {
    #[must_use]
    pub fn new(order: &Order) -> Self {
        Self {
            row: OrderRow::new(order, false),
            items: order.items.iter().map(OrderItemView::from).collect(),
            subtotal: order.subtotal.to_string(),
            shipping: order.shipping.to_string(),
            updated: order.updated_at.format("%b %d, %Y %H:%M").to_string(),
        }
    }
}

/// A labelled number on a dashboard.
#[derive(Debug, Clone)]
pub struct StatTile {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct TopProductRow {
    pub id: ProductId,
    pub name: String,
    pub units: u64,
    pub revenue: String,
}

/// Dashboard numbers shared by the vendor and admin consoles.
#[derive(Debug, Clone)]
pub struct AnalyticsView {
    pub tiles: Vec<StatTile>,
    pub statuses: Vec<StatTile>,
    pub bars: Vec<RevenueBar>,
    pub top_products: Vec<TopProductRow>,
    pub generated: String,
}

impl AnalyticsView {
    /// `marketplace` adds customer and product counts, which only the admin
    /// snapshot fills in.
    #[must_use]
    pub fn new(snapshot: &AnalyticsSnapshot, marketplace: bool) -> Self {
        let mut tiles = vec![
            StatTile {
                label: "Revenue",
                value: snapshot.revenue.to_string(),
            },
            StatTile {
                label: "Orders",
                value: snapshot.order_count.to_string(),
            },
            StatTile {
                label: "Average order",
                value: snapshot.average_order_value.to_string(),
            },
        ];
        if marketplace {
            tiles.push(StatTile {
                label: "Customers",
                value: snapshot.customer_count.to_string(),
            });
            tiles.push(StatTile {
                label: "Products",
                value: snapshot.product_count.to_string(),
            });
        }

        Self {
            tiles,
            statuses: OrderStatus::ALL
                .into_iter()
                .map(|status| StatTile {
                    label: status.label(),
                    value: snapshot.count_for(status).to_string(),
                })
                .collect(),
            bars: snapshot.revenue_bars(),
            top_products: snapshot
                .top_products
                .iter()
                .map(|p| TopProductRow {
                    id: p.product_id,
                    name: p.name.clone(),
                    units: p.units_sold,
                    revenue: p.revenue.to_string(),
                })
                .collect(),
            generated: snapshot.generated_at.format("%b %d, %Y %H:%M UTC").to_string(),
        }
    }
}

/// The confirmation dialog as rendered by the base layout.
#[derive(Debug, Clone)]
pub struct ModalView {
    pub title: String,
    pub message: String,
    /// Where the confirm button posts.
    pub action: String,
    pub confirm_label: &'static str,
    /// Posted back with the confirmation.
    pub target: String,
    /// Page the dialog belongs to; cancelling returns there.
    pub back: String,
}

impl ModalView {
    #[must_use]
    pub fn new(modal: &Modal) -> Self {
        let target = modal.target.clone();
        let (title, message, action, confirm_label, back) = match modal.kind {
            ModalKind::DeleteProduct => (
                "Delete product?".to_string(),
                format!("Product #{target} will be removed from the catalog. This cannot be undone."),
                format!("/vendor/products/{target}/delete/confirm"),
                "Delete product",
                "/vendor/products".to_string(),
            ),
            ModalKind::DeleteWishlist => (
                "Delete wishlist?".to_string(),
                "The wishlist and the products saved in it will be removed.".to_string(),
                format!("/wishlists/{target}/delete/confirm"),
                "Delete wishlist",
                "/wishlists".to_string(),
            ),
            ModalKind::DeleteCategory => (
                "Delete category?".to_string(),
                "Products in this category will no longer be grouped under it.".to_string(),
                format!("/admin/categories/{target}/delete/confirm"),
                "Delete category",
                "/admin/categories".to_string(),
            ),
            ModalKind::CancelOrder => (
                format!("Cancel order #{target}?"),
                "The order will be cancelled. This cannot be undone.".to_string(),
                format!("/account/orders/{target}/cancel/confirm"),
                "Cancel order",
                format!("/account/orders/{target}"),
            ),
            ModalKind::DeleteUsers => {
                let count = target.split(',').filter(|id| !id.trim().is_empty()).count();
                let plural = if count == 1 { "" } else { "s" };
                (
                    format!("Delete {count} user{plural}?"),
                    "Accounts are removed one at a time. This cannot be undone.".to_string(),
                    "/admin/users/bulk/delete/confirm".to_string(),
                    "Delete",
                    "/admin/users".to_string(),
                )
            }
        };
        Self {
            title,
            message,
            action,
            confirm_label,
            target,
            back,
        }
    }
}

/// Keep redirects on this site.
#[must_use]
pub fn local_path(candidate: Option<&str>, fallback: &str) -> String {
    candidate
        .filter(|p| p.starts_with('/') && !p.starts_with("//"))
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(total: u64, page: u32) -> Page<()> {
        Page {
            items: Vec::new(),
            total,
            page,
            per_page: 10,
        }
    }

    #[test]
    fn test_pager_keeps_filters() {
        let pager = Pager::new(
            &page(45, 2),
            "/products",
            &[("q", "desk lamp".to_string()), ("category", String::new())],
        );
        assert_eq!(pager.total_pages, 5);
        assert_eq!(pager.prev.as_deref(), Some("/products?q=desk+lamp&page=1"));
        assert_eq!(pager.next.as_deref(), Some("/products?q=desk+lamp&page=3"));
        let current: Vec<u32> = pager.links.iter().filter(|l| l.current).map(|l| l.number).collect();
        assert_eq!(current, vec![2]);
    }

    #[test]
    fn test_single_page_is_hidden() {
        let pager = Pager::new(&page(3, 1), "/orders", &[]);
        assert!(!pager.is_visible());
        assert!(pager.prev.is_none() && pager.next.is_none());
    }

    #[test]
    fn test_stars() {
        assert_eq!(stars(3), "★★★☆☆");
        assert_eq!(stars(9), "★★★★★");
    }

    #[test]
    fn test_local_path() {
        assert_eq!(local_path(Some("/cart"), "/"), "/cart");
        assert_eq!(local_path(Some("//evil.example"), "/"), "/");
        assert_eq!(local_path(Some("https://evil.example"), "/"), "/");
        assert_eq!(local_path(None, "/wishlists"), "/wishlists");
    }

    #[test]
    fn test_modal_view_for_bulk_delete() {
        let view = ModalView::new(&Modal {
            kind: ModalKind::DeleteUsers,
            target: "3,9".to_string(),
        });
        assert_eq!(view.title, "Delete 2 users?");
        assert_eq!(view.action, "/admin/users/bulk/delete/confirm");
        assert_eq!(view.target, "3,9");
    }

    #[test]
    fn test_select_option() {
        let option = SelectOption::new("shipped", "Shipped", "shipped");
        assert!(option.selected);
        assert!(!SelectOption::any("All", "shipped").selected);
        assert!(SelectOption::any("All", "").selected);
    }

    #[test]
    fn test_row_status_options_offer_only_allowed_moves() {
        let values: Vec<String> = order_transition_options(OrderStatus::Shipped)
            .into_iter()
            .map(|o| o.value)
            .collect();
        assert_eq!(values, ["shipped", "delivered", "refunded"]);

        let options = order_transition_options(OrderStatus::Pending);
        assert!(options[0].selected);
        assert!(options.iter().all(|o| o.value != "shipped"));
    }
}
