//! Dashboard analytics snapshots.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::types::{Money, OrderStatus, ProductId};

/// Aggregates returned by `GET /admin/analytics` and
/// `GET /vendors/me/analytics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub revenue: Money,
    pub order_count: u64,
    #[serde(default)]
    pub customer_count: u64,
    #[serde(default)]
    pub product_count: u64,
    pub average_order_value: Money,
    #[serde(default)]
    pub orders_by_status: Vec<StatusCount>,
    #[serde(default)]
    pub top_products: Vec<TopProduct>,
    #[serde(default)]
    pub daily_revenue: Vec<DailyRevenue>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub units_sold: u64,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: Money,
}

/// A revenue bar scaled for the dashboard chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevenueBar {
    pub label: String,
    pub value: Money,
    /// Height in percent of the tallest bar (0-100).
    pub percent: u8,
}

impl AnalyticsSnapshot {
    /// Daily revenue scaled against the best day, for a CSS bar chart.
    #[must_use]
    pub fn revenue_bars(&self) -> Vec<RevenueBar> {
        let max = self
            .daily_revenue
            .iter()
            .map(|day| day.revenue.amount)
            .max()
            .unwrap_or_default();

        self.daily_revenue
            .iter()
            .map(|day| {
                let percent = if max.is_zero() {
                    0
                } else {
                    let scaled = (day.revenue.amount * rust_decimal::Decimal::ONE_HUNDRED / max)
                        .round()
                        .clamp(rust_decimal::Decimal::ZERO, rust_decimal::Decimal::ONE_HUNDRED);
                    scaled.to_u8().unwrap_or(100)
                };
                RevenueBar {
                    label: day.date.format("%b %d").to_string(),
                    value: day.revenue,
                    percent,
                }
            })
            .collect()
    }

    /// Order count for one status, zero when the backend omitted it.
    #[must_use]
    pub fn count_for(&self, status: OrderStatus) -> u64 {
        self.orders_by_status
            .iter()
            .find(|entry| entry.status == status)
            .map_or(0, |entry| entry.count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn snapshot(days: &[(u32, i64)]) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            revenue: Money::zero(),
            order_count: 0,
            customer_count: 0,
            product_count: 0,
            average_order_value: Money::zero(),
            orders_by_status: vec![StatusCount {
                status: OrderStatus::Shipped,
                count: 4,
            }],
            top_products: vec![],
            daily_revenue: days
                .iter()
                .map(|&(day, cents)| DailyRevenue {
                    date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
                    revenue: Money::from_cents(cents),
                })
                .collect(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_revenue_bars_scale_to_max() {
        let bars = snapshot(&[(1, 5000), (2, 10000), (3, 0)]).revenue_bars();
        let percents: Vec<u8> = bars.iter().map(|b| b.percent).collect();
        assert_eq!(percents, vec![50, 100, 0]);
        assert_eq!(bars[0].label, "Mar 01");
    }

    #[test]
    fn test_revenue_bars_all_zero() {
        let bars = snapshot(&[(1, 0), (2, 0)]).revenue_bars();
        assert!(bars.iter().all(|b| b.percent == 0));
    }

    #[test]
    fn test_count_for_missing_status() {
        let snap = snapshot(&[]);
        assert_eq!(snap.count_for(OrderStatus::Shipped), 4);
        assert_eq!(snap.count_for(OrderStatus::Pending), 0);
    }
}
