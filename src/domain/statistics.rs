//! Order statistics for customers and administrators

use crate::domain::order::{Order, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of orders in each status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub new: u64,
    pub pending: u64,
    pub completed: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    fn record(&mut self, status: OrderStatus) {
        match status {
            OrderStatus::New => self.new += 1,
            OrderStatus::Pending => self.pending += 1,
            OrderStatus::Completed => self.completed += 1,
            OrderStatus::Cancelled => self.cancelled += 1,
        }
    }

    pub fn get(&self, status: OrderStatus) -> u64 {
        match status {
            OrderStatus::New => self.new,
            OrderStatus::Pending => self.pending,
            OrderStatus::Completed => self.completed,
            OrderStatus::Cancelled => self.cancelled,
        }
    }
}

/// A customer's order summary
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderStatistics {
    pub total_orders: u64,
    pub by_status: StatusCounts,
    pub total_spent: Decimal,
    pub average_order_value: Decimal,
}

impl OrderStatistics {
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut stats = Self::default();
        for order in orders {
            stats.total_orders += 1;
            stats.by_status.record(order.status);
            stats.total_spent += order.order_price;
        }
        stats.average_order_value = average(stats.total_spent, stats.total_orders);
        stats
    }
}

/// Shop-wide order summary
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdminStatistics {
    pub total_orders: u64,
    pub distinct_customers: u64,
    pub total_revenue: Decimal,
    pub by_status: StatusCounts,
    pub average_order_value: Decimal,
}

impl AdminStatistics {
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut stats = Self::default();
        let mut customers = HashSet::new();
        for order in orders {
            stats.total_orders += 1;
            stats.by_status.record(order.status);
            stats.total_revenue += order.order_price;
            customers.insert(order.user_id);
        }
        stats.distinct_customers = customers.len() as u64;
        stats.average_order_value = average(stats.total_revenue, stats.total_orders);
        stats
    }
}

fn average(total: Decimal, count: u64) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        (total / Decimal::from(count)).round_dp(2)
    }
}
