use super::{Customer, Order, Product};
use crate::domain::CrmTotals;
use async_graphql::SimpleObject;
use rust_decimal::Decimal;

#[derive(SimpleObject)]
pub struct CreateCustomerPayload {
    pub customer: Customer,
    pub message: String,
}

/// Created customers plus one `"Record <n>: <reason>"` entry per rejected input.
#[derive(SimpleObject)]
pub struct BulkCreateCustomersPayload {
    pub customers: Vec<Customer>,
    pub errors: Vec<String>,
}

#[derive(SimpleObject)]
pub struct CreateProductPayload {
    pub product: Product,
}

#[derive(SimpleObject)]
pub struct CreateOrderPayload {
    pub order: Order,
}

/// Aggregate CRM totals
#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct CrmReport {
    pub total_customers: i64,
    pub total_orders: i64,
    /// Sum of all order totals
    pub total_revenue: Decimal,
}

impl From<CrmTotals> for CrmReport {
    fn from(totals: CrmTotals) -> Self {
        Self {
            total_customers: totals.total_customers,
            total_orders: totals.total_orders,
            total_revenue: totals.total_revenue,
        }
    }
}
