use crate::domain::NewCustomer;
use crate::error::{CrmError, Result};
use crate::filters::{CustomerFilter, OrderFilter, ProductFilter};
use crate::validation::INVALID_PRODUCT;
use async_graphql::{InputObject, ID};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Parses a GraphQL ID into a numeric key, reporting `message` on failure.
pub fn parse_id(id: &ID, message: &str) -> Result<i64> {
    id.trim()
        .parse::<i64>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| CrmError::validation(message))
}

#[derive(InputObject, Clone, Debug)]
pub struct BulkCustomerInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl From<BulkCustomerInput> for NewCustomer {
    fn from(input: BulkCustomerInput) -> Self {
        NewCustomer {
            name: input.name,
            email: input.email,
            phone: input.phone,
        }
    }
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct CustomerFilterInput {
    pub name_icontains: Option<String>,
    pub email_icontains: Option<String>,
    pub created_at_gte: Option<DateTime<Utc>>,
    pub created_at_lte: Option<DateTime<Utc>>,
    /// Case-insensitive phone prefix, e.g. "+1"
    pub phone_pattern: Option<String>,
}

impl From<CustomerFilterInput> for CustomerFilter {
    fn from(input: CustomerFilterInput) -> Self {
        CustomerFilter {
            name_icontains: input.name_icontains,
            email_icontains: input.email_icontains,
            created_at_gte: input.created_at_gte,
            created_at_lte: input.created_at_lte,
            phone_pattern: input.phone_pattern,
        }
    }
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct ProductFilterInput {
    pub name_icontains: Option<String>,
    pub price_gte: Option<Decimal>,
    pub price_lte: Option<Decimal>,
    pub stock_gte: Option<i32>,
    pub stock_lte: Option<i32>,
    /// Only products with fewer than 10 units in stock
    pub low_stock: Option<bool>,
}

impl From<ProductFilterInput> for ProductFilter {
    fn from(input: ProductFilterInput) -> Self {
        ProductFilter {
            name_icontains: input.name_icontains,
            price_gte: input.price_gte,
            price_lte: input.price_lte,
            stock_gte: input.stock_gte,
            stock_lte: input.stock_lte,
            low_stock: input.low_stock,
        }
    }
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct OrderFilterInput {
    pub total_amount_gte: Option<Decimal>,
    pub total_amount_lte: Option<Decimal>,
    pub order_date_gte: Option<DateTime<Utc>>,
    pub order_date_lte: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the customer's name
    pub customer_name: Option<String>,
    /// Case-insensitive substring of any ordered product's name
    pub product_name: Option<String>,
    pub product_id: Option<ID>,
}

impl TryFrom<OrderFilterInput> for OrderFilter {
    type Error = CrmError;

    fn try_from(input: OrderFilterInput) -> Result<Self> {
        let product_id = match &input.product_id {
            Some(id) => Some(parse_id(id, INVALID_PRODUCT)?),
            None => None,
        };
        Ok(OrderFilter {
            total_amount_gte: input.total_amount_gte,
            total_amount_lte: input.total_amount_lte,
            order_date_gte: input.order_date_gte,
            order_date_lte: input.order_date_lte,
            customer_name: input.customer_name,
            product_name: input.product_name,
            product_id,
        })
    }
}
