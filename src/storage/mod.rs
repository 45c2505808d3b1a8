pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryStorage;
pub use sqlite::SqliteStorage;

use crate::domain::{CrmTotals, Customer, NewCustomer, NewOrder, NewProduct, Order, Product};
use crate::error::Result;
use crate::filters::{
    CustomerField, CustomerFilter, OrderBy, OrderField, OrderFilter, Page, ProductField,
    ProductFilter,
};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};

/// Chooses a page once the total number of matches is known.
pub type PageFor<'a> = &'a (dyn Fn(usize) -> Page + Send + Sync);

/// Persistence for CRM records.
///
/// `create_*` methods validate their input and enforce the store-level invariants
/// (unique email, existing relations), so every backend rejects the same inputs.
#[async_trait]
pub trait Storage: Send + Sync {
    // Customer operations
    async fn create_customer(&self, input: NewCustomer) -> Result<Customer>;
    /// Each record succeeds or fails on its own; successes are kept.
    async fn create_customers_bulk(&self, inputs: Vec<NewCustomer>) -> Result<Vec<Result<Customer>>>;
    async fn get_customer(&self, id: i64) -> Result<Option<Customer>>;
    async fn get_customers_by_ids(&self, ids: &[i64]) -> Result<Vec<Customer>>;
    async fn query_customers(
        &self,
        filter: &CustomerFilter,
        order: OrderBy<CustomerField>,
        page: Page,
    ) -> Result<Vec<Customer>>;
    /// Match count plus the page `page_for` picks from it, read under one lock.
    async fn page_customers(
        &self,
        filter: &CustomerFilter,
        order: OrderBy<CustomerField>,
        page_for: PageFor<'_>,
    ) -> Result<(usize, Vec<Customer>)>;

    // Product operations
    async fn create_product(&self, input: NewProduct) -> Result<Product>;
    async fn get_product(&self, id: i64) -> Result<Option<Product>>;
    async fn get_products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>>;
    async fn query_products(
        &self,
        filter: &ProductFilter,
        order: OrderBy<ProductField>,
        page: Page,
    ) -> Result<Vec<Product>>;
    async fn page_products(
        &self,
        filter: &ProductFilter,
        order: OrderBy<ProductField>,
        page_for: PageFor<'_>,
    ) -> Result<(usize, Vec<Product>)>;

    // Order operations
    async fn create_order(&self, input: NewOrder) -> Result<Order>;
    async fn get_order(&self, id: i64) -> Result<Option<Order>>;
    async fn query_orders(
        &self,
        filter: &OrderFilter,
        order: OrderBy<OrderField>,
        page: Page,
    ) -> Result<Vec<Order>>;
    async fn page_orders(
        &self,
        filter: &OrderFilter,
        order: OrderBy<OrderField>,
        page_for: PageFor<'_>,
    ) -> Result<(usize, Vec<Order>)>;
    async fn orders_for_customer(&self, customer_id: i64) -> Result<Vec<Order>>;

    /// Customer count, order count and summed order totals.
    async fn totals(&self) -> Result<CrmTotals>;
}

/// Timestamps are kept at microsecond precision so every backend round-trips them exactly.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn normalize_timestamp(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}
