use crate::domain::Order as DomainOrder;
use crate::graphql::loaders::{CustomerLoader, ProductLoader};
use async_graphql::dataloader::DataLoader;
use async_graphql::{Context, FieldResult, Object, ID};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// GraphQL representation of an Order
#[derive(Clone)]
pub struct Order {
    pub inner: DomainOrder,
}

impl From<DomainOrder> for Order {
    fn from(order: DomainOrder) -> Self {
        Self { inner: order }
    }
}

#[Object]
impl Order {
    /// The unique identifier for the order
    async fn id(&self) -> ID {
        ID(self.inner.id.to_string())
    }

    /// Sum of the ordered products' prices at the time of ordering
    async fn total_amount(&self) -> Decimal {
        self.inner.total_amount
    }

    /// When the order was placed
    async fn order_date(&self) -> DateTime<Utc> {
        self.inner.order_date
    }

    /// The customer who placed the order
    async fn customer(&self, ctx: &Context<'_>) -> FieldResult<Option<super::customer::Customer>> {
        let loader = ctx.data::<DataLoader<CustomerLoader>>()?;
        let customer = loader.load_one(self.inner.customer_id).await?;
        Ok(customer.map(|c| c.into()))
    }

    /// Products included in the order
    async fn products(&self, ctx: &Context<'_>) -> FieldResult<Vec<super::product::Product>> {
        let loader = ctx.data::<DataLoader<ProductLoader>>()?;
        let mut found = loader.load_many(self.inner.product_ids.iter().copied()).await?;

        // load_many returns a map; keep the order's own product sequence
        Ok(self
            .inner
            .product_ids
            .iter()
            .filter_map(|id| found.remove(id))
            .map(|p| p.into())
            .collect())
    }
}
