use crate::filters::{
    CustomerField, CustomerFilter, OrderBy, OrderField, OrderFilter, Page, ProductField,
    ProductFilter,
};
use crate::graphql::schema::GraphQLContext;
use crate::graphql::types::connection::{CountedConnection, Window};
use crate::graphql::types::inputs::parse_id;
use crate::graphql::types::{
    CrmReport, Customer, CustomerFilterInput, Order, OrderFilterInput, Product,
    ProductFilterInput,
};
use crate::validation::{INVALID_CUSTOMER, INVALID_PRODUCT};
use async_graphql::connection::query;
use async_graphql::{Context, ErrorExtensions, FieldResult, Object, ID};

/// Root query object for GraphQL
pub struct Query;

#[Object]
impl Query {
    /// Liveness probe for GraphQL clients
    async fn hello(&self) -> &'static str {
        "Hello, GraphQL!"
    }

    /// Get a customer by ID
    async fn customer(&self, ctx: &Context<'_>, id: ID) -> FieldResult<Option<Customer>> {
        let context = ctx.data::<GraphQLContext>()?;
        let customer_id = parse_id(&id, INVALID_CUSTOMER).map_err(|e| e.extend())?;

        match context.storage.get_customer(customer_id).await {
            Ok(customer) => Ok(customer.map(|c| c.into())),
            Err(e) => Err(e.extend()),
        }
    }

    /// Get all customers with optional pagination
    async fn customers(
        &self,
        ctx: &Context<'_>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> FieldResult<Vec<Customer>> {
        let context = ctx.data::<GraphQLContext>()?;

        match context
            .storage
            .query_customers(
                &CustomerFilter::default(),
                OrderBy::default(),
                Page::from_args(limit, offset),
            )
            .await
        {
            Ok(customers) => Ok(customers.into_iter().map(|c| c.into()).collect()),
            Err(e) => Err(e.extend()),
        }
    }

    /// Filtered, ordered customers as a Relay connection
    async fn all_customers(
        &self,
        ctx: &Context<'_>,
        filter: Option<CustomerFilterInput>,
        order_by: Option<String>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> FieldResult<CountedConnection<Customer>> {
        let context = ctx.data::<GraphQLContext>()?;
        let storage = context.storage.clone();
        let filter: CustomerFilter = filter.map(Into::into).unwrap_or_default();
        let order = OrderBy::<CustomerField>::parse(order_by.as_deref()).map_err(|e| e.extend())?;

        query(after, before, first, last, |after, before, first, last| async move {
            let (total, customers) = storage
                .page_customers(&filter, order, &|total| {
                    Window::new(total, after, before, first, last).page()
                })
                .await
                .map_err(|e| e.extend())?;
            let window = Window::new(total, after, before, first, last);
            Ok::<_, async_graphql::Error>(
                window.into_connection(customers.into_iter().map(Customer::from)),
            )
        })
        .await
    }

    /// Get a product by ID
    async fn product(&self, ctx: &Context<'_>, id: ID) -> FieldResult<Option<Product>> {
        let context = ctx.data::<GraphQLContext>()?;
        let product_id = parse_id(&id, INVALID_PRODUCT).map_err(|e| e.extend())?;

        match context.storage.get_product(product_id).await {
            Ok(product) => Ok(product.map(|p| p.into())),
            Err(e) => Err(e.extend()),
        }
    }

    /// Get all products with optional pagination
    async fn products(
        &self,
        ctx: &Context<'_>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> FieldResult<Vec<Product>> {
        let context = ctx.data::<GraphQLContext>()?;

        match context
            .storage
            .query_products(
                &ProductFilter::default(),
                OrderBy::default(),
                Page::from_args(limit, offset),
            )
            .await
        {
            Ok(products) => Ok(products.into_iter().map(|p| p.into()).collect()),
            Err(e) => Err(e.extend()),
        }
    }

    /// Filtered, ordered products as a Relay connection
    async fn all_products(
        &self,
        ctx: &Context<'_>,
        filter: Option<ProductFilterInput>,
        order_by: Option<String>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> FieldResult<CountedConnection<Product>> {
        let context = ctx.data::<GraphQLContext>()?;
        let storage = context.storage.clone();
        let filter: ProductFilter = filter.map(Into::into).unwrap_or_default();
        let order = OrderBy::<ProductField>::parse(order_by.as_deref()).map_err(|e| e.extend())?;

        query(after, before, first, last, |after, before, first, last| async move {
            let (total, products) = storage
                .page_products(&filter, order, &|total| {
                    Window::new(total, after, before, first, last).page()
                })
                .await
                .map_err(|e| e.extend())?;
            let window = Window::new(total, after, before, first, last);
            Ok::<_, async_graphql::Error>(
                window.into_connection(products.into_iter().map(Product::from)),
            )
        })
        .await
    }

    /// Get an order by ID
    async fn order(&self, ctx: &Context<'_>, id: ID) -> FieldResult<Option<Order>> {
        let context = ctx.data::<GraphQLContext>()?;
        let order_id = parse_id(&id, "Invalid order ID").map_err(|e| e.extend())?;

        match context.storage.get_order(order_id).await {
            Ok(order) => Ok(order.map(|o| o.into())),
            Err(e) => Err(e.extend()),
        }
    }

    /// Get all orders with optional pagination
    async fn orders(
        &self,
        ctx: &Context<'_>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> FieldResult<Vec<Order>> {
        let context = ctx.data::<GraphQLContext>()?;

        match context
            .storage
            .query_orders(
                &OrderFilter::default(),
                OrderBy::default(),
                Page::from_args(limit, offset),
            )
            .await
        {
            Ok(orders) => Ok(orders.into_iter().map(|o| o.into()).collect()),
            Err(e) => Err(e.extend()),
        }
    }

    /// Filtered, ordered orders as a Relay connection
    async fn all_orders(
        &self,
        ctx: &Context<'_>,
        filter: Option<OrderFilterInput>,
        order_by: Option<String>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> FieldResult<CountedConnection<Order>> {
        let context = ctx.data::<GraphQLContext>()?;
        let storage = context.storage.clone();
        let filter = match filter {
            Some(input) => OrderFilter::try_from(input).map_err(|e| e.extend())?,
            None => OrderFilter::default(),
        };
        let order = OrderBy::<OrderField>::parse(order_by.as_deref()).map_err(|e| e.extend())?;

        query(after, before, first, last, |after, before, first, last| async move {
            let (total, orders) = storage
                .page_orders(&filter, order, &|total| {
                    Window::new(total, after, before, first, last).page()
                })
                .await
                .map_err(|e| e.extend())?;
            let window = Window::new(total, after, before, first, last);
            Ok::<_, async_graphql::Error>(window.into_connection(orders.into_iter().map(Order::from)))
        })
        .await
    }

    /// Aggregate totals across all customers and orders
    async fn crm_report(&self, ctx: &Context<'_>) -> FieldResult<CrmReport> {
        let context = ctx.data::<GraphQLContext>()?;

        match context.storage.totals().await {
            Ok(totals) => Ok(totals.into()),
            Err(e) => Err(e.extend()),
        }
    }
}
