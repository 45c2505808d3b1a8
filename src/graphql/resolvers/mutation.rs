use crate::domain::{NewCustomer, NewOrder, NewProduct};
use crate::error::{CrmError, Result};
use crate::graphql::schema::GraphQLContext;
use crate::graphql::types::inputs::parse_id;
use crate::graphql::types::{
    BulkCreateCustomersPayload, BulkCustomerInput, CreateCustomerPayload, CreateOrderPayload,
    CreateProductPayload,
};
use crate::metrics;
use crate::validation::{INVALID_CUSTOMER, INVALID_PRODUCT};
use async_graphql::{Context, ErrorExtensions, FieldResult, Object, ID};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Records the outcome of a mutation and converts failures into GraphQL errors.
fn finish<T>(mutation: &'static str, result: Result<T>) -> FieldResult<T> {
    match result {
        Ok(value) => {
            metrics::record_mutation(mutation, "ok");
            Ok(value)
        }
        Err(e) => {
            if matches!(e, CrmError::Validation(_)) {
                metrics::record_validation_error(mutation);
                warn!(mutation, error = %e, "Mutation rejected");
            } else {
                tracing::error!(mutation, error = %e, "Mutation failed");
            }
            metrics::record_mutation(mutation, "error");
            Err(e.extend())
        }
    }
}

/// Root mutation object for GraphQL
pub struct Mutation;

#[Object]
impl Mutation {
    /// Create one customer. Fails if the email is taken or the phone is malformed.
    async fn create_customer(
        &self,
        ctx: &Context<'_>,
        name: String,
        email: String,
        phone: Option<String>,
    ) -> FieldResult<CreateCustomerPayload> {
        let context = ctx.data::<GraphQLContext>()?;

        let result = context
            .storage
            .create_customer(NewCustomer { name, email, phone })
            .await
            .map(|customer| {
                info!("Created customer {} ({})", customer.id, customer.email);
                CreateCustomerPayload {
                    customer: customer.into(),
                    message: "Customer created successfully".to_string(),
                }
            });
        finish("create_customer", result)
    }

    /// Create many customers; valid records are kept even when others fail.
    async fn bulk_create_customers(
        &self,
        ctx: &Context<'_>,
        input: Vec<BulkCustomerInput>,
    ) -> FieldResult<BulkCreateCustomersPayload> {
        let context = ctx.data::<GraphQLContext>()?;
        let inputs: Vec<NewCustomer> = input.into_iter().map(Into::into).collect();

        let result = context
            .storage
            .create_customers_bulk(inputs)
            .await
            .map(|outcomes| {
                let mut customers = Vec::new();
                let mut errors = Vec::new();
                for (index, outcome) in outcomes.into_iter().enumerate() {
                    match outcome {
                        Ok(customer) => customers.push(customer.into()),
                        Err(e) => errors.push(format!("Record {}: {}", index + 1, e)),
                    }
                }
                info!(
                    created = customers.len(),
                    rejected = errors.len(),
                    "Bulk customer import finished"
                );
                BulkCreateCustomersPayload { customers, errors }
            });
        finish("bulk_create_customers", result)
    }

    /// Create a product with a positive price and non-negative stock.
    async fn create_product(
        &self,
        ctx: &Context<'_>,
        name: String,
        price: Decimal,
        #[graphql(default)] stock: i32,
    ) -> FieldResult<CreateProductPayload> {
        let context = ctx.data::<GraphQLContext>()?;

        let result = context
            .storage
            .create_product(NewProduct { name, price, stock })
            .await
            .map(|product| {
                info!("Created product {} ({})", product.id, product.name);
                CreateProductPayload {
                    product: product.into(),
                }
            });
        finish("create_product", result)
    }

    /// Create an order for an existing customer; the total is the sum of product prices.
    async fn create_order(
        &self,
        ctx: &Context<'_>,
        customer_id: ID,
        product_ids: Vec<ID>,
        order_date: Option<DateTime<Utc>>,
    ) -> FieldResult<CreateOrderPayload> {
        let context = ctx.data::<GraphQLContext>()?;

        let input = parse_id(&customer_id, INVALID_CUSTOMER).and_then(|customer_id| {
            let product_ids = product_ids
                .iter()
                .map(|id| parse_id(id, INVALID_PRODUCT))
                .collect::<Result<Vec<i64>>>()?;
            Ok(NewOrder {
                customer_id,
                product_ids,
                order_date,
            })
        });
        let result = match input {
            Ok(input) => context.storage.create_order(input).await,
            Err(e) => Err(e),
        }
        .map(|order| {
            info!(
                "Created order {} for customer {} totalling {}",
                order.id, order.customer_id, order.total_amount
            );
            CreateOrderPayload {
                order: order.into(),
            }
        });
        finish("create_order", result)
    }
}
