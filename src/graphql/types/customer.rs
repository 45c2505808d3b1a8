use crate::domain::Customer as DomainCustomer;
use crate::graphql::schema::GraphQLContext;
use async_graphql::{Context, ErrorExtensions, FieldResult, Object, ID};
use chrono::{DateTime, Utc};

/// GraphQL representation of a Customer
#[derive(Clone)]
pub struct Customer {
    pub inner: DomainCustomer,
}

impl From<DomainCustomer> for Customer {
    fn from(customer: DomainCustomer) -> Self {
        Self { inner: customer }
    }
}

#[Object]
impl Customer {
    /// The unique identifier for the customer
    async fn id(&self) -> ID {
        ID(self.inner.id.to_string())
    }

    /// The customer's full name
    async fn name(&self) -> &str {
        &self.inner.name
    }

    /// The customer's email address (unique, case-insensitive)
    async fn email(&self) -> &str {
        &self.inner.email
    }

    /// Phone number in `+<digits>` or `123-456-7890` form
    async fn phone(&self) -> Option<&str> {
        self.inner.phone.as_deref()
    }

    /// When the customer was created
    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Orders placed by this customer
    async fn orders(&self, ctx: &Context<'_>) -> FieldResult<Vec<super::order::Order>> {
        let context = ctx.data::<GraphQLContext>()?;

        match context.storage.orders_for_customer(self.inner.id).await {
            Ok(orders) => Ok(orders.into_iter().map(|o| o.into()).collect()),
            Err(e) => Err(e.extend()),
        }
    }
}
