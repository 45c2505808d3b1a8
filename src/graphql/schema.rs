use crate::error::CrmError;
use crate::graphql::loaders::{CustomerLoader, ProductLoader};
use crate::graphql::resolvers::{Mutation, Query};
use crate::storage::Storage;
use async_graphql::{EmptySubscription, ErrorExtensions, Schema};
use std::sync::Arc;

/// GraphQL context containing shared application state
pub struct GraphQLContext {
    pub storage: Arc<dyn Storage>,
}

/// The complete GraphQL schema
pub type GraphQLSchema = Schema<Query, Mutation, EmptySubscription>;

/// Create a new GraphQL schema with the given storage
pub fn create_schema(storage: Arc<dyn Storage>) -> GraphQLSchema {
    Schema::build(Query, Mutation, EmptySubscription)
        .data(CustomerLoader::new(storage.clone()))
        .data(ProductLoader::new(storage.clone()))
        .data(GraphQLContext { storage })
        .finish()
}

impl ErrorExtensions for CrmError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", self.code()))
    }
}
