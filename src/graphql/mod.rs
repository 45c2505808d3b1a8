pub mod loaders;
pub mod resolvers;
pub mod schema;
pub mod types;

pub use schema::{create_schema, GraphQLContext, GraphQLSchema};
