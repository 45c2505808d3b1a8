use crate::graphql::GraphQLSchema;
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    http::Method,
    response::{Html, IntoResponse, Json},
    routing::get,
    Extension, Router,
};
use hyper::Server;
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "crm-graphql",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GraphQL handler (supports GET and POST)
async fn graphql_handler(
    Extension(schema): Extension<GraphQLSchema>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

/// GraphiQL UI
async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// Create the HTTP router with health, GraphQL and GraphiQL routes
pub fn create_router(schema: GraphQLSchema) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/graphql", get(graphql_handler).post(graphql_handler))
        .route("/graphiql", get(graphiql))
        .layer(Extension(schema))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_listener<S>(
    schema: GraphQLSchema,
    listener: TcpListener,
    shutdown: S,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: Future<Output = ()>,
{
    listener.set_nonblocking(true)?;
    let addr = listener.local_addr()?;
    let app = create_router(schema);

    info!("HTTP server running on http://{addr}");
    info!("GraphQL:   http://{addr}/graphql");
    info!("GraphiQL:  http://{addr}/graphiql");

    Server::from_tcp(listener)?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Start the HTTP server on the specified port
pub async fn start_server<S>(
    schema: GraphQLSchema,
    port: u16,
    shutdown: S,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: Future<Output = ()>,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)?;
    serve_listener(schema, listener, shutdown).await
}
