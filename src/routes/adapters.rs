use crate::{
    handlers::adapters::{graphql_to_rest_handler, rest_to_graphql_handler},
    AppState,
};
use axum::{routing::post, Router};

pub fn adapters_router() -> Router<AppState> {
    Router::new()
        .route("/rest-to-graphql", post(rest_to_graphql_handler))
        .route("/graphql-to-rest", post(graphql_to_rest_handler))
}
