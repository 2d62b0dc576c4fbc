//! HTTP request surface over [`ParserApi`].

use crate::parser::ParserApi;
use axum::{
    extract::{Form, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

type ApiState = Arc<dyn ParserApi>;

#[derive(Debug, Deserialize)]
struct AddressQuery {
    address: Option<String>,
}

/// Address from a url-encoded form body, falling back to the query string.
fn request_address(query: AddressQuery, form: Option<Form<AddressQuery>>) -> Option<String> {
    let non_empty = |address: Option<String>| address.filter(|address| !address.is_empty());
    form.and_then(|Form(form)| non_empty(form.address)).or_else(|| non_empty(query.address))
}

/// Builds the router serving `/current_block`, `/subscribe` and `/transactions`.
pub fn build_app(parser: ApiState) -> Router {
    Router::new()
        .route("/current_block", get(current_block))
        .route("/subscribe", get(subscribe).post(subscribe))
        .route("/transactions", get(transactions).post(transactions))
        .with_state(parser)
}

async fn current_block(State(parser): State<ApiState>) -> String {
    match parser.current_block() {
        Some(number) => number.to_string(),
        None => "-1".to_string(),
    }
}

async fn subscribe(
    State(parser): State<ApiState>,
    Query(query): Query<AddressQuery>,
    form: Option<Form<AddressQuery>>,
) -> StatusCode {
    let Some(address) = request_address(query, form) else { return StatusCode::BAD_REQUEST };
    match parser.subscribe(&address) {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn transactions(
    State(parser): State<ApiState>,
    Query(query): Query<AddressQuery>,
    form: Option<Form<AddressQuery>>,
) -> Response {
    let Some(address) = request_address(query, form) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let transactions = match parser.transactions(&address) {
        Ok(transactions) => transactions,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };
    if transactions.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }
    info!("Got {} transactions for {}", transactions.len(), address);

    match serde_json::to_vec(&transactions) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => {
            warn!("Could not encode transactions for {}: {}", address, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
