//! HTTP request handlers for the dues engine API.
//!
//! This module contains the handler functions for all API endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::batch::{BatchRunner, CancelFlag};
use crate::calculation::evaluate_member;
use crate::error::EngineError;
use crate::providers::{InMemoryRoster, InMemoryRules, MemoryLedgerSink, StaticFormulas, StaticMembership};
use crate::remittance::RemittanceAggregator;

use super::request::{AggregateRequest, EvaluateRequest, RunRequest};
use super::response::{AggregateResponse, ApiError, ApiErrorResponse, RunResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/evaluate", post(evaluate_handler))
        .route("/runs", post(run_handler))
        .route("/remittances/aggregate", post(aggregate_handler))
        .with_state(state)
}

fn rejection_to_error(rejection: JsonRejection, correlation_id: Uuid) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(correlation_id = %correlation_id, error = %body_text, "JSON data error");
            if body_text.contains("missing field") {
                ApiError::new("VALIDATION_ERROR", body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "JSON syntax error");
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    }
}

fn json_response<T: serde::Serialize>(status: StatusCode, body: T) -> axum::response::Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn error_response(error: EngineError, correlation_id: Uuid) -> axum::response::Response {
    warn!(correlation_id = %correlation_id, error = %error, "Request failed");
    let api_error: ApiErrorResponse = error.into();
    json_response(api_error.status, api_error.error)
}

/// Handler for the POST /evaluate endpoint.
///
/// Evaluates one member's dues under a rule carried inline and returns the
/// full ledger entry with its audit trace.
async fn evaluate_handler(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing evaluate request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            let error = rejection_to_error(rejection, correlation_id);
            return json_response(StatusCode::BAD_REQUEST, error);
        }
    };

    let money = state.config().money_context();
    let policy = request
        .late_fee_policy
        .unwrap_or_else(|| state.config().late_fee_policy().clone());

    match evaluate_member(&request.rule, &request.fact, &policy, &money, correlation_id) {
        Ok(entry) => {
            info!(
                correlation_id = %correlation_id,
                member_id = %entry.member_id,
                total_due = %entry.total_due,
                "Evaluation completed"
            );
            json_response(StatusCode::OK, entry)
        }
        Err(err) => error_response(err, correlation_id),
    }
}

/// Handler for the POST /runs endpoint.
///
/// Runs batch dues for an organization and period with the roster and rules
/// carried inline. Concurrent runs for the same organization and period are
/// rejected with `RUN_CONFLICT`.
async fn run_handler(
    State(state): State<AppState>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing run request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            let error = rejection_to_error(rejection, correlation_id);
            return json_response(StatusCode::BAD_REQUEST, error);
        }
    };

    let policy = request
        .late_fee_policy
        .unwrap_or_else(|| state.config().late_fee_policy().clone());
    let sink = MemoryLedgerSink::new();
    let runner = BatchRunner::with_admissions(
        Arc::new(InMemoryRoster::new(request.facts)),
        Arc::new(InMemoryRules::new(request.rules)),
        Arc::new(sink.clone()),
        policy,
        state.config().money_context(),
        state.admissions().clone(),
    );

    match runner.run_batch(&request.organization_id, request.period, &CancelFlag::new()) {
        Ok(summary) => {
            info!(
                correlation_id = %correlation_id,
                run_id = %summary.run_id,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Run completed"
            );
            json_response(
                StatusCode::OK,
                RunResponse {
                    summary,
                    entries: sink.entries(),
                    failures: sink.failures(),
                },
            )
        }
        Err(err) => error_response(err, correlation_id),
    }
}

/// Handler for the POST /remittances/aggregate endpoint.
///
/// Aggregates affiliate returns into per-capita remittance records. The
/// formula comes inline or from the configured jurisdiction.
async fn aggregate_handler(
    State(state): State<AppState>,
    payload: Result<Json<AggregateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing aggregate request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            let error = rejection_to_error(rejection, correlation_id);
            return json_response(StatusCode::BAD_REQUEST, error);
        }
    };

    let formula = match request.formula {
        Some(formula) => formula,
        None => match state.config().jurisdiction(&request.jurisdiction_id) {
            Some(formula) => formula.clone(),
            None => {
                return error_response(
                    EngineError::FormulaNotFound {
                        federation_id: request.federation_id.clone(),
                        jurisdiction_id: request.jurisdiction_id.clone(),
                    },
                    correlation_id,
                );
            }
        },
    };

    let sink = MemoryLedgerSink::new();
    let aggregator = RemittanceAggregator::new(
        Arc::new(StaticMembership::new(
            &request.federation_id,
            request.expected_affiliates,
            request.period,
            request.returns,
        )),
        Arc::new(StaticFormulas::new(vec![(
            request.federation_id.clone(),
            request.jurisdiction_id.clone(),
            formula,
        )])),
        Arc::new(sink),
        state.config().money_context(),
    );

    let result = if request.require_complete {
        aggregator.aggregate_complete(
            &request.federation_id,
            &request.jurisdiction_id,
            request.period,
        )
    } else {
        aggregator.aggregate(
            &request.federation_id,
            &request.jurisdiction_id,
            request.period,
        )
    };

    match result {
        Ok(outcome) => {
            info!(
                correlation_id = %correlation_id,
                federation_id = %request.federation_id,
                records = outcome.records.len(),
                pending = outcome.pending.len(),
                "Aggregation completed"
            );
            let complete = outcome.is_complete();
            json_response(
                StatusCode::OK,
                AggregateResponse {
                    records: outcome.records,
                    pending: outcome.pending,
                    complete,
                },
            )
        }
        Err(err) => error_response(err, correlation_id),
    }
}
