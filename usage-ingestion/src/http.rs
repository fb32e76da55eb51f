use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use usage_ledger::{UsageTransaction, UsageTransactionDetail};
use uuid::Uuid;

use crate::edi::EdiUsageTransaction;
use crate::ingest::{Envelope, GroupReport, IngestError, IngestOutcome, Ingestor};
use crate::store::StoreError;

#[derive(Clone)]
pub struct AppState {
    ingestor: Arc<Ingestor>,
}

impl AppState {
    pub fn new(ingestor: Ingestor) -> Self {
        Self {
            ingestor: Arc::new(ingestor),
        }
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/edi/monthly-usage", post(create_monthly_usage))
        .route("/usage-transactions", get(list_usage_transactions))
        .route("/usage-transactions/:id", get(get_usage_transaction))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    #[serde(flatten)]
    pub transaction: UsageTransaction,
    pub detail_rows: usize,
    pub unhandled_groups: Vec<GroupReport>,
}

impl From<IngestOutcome> for IngestResponse {
    fn from(outcome: IngestOutcome) -> Self {
        let unhandled_groups = outcome.unhandled_groups().cloned().collect();
        Self {
            transaction: outcome.header,
            detail_rows: outcome.detail_rows,
            unhandled_groups,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionWithDetails {
    #[serde(flatten)]
    pub transaction: UsageTransaction,
    pub details: Vec<UsageTransactionDetail>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    validation_errors: Vec<String>,
}

#[derive(Debug)]
pub enum ApiError {
    MalformedBody(String),
    Ingest(IngestError),
    NotFound(String),
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        Self::Ingest(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Ingest(IngestError::Storage(e))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Ingest(IngestError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Ingest(IngestError::Resolution { .. } | IngestError::UnresolvedMeter(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Ingest(IngestError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::MalformedBody(msg) => ErrorBody {
                error: format!("invalid request: {msg}"),
                validation_errors: Vec::new(),
            },
            Self::NotFound(msg) => ErrorBody {
                error: msg,
                validation_errors: Vec::new(),
            },
            Self::Ingest(IngestError::Validation(errors)) => ErrorBody {
                error: "invalid transaction".to_string(),
                validation_errors: errors,
            },
            Self::Ingest(e) => ErrorBody {
                error: e.to_string(),
                validation_errors: Vec::new(),
            },
        };

        (status, Json(body)).into_response()
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn create_monthly_usage(
    State(state): State<AppState>,
    payload: Result<Json<EdiUsageTransaction>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let Json(payload) = payload.map_err(|e| {
        metrics::counter!("edi_usage_malformed_total").increment(1);
        ApiError::MalformedBody(e.body_text())
    })?;

    let outcome = state.ingestor.ingest(Envelope::new(payload)).await?;

    Ok((StatusCode::CREATED, Json(outcome.into())))
}

async fn list_usage_transactions(
    State(state): State<AppState>,
) -> Result<Json<Vec<UsageTransaction>>, ApiError> {
    let transactions = state.ingestor.ledger().list_transactions().await?;
    Ok(Json(transactions))
}

async fn get_usage_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionWithDetails>, ApiError> {
    match state.ingestor.ledger().transaction_with_details(id).await? {
        Some((transaction, details)) => Ok(Json(TransactionWithDetails {
            transaction,
            details,
        })),
        None => Err(ApiError::NotFound(format!("usage transaction {id} not found"))),
    }
}
