use crate::dtos::{
    CreateInvoiceRequest, InvoiceActionResponse, InvoiceResponse, UpdateStatusRequest,
    UploadProofRequest, ValidateInvoiceRequest,
};
use crate::middleware::AuthUser;
use crate::models::Invoice;
use crate::services::InvoiceError;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

fn to_responses(invoices: Vec<Invoice>) -> Json<Vec<InvoiceResponse>> {
    Json(invoices.into_iter().map(InvoiceResponse::from).collect())
}

pub async fn create_invoice(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(req): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let new = req.into_new_invoice()?;

    let invoice = state.lifecycle.create(&actor, new).await?;

    Ok((StatusCode::CREATED, Json(InvoiceResponse::from(invoice))))
}

pub async fn list_received(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(to_responses(state.lifecycle.list_received(&actor).await?))
}

pub async fn list_pending(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(to_responses(
        state.lifecycle.list_pending_received(&actor).await?,
    ))
}

pub async fn list_sent(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(to_responses(state.lifecycle.list_sent(&actor).await?))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state.lifecycle.get(&actor, &invoice_id).await?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

pub async fn upload_proof(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(invoice_id): Path<String>,
    Json(req): Json<UploadProofRequest>,
) -> Result<impl IntoResponse, AppError> {
    let proof = req.image_base64.ok_or(InvoiceError::MissingProof)?;

    let invoice = state
        .lifecycle
        .upload_proof(&actor, &invoice_id, &proof)
        .await?;

    Ok(Json(InvoiceActionResponse::new(
        "Payment proof uploaded",
        invoice,
    )))
}

pub async fn validate_invoice(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(invoice_id): Path<String>,
    Json(req): Json<ValidateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let decision = req.decision()?;

    let invoice = state
        .lifecycle
        .validate(&actor, &invoice_id, decision)
        .await?;

    let message = format!("Invoice marked as {}", invoice.status);
    Ok(Json(InvoiceActionResponse::new(message, invoice)))
}

pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(invoice_id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Unknown values are rejected before the invoice is loaded.
    let status = req.target_status()?;

    let invoice = state
        .lifecycle
        .set_status(&actor, &invoice_id, status, req.image_base64.as_deref())
        .await?;

    Ok(Json(InvoiceActionResponse::new("Status updated", invoice)))
}
