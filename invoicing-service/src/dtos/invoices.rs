use crate::models::{HistoryEntry, Invoice, InvoiceStatus, NewInvoice, ValidationDecision};
use crate::services::InvoiceError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Field aliases accept the camelCase names used by existing web clients.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[serde(default, alias = "toUserEmail", deserialize_with = "trimmed")]
    #[validate(email(message = "Recipient must be a valid email address"))]
    pub recipient_email: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[validate(length(max = 500, message = "Service description is too long"))]
    pub service: Option<String>,
    #[validate(length(max = 2000, message = "Comments are too long"))]
    pub comments: Option<String>,
    /// Nominal invoice date; defaults to the creation time.
    pub date: Option<DateTime<Utc>>,
}

impl CreateInvoiceRequest {
    pub fn into_new_invoice(self) -> Result<NewInvoice, InvoiceError> {
        let recipient_email = non_blank(self.recipient_email);
        let service = non_blank(self.service);

        let mut missing = Vec::new();
        if recipient_email.is_none() {
            missing.push("recipient_email");
        }
        if self.price.is_none() {
            missing.push("price");
        }
        if service.is_none() {
            missing.push("service");
        }

        match (recipient_email, self.price, service) {
            (Some(recipient_email), Some(price), Some(service)) => Ok(NewInvoice {
                recipient_email,
                price,
                service,
                comments: non_blank(self.comments),
                issued_at: self.date,
            }),
            _ => Err(InvoiceError::MissingFields(missing.join(", "))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadProofRequest {
    /// Opaque proof blob, typically a base64 image.
    #[serde(alias = "imageBase64")]
    pub image_base64: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateInvoiceRequest {
    pub status: Option<String>,
}

impl ValidateInvoiceRequest {
    pub fn decision(&self) -> Result<ValidationDecision, InvoiceError> {
        let raw = self.status.as_deref().unwrap_or_default();
        raw.parse()
            .map_err(|_| InvoiceError::InvalidDecision(raw.trim().to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    /// Only consulted when moving to `proof_uploaded`.
    #[serde(alias = "imageBase64")]
    pub image_base64: Option<String>,
}

impl UpdateStatusRequest {
    pub fn target_status(&self) -> Result<InvoiceStatus, InvoiceError> {
        let raw = self
            .status
            .as_deref()
            .ok_or_else(|| InvoiceError::MissingFields("status".to_string()))?;
        raw.parse()
            .map_err(|_| InvoiceError::InvalidStatus(raw.trim().to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryEntryResponse {
    pub action: String,
    pub actor_email: String,
    pub timestamp: String,
}

impl From<HistoryEntry> for HistoryEntryResponse {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            action: entry.action,
            actor_email: entry.actor_email,
            timestamp: entry.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub id: String,
    pub issuer_email: String,
    pub issuer_name: String,
    pub recipient_email: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub service: String,
    pub comments: Option<String>,
    pub status: InvoiceStatus,
    pub payment_proof: Option<String>,
    pub history: Vec<HistoryEntryResponse>,
    pub version: i64,
    pub issued_at: String,
    pub created_at: String,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            issuer_email: invoice.issuer_email,
            issuer_name: invoice.issuer_name,
            recipient_email: invoice.recipient_email,
            price: invoice.price,
            service: invoice.service,
            comments: invoice.comments,
            status: invoice.status,
            payment_proof: invoice.payment_proof,
            history: invoice.history.into_iter().map(Into::into).collect(),
            version: invoice.version,
            issued_at: invoice.issued_at.to_rfc3339(),
            created_at: invoice.created_at.to_rfc3339(),
        }
    }
}

/// Body returned by every state-changing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceActionResponse {
    pub message: String,
    pub invoice: InvoiceResponse,
}

impl InvoiceActionResponse {
    pub fn new(message: impl Into<String>, invoice: Invoice) -> Self {
        Self {
            message: message.into(),
            invoice: invoice.into(),
        }
    }
}

fn trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(|v| v.trim().to_string()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
