use service_core::error::AppError;
use thiserror::Error;

/// Rejections raised by the invoice lifecycle.
#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("Missing required fields: {0}")]
    MissingFields(String),

    #[error("Price must be greater than zero")]
    InvalidPrice,

    #[error("Recipient email does not belong to a registered user")]
    UnknownRecipient(String),

    #[error("Issuer account not found")]
    IssuerNotFound,

    #[error("Invoices cannot be issued to yourself")]
    SelfInvoice,

    #[error("Invoice not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Payment proof is required")]
    MissingProof,

    #[error("Invalid decision '{0}': must be 'paid' or 'rejected'")]
    InvalidDecision(String),

    #[error("Invalid status '{0}'")]
    InvalidStatus(String),

    #[error("Invoice is already paid")]
    AlreadyFinalized,

    #[error("Invoice was modified concurrently, reload and retry")]
    Conflict,

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl InvoiceError {
    /// Short label for the `invoice_rejections_total` metric.
    pub fn reason(&self) -> &'static str {
        match self {
            InvoiceError::MissingFields(_) => "missing_fields",
            InvoiceError::InvalidPrice => "invalid_price",
            InvoiceError::UnknownRecipient(_) => "unknown_recipient",
            InvoiceError::IssuerNotFound => "issuer_not_found",
            InvoiceError::SelfInvoice => "self_invoice",
            InvoiceError::NotFound => "not_found",
            InvoiceError::Forbidden(_) => "forbidden",
            InvoiceError::MissingProof => "missing_proof",
            InvoiceError::InvalidDecision(_) => "invalid_decision",
            InvoiceError::InvalidStatus(_) => "invalid_status",
            InvoiceError::AlreadyFinalized => "already_finalized",
            InvoiceError::Conflict => "conflict",
            InvoiceError::Database(_) => "database",
            InvoiceError::Internal(_) => "internal",
        }
    }
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        match err {
            InvoiceError::MissingFields(_)
            | InvoiceError::InvalidPrice
            | InvoiceError::UnknownRecipient(_)
            | InvoiceError::SelfInvoice
            | InvoiceError::MissingProof
            | InvoiceError::InvalidDecision(_)
            | InvoiceError::InvalidStatus(_) => AppError::BadRequest(anyhow::anyhow!(err.to_string())),
            InvoiceError::NotFound | InvoiceError::IssuerNotFound => {
                AppError::NotFound(anyhow::anyhow!(err.to_string()))
            }
            InvoiceError::Forbidden(msg) => AppError::Forbidden(anyhow::anyhow!(msg)),
            InvoiceError::AlreadyFinalized | InvoiceError::Conflict => {
                AppError::Conflict(anyhow::anyhow!(err.to_string()))
            }
            InvoiceError::Database(e) => AppError::from(e),
            InvoiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
