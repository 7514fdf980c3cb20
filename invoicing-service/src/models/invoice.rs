//! Invoice model for invoicing-service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    ProofUploaded,
    Paid,
    Rejected,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Pending,
        InvoiceStatus::ProofUploaded,
        InvoiceStatus::Paid,
        InvoiceStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::ProofUploaded => "proof_uploaded",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Rejected => "rejected",
        }
    }

    /// Party allowed to move an invoice into this status.
    pub fn required_role(&self) -> PartyRole {
        match self {
            InvoiceStatus::ProofUploaded => PartyRole::Recipient,
            InvoiceStatus::Pending | InvoiceStatus::Paid | InvoiceStatus::Rejected => {
                PartyRole::Issuer
            }
        }
    }

    /// A paid invoice no longer accepts new payment proof.
    pub fn is_finalized(&self) -> bool {
        matches!(self, InvoiceStatus::Paid)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown invoice status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for InvoiceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == trimmed)
            .ok_or_else(|| UnknownStatus(trimmed.to_string()))
    }
}

/// Outcome an issuer may record after reviewing payment proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationDecision {
    Paid,
    Rejected,
}

impl ValidationDecision {
    pub fn status(&self) -> InvoiceStatus {
        match self {
            ValidationDecision::Paid => InvoiceStatus::Paid,
            ValidationDecision::Rejected => InvoiceStatus::Rejected,
        }
    }
}

impl FromStr for ValidationDecision {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<InvoiceStatus>()? {
            InvoiceStatus::Paid => Ok(ValidationDecision::Paid),
            InvoiceStatus::Rejected => Ok(ValidationDecision::Rejected),
            other => Err(UnknownStatus(other.as_str().to_string())),
        }
    }
}

/// Which side of an invoice a caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyRole {
    Issuer,
    Recipient,
}

/// A sanctioned transition, recorded in the invoice history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceAction {
    UploadProof,
    Validate(ValidationDecision),
    SetStatus(InvoiceStatus),
}

impl InvoiceAction {
    pub fn label(&self) -> String {
        match self {
            InvoiceAction::UploadProof => "upload-proof".to_string(),
            InvoiceAction::Validate(decision) => format!("validate-{}", decision.status()),
            InvoiceAction::SetStatus(status) => format!("status-{}", status),
        }
    }

    /// Status the invoice ends up in after this action.
    pub fn target_status(&self) -> InvoiceStatus {
        match self {
            InvoiceAction::UploadProof => InvoiceStatus::ProofUploaded,
            InvoiceAction::Validate(decision) => decision.status(),
            InvoiceAction::SetStatus(status) => *status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: String,
    pub actor_email: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

/// Invoice document, stored in the `invoices` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "_id")]
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
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Revision counter for conditional updates.
    #[serde(default)]
    pub version: i64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub issued_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Validated input for creating an invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub recipient_email: String,
    pub price: Decimal,
    pub service: String,
    pub comments: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
}

impl Invoice {
    pub fn new(
        new: NewInvoice,
        issuer_email: String,
        issuer_name: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            issuer_email,
            issuer_name,
            recipient_email: new.recipient_email,
            price: new.price,
            service: new.service,
            comments: new.comments,
            status: InvoiceStatus::Pending,
            payment_proof: None,
            history: Vec::new(),
            version: 0,
            issued_at: new.issued_at.unwrap_or(created_at),
            created_at,
        }
    }

    pub fn is_issuer(&self, email: &str) -> bool {
        self.issuer_email == email
    }

    pub fn is_recipient(&self, email: &str) -> bool {
        self.recipient_email == email
    }

    pub fn has_role(&self, email: &str, role: PartyRole) -> bool {
        match role {
            PartyRole::Issuer => self.is_issuer(email),
            PartyRole::Recipient => self.is_recipient(email),
        }
    }

    /// Parties to the invoice may read it; nobody else.
    pub fn is_visible_to(&self, email: &str) -> bool {
        self.is_issuer(email) || self.is_recipient(email)
    }

    /// Move to the action's target status and append one history entry.
    pub fn record(&mut self, action: InvoiceAction, actor_email: &str, at: DateTime<Utc>) {
        self.status = action.target_status();
        self.history.push(HistoryEntry {
            action: action.label(),
            actor_email: actor_email.to_string(),
            timestamp: at,
        });
        self.version += 1;
    }
}

/// Sort direction on `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Query predicate for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub issuer_email: Option<String>,
    pub recipient_email: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub direction: SortDirection,
}

impl InvoiceFilter {
    pub fn received_by(email: &str) -> Self {
        Self {
            recipient_email: Some(email.to_string()),
            ..Default::default()
        }
    }

    pub fn sent_by(email: &str) -> Self {
        Self {
            issuer_email: Some(email.to_string()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.issuer_email
            .as_deref()
            .is_none_or(|email| invoice.issuer_email == email)
            && self
                .recipient_email
                .as_deref()
                .is_none_or(|email| invoice.recipient_email == email)
            && self.status.is_none_or(|status| invoice.status == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_invoice() -> Invoice {
        Invoice::new(
            NewInvoice {
                recipient_email: "bob@x".to_string(),
                price: Decimal::from(100),
                service: "consulting".to_string(),
                comments: None,
                issued_at: None,
            },
            "alice@x".to_string(),
            "Alice".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn parses_status_with_surrounding_whitespace() {
        assert_eq!(
            "  proof_uploaded ".parse::<InvoiceStatus>(),
            Ok(InvoiceStatus::ProofUploaded)
        );
        assert_eq!("paid".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Paid));
    }

    #[test]
    fn rejects_status_outside_enumeration() {
        assert!("cancelled".parse::<InvoiceStatus>().is_err());
        assert!("Paid".parse::<InvoiceStatus>().is_err());
        assert!("".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn decision_only_accepts_terminal_review_states() {
        assert_eq!(
            "paid".parse::<ValidationDecision>(),
            Ok(ValidationDecision::Paid)
        );
        assert_eq!(
            "rejected".parse::<ValidationDecision>(),
            Ok(ValidationDecision::Rejected)
        );
        assert!("pending".parse::<ValidationDecision>().is_err());
        assert!("proof_uploaded".parse::<ValidationDecision>().is_err());
    }

    #[test]
    fn required_roles_follow_transition_table() {
        assert_eq!(
            InvoiceStatus::ProofUploaded.required_role(),
            PartyRole::Recipient
        );
        assert_eq!(InvoiceStatus::Pending.required_role(), PartyRole::Issuer);
        assert_eq!(InvoiceStatus::Paid.required_role(), PartyRole::Issuer);
        assert_eq!(InvoiceStatus::Rejected.required_role(), PartyRole::Issuer);
    }

    #[test]
    fn action_labels() {
        assert_eq!(InvoiceAction::UploadProof.label(), "upload-proof");
        assert_eq!(
            InvoiceAction::Validate(ValidationDecision::Rejected).label(),
            "validate-rejected"
        );
        assert_eq!(
            InvoiceAction::SetStatus(InvoiceStatus::ProofUploaded).label(),
            "status-proof_uploaded"
        );
    }

    #[test]
    fn new_invoice_starts_pending_with_empty_history() {
        let invoice = sample_invoice();
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert!(invoice.history.is_empty());
        assert_eq!(invoice.version, 0);
        assert_eq!(invoice.issued_at, invoice.created_at);
    }

    #[test]
    fn record_appends_exactly_one_entry() {
        let mut invoice = sample_invoice();
        let at = Utc::now();

        invoice.record(InvoiceAction::UploadProof, "bob@x", at);
        invoice.record(
            InvoiceAction::Validate(ValidationDecision::Paid),
            "alice@x",
            at,
        );

        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.history.len(), 2);
        assert_eq!(invoice.history[0].action, "upload-proof");
        assert_eq!(invoice.history[1].actor_email, "alice@x");
        assert_eq!(invoice.version, 2);
    }

    #[test]
    fn filter_matches_on_every_set_field() {
        let invoice = sample_invoice();

        assert!(InvoiceFilter::received_by("bob@x").matches(&invoice));
        assert!(InvoiceFilter::sent_by("alice@x").matches(&invoice));
        assert!(!InvoiceFilter::sent_by("bob@x").matches(&invoice));
        assert!(InvoiceFilter::received_by("bob@x")
            .with_status(InvoiceStatus::Pending)
            .matches(&invoice));
        assert!(!InvoiceFilter::received_by("bob@x")
            .with_status(InvoiceStatus::Paid)
            .matches(&invoice));
    }
}
