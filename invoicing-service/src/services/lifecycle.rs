//! Invoice lifecycle: who may move an invoice between statuses, and how
//! each move is recorded.
//!
//! | From        | Action                    | Actor     | To             |
//! |-------------|---------------------------|-----------|----------------|
//! | -           | create                    | anyone    | pending        |
//! | not paid    | upload-proof              | recipient | proof_uploaded |
//! | any         | validate(paid / rejected) | issuer    | paid / rejected|
//! | any         | set-status(pending)       | issuer    | pending        |
//! | any         | set-status(proof_uploaded)| recipient | proof_uploaded |
//! | any         | set-status(paid/rejected) | issuer    | paid / rejected|
//!
//! Every successful mutation appends exactly one history entry and bumps the
//! invoice revision; the write only lands if nobody else changed the invoice
//! since it was read.

use crate::models::{
    Invoice, InvoiceAction, InvoiceFilter, InvoiceStatus, NewInvoice, PartyRole,
    ValidationDecision,
};
use crate::services::directory::UserDirectory;
use crate::services::error::InvoiceError;
use crate::services::identity::Identity;
use crate::services::metrics;
use crate::services::store::InvoiceStore;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Answers to the product questions the workflow leaves open.
#[derive(Debug, Clone, Copy)]
pub struct LifecyclePolicy {
    /// Allow an issuer to address an invoice to their own email.
    pub allow_self_invoice: bool,
    /// Use the caller-supplied invoice date instead of the server clock.
    pub accept_client_date: bool,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            allow_self_invoice: true,
            accept_client_date: true,
        }
    }
}

#[derive(Clone)]
pub struct InvoiceLifecycle {
    store: Arc<dyn InvoiceStore>,
    users: Arc<dyn UserDirectory>,
    policy: LifecyclePolicy,
}

impl InvoiceLifecycle {
    pub fn new(
        store: Arc<dyn InvoiceStore>,
        users: Arc<dyn UserDirectory>,
        policy: LifecyclePolicy,
    ) -> Self {
        Self {
            store,
            users,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn InvoiceStore> {
        &self.store
    }

    pub async fn create(&self, actor: &Identity, new: NewInvoice) -> Result<Invoice, InvoiceError> {
        observe("create", self.create_inner(actor, new).await)
    }

    async fn create_inner(
        &self,
        actor: &Identity,
        mut new: NewInvoice,
    ) -> Result<Invoice, InvoiceError> {
        new.recipient_email = new.recipient_email.trim().to_string();
        new.service = new.service.trim().to_string();

        let mut missing = Vec::new();
        if new.recipient_email.is_empty() {
            missing.push("recipient_email");
        }
        if new.service.is_empty() {
            missing.push("service");
        }
        if !missing.is_empty() {
            return Err(InvoiceError::MissingFields(missing.join(", ")));
        }
        if new.price <= Decimal::ZERO {
            return Err(InvoiceError::InvalidPrice);
        }

        let issuer = self
            .users
            .find_by_id(&actor.user_id)
            .await?
            .ok_or(InvoiceError::IssuerNotFound)?;

        if !self.policy.allow_self_invoice && new.recipient_email == actor.email {
            return Err(InvoiceError::SelfInvoice);
        }

        // Checked once; later removal of the recipient account is tolerated.
        if self
            .users
            .find_by_email(&new.recipient_email)
            .await?
            .is_none()
        {
            return Err(InvoiceError::UnknownRecipient(new.recipient_email));
        }

        if !self.policy.accept_client_date {
            new.issued_at = None;
        }

        let invoice = Invoice::new(
            new,
            actor.email.clone(),
            issuer.display_name().to_string(),
            Utc::now(),
        );
        self.store.insert(&invoice).await?;

        metrics::record_created();
        tracing::info!(
            invoice_id = %invoice.id,
            issuer = %invoice.issuer_email,
            recipient = %invoice.recipient_email,
            "Invoice created"
        );

        Ok(invoice)
    }

    /// Recipient attaches payment proof.
    pub async fn upload_proof(
        &self,
        actor: &Identity,
        invoice_id: &str,
        proof: &str,
    ) -> Result<Invoice, InvoiceError> {
        observe(
            "upload_proof",
            self.upload_proof_inner(actor, invoice_id, proof).await,
        )
    }

    async fn upload_proof_inner(
        &self,
        actor: &Identity,
        invoice_id: &str,
        proof: &str,
    ) -> Result<Invoice, InvoiceError> {
        if proof.trim().is_empty() {
            return Err(InvoiceError::MissingProof);
        }

        let mut invoice = self.load(invoice_id).await?;
        if !invoice.is_recipient(&actor.email) {
            return Err(InvoiceError::Forbidden(
                "Only the recipient can upload payment proof",
            ));
        }
        if invoice.status.is_finalized() {
            return Err(InvoiceError::AlreadyFinalized);
        }

        let expected_version = invoice.version;
        invoice.payment_proof = Some(proof.to_string());
        self.apply(&mut invoice, InvoiceAction::UploadProof, actor, expected_version)
            .await?;
        Ok(invoice)
    }

    /// Issuer accepts or rejects the uploaded proof.
    ///
    /// Re-validating an already decided invoice is allowed and recorded again.
    pub async fn validate(
        &self,
        actor: &Identity,
        invoice_id: &str,
        decision: ValidationDecision,
    ) -> Result<Invoice, InvoiceError> {
        observe(
            "validate",
            self.validate_inner(actor, invoice_id, decision).await,
        )
    }

    async fn validate_inner(
        &self,
        actor: &Identity,
        invoice_id: &str,
        decision: ValidationDecision,
    ) -> Result<Invoice, InvoiceError> {
        let mut invoice = self.load(invoice_id).await?;
        if !invoice.is_issuer(&actor.email) {
            return Err(InvoiceError::Forbidden(
                "Only the issuer can validate payment proof",
            ));
        }

        let expected_version = invoice.version;
        self.apply(
            &mut invoice,
            InvoiceAction::Validate(decision),
            actor,
            expected_version,
        )
        .await?;
        Ok(invoice)
    }

    /// Generic status change. Role rules match the dedicated actions; moving
    /// to `proof_uploaded` needs proof already on file or supplied here.
    pub async fn set_status(
        &self,
        actor: &Identity,
        invoice_id: &str,
        status: InvoiceStatus,
        proof: Option<&str>,
    ) -> Result<Invoice, InvoiceError> {
        observe(
            "set_status",
            self.set_status_inner(actor, invoice_id, status, proof).await,
        )
    }

    async fn set_status_inner(
        &self,
        actor: &Identity,
        invoice_id: &str,
        status: InvoiceStatus,
        proof: Option<&str>,
    ) -> Result<Invoice, InvoiceError> {
        let mut invoice = self.load(invoice_id).await?;

        if !invoice.has_role(&actor.email, status.required_role()) {
            return Err(InvoiceError::Forbidden(forbidden_message(status)));
        }

        let expected_version = invoice.version;
        if status == InvoiceStatus::ProofUploaded {
            match proof.filter(|p| !p.trim().is_empty()) {
                Some(p) => invoice.payment_proof = Some(p.to_string()),
                None if invoice.payment_proof.is_some() => {}
                None => return Err(InvoiceError::MissingProof),
            }
        }

        self.apply(
            &mut invoice,
            InvoiceAction::SetStatus(status),
            actor,
            expected_version,
        )
        .await?;
        Ok(invoice)
    }

    /// A single invoice, visible only to its issuer and recipient.
    pub async fn get(&self, actor: &Identity, invoice_id: &str) -> Result<Invoice, InvoiceError> {
        let invoice = self.load(invoice_id).await?;
        if !invoice.is_visible_to(&actor.email) {
            return Err(InvoiceError::NotFound);
        }
        Ok(invoice)
    }

    pub async fn list_received(&self, actor: &Identity) -> Result<Vec<Invoice>, InvoiceError> {
        self.store
            .find_many(&InvoiceFilter::received_by(&actor.email))
            .await
    }

    pub async fn list_pending_received(
        &self,
        actor: &Identity,
    ) -> Result<Vec<Invoice>, InvoiceError> {
        self.store
            .find_many(&InvoiceFilter::received_by(&actor.email).with_status(InvoiceStatus::Pending))
            .await
    }

    pub async fn list_sent(&self, actor: &Identity) -> Result<Vec<Invoice>, InvoiceError> {
        self.store
            .find_many(&InvoiceFilter::sent_by(&actor.email))
            .await
    }

    async fn load(&self, invoice_id: &str) -> Result<Invoice, InvoiceError> {
        self.store
            .find_by_id(invoice_id)
            .await?
            .ok_or(InvoiceError::NotFound)
    }

    async fn apply(
        &self,
        invoice: &mut Invoice,
        action: InvoiceAction,
        actor: &Identity,
        expected_version: i64,
    ) -> Result<(), InvoiceError> {
        let from = invoice.status;
        invoice.record(action, &actor.email, Utc::now());
        self.store.update(invoice, expected_version).await?;

        let label = action.label();
        metrics::record_transition(&label);
        tracing::info!(
            invoice_id = %invoice.id,
            actor = %actor.email,
            action = %label,
            from = %from,
            to = %invoice.status,
            "Invoice transition recorded"
        );
        Ok(())
    }
}

fn forbidden_message(status: InvoiceStatus) -> &'static str {
    match (status, status.required_role()) {
        (_, PartyRole::Recipient) => "Only the recipient can upload payment proof",
        (InvoiceStatus::Pending, _) => "Only the issuer can reset an invoice to pending",
        _ => "Only the issuer can mark an invoice paid or rejected",
    }
}

fn observe<T>(operation: &'static str, result: Result<T, InvoiceError>) -> Result<T, InvoiceError> {
    if let Err(err) = &result {
        metrics::record_rejection(operation, err.reason());
        match err {
            InvoiceError::Database(_) | InvoiceError::Internal(_) => {
                tracing::error!(operation, error = %err, "Invoice operation failed");
            }
            _ => tracing::warn!(operation, reason = err.reason(), "Invoice operation rejected"),
        }
    }
    result
}
