//! Invoice persistence.
//!
//! Updates are conditional on the revision the caller read, so two writers
//! racing on the same invoice cannot silently overwrite each other: the
//! second one gets [`InvoiceError::Conflict`].

use crate::models::{Invoice, InvoiceFilter, SortDirection};
use crate::services::database::MongoDb;
use crate::services::error::InvoiceError;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use std::collections::HashMap;
use std::sync::Mutex;

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Persist a new invoice and return its id.
    async fn insert(&self, invoice: &Invoice) -> Result<String, InvoiceError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>, InvoiceError>;

    /// All invoices matching `filter`, ordered by `created_at`.
    async fn find_many(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, InvoiceError>;

    /// Replace the stored invoice if its revision is still `expected_version`.
    async fn update(&self, invoice: &Invoice, expected_version: i64) -> Result<(), InvoiceError>;

    async fn health_check(&self) -> Result<(), InvoiceError>;
}

#[derive(Clone)]
pub struct MongoInvoiceStore {
    db: MongoDb,
}

impl MongoInvoiceStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }

    fn filter_document(filter: &InvoiceFilter) -> Document {
        let mut query = Document::new();
        if let Some(email) = &filter.issuer_email {
            query.insert("issuer_email", email.as_str());
        }
        if let Some(email) = &filter.recipient_email {
            query.insert("recipient_email", email.as_str());
        }
        if let Some(status) = filter.status {
            query.insert("status", status.as_str());
        }
        query
    }
}

#[async_trait]
impl InvoiceStore for MongoInvoiceStore {
    async fn insert(&self, invoice: &Invoice) -> Result<String, InvoiceError> {
        self.db.invoices().insert_one(invoice, None).await?;
        Ok(invoice.id.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>, InvoiceError> {
        Ok(self.db.invoices().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_many(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, InvoiceError> {
        let order = match filter.direction {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        };
        let options = FindOptions::builder()
            .sort(doc! { "created_at": order, "_id": order })
            .build();

        let cursor = self
            .db
            .invoices()
            .find(Self::filter_document(filter), options)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn update(&self, invoice: &Invoice, expected_version: i64) -> Result<(), InvoiceError> {
        let result = self
            .db
            .invoices()
            .replace_one(
                doc! { "_id": &invoice.id, "version": expected_version },
                invoice,
                None,
            )
            .await?;

        if result.matched_count == 0 {
            let exists = self
                .db
                .invoices()
                .count_documents(doc! { "_id": &invoice.id }, None)
                .await?
                > 0;
            return Err(if exists {
                InvoiceError::Conflict
            } else {
                InvoiceError::NotFound
            });
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<(), InvoiceError> {
        self.db
            .health_check()
            .await
            .map_err(|e| InvoiceError::Internal(anyhow::anyhow!(e.to_string())))
    }
}

/// Process-local store for tests and local runs without MongoDB.
#[derive(Default)]
pub struct InMemoryInvoiceStore {
    invoices: Mutex<HashMap<String, Invoice>>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Invoice>>, InvoiceError> {
        self.invoices
            .lock()
            .map_err(|e| InvoiceError::Internal(anyhow::anyhow!("Invoice store mutex poisoned: {}", e)))
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn insert(&self, invoice: &Invoice) -> Result<String, InvoiceError> {
        let mut invoices = self.lock()?;
        if invoices.contains_key(&invoice.id) {
            return Err(InvoiceError::Conflict);
        }
        invoices.insert(invoice.id.clone(), invoice.clone());
        Ok(invoice.id.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>, InvoiceError> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn find_many(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, InvoiceError> {
        let mut matching: Vec<Invoice> = self
            .lock()?
            .values()
            .filter(|invoice| filter.matches(invoice))
            .cloned()
            .collect();

        matching.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        if filter.direction == SortDirection::Descending {
            matching.reverse();
        }
        Ok(matching)
    }

    async fn update(&self, invoice: &Invoice, expected_version: i64) -> Result<(), InvoiceError> {
        let mut invoices = self.lock()?;
        let stored = invoices
            .get_mut(&invoice.id)
            .ok_or(InvoiceError::NotFound)?;

        if stored.version != expected_version {
            return Err(InvoiceError::Conflict);
        }
        *stored = invoice.clone();
        Ok(())
    }

    async fn health_check(&self) -> Result<(), InvoiceError> {
        self.lock().map(|_| ())
    }
}
