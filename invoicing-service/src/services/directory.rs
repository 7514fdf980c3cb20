use crate::models::User;
use crate::services::database::MongoDb;
use crate::services::error::InvoiceError;
use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Document};
use std::collections::HashMap;
use std::sync::Mutex;

/// Lookup of registered accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, InvoiceError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, InvoiceError>;
}

#[derive(Clone)]
pub struct MongoUserDirectory {
    db: MongoDb,
}

impl MongoUserDirectory {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }

    /// Account keys are `ObjectId`s for accounts created by the auth service
    /// and plain strings otherwise; a hex subject may be either.
    fn id_filter(id: &str) -> Document {
        match ObjectId::parse_str(id) {
            Ok(oid) => doc! { "_id": { "$in": [oid, id] } },
            Err(_) => doc! { "_id": id },
        }
    }
}

#[async_trait]
impl UserDirectory for MongoUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, InvoiceError> {
        Ok(self.db.users().find_one(doc! { "email": email }, None).await?)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, InvoiceError> {
        Ok(self.db.users().find_one(Self::id_filter(id), None).await?)
    }
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let directory = Self::new();
        for user in users {
            directory.add(user);
        }
        directory
    }

    pub fn add(&self, user: User) {
        if let Ok(mut users) = self.users.lock() {
            users.insert(user.id.clone(), user);
        }
    }

    pub fn remove(&self, id: &str) {
        if let Ok(mut users) = self.users.lock() {
            users.remove(id);
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, User>>, InvoiceError> {
        self.users
            .lock()
            .map_err(|e| InvoiceError::Internal(anyhow::anyhow!("User directory mutex poisoned: {}", e)))
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, InvoiceError> {
        Ok(self.lock()?.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, InvoiceError> {
        Ok(self.lock()?.get(id).cloned())
    }
}
