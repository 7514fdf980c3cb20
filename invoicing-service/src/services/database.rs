use crate::models::{Invoice, User};
use mongodb::{
    bson::doc, options::IndexOptions, Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for invoicing-service");

        // Serves both "received" and "pending received" listings
        let received_index = IndexModel::builder()
            .keys(doc! { "recipient_email": 1, "status": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("recipient_status_created".to_string())
                    .build(),
            )
            .build();

        let sent_index = IndexModel::builder()
            .keys(doc! { "issuer_email": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("issuer_created".to_string())
                    .build(),
            )
            .build();

        self.invoices()
            .create_indexes([received_index, sent_index], None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create indexes on invoices collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created indexes on invoices collection");

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn invoices(&self) -> Collection<Invoice> {
        self.db.collection("invoices")
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
