//! Services layer for invoicing-service.

pub mod database;
pub mod directory;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod metrics;
pub mod store;

pub use database::MongoDb;
pub use directory::{InMemoryUserDirectory, MongoUserDirectory, UserDirectory};
pub use error::InvoiceError;
pub use identity::{AccessTokenClaims, Identity, IdentityError, IdentityProvider, JwtIdentityProvider};
pub use lifecycle::{InvoiceLifecycle, LifecyclePolicy};
pub use metrics::{get_metrics, init_metrics};
pub use store::{InMemoryInvoiceStore, InvoiceStore, MongoInvoiceStore};
