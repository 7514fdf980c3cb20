pub mod health;
pub mod invoices;

pub use health::{health_check, metrics_endpoint, readiness_check};
pub use invoices::{
    create_invoice, get_invoice, list_pending, list_received, list_sent, update_status,
    upload_proof, validate_invoice,
};
