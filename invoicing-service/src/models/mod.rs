//! Domain models for invoicing-service.

mod invoice;
mod user;

pub use invoice::{
    HistoryEntry, Invoice, InvoiceAction, InvoiceFilter, InvoiceStatus, NewInvoice, PartyRole,
    SortDirection, UnknownStatus, ValidationDecision,
};
pub use user::User;
