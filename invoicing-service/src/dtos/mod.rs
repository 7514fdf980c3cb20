pub mod invoices;

pub use invoices::{
    CreateInvoiceRequest, HistoryEntryResponse, InvoiceActionResponse, InvoiceResponse,
    UpdateStatusRequest, UploadProofRequest, ValidateInvoiceRequest,
};
