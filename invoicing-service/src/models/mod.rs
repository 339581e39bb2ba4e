//! Domain models for invoicing-service.

mod invoice;
mod line_item;
mod product;
mod revenue;

pub use invoice::{
    CreateInvoice, DeletedInvoice, Invoice, InvoiceStatus, InvoiceWithItems, UpdateInvoice,
};
pub use line_item::{InvoiceItem, NewInvoiceItem};
pub use product::{Product, ProductPage};
pub use revenue::{chronological, RevenueBucket, RevenuePoint, RevenueRow};
