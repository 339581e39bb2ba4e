pub mod health;
pub mod invoices;
pub mod products;
pub mod revenue;
