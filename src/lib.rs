//! Core entry point for the fruit_invoice crate.
//!
//! [`invoice::invoice_plan`] describes the sample invoice as data, [`builder::DocumentBuilder`]
//! renders any [`model::LayoutPlan`] with `genpdf`, and [`generator`] produces fake line items.

pub mod builder;
pub mod elements;
pub mod error;
pub mod fonts;
pub mod generator;
pub mod invoice;
pub mod model;
pub mod symbols;

pub use builder::{assemble, DocumentBuilder, RenderedPdf};
pub use error::InvoiceError;
