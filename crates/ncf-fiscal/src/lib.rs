//! Fiscal numbering (NCF) and DGII regulatory reporting for Dominican
//! Republic invoicing.
//!
//! The crate is organized around four collaborators: the document type
//! catalog, the sequence allocator that hands out gapless NCF numbers per
//! (type, company, validity window), the binder that attaches a number to a
//! business document exactly once, and the extractor that projects posted
//! documents into 606/607 report rows.

pub mod config;
pub mod error;
pub mod fiscal;
pub mod telemetry;
