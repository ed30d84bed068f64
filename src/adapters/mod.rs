// Adapters layer: concrete implementations for external systems (record store, attachment upload, PDF).

pub mod airtable;
pub mod attachment;
pub mod pdf;
