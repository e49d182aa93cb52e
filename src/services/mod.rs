pub mod ingest_service;
pub mod spreadsheet;
pub mod staging;
