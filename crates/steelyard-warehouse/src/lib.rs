//! Steelyard Warehouse - gateway abstraction over the analytical warehouse
//!
//! The warehouse itself (query planning, storage, load-job scheduling) is an
//! external collaborator; this crate only models its request/response
//! contracts:
//! - `WarehouseGateway`: submit SQL, introspect tables, start bulk loads
//! - `LoadJobHandle`: pollable status handle for an asynchronous load job
//! - `BigQueryGateway`: REST v2 implementation over reqwest
//! - `fakes`: in-memory gateway and job for tests

pub mod bigquery;
pub mod error;
pub mod fakes;
pub mod gateway;
pub mod row;

// Re-export key types
pub use bigquery::BigQueryGateway;
pub use error::{WarehouseError, WarehouseResult};
pub use gateway::{
    FieldSchema, LoadJobConfig, LoadJobHandle, LoadJobState, SourceFormat, TableRef, TableStats,
    WarehouseGateway, WriteDisposition,
};
pub use row::Row;
