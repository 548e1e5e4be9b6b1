//! CSV snapshot ingestion: one-time population of the five schema tables.

pub mod loader;
pub mod tables;

pub use loader::*;
pub use tables::*;

use std::path::PathBuf;

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Data directory not found: {}", .0.display())]
    DataDirMissing(PathBuf),

    #[error("Missing CSV file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("{table}.csv is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for LoadError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::Sqlite(value))
    }
}
