//! # assetdb - Asset Dependency Tracking Database
//!
//! The persisted dependency graph behind an asset-processing pipeline.
//!
//! assetdb provides:
//! - Typed records for scan folders, sources, jobs, products and their dependencies
//! - A schema-version gated SQLite connection with a fixed catalog of named queries
//! - Lazy, filterable row iteration with early stop
//! - Direct and transitive product dependency resolution that tolerates cycles

pub mod config;
pub mod dependency;
pub mod entry;
pub mod job;
pub mod resolver;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use dependency::{ProductDependencyEntry, ProductDependencyType, SourceFileDependencyEntry, TypeOfDependency};
pub use entry::{
    AssetId, BuilderInfoEntry, CombinedEntry, DatabaseInfoEntry, FileEntry, LegacySubIdEntry, ProductEntry,
    ScanFolderEntry, SourceAndScanFolderEntry, SourceEntry, NO_ID,
};
pub use job::{JobEntry, JobInfo, JobStatus};
pub use resolver::{DependencyResolver, ResolvedDependency};
pub use storage::{AssetDatabaseConnection, DatabaseVersion, DbStats, JobFilter, LikeType, OpenMode};

use std::path::PathBuf;

/// Result type alias for asset database operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for asset database operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("There is no asset database at {0} and read-only access was requested")]
    MissingDatabase(PathBuf),

    #[error("Asset database at {0} is marked read-only on disk and cannot be opened for writing")]
    ReadOnlyDatabase(PathBuf),

    #[error("Invalid database version - database has {found} and we want {expected}")]
    VersionMismatch { found: i32, expected: i32 },

    #[error(
        "Table {0} is missing: the database was likely created by a newer version of this software, refusing to open it to prevent data loss"
    )]
    MissingTable(String),

    #[error("Asset database connection is not open")]
    NotOpen,

    #[error("Asset database connection was opened read-only")]
    ReadOnlyConnection,

    #[error("Dependency type {0:#x} cannot be stored, it is only valid as a query filter")]
    InvalidDependencyType(u32),
}
