//! Storage Layer - SQLite-backed asset database
//!
//! Tables:
//! - dbinfo(rowID, version)
//! - ScanFolders(ScanFolderID, ScanFolder, DisplayName, PortableKey, OutputPrefix, IsRoot)
//! - Sources(SourceID, ScanFolderPK, SourceName, SourceGuid, AnalysisFingerprint)
//! - Jobs(JobID, SourcePK, JobKey, Fingerprint, Platform, BuilderGuid, Status, JobRunKey, logs...)
//! - Products(ProductID, JobPK, ProductName, SubID, AssetType, LegacyGuid)
//! - LegacySubIDs(LegacySubID, ProductPK, SubID)
//! - ProductDependencies(ProductDependencyID, ProductPK, DependencySourceGuid, DependencySubID, ...)
//! - SourceDependency(SourceDependencyID, BuilderGuid, Source, DependsOnSource, TypeOfDependency)
//! - BuilderInfo(BuilderID, Guid, AnalysisFingerprint)
//! - Files(FileID, ScanFolderPK, FileName, IsFolder, ModTime)

pub mod connection;
pub mod decode;
pub mod query;
pub mod schema;
pub mod selection;
pub mod writer;

#[cfg(test)]
pub(crate) mod fixtures;

pub use connection::{AssetDatabaseConnection, DbStats, OpenMode};
pub use query::{like_search_term, JobFilter, LikeType, Query};
pub use schema::DatabaseVersion;
pub use selection::{Rows, Selection};
