//! Asset database connection
//!
//! Owns the SQLite handle, gates on the schema version, and exposes one
//! query method per entity and lookup key. Every query returns a lazy
//! [`Selection`]; "not found" is an empty selection, never an error.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::decode::{self, Decoder};
use super::query::{like_search_term, JobFilter, LikeType, Query};
use super::schema::{DatabaseVersion, EXPECTED_TABLES};
use super::selection::Selection;
use crate::config::{ensure_db_dir, AssetDbConfig};
use crate::dependency::{ProductDependencyEntry, SourceFileDependencyEntry, TypeOfDependency};
use crate::entry::{
    AssetId, BuilderInfoEntry, CombinedEntry, DatabaseInfoEntry, FileEntry, LegacySubIdEntry, ProductEntry,
    ScanFolderEntry, SourceAndScanFolderEntry, SourceEntry,
};
use crate::job::{JobEntry, JobInfo};
use crate::resolver::DependencyResolver;
use crate::{Error, Result};

/// How the database file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OpenMode {
    #[default]
    ReadOnly,
    ReadWrite,
}

/// Connection to the asset database.
///
/// Not thread-safe: callers sharing one connection across threads must
/// serialize access themselves.
pub struct AssetDatabaseConnection {
    path: PathBuf,
    mode: OpenMode,
    conn: Option<Connection>,
    validated_tables: RefCell<HashSet<String>>,
}

impl AssetDatabaseConnection {
    /// A closed connection for the database at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: OpenMode::ReadOnly,
            conn: None,
            validated_tables: RefCell::new(HashSet::new()),
        }
    }

    /// A closed connection for the database the config points at
    pub fn from_config(config: &AssetDbConfig, base: &Path) -> Self {
        Self::new(config.database_path(base))
    }

    /// Open an in-memory database with a fresh schema (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let mut db = Self::new(":memory:");
        db.conn = Some(Connection::open_in_memory()?);
        db.mode = OpenMode::ReadWrite;
        db.configure()?;
        db.create_schema()?;
        db.set_database_version(DatabaseVersion::LATEST)?;
        db.post_open()?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Open and validate the database. Any failure leaves the connection closed.
    pub fn open(&mut self, mode: OpenMode) -> Result<()> {
        self.close();
        match self.try_open(mode) {
            Ok(()) => {
                info!(path = %self.path.display(), ?mode, "opened asset database");
                Ok(())
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to open asset database");
                self.close();
                Err(e)
            }
        }
    }

    fn try_open(&mut self, mode: OpenMode) -> Result<()> {
        ensure_db_dir(&self.path)?;

        let exists = self.path.exists();
        match mode {
            OpenMode::ReadOnly if !exists => return Err(Error::MissingDatabase(self.path.clone())),
            OpenMode::ReadWrite if exists && std::fs::metadata(&self.path)?.permissions().readonly() => {
                return Err(Error::ReadOnlyDatabase(self.path.clone()));
            }
            _ => {}
        }

        let flags = match mode {
            OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            OpenMode::ReadWrite => {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_NO_MUTEX
            }
        };

        self.conn = Some(Connection::open_with_flags(&self.path, flags)?);
        self.mode = mode;
        self.configure()?;
        self.post_open()
    }

    fn configure(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.set_prepared_statement_cache_capacity(Query::ALL.len() + 8);
        self.validated_tables.borrow_mut().clear();
        Ok(())
    }

    /// Version gate, table check, then statement preparation
    fn post_open(&self) -> Result<()> {
        let version = self.query_database_version()?;
        if version != DatabaseVersion::LATEST {
            return Err(Error::VersionMismatch {
                found: version.0,
                expected: DatabaseVersion::LATEST.0,
            });
        }

        for table in EXPECTED_TABLES {
            if !self.validate_database_table(table)? {
                return Err(Error::MissingTable(table.to_string()));
            }
        }

        self.prepare_statements()
    }

    fn prepare_statements(&self) -> Result<()> {
        let conn = self.connection()?;
        for query in Query::ALL {
            conn.prepare_cached(&query.sql())?;
        }
        debug!(statements = Query::ALL.len(), "prepared query catalog");
        Ok(())
    }

    /// Close the handle and forget cached state. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.flush_prepared_statement_cache();
            if let Err((_, e)) = conn.close() {
                warn!(path = %self.path.display(), error = %e, "error while closing asset database");
            }
            info!(path = %self.path.display(), "closed asset database");
        }
        self.validated_tables.borrow_mut().clear();
    }

    pub(crate) fn connection(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(Error::NotOpen)
    }

    /// Whether `table` exists; positive answers are remembered until close
    pub fn validate_database_table(&self, table: &str) -> Result<bool> {
        if self.validated_tables.borrow().contains(table) {
            return Ok(true);
        }

        let exists: bool = self.connection()?.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [table],
            |row| row.get(0),
        )?;

        if exists {
            debug!(table, "validated table");
            self.validated_tables.borrow_mut().insert(table.to_string());
        }
        Ok(exists)
    }

    fn select<T>(&self, query: Query, params: Vec<Value>, decode: Decoder<T>) -> Result<Selection<'_, T>> {
        Selection::new(self.connection()?, query, params, decode)
    }

    fn select_jobs<T>(
        &self,
        query: Query,
        mut params: Vec<Value>,
        filter: &JobFilter,
        decode: Decoder<T>,
    ) -> Result<Selection<'_, T>> {
        params.push(filter.platform_value());
        Ok(self.select(query, params, decode)?.filtered(filter))
    }

    // ========== Whole Tables ==========

    pub fn query_database_info_table(&self) -> Result<Selection<'_, DatabaseInfoEntry>> {
        self.select(Query::DatabaseInfoTable, vec![], decode::database_info)
    }

    /// Stored schema version, or `DATABASE_DOES_NOT_EXIST` without a `dbinfo` row
    pub fn query_database_version(&self) -> Result<DatabaseVersion> {
        if !self.validate_database_table("dbinfo")? {
            return Ok(DatabaseVersion::DATABASE_DOES_NOT_EXIST);
        }
        Ok(self
            .query_database_info_table()?
            .first()?
            .map(|info| info.version)
            .unwrap_or(DatabaseVersion::DATABASE_DOES_NOT_EXIST))
    }

    pub fn query_builder_info_table(&self) -> Result<Selection<'_, BuilderInfoEntry>> {
        self.select(Query::BuilderInfoTable, vec![], decode::builder_info)
    }

    pub fn query_scan_folders_table(&self) -> Result<Selection<'_, ScanFolderEntry>> {
        self.select(Query::ScanFoldersTable, vec![], decode::scan_folder)
    }

    pub fn query_sources_table(&self) -> Result<Selection<'_, SourceEntry>> {
        self.select(Query::SourcesTable, vec![], decode::source)
    }

    pub fn query_jobs_table(&self, filter: &JobFilter) -> Result<Selection<'_, JobEntry>> {
        self.select_jobs(Query::JobsTable, vec![], filter, decode::job)
    }

    pub fn query_products_table(&self, filter: &JobFilter) -> Result<Selection<'_, ProductEntry>> {
        self.select_jobs(Query::ProductsTable, vec![], filter, decode::product)
    }

    /// Every product dependency with the asset id of the product that owns it
    pub fn query_product_dependencies_table(&self) -> Result<Selection<'_, (AssetId, ProductDependencyEntry)>> {
        self.select(Query::ProductDependenciesTable, vec![], decode::owned_product_dependency)
    }

    pub fn query_files_table(&self) -> Result<Selection<'_, FileEntry>> {
        self.select(Query::FilesTable, vec![], decode::file)
    }

    pub fn query_legacy_sub_ids_by_product_id(&self, product_id: i64) -> Result<Selection<'_, LegacySubIdEntry>> {
        self.select(Query::LegacySubIdsByProductId, vec![int(product_id)], decode::legacy_sub_id)
    }

    // ========== Scan Folders ==========

    pub fn query_scan_folder_by_scan_folder_id(&self, scan_folder_id: i64) -> Result<Selection<'_, ScanFolderEntry>> {
        self.select(Query::ScanFolderById, vec![int(scan_folder_id)], decode::scan_folder)
    }

    pub fn query_scan_folder_by_display_name(&self, display_name: &str) -> Result<Selection<'_, ScanFolderEntry>> {
        self.select(Query::ScanFolderByDisplayName, vec![text(display_name)], decode::scan_folder)
    }

    pub fn query_scan_folder_by_portable_key(&self, portable_key: &str) -> Result<Selection<'_, ScanFolderEntry>> {
        self.select(Query::ScanFolderByPortableKey, vec![text(portable_key)], decode::scan_folder)
    }

    pub fn query_scan_folder_by_source_id(&self, source_id: i64) -> Result<Selection<'_, ScanFolderEntry>> {
        self.select(Query::ScanFolderBySourceId, vec![int(source_id)], decode::scan_folder)
    }

    pub fn query_scan_folder_by_job_id(&self, job_id: i64) -> Result<Selection<'_, ScanFolderEntry>> {
        self.select(Query::ScanFolderByJobId, vec![int(job_id)], decode::scan_folder)
    }

    pub fn query_scan_folder_by_product_id(&self, product_id: i64) -> Result<Selection<'_, ScanFolderEntry>> {
        self.select(Query::ScanFolderByProductId, vec![int(product_id)], decode::scan_folder)
    }

    // ========== Sources ==========

    pub fn query_source_by_source_id(&self, source_id: i64) -> Result<Selection<'_, SourceEntry>> {
        self.select(Query::SourceById, vec![int(source_id)], decode::source)
    }

    pub fn query_sources_by_scan_folder_id(&self, scan_folder_id: i64) -> Result<Selection<'_, SourceEntry>> {
        self.select(Query::SourcesByScanFolderId, vec![int(scan_folder_id)], decode::source)
    }

    pub fn query_source_by_source_guid(&self, source_guid: &Uuid) -> Result<Selection<'_, SourceEntry>> {
        self.select(Query::SourcesByGuid, vec![guid(source_guid)], decode::source)
    }

    pub fn query_source_by_source_name(&self, source_name: &str) -> Result<Selection<'_, SourceEntry>> {
        self.select(Query::SourcesBySourceName, vec![text(source_name)], decode::source)
    }

    pub fn query_source_by_source_name_scan_folder_id(
        &self,
        source_name: &str,
        scan_folder_id: i64,
    ) -> Result<Selection<'_, SourceEntry>> {
        self.select(
            Query::SourceBySourceNameScanFolderId,
            vec![text(source_name), int(scan_folder_id)],
            decode::source,
        )
    }

    pub fn query_source_like_source_name(
        &self,
        source_name: &str,
        like_type: LikeType,
    ) -> Result<Selection<'_, SourceEntry>> {
        self.select(
            Query::SourcesLikeSourceName,
            vec![Value::Text(like_search_term(source_name, like_type))],
            decode::source,
        )
    }

    pub fn query_source_by_job_id(&self, job_id: i64) -> Result<Selection<'_, SourceEntry>> {
        self.select(Query::SourceByJobId, vec![int(job_id)], decode::source)
    }

    pub fn query_source_by_product_id(&self, product_id: i64) -> Result<Selection<'_, SourceEntry>> {
        self.select(Query::SourceByProductId, vec![int(product_id)], decode::source)
    }

    /// Every source with its scan folder (absent when the folder row is gone)
    pub fn query_source_and_scan_folder(&self) -> Result<Selection<'_, SourceAndScanFolderEntry>> {
        self.select(Query::SourcesAndScanFolders, vec![], decode::source_and_scan_folder)
    }

    /// The stored analysis fingerprint of a source, if the source is known
    pub fn query_source_analysis_fingerprint(&self, source_name: &str, scan_folder_id: i64) -> Result<Option<String>> {
        self.select(
            Query::SourceAnalysisFingerprint,
            vec![text(source_name), int(scan_folder_id)],
            decode::analysis_fingerprint,
        )?
        .first()
    }

    // ========== Jobs ==========

    pub fn query_job_by_job_id(&self, job_id: i64) -> Result<Selection<'_, JobEntry>> {
        self.select(Query::JobById, vec![int(job_id)], decode::job)
    }

    pub fn query_job_by_job_key(&self, job_key: &str) -> Result<Selection<'_, JobEntry>> {
        self.select(Query::JobsByJobKey, vec![text(job_key)], decode::job)
    }

    pub fn query_job_by_job_run_key(&self, job_run_key: u64) -> Result<Selection<'_, JobEntry>> {
        self.select(Query::JobsByJobRunKey, vec![Value::Integer(job_run_key as i64)], decode::job)
    }

    pub fn query_job_by_product_id(&self, product_id: i64) -> Result<Selection<'_, JobEntry>> {
        self.select(Query::JobByProductId, vec![int(product_id)], decode::job)
    }

    pub fn query_job_by_source_id(&self, source_id: i64, filter: &JobFilter) -> Result<Selection<'_, JobEntry>> {
        self.select_jobs(Query::JobsBySourceId, vec![int(source_id)], filter, decode::job)
    }

    // ========== Job Info ==========

    pub fn query_job_info_by_job_id(&self, job_id: i64) -> Result<Selection<'_, JobInfo>> {
        self.select(Query::JobInfoByJobId, vec![int(job_id)], decode::job_info)
    }

    pub fn query_job_info_by_job_run_key(&self, job_run_key: u64) -> Result<Selection<'_, JobInfo>> {
        self.select(Query::JobInfoByJobRunKey, vec![Value::Integer(job_run_key as i64)], decode::job_info)
    }

    pub fn query_job_info_by_job_key(&self, job_key: &str) -> Result<Selection<'_, JobInfo>> {
        self.select(Query::JobInfoByJobKey, vec![text(job_key)], decode::job_info)
    }

    pub fn query_job_info_by_source_name(&self, source_name: &str, filter: &JobFilter) -> Result<Selection<'_, JobInfo>> {
        self.select_jobs(Query::JobInfoBySourceName, vec![text(source_name)], filter, decode::job_info)
    }

    // ========== Products ==========

    pub fn query_product_by_product_id(&self, product_id: i64) -> Result<Selection<'_, ProductEntry>> {
        self.select(Query::ProductById, vec![int(product_id)], decode::product)
    }

    pub fn query_product_by_job_id(&self, job_id: i64, filter: &JobFilter) -> Result<Selection<'_, ProductEntry>> {
        self.select_jobs(Query::ProductsByJobId, vec![int(job_id)], filter, decode::product)
    }

    pub fn query_product_by_source_id(&self, source_id: i64, filter: &JobFilter) -> Result<Selection<'_, ProductEntry>> {
        self.select_jobs(Query::ProductsBySourceId, vec![int(source_id)], filter, decode::product)
    }

    pub fn query_product_by_product_name(
        &self,
        product_name: &str,
        filter: &JobFilter,
    ) -> Result<Selection<'_, ProductEntry>> {
        self.select_jobs(Query::ProductsByProductName, vec![text(product_name)], filter, decode::product)
    }

    pub fn query_product_like_product_name(
        &self,
        product_name: &str,
        like_type: LikeType,
        filter: &JobFilter,
    ) -> Result<Selection<'_, ProductEntry>> {
        self.select_jobs(
            Query::ProductsLikeProductName,
            vec![Value::Text(like_search_term(product_name, like_type))],
            filter,
            decode::product,
        )
    }

    pub fn query_product_by_source_name(
        &self,
        source_name: &str,
        filter: &JobFilter,
    ) -> Result<Selection<'_, ProductEntry>> {
        self.select_jobs(Query::ProductsBySourceName, vec![text(source_name)], filter, decode::product)
    }

    pub fn query_product_like_source_name(
        &self,
        source_name: &str,
        like_type: LikeType,
        filter: &JobFilter,
    ) -> Result<Selection<'_, ProductEntry>> {
        self.select_jobs(
            Query::ProductsLikeSourceName,
            vec![Value::Text(like_search_term(source_name, like_type))],
            filter,
            decode::product,
        )
    }

    pub fn query_product_by_job_id_sub_id(&self, job_id: i64, sub_id: u32) -> Result<Selection<'_, ProductEntry>> {
        self.select(Query::ProductByJobIdSubId, vec![int(job_id), sub(sub_id)], decode::product)
    }

    pub fn query_product_by_source_guid_sub_id(
        &self,
        source_guid: &Uuid,
        sub_id: u32,
    ) -> Result<Selection<'_, ProductEntry>> {
        self.select(Query::ProductsBySourceGuidSubId, vec![guid(source_guid), sub(sub_id)], decode::product)
    }

    // ========== Combined ==========

    pub fn query_combined(&self, filter: &JobFilter) -> Result<Selection<'_, CombinedEntry>> {
        self.select_jobs(Query::Combined, vec![], filter, decode::combined)
    }

    pub fn query_combined_by_source_id(
        &self,
        source_id: i64,
        filter: &JobFilter,
    ) -> Result<Selection<'_, CombinedEntry>> {
        self.select_jobs(Query::CombinedBySourceId, vec![int(source_id)], filter, decode::combined)
    }

    pub fn query_combined_by_job_id(&self, job_id: i64, filter: &JobFilter) -> Result<Selection<'_, CombinedEntry>> {
        self.select_jobs(Query::CombinedByJobId, vec![int(job_id)], filter, decode::combined)
    }

    pub fn query_combined_by_product_id(
        &self,
        product_id: i64,
        filter: &JobFilter,
    ) -> Result<Selection<'_, CombinedEntry>> {
        self.select_jobs(Query::CombinedByProductId, vec![int(product_id)], filter, decode::combined)
    }

    /// Products whose source GUID or legacy GUID is `source_guid`; source GUID matches come first
    pub fn query_combined_by_source_guid_product_sub_id(
        &self,
        source_guid: &Uuid,
        product_sub_id: u32,
        filter: &JobFilter,
    ) -> Result<Selection<'_, CombinedEntry>> {
        self.select_jobs(
            Query::CombinedBySourceGuidProductSubId,
            vec![sub(product_sub_id), guid(source_guid)],
            filter,
            decode::combined,
        )
    }

    pub fn query_combined_by_source_name(
        &self,
        source_name: &str,
        filter: &JobFilter,
    ) -> Result<Selection<'_, CombinedEntry>> {
        self.select_jobs(Query::CombinedBySourceName, vec![text(source_name)], filter, decode::combined)
    }

    pub fn query_combined_like_source_name(
        &self,
        source_name: &str,
        like_type: LikeType,
        filter: &JobFilter,
    ) -> Result<Selection<'_, CombinedEntry>> {
        self.select_jobs(
            Query::CombinedLikeSourceName,
            vec![Value::Text(like_search_term(source_name, like_type))],
            filter,
            decode::combined,
        )
    }

    pub fn query_combined_by_product_name(
        &self,
        product_name: &str,
        filter: &JobFilter,
    ) -> Result<Selection<'_, CombinedEntry>> {
        self.select_jobs(Query::CombinedByProductName, vec![text(product_name)], filter, decode::combined)
    }

    pub fn query_combined_like_product_name(
        &self,
        product_name: &str,
        like_type: LikeType,
        filter: &JobFilter,
    ) -> Result<Selection<'_, CombinedEntry>> {
        self.select_jobs(
            Query::CombinedLikeProductName,
            vec![Value::Text(like_search_term(product_name, like_type))],
            filter,
            decode::combined,
        )
    }

    // ========== Source Dependencies ==========

    pub fn query_source_dependency_by_source_dependency_id(
        &self,
        source_dependency_id: i64,
    ) -> Result<Selection<'_, SourceFileDependencyEntry>> {
        self.select(Query::SourceDependencyById, vec![int(source_dependency_id)], decode::source_dependency)
    }

    /// Reverse lookup: who depends on `depends_on_source`.
    ///
    /// `dependent_filter` is a raw LIKE pattern over the dependent source,
    /// defaulting to everything. When `kind` includes wildcard dependencies,
    /// every exact source or job edge on `depends_on_source` is returned along
    /// with the stored patterns that match it.
    pub fn query_source_dependency_by_depends_on_source(
        &self,
        depends_on_source: &str,
        dependent_filter: Option<&str>,
        kind: TypeOfDependency,
    ) -> Result<Selection<'_, SourceFileDependencyEntry>> {
        if kind.includes_like_match() {
            return self.select(
                Query::SourceDependenciesByDependsOnSourceWildcard,
                vec![
                    text(depends_on_source),
                    mask(TypeOfDependency::SourceOrJob),
                    text(dependent_filter.unwrap_or("%")),
                    mask(TypeOfDependency::SourceLikeMatch),
                ],
                decode::source_dependency,
            );
        }

        self.select(
            Query::SourceDependenciesByDependsOnSource,
            vec![text(depends_on_source), mask(kind), text(dependent_filter.unwrap_or("%"))],
            decode::source_dependency,
        )
    }

    /// Forward lookup: what `source` depends on, optionally filtered by a raw
    /// LIKE pattern over the depended-on side
    pub fn query_depends_on_source_by_source(
        &self,
        source: &str,
        depends_on_filter: Option<&str>,
        kind: TypeOfDependency,
    ) -> Result<Selection<'_, SourceFileDependencyEntry>> {
        self.select(
            Query::DependsOnSourceBySource,
            vec![text(source), mask(kind), text(depends_on_filter.unwrap_or("%"))],
            decode::source_dependency,
        )
    }

    // ========== Product Dependencies ==========

    pub fn query_product_dependency_by_product_dependency_id(
        &self,
        product_dependency_id: i64,
    ) -> Result<Selection<'_, ProductDependencyEntry>> {
        self.select(Query::ProductDependencyById, vec![int(product_dependency_id)], decode::product_dependency)
    }

    pub fn query_product_dependency_by_product_id(
        &self,
        product_id: i64,
    ) -> Result<Selection<'_, ProductDependencyEntry>> {
        self.select(Query::ProductDependenciesByProductId, vec![int(product_id)], decode::product_dependency)
    }

    /// The resolution worklist: dependencies whose target is still a path
    pub fn query_unresolved_product_dependencies(&self) -> Result<Selection<'_, ProductDependencyEntry>> {
        self.select(Query::UnresolvedProductDependencies, vec![], decode::product_dependency)
    }

    /// Products that `product_id` depends on directly
    pub fn query_direct_product_dependencies(&self, product_id: i64) -> Result<Selection<'_, ProductEntry>> {
        self.select(Query::DirectProductDependencies, vec![int(product_id)], decode::product)
    }

    /// Every product reachable from `product_id`, excluding the product itself
    pub fn query_all_product_dependencies(&self, product_id: i64) -> Result<Vec<ProductEntry>> {
        Ok(DependencyResolver::new(self)
            .transitive(product_id)?
            .into_iter()
            .map(|dep| dep.product)
            .collect())
    }

    // ========== Files ==========

    pub fn query_file_by_file_id(&self, file_id: i64) -> Result<Selection<'_, FileEntry>> {
        self.select(Query::FileById, vec![int(file_id)], decode::file)
    }

    pub fn query_files_by_file_name_and_scan_folder_id(
        &self,
        file_name: &str,
        scan_folder_id: i64,
    ) -> Result<Selection<'_, FileEntry>> {
        self.select(
            Query::FilesByFileNameScanFolderId,
            vec![text(file_name), int(scan_folder_id)],
            decode::file,
        )
    }

    pub fn query_files_like_file_name(&self, file_name: &str, like_type: LikeType) -> Result<Selection<'_, FileEntry>> {
        self.select(
            Query::FilesLikeFileName,
            vec![Value::Text(like_search_term(file_name, like_type))],
            decode::file,
        )
    }

    pub fn query_files_by_scan_folder_id(&self, scan_folder_id: i64) -> Result<Selection<'_, FileEntry>> {
        self.select(Query::FilesByScanFolderId, vec![int(scan_folder_id)], decode::file)
    }

    // ========== Statistics ==========

    /// Row count of every table
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.connection()?;
        let mut tables = Vec::with_capacity(EXPECTED_TABLES.len());
        for table in EXPECTED_TABLES {
            let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            tables.push((table.to_string(), count as usize));
        }
        Ok(DbStats {
            version: self.query_database_version()?,
            tables,
        })
    }
}

impl Drop for AssetDatabaseConnection {
    fn drop(&mut self) {
        self.close();
    }
}

fn int(value: i64) -> Value {
    Value::Integer(value)
}

fn sub(value: u32) -> Value {
    Value::Integer(i64::from(value))
}

fn mask(kind: TypeOfDependency) -> Value {
    Value::Integer(i64::from(kind.bits()))
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn guid(value: &Uuid) -> Value {
    Value::Blob(value.as_bytes().to_vec())
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub version: DatabaseVersion,
    pub tables: Vec<(String, usize)>,
}

impl DbStats {
    pub fn count(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|(name, _)| name == table).map(|(_, count)| *count)
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Version: {}", self.version)?;
        for (table, count) in &self.tables {
            writeln!(f, "  {}: {}", table, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::ProductDependencyType;
    use crate::job::JobStatus;
    use crate::storage::fixtures::{Chain, ASSET_TYPE, BUILDER};
    use tempfile::TempDir;

    fn created(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("assetdb.sqlite");
        AssetDatabaseConnection::create(&path).unwrap();
        path
    }

    #[test]
    fn test_open_close_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = created(&dir);

        let mut db = AssetDatabaseConnection::new(&path);
        assert!(!db.is_open());
        db.close();
        db.close();

        db.open(OpenMode::ReadOnly).unwrap();
        assert!(db.is_open());
        db.open(OpenMode::ReadWrite).unwrap();
        assert_eq!(db.mode(), OpenMode::ReadWrite);

        db.close();
        db.close();
        assert!(!db.is_open());
        assert!(matches!(db.query_sources_table(), Err(Error::NotOpen)));
    }

    #[test]
    fn test_read_only_open_of_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("missing.sqlite");

        let mut db = AssetDatabaseConnection::new(&path);
        let err = db.open(OpenMode::ReadOnly).unwrap_err();
        assert!(matches!(err, Error::MissingDatabase(p) if p == path));
        assert!(!db.is_open());
        assert!(path.parent().unwrap().exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_read_write_open_of_read_only_file() {
        let dir = TempDir::new().unwrap();
        let path = created(&dir);

        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&path, perms.clone()).unwrap();

        let mut db = AssetDatabaseConnection::new(&path);
        assert!(matches!(db.open(OpenMode::ReadWrite), Err(Error::ReadOnlyDatabase(_))));
        assert!(!db.is_open());
        db.open(OpenMode::ReadOnly).unwrap();

        perms.set_readonly(false);
        std::fs::set_permissions(&path, perms).unwrap();
    }

    #[test]
    fn test_version_mismatch_leaves_connection_closed() {
        let dir = TempDir::new().unwrap();
        let path = created(&dir);
        Connection::open(&path)
            .unwrap()
            .execute("UPDATE dbinfo SET version = ?1", [DatabaseVersion::ADDED_TYPE_OF_DEPENDENCY_INDEX.0])
            .unwrap();

        let mut db = AssetDatabaseConnection::new(&path);
        let err = db.open(OpenMode::ReadOnly).unwrap_err();
        assert!(matches!(err, Error::VersionMismatch { found: 21, expected: 22 }));
        assert!(!db.is_open());
    }

    #[test]
    fn test_missing_table_refuses_open() {
        let dir = TempDir::new().unwrap();
        let path = created(&dir);
        Connection::open(&path).unwrap().execute("DROP TABLE Files", []).unwrap();

        let mut db = AssetDatabaseConnection::new(&path);
        let err = db.open(OpenMode::ReadOnly).unwrap_err();
        assert!(matches!(&err, Error::MissingTable(t) if t == "Files"));
        assert!(err.to_string().contains("newer version"));
        assert!(!db.is_open());
    }

    #[test]
    fn test_version_of_empty_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.sqlite");
        Connection::open(&path).unwrap().execute_batch("CREATE TABLE Unrelated (x INTEGER)").unwrap();

        let mut db = AssetDatabaseConnection::new(&path);
        let err = db.open(OpenMode::ReadWrite).unwrap_err();
        assert!(matches!(err, Error::VersionMismatch { found: -1, .. }));
    }

    #[test]
    fn test_validate_database_table() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        assert!(db.validate_database_table("Sources").unwrap());
        assert!(db.validate_database_table("Sources").unwrap());
        assert!(!db.validate_database_table("Symbols").unwrap());
        assert_eq!(db.query_database_version().unwrap(), DatabaseVersion::LATEST);
    }

    #[test]
    fn test_scan_folder_round_trip() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let chain = Chain::seed(&db, "rock.png", "pc");
        let folder = &chain.scan_folder;

        let lookups = [
            db.query_scan_folder_by_scan_folder_id(folder.scan_folder_id).unwrap().first().unwrap(),
            db.query_scan_folder_by_display_name(&folder.display_name).unwrap().first().unwrap(),
            db.query_scan_folder_by_portable_key(&folder.portable_key).unwrap().first().unwrap(),
            db.query_scan_folder_by_source_id(chain.source.source_id).unwrap().first().unwrap(),
            db.query_scan_folder_by_job_id(chain.job.job_id).unwrap().first().unwrap(),
            db.query_scan_folder_by_product_id(chain.product.product_id).unwrap().first().unwrap(),
        ];
        for found in lookups {
            let found = found.unwrap();
            assert_eq!(&found, folder);
            assert_eq!(found.scan_folder, folder.scan_folder);
        }

        assert!(db.query_scan_folder_by_scan_folder_id(9999).unwrap().first().unwrap().is_none());
    }

    #[test]
    fn test_source_round_trip() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let chain = Chain::seed(&db, "rock.png", "pc");
        let source = &chain.source;

        assert_eq!(db.query_source_by_source_id(source.source_id).unwrap().first().unwrap().as_ref(), Some(source));
        assert_eq!(db.query_source_by_source_guid(&source.source_guid).unwrap().collect_vec().unwrap(), vec![source.clone()]);
        assert_eq!(db.query_source_by_source_name("rock.png").unwrap().collect_vec().unwrap(), vec![source.clone()]);
        assert_eq!(
            db.query_source_by_source_name_scan_folder_id("rock.png", chain.scan_folder.scan_folder_id)
                .unwrap()
                .collect_vec()
                .unwrap(),
            vec![source.clone()]
        );
        assert!(db
            .query_source_by_source_name_scan_folder_id("rock.png", chain.scan_folder.scan_folder_id + 1)
            .unwrap()
            .first()
            .unwrap()
            .is_none());
        assert_eq!(db.query_sources_by_scan_folder_id(chain.scan_folder.scan_folder_id).unwrap().collect_vec().unwrap().len(), 1);
        assert_eq!(db.query_source_by_job_id(chain.job.job_id).unwrap().first().unwrap().as_ref(), Some(source));
        assert_eq!(db.query_source_by_product_id(chain.product.product_id).unwrap().first().unwrap().as_ref(), Some(source));

        let joined = db.query_source_and_scan_folder().unwrap().collect_vec().unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].scan_folder.as_ref(), Some(&chain.scan_folder));
    }

    #[test]
    fn test_source_analysis_fingerprint() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let mut folder = ScanFolderEntry::new("/project", "project", "project");
        db.insert_scan_folder(&mut folder).unwrap();
        let mut source = SourceEntry::new(folder.scan_folder_id, "level.prefab", Uuid::new_v4()).with_fingerprint("abc123");
        db.insert_source(&mut source).unwrap();

        assert_eq!(
            db.query_source_analysis_fingerprint("level.prefab", folder.scan_folder_id).unwrap(),
            Some("abc123".to_string())
        );
        assert_eq!(db.query_source_analysis_fingerprint("other.prefab", folder.scan_folder_id).unwrap(), None);
    }

    #[test]
    fn test_job_round_trip() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let chain = Chain::seed(&db, "rock.png", "pc");
        let job = &chain.job;

        assert_eq!(db.query_job_by_job_id(job.job_id).unwrap().first().unwrap().as_ref(), Some(job));
        assert_eq!(db.query_job_by_job_key("Compile").unwrap().collect_vec().unwrap(), vec![job.clone()]);
        assert_eq!(db.query_job_by_job_run_key(job.job_run_key).unwrap().collect_vec().unwrap(), vec![job.clone()]);
        assert_eq!(db.query_job_by_product_id(chain.product.product_id).unwrap().first().unwrap().as_ref(), Some(job));

        let by_platform = db
            .query_job_by_source_id(chain.source.source_id, &JobFilter::new().platform("pc"))
            .unwrap()
            .collect_vec()
            .unwrap();
        assert_eq!(by_platform, vec![job.clone()]);

        let info = db.query_job_info_by_job_id(job.job_id).unwrap().first().unwrap().unwrap();
        assert_eq!(info.source_file, "rock.png");
        assert_eq!(info.watch_folder, chain.scan_folder.scan_folder);
        assert_eq!(db.query_job_info_by_job_run_key(job.job_run_key).unwrap().collect_vec().unwrap().len(), 1);
        assert_eq!(db.query_job_info_by_job_key("Compile").unwrap().collect_vec().unwrap().len(), 1);
        assert_eq!(
            db.query_job_info_by_source_name("rock.png", &JobFilter::new()).unwrap().collect_vec().unwrap().len(),
            1
        );
    }

    #[test]
    fn test_product_round_trip() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let chain = Chain::seed(&db, "rock.png", "pc");
        let product = &chain.product;
        let all = JobFilter::new();

        assert_eq!(db.query_product_by_product_id(product.product_id).unwrap().first().unwrap().as_ref(), Some(product));
        assert_eq!(db.query_product_by_job_id(chain.job.job_id, &all).unwrap().collect_vec().unwrap(), vec![product.clone()]);
        assert_eq!(db.query_product_by_source_id(chain.source.source_id, &all).unwrap().collect_vec().unwrap(), vec![product.clone()]);
        assert_eq!(db.query_product_by_product_name("pc/rock.png.out", &all).unwrap().collect_vec().unwrap(), vec![product.clone()]);
        assert_eq!(db.query_product_by_source_name("rock.png", &all).unwrap().collect_vec().unwrap(), vec![product.clone()]);
        assert_eq!(
            db.query_product_like_product_name("rock", LikeType::Matches, &all).unwrap().collect_vec().unwrap(),
            vec![product.clone()]
        );
        assert_eq!(
            db.query_product_like_source_name("rock", LikeType::StartsWith, &all).unwrap().collect_vec().unwrap(),
            vec![product.clone()]
        );
        assert_eq!(db.query_product_by_job_id_sub_id(chain.job.job_id, 0).unwrap().first().unwrap().as_ref(), Some(product));
        assert_eq!(
            db.query_product_by_source_guid_sub_id(&chain.source.source_guid, 0).unwrap().first().unwrap().as_ref(),
            Some(product)
        );
        assert!(db.query_product_by_job_id_sub_id(chain.job.job_id, 1).unwrap().first().unwrap().is_none());
        assert!(db
            .query_product_by_product_name("pc/rock.png.out", &JobFilter::new().platform("ios"))
            .unwrap()
            .first()
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_combined_queries() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let chain = Chain::seed(&db, "rock.png", "pc");
        Chain::seed(&db, "tree.png", "ios");
        let all = JobFilter::new();

        assert_eq!(db.query_combined(&all).unwrap().collect_vec().unwrap().len(), 2);
        assert_eq!(db.query_combined(&JobFilter::new().platform("ios")).unwrap().collect_vec().unwrap().len(), 1);

        let found = db.query_combined_by_product_id(chain.product.product_id, &all).unwrap().first().unwrap().unwrap();
        assert_eq!(found.source, chain.source);
        assert_eq!(found.job, chain.job);
        assert_eq!(found.product, chain.product);
        assert_eq!(found.scan_folder, chain.scan_folder);
        assert_eq!(found.asset_id(), AssetId::new(chain.source.source_guid, 0));

        assert!(db.query_combined_by_source_id(chain.source.source_id, &all).unwrap().exists().unwrap());
        assert!(db.query_combined_by_job_id(chain.job.job_id, &all).unwrap().exists().unwrap());
        assert!(db.query_combined_by_source_name("rock.png", &all).unwrap().exists().unwrap());
        assert!(db.query_combined_like_source_name(".png", LikeType::EndsWith, &all).unwrap().exists().unwrap());
        assert!(db.query_combined_by_product_name("pc/rock.png.out", &all).unwrap().exists().unwrap());
        assert_eq!(
            db.query_combined_like_product_name("ios/", LikeType::StartsWith, &all).unwrap().collect_vec().unwrap().len(),
            1
        );
        assert!(!db
            .query_combined_by_source_name("rock.png", &JobFilter::new().platform("ios"))
            .unwrap()
            .exists()
            .unwrap());
    }

    #[test]
    fn test_job_filter_row_criteria() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let chain = Chain::seed(&db, "rock.png", "pc");

        let other_builder = Uuid::new_v4();
        let mut failed = JobEntry::new(chain.source.source_id, "Package", 7, "pc", other_builder, JobStatus::Failed, 77)
            .with_fail_log(10, "fail.log");
        db.insert_job(&mut failed).unwrap();

        let source_id = chain.source.source_id;
        let jobs = |filter: JobFilter| db.query_job_by_source_id(source_id, &filter).unwrap().collect_vec().unwrap();

        assert_eq!(jobs(JobFilter::new()).len(), 2);
        assert_eq!(jobs(JobFilter::new().status(JobStatus::Failed)), vec![failed.clone()]);
        assert_eq!(jobs(JobFilter::new().builder(BUILDER)), vec![chain.job.clone()]);
        assert_eq!(jobs(JobFilter::new().builder(Uuid::nil())).len(), 2);
        assert_eq!(jobs(JobFilter::new().job_key("Package")), vec![failed.clone()]);
        assert!(jobs(JobFilter::new().job_key("Package").status(JobStatus::Completed)).is_empty());
        assert!(jobs(JobFilter::new().platform("ios")).is_empty());

        let stored = db.query_job_by_job_id(failed.job_id).unwrap().first().unwrap().unwrap();
        assert_eq!(stored.first_fail_log_file, "fail.log");
        assert_eq!(stored.last_fail_log_time, 10);
    }

    #[test]
    fn test_like_search_is_literal() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let mut folder = ScanFolderEntry::new("/project", "project", "project");
        db.insert_scan_folder(&mut folder).unwrap();
        for name in ["100%_done.txt", "100Xdone.txt", "100%Ydone.txt"] {
            db.insert_source(&mut SourceEntry::new(folder.scan_folder_id, name, Uuid::new_v4())).unwrap();
            db.insert_file(&mut FileEntry::new(folder.scan_folder_id, name, false, 1)).unwrap();
        }

        let sources = db.query_source_like_source_name("100%_done", LikeType::Matches).unwrap().collect_vec().unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source_name, "100%_done.txt");

        let files = db.query_files_like_file_name("100%_", LikeType::StartsWith).unwrap().collect_vec().unwrap();
        assert_eq!(files.len(), 1);

        let raw = db.query_files_like_file_name("100_done.txt", LikeType::Raw).unwrap().collect_vec().unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].file_name, "100Xdone.txt");
    }

    #[test]
    fn test_file_round_trip() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let mut folder = ScanFolderEntry::new("/project", "project", "project");
        db.insert_scan_folder(&mut folder).unwrap();
        let mut file = FileEntry::new(folder.scan_folder_id, "textures", true, 1_700_000_000_000);
        db.insert_file(&mut file).unwrap();

        assert_eq!(db.query_file_by_file_id(file.file_id).unwrap().first().unwrap().as_ref(), Some(&file));
        assert_eq!(
            db.query_files_by_file_name_and_scan_folder_id("TEXTURES", folder.scan_folder_id)
                .unwrap()
                .collect_vec()
                .unwrap(),
            vec![file.clone()]
        );
        assert_eq!(db.query_files_by_scan_folder_id(folder.scan_folder_id).unwrap().collect_vec().unwrap().len(), 1);
        assert_eq!(db.query_files_table().unwrap().first().unwrap().unwrap().mod_time, 1_700_000_000_000);
    }

    #[test]
    fn test_early_stop_delivers_one_row() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let mut chains = Vec::new();
        for name in ["a.png", "b.png", "c.png"] {
            chains.push(Chain::seed(&db, name, "pc"));
        }
        for chain in &chains[1..] {
            chains[0].depend_on(&db, chain);
            let mut dep = SourceFileDependencyEntry::new(BUILDER, &chain.source.source_name, "shared.h", TypeOfDependency::SourceToSource);
            db.insert_source_dependency(&mut dep).unwrap();
        }

        let mut visits = 0;
        let found = db
            .query_sources_table()
            .unwrap()
            .for_each_while(|_| {
                visits += 1;
                false
            })
            .unwrap();
        assert!(found);
        assert_eq!(visits, 1);

        let mut visits = 0;
        let found = db
            .query_combined(&JobFilter::new())
            .unwrap()
            .for_each_while(|_| {
                visits += 1;
                false
            })
            .unwrap();
        assert!(found);
        assert_eq!(visits, 1);

        let mut visits = 0;
        db.query_source_dependency_by_depends_on_source("shared.h", None, TypeOfDependency::Any)
            .unwrap()
            .for_each_while(|_| {
                visits += 1;
                false
            })
            .unwrap();
        assert_eq!(visits, 1);

        let mut visits = 0;
        db.query_direct_product_dependencies(chains[0].product.product_id)
            .unwrap()
            .for_each_while(|_| {
                visits += 1;
                false
            })
            .unwrap();
        assert_eq!(visits, 1);

        let mut selection = db.query_jobs_table(&JobFilter::new()).unwrap();
        assert!(selection.rows().unwrap().next().is_some());

        let found = db.query_source_by_source_name("missing.png").unwrap().for_each_while(|_| true).unwrap();
        assert!(!found);
    }

    fn visits_before_stop<T>(selection: Selection<'_, T>) -> usize {
        let mut visits = 0;
        let found = selection
            .for_each_while(|_| {
                visits += 1;
                false
            })
            .unwrap();
        assert!(found);
        visits
    }

    #[test]
    fn test_early_stop_across_tables() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let chains: Vec<Chain> = ["a.png", "b.png", "c.png"]
            .into_iter()
            .map(|name| Chain::seed(&db, name, "pc"))
            .collect();
        let root = &chains[0];
        for chain in &chains[1..] {
            root.depend_on(&db, chain);
        }
        for sub_id in [5, 6] {
            db.insert_legacy_sub_id(&mut LegacySubIdEntry::new(root.product.product_id, sub_id)).unwrap();
        }
        for name in ["a.png", "a.png.meta"] {
            db.insert_file(&mut FileEntry::new(root.scan_folder.scan_folder_id, name, false, 1)).unwrap();
        }

        assert_eq!(visits_before_stop(db.query_scan_folders_table().unwrap()), 1);
        assert_eq!(visits_before_stop(db.query_products_table(&JobFilter::new()).unwrap()), 1);
        assert_eq!(visits_before_stop(db.query_job_info_by_job_key("Compile").unwrap()), 1);
        assert_eq!(visits_before_stop(db.query_product_dependencies_table().unwrap()), 1);
        assert_eq!(
            visits_before_stop(db.query_product_dependency_by_product_id(root.product.product_id).unwrap()),
            1
        );
        assert_eq!(visits_before_stop(db.query_files_table().unwrap()), 1);
        assert_eq!(
            visits_before_stop(db.query_files_by_scan_folder_id(root.scan_folder.scan_folder_id).unwrap()),
            1
        );
        assert_eq!(
            visits_before_stop(db.query_legacy_sub_ids_by_product_id(root.product.product_id).unwrap()),
            1
        );
        assert_eq!(
            visits_before_stop(db.query_combined(&JobFilter::new()).unwrap().with_legacy_sub_ids()),
            1
        );
    }

    #[test]
    fn test_legacy_sub_id_enrichment() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let chain = Chain::seed(&db, "mesh.fbx", "pc");
        for sub_id in [3, 4] {
            db.insert_legacy_sub_id(&mut LegacySubIdEntry::new(chain.product.product_id, sub_id)).unwrap();
        }

        let plain = db.query_combined(&JobFilter::new()).unwrap().first().unwrap().unwrap();
        assert!(plain.legacy_sub_ids.is_empty());

        let enriched = db
            .query_combined(&JobFilter::new())
            .unwrap()
            .with_legacy_sub_ids()
            .first()
            .unwrap()
            .unwrap();
        let sub_ids: Vec<u32> = enriched.legacy_sub_ids.iter().map(|l| l.sub_id).collect();
        assert_eq!(sub_ids, vec![3, 4]);
        assert_eq!(db.query_legacy_sub_ids_by_product_id(chain.product.product_id).unwrap().collect_vec().unwrap().len(), 2);
    }

    #[test]
    fn test_source_guid_lookup_prefers_primary_guid() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let legacy = Chain::seed(&db, "old_name.fbx", "pc");
        let primary = Chain::seed(&db, "new_name.fbx", "pc");

        // A product elsewhere that used to be known by the primary source's GUID
        let mut renamed = ProductEntry::new(legacy.job.job_id, 0, "pc/renamed.out", ASSET_TYPE)
            .with_legacy_guid(primary.source.source_guid);
        db.insert_product(&mut renamed).unwrap();

        let found = db
            .query_combined_by_source_guid_product_sub_id(&primary.source.source_guid, 0, &JobFilter::new())
            .unwrap()
            .collect_vec()
            .unwrap();
        let ids: Vec<i64> = found.iter().map(|c| c.product.product_id).collect();
        assert_eq!(ids, vec![primary.product.product_id, renamed.product_id]);
    }

    #[test]
    fn test_source_dependency_lookups() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let deps = [
            ("a.material", "b.png", TypeOfDependency::SourceToSource),
            ("c.material", "textures/%.png", TypeOfDependency::SourceLikeMatch),
            ("d.script", "b.png", TypeOfDependency::JobToJob),
        ];
        for (source, depends_on, kind) in deps {
            let mut dep = SourceFileDependencyEntry::new(BUILDER, source, depends_on, kind);
            db.insert_source_dependency(&mut dep).unwrap();
            let stored = db
                .query_source_dependency_by_source_dependency_id(dep.source_dependency_id)
                .unwrap()
                .first()
                .unwrap();
            assert_eq!(stored, Some(dep));
        }

        let sources = |depends_on: &str, filter: Option<&str>, kind| -> Vec<String> {
            db.query_source_dependency_by_depends_on_source(depends_on, filter, kind)
                .unwrap()
                .collect_vec()
                .unwrap()
                .into_iter()
                .map(|d| d.source)
                .collect()
        };

        assert_eq!(sources("b.png", None, TypeOfDependency::SourceToSource), vec!["a.material"]);
        assert_eq!(sources("b.png", None, TypeOfDependency::SourceOrJob), vec!["a.material", "d.script"]);
        assert_eq!(sources("b.png", Some("d.%"), TypeOfDependency::Any), vec!["d.script"]);
        assert_eq!(sources("textures/rock.png", None, TypeOfDependency::Any), vec!["c.material"]);
        assert_eq!(sources("textures/rock.png", None, TypeOfDependency::SourceLikeMatch), vec!["c.material"]);
        // a wildcard lookup still sees the exact edges of both kinds
        assert_eq!(sources("b.png", None, TypeOfDependency::SourceLikeMatch), vec!["a.material", "d.script"]);
        assert_eq!(sources("b.png", Some("a.%"), TypeOfDependency::SourceLikeMatch), vec!["a.material"]);
        assert!(sources("textures/rock.png", None, TypeOfDependency::SourceToSource).is_empty());

        let forward = db
            .query_depends_on_source_by_source("a.material", None, TypeOfDependency::Any)
            .unwrap()
            .collect_vec()
            .unwrap();
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].depends_on_source, "b.png");
        assert!(db
            .query_depends_on_source_by_source("a.material", Some("%.tga"), TypeOfDependency::Any)
            .unwrap()
            .first()
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unresolved_worklist() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let a = Chain::seed(&db, "a.material", "pc");
        let b = Chain::seed(&db, "b.png", "pc");

        let resolved = a.depend_on(&db, &b);
        let mut pending =
            ProductDependencyEntry::unresolved(a.product.product_id, "textures/missing.png", ProductDependencyType::SourceFile, "pc");
        db.insert_product_dependency(&mut pending).unwrap();

        let worklist = db.query_unresolved_product_dependencies().unwrap().collect_vec().unwrap();
        assert_eq!(worklist, vec![pending.clone()]);
        assert!(worklist.iter().all(ProductDependencyEntry::is_unresolved));

        let by_id = db
            .query_product_dependency_by_product_dependency_id(resolved.product_dependency_id)
            .unwrap()
            .first()
            .unwrap();
        assert_eq!(by_id, Some(resolved));
        assert_eq!(db.query_product_dependency_by_product_id(a.product.product_id).unwrap().collect_vec().unwrap().len(), 2);
    }

    #[test]
    fn test_product_dependencies_table_carries_owner() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let a = Chain::seed(&db, "a.material", "pc");
        let b = Chain::seed(&db, "b.png", "pc");
        let dep = a.depend_on(&db, &b);

        let rows = db.query_product_dependencies_table().unwrap().collect_vec().unwrap();
        assert_eq!(rows, vec![(a.product_asset_id(), dep.clone())]);
        assert_eq!(dep.target(), b.product_asset_id());
    }

    #[test]
    fn test_direct_and_transitive_dependencies() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let a = Chain::seed(&db, "a", "pc");
        let b = Chain::seed(&db, "b", "pc");
        let c = Chain::seed(&db, "c", "pc");
        a.depend_on(&db, &b);
        a.depend_on(&db, &b);
        b.depend_on(&db, &c);

        let direct = db.query_direct_product_dependencies(a.product.product_id).unwrap().collect_vec().unwrap();
        assert_eq!(direct, vec![b.product.clone()]);

        let all = db.query_all_product_dependencies(a.product.product_id).unwrap();
        assert_eq!(all, vec![b.product.clone(), c.product.clone()]);
        assert!(db.query_all_product_dependencies(c.product.product_id).unwrap().is_empty());
    }

    #[test]
    fn test_whole_tables_and_stats() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        Chain::seed(&db, "a.png", "pc");
        Chain::seed(&db, "b.png", "ios");
        db.insert_builder_info(&mut BuilderInfoEntry::new(BUILDER, "fp")).unwrap();

        assert_eq!(db.query_database_info_table().unwrap().collect_vec().unwrap().len(), 1);
        assert_eq!(db.query_builder_info_table().unwrap().first().unwrap().unwrap().builder_uuid, BUILDER);
        assert_eq!(db.query_scan_folders_table().unwrap().collect_vec().unwrap().len(), 2);
        assert_eq!(db.query_sources_table().unwrap().collect_vec().unwrap().len(), 2);
        assert_eq!(db.query_jobs_table(&JobFilter::new().platform("pc")).unwrap().collect_vec().unwrap().len(), 1);
        assert_eq!(db.query_products_table(&JobFilter::new()).unwrap().collect_vec().unwrap().len(), 2);

        let stats = db.stats().unwrap();
        assert_eq!(stats.version, DatabaseVersion::LATEST);
        assert_eq!(stats.count("Products"), Some(2));
        assert_eq!(stats.count("BuilderInfo"), Some(1));
        assert_eq!(stats.count("Files"), Some(0));
        assert!(stats.to_string().contains("Sources: 2"));
    }
}
