//! Write operations
//!
//! Schema creation, version stamping and one insert per table. Every insert
//! writes the assigned row id back into the entry and returns it.

use std::path::PathBuf;

use rusqlite::{params, Connection};
use tracing::{debug, info};

use super::connection::{AssetDatabaseConnection, OpenMode};
use super::schema::{self, DatabaseVersion};
use crate::config::ensure_db_dir;
use crate::dependency::{ProductDependencyEntry, SourceFileDependencyEntry};
use crate::entry::{BuilderInfoEntry, FileEntry, LegacySubIdEntry, ProductEntry, ScanFolderEntry, SourceEntry};
use crate::job::{JobEntry, JobStatus};
use crate::{Error, Result};

fn initialize_schema(conn: &Connection) -> Result<()> {
    for stmt in schema::all_schema_statements() {
        conn.execute(stmt, [])?;
    }
    Ok(())
}

impl AssetDatabaseConnection {
    /// Create a database at `path` and open it read-write.
    ///
    /// An existing database keeps its stored version, so an outdated file
    /// still fails the open instead of being silently restamped.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let mut db = Self::new(path);
        ensure_db_dir(db.path())?;

        {
            let conn = Connection::open(db.path())?;
            initialize_schema(&conn)?;
            conn.execute(
                "INSERT INTO dbinfo (rowID, version) SELECT 1, ?1 WHERE NOT EXISTS (SELECT 1 FROM dbinfo)",
                [DatabaseVersion::LATEST.0],
            )?;
        }

        db.open(OpenMode::ReadWrite)?;
        info!(path = %db.path().display(), "created asset database");
        Ok(db)
    }

    fn writable(&self) -> Result<&Connection> {
        let conn = self.connection()?;
        if self.mode() != OpenMode::ReadWrite {
            return Err(Error::ReadOnlyConnection);
        }
        Ok(conn)
    }

    /// Create every table and index that does not exist yet
    pub fn create_schema(&self) -> Result<()> {
        initialize_schema(self.writable()?)?;
        debug!("schema created");
        Ok(())
    }

    /// Overwrite the stored schema version
    pub fn set_database_version(&self, version: DatabaseVersion) -> Result<()> {
        self.writable()?
            .execute("INSERT OR REPLACE INTO dbinfo (rowID, version) VALUES (1, ?1)", [version.0])?;
        Ok(())
    }

    // ========== Inserts ==========

    pub fn insert_scan_folder(&self, entry: &mut ScanFolderEntry) -> Result<i64> {
        let conn = self.writable()?;
        conn.execute(
            "INSERT INTO ScanFolders (ScanFolder, DisplayName, PortableKey, OutputPrefix, IsRoot) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.scan_folder,
                entry.display_name,
                entry.portable_key,
                entry.output_prefix,
                entry.is_root,
            ],
        )?;
        entry.scan_folder_id = conn.last_insert_rowid();
        Ok(entry.scan_folder_id)
    }

    pub fn insert_source(&self, entry: &mut SourceEntry) -> Result<i64> {
        let conn = self.writable()?;
        conn.execute(
            "INSERT INTO Sources (ScanFolderPK, SourceName, SourceGuid, AnalysisFingerprint) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.scan_folder_pk,
                entry.source_name,
                entry.source_guid,
                entry.analysis_fingerprint,
            ],
        )?;
        entry.source_id = conn.last_insert_rowid();
        Ok(entry.source_id)
    }

    pub fn insert_builder_info(&self, entry: &mut BuilderInfoEntry) -> Result<i64> {
        let conn = self.writable()?;
        conn.execute(
            "INSERT INTO BuilderInfo (Guid, AnalysisFingerprint) VALUES (?1, ?2)",
            params![entry.builder_uuid, entry.analysis_fingerprint],
        )?;
        entry.builder_info_id = conn.last_insert_rowid();
        Ok(entry.builder_info_id)
    }

    /// Insert a job. `JobStatus::Any` is a filter value and cannot be stored.
    pub fn insert_job(&self, entry: &mut JobEntry) -> Result<i64> {
        if entry.status == JobStatus::Any {
            return Err(Error::Parse("job status Any is only valid as a query filter".into()));
        }

        let conn = self.writable()?;
        conn.execute(
            "INSERT INTO Jobs (SourcePK, JobKey, Fingerprint, Platform, BuilderGuid, Status, JobRunKey, \
             FirstFailLogTime, FirstFailLogFile, LastFailLogTime, LastFailLogFile, LastLogTime, LastLogFile) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                entry.source_pk,
                entry.job_key,
                entry.fingerprint,
                entry.platform,
                entry.builder_guid,
                entry.status.as_i32(),
                entry.job_run_key as i64,
                entry.first_fail_log_time,
                entry.first_fail_log_file,
                entry.last_fail_log_time,
                entry.last_fail_log_file,
                entry.last_log_time,
                entry.last_log_file,
            ],
        )?;
        entry.job_id = conn.last_insert_rowid();
        Ok(entry.job_id)
    }

    pub fn insert_product(&self, entry: &mut ProductEntry) -> Result<i64> {
        let conn = self.writable()?;
        conn.execute(
            "INSERT INTO Products (JobPK, ProductName, SubID, AssetType, LegacyGuid) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.job_pk,
                entry.product_name,
                entry.sub_id,
                entry.asset_type,
                entry.legacy_guid,
            ],
        )?;
        entry.product_id = conn.last_insert_rowid();
        Ok(entry.product_id)
    }

    pub fn insert_legacy_sub_id(&self, entry: &mut LegacySubIdEntry) -> Result<i64> {
        let conn = self.writable()?;
        conn.execute(
            "INSERT INTO LegacySubIDs (ProductPK, SubID) VALUES (?1, ?2)",
            params![entry.product_pk, entry.sub_id],
        )?;
        entry.sub_ids_entry_id = conn.last_insert_rowid();
        Ok(entry.sub_ids_entry_id)
    }

    pub fn insert_product_dependency(&self, entry: &mut ProductDependencyEntry) -> Result<i64> {
        let conn = self.writable()?;
        conn.execute(
            "INSERT INTO ProductDependencies (ProductPK, DependencySourceGuid, DependencySubID, DependencyFlags, \
             Platform, UnresolvedPath, UnresolvedDependencyType) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.product_pk,
                entry.dependency_source_guid,
                entry.dependency_sub_id,
                entry.dependency_flags as i64,
                entry.platform,
                entry.unresolved_path,
                entry.dependency_type.as_u32(),
            ],
        )?;
        entry.product_dependency_id = conn.last_insert_rowid();
        Ok(entry.product_dependency_id)
    }

    /// Insert a source dependency. Query-only masks (`Any`, `SourceOrJob`) are rejected.
    pub fn insert_source_dependency(&self, entry: &mut SourceFileDependencyEntry) -> Result<i64> {
        if !entry.type_of_dependency.is_storable() {
            return Err(Error::InvalidDependencyType(entry.type_of_dependency.bits()));
        }

        let conn = self.writable()?;
        conn.execute(
            "INSERT INTO SourceDependency (BuilderGuid, Source, DependsOnSource, TypeOfDependency) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.builder_guid,
                entry.source,
                entry.depends_on_source,
                entry.type_of_dependency.bits(),
            ],
        )?;
        entry.source_dependency_id = conn.last_insert_rowid();
        Ok(entry.source_dependency_id)
    }

    pub fn insert_file(&self, entry: &mut FileEntry) -> Result<i64> {
        let conn = self.writable()?;
        conn.execute(
            "INSERT INTO Files (ScanFolderPK, FileName, IsFolder, ModTime) VALUES (?1, ?2, ?3, ?4)",
            params![entry.scan_folder_pk, entry.file_name, entry.is_folder, entry.mod_time as i64],
        )?;
        entry.file_id = conn.last_insert_rowid();
        Ok(entry.file_id)
    }

    // ========== Transactions ==========

    /// Begin a transaction for bulk operations
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.writable()?.execute_batch("BEGIN TRANSACTION")?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&mut self) -> Result<()> {
        self.writable()?.execute_batch("COMMIT")?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.writable()?.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::TypeOfDependency;
    use crate::storage::fixtures::Chain;
    use tempfile::TempDir;
    use uuid::Uuid;

    #[test]
    fn test_create_then_reopen_read_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Cache").join("assetdb.sqlite");

        let db = AssetDatabaseConnection::create(&path).unwrap();
        assert!(db.is_open());
        assert_eq!(db.query_database_version().unwrap(), DatabaseVersion::LATEST);
        drop(db);

        let mut db = AssetDatabaseConnection::new(&path);
        db.open(OpenMode::ReadOnly).unwrap();
        let mut folder = ScanFolderEntry::new("/root", "root", "root");
        assert!(matches!(db.insert_scan_folder(&mut folder), Err(Error::ReadOnlyConnection)));
    }

    #[test]
    fn test_create_keeps_existing_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assetdb.sqlite");

        let db = AssetDatabaseConnection::create(&path).unwrap();
        db.set_database_version(DatabaseVersion::ADDED_FILE_MOD_TIMES).unwrap();
        drop(db);

        let err = AssetDatabaseConnection::create(&path).err().unwrap();
        assert!(matches!(err, Error::VersionMismatch { found: 18, expected: 22 }));
    }

    #[test]
    fn test_insert_assigns_ids() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let chain = Chain::seed(&db, "textures/rock.png", "pc");

        assert!(chain.scan_folder.scan_folder_id > 0);
        assert!(chain.source.source_id > 0);
        assert!(chain.job.job_id > 0);
        assert!(chain.product.product_id > 0);
        assert_eq!(chain.source.scan_folder_pk, chain.scan_folder.scan_folder_id);
        assert_eq!(chain.product.job_pk, chain.job.job_id);
    }

    #[test]
    fn test_insert_rejects_query_only_dependency_types() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();

        for kind in [TypeOfDependency::Any, TypeOfDependency::SourceOrJob] {
            let mut dep = SourceFileDependencyEntry::new(Uuid::new_v4(), "a.material", "b.png", kind);
            let err = db.insert_source_dependency(&mut dep).unwrap_err();
            assert!(matches!(err, Error::InvalidDependencyType(bits) if bits == kind.bits()));
        }
        assert!(db.query_source_dependency_by_depends_on_source("b.png", None, TypeOfDependency::Any)
            .unwrap()
            .collect_vec()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_insert_rejects_any_job_status() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();
        let chain = Chain::seed(&db, "a.png", "pc");

        let mut job = JobEntry::new(chain.source.source_id, "any", 0, "pc", Uuid::new_v4(), JobStatus::Any, 9);
        assert!(db.insert_job(&mut job).is_err());
    }

    #[test]
    fn test_rollback_discards_inserts() {
        let mut db = AssetDatabaseConnection::open_in_memory().unwrap();

        db.begin_transaction().unwrap();
        let mut folder = ScanFolderEntry::new("/tmp/a", "a", "a");
        db.insert_scan_folder(&mut folder).unwrap();
        db.rollback().unwrap();
        assert_eq!(db.query_scan_folders_table().unwrap().collect_vec().unwrap().len(), 0);

        db.begin_transaction().unwrap();
        db.insert_scan_folder(&mut folder).unwrap();
        db.commit().unwrap();
        assert_eq!(db.query_scan_folders_table().unwrap().collect_vec().unwrap().len(), 1);
    }

    #[test]
    fn test_portable_key_is_unique() {
        let db = AssetDatabaseConnection::open_in_memory().unwrap();

        let mut first = ScanFolderEntry::new("/a", "a", "key");
        let mut second = ScanFolderEntry::new("/b", "b", "KEY");
        db.insert_scan_folder(&mut first).unwrap();
        assert!(matches!(db.insert_scan_folder(&mut second), Err(Error::Storage(_))));
    }
}
