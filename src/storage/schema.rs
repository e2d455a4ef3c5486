//! Database schema definitions

use serde::{Deserialize, Serialize};

/// Schema version stored in `dbinfo`.
///
/// Kept as a plain integer so versions written by newer software still load
/// and can be reported in a mismatch error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DatabaseVersion(pub i32);

impl DatabaseVersion {
    pub const DATABASE_DOES_NOT_EXIST: DatabaseVersion = DatabaseVersion(-1);
    pub const STARTING_VERSION: DatabaseVersion = DatabaseVersion(2);
    pub const ADDED_INDICES: DatabaseVersion = DatabaseVersion(3);
    pub const ADDED_JOB_LOG_TABLE: DatabaseVersion = DatabaseVersion(4);
    // 5 and 6 were skipped so that older tables get cleared
    pub const NEW_TABLES: DatabaseVersion = DatabaseVersion(7);
    pub const ADDED_OUTPUT_PREFIX_TO_SCAN_FOLDERS: DatabaseVersion = DatabaseVersion(8);
    pub const ADDED_JOB_KEY_INDEX: DatabaseVersion = DatabaseVersion(9);
    pub const ADDED_SOURCE_GUID_INDEX: DatabaseVersion = DatabaseVersion(10);
    pub const ADDED_SOURCE_DEPENDENCY_TABLE: DatabaseVersion = DatabaseVersion(11);
    pub const ADDED_LEGACY_SUB_IDS_TABLE: DatabaseVersion = DatabaseVersion(12);
    pub const ADDED_PRODUCT_DEPENDENCY_TABLE: DatabaseVersion = DatabaseVersion(13);
    pub const CLEAR_AUTO_SUCCEED_JOBS: DatabaseVersion = DatabaseVersion(14);
    pub const ADDED_FILES_TABLE: DatabaseVersion = DatabaseVersion(15);
    pub const ADDED_ANALYSIS_FINGERPRINT: DatabaseVersion = DatabaseVersion(16);
    pub const ADDED_SOURCE_DEPENDENCY_TYPE: DatabaseVersion = DatabaseVersion(17);
    pub const ADDED_FILE_MOD_TIMES: DatabaseVersion = DatabaseVersion(18);
    pub const ADDED_UNRESOLVED_DEPENDENCY_FIELD: DatabaseVersion = DatabaseVersion(19);
    pub const ADDED_UNRESOLVED_DEPENDENCY_TYPE_FIELD: DatabaseVersion = DatabaseVersion(20);
    pub const ADDED_TYPE_OF_DEPENDENCY_INDEX: DatabaseVersion = DatabaseVersion(21);
    pub const ADDED_PRODUCT_DEPENDENCY_PLATFORM: DatabaseVersion = DatabaseVersion(22);

    /// The only version this crate reads
    pub const LATEST: DatabaseVersion = Self::ADDED_PRODUCT_DEPENDENCY_PLATFORM;

    pub fn exists(&self) -> bool {
        self.0 >= Self::STARTING_VERSION.0
    }
}

impl std::fmt::Display for DatabaseVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tables that must exist for a database to be readable
pub const EXPECTED_TABLES: &[&str] = &[
    "BuilderInfo",
    "Files",
    "Jobs",
    "LegacySubIDs",
    "ProductDependencies",
    "Products",
    "ScanFolders",
    "SourceDependency",
    "Sources",
    "dbinfo",
];

/// SQL to create the dbinfo table
pub const CREATE_DBINFO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS dbinfo (
    rowID INTEGER PRIMARY KEY,
    version INTEGER NOT NULL
)
"#;

/// SQL to create the ScanFolders table
pub const CREATE_SCAN_FOLDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ScanFolders (
    ScanFolderID INTEGER PRIMARY KEY AUTOINCREMENT,
    ScanFolder TEXT NOT NULL COLLATE NOCASE,
    DisplayName TEXT NOT NULL COLLATE NOCASE,
    PortableKey TEXT NOT NULL COLLATE NOCASE UNIQUE,
    OutputPrefix TEXT NOT NULL COLLATE NOCASE,
    IsRoot INTEGER NOT NULL
)
"#;

/// SQL to create the Sources table
pub const CREATE_SOURCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Sources (
    SourceID INTEGER PRIMARY KEY AUTOINCREMENT,
    ScanFolderPK INTEGER NOT NULL,
    SourceName TEXT NOT NULL COLLATE NOCASE,
    SourceGuid BLOB NOT NULL,
    AnalysisFingerprint TEXT NOT NULL DEFAULT '',
    FOREIGN KEY (ScanFolderPK) REFERENCES ScanFolders(ScanFolderID) ON DELETE CASCADE
)
"#;

/// SQL to create the BuilderInfo table
pub const CREATE_BUILDER_INFO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS BuilderInfo (
    BuilderID INTEGER PRIMARY KEY AUTOINCREMENT,
    Guid BLOB NOT NULL,
    AnalysisFingerprint TEXT NOT NULL DEFAULT ''
)
"#;

/// SQL to create the SourceDependency table
pub const CREATE_SOURCE_DEPENDENCY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS SourceDependency (
    SourceDependencyID INTEGER PRIMARY KEY AUTOINCREMENT,
    BuilderGuid BLOB NOT NULL,
    Source TEXT NOT NULL COLLATE NOCASE,
    DependsOnSource TEXT NOT NULL COLLATE NOCASE,
    TypeOfDependency INTEGER NOT NULL DEFAULT 1
)
"#;

/// SQL to create the Jobs table
pub const CREATE_JOBS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Jobs (
    JobID INTEGER PRIMARY KEY AUTOINCREMENT,
    SourcePK INTEGER NOT NULL,
    JobKey TEXT NOT NULL COLLATE NOCASE,
    Fingerprint INTEGER NOT NULL,
    Platform TEXT NOT NULL COLLATE NOCASE,
    BuilderGuid BLOB NOT NULL,
    Status INTEGER NOT NULL,
    JobRunKey INTEGER NOT NULL,
    FirstFailLogTime INTEGER NOT NULL DEFAULT 0,
    FirstFailLogFile TEXT NOT NULL DEFAULT '',
    LastFailLogTime INTEGER NOT NULL DEFAULT 0,
    LastFailLogFile TEXT NOT NULL DEFAULT '',
    LastLogTime INTEGER NOT NULL DEFAULT 0,
    LastLogFile TEXT NOT NULL DEFAULT '',
    FOREIGN KEY (SourcePK) REFERENCES Sources(SourceID) ON DELETE CASCADE
)
"#;

/// SQL to create the Products table
pub const CREATE_PRODUCTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Products (
    ProductID INTEGER PRIMARY KEY AUTOINCREMENT,
    JobPK INTEGER NOT NULL,
    ProductName TEXT NOT NULL COLLATE NOCASE,
    SubID INTEGER NOT NULL,
    AssetType BLOB NOT NULL,
    LegacyGuid BLOB NOT NULL,
    FOREIGN KEY (JobPK) REFERENCES Jobs(JobID) ON DELETE CASCADE
)
"#;

/// SQL to create the LegacySubIDs table
pub const CREATE_LEGACY_SUB_IDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS LegacySubIDs (
    LegacySubID INTEGER PRIMARY KEY AUTOINCREMENT,
    ProductPK INTEGER NOT NULL,
    SubID INTEGER NOT NULL,
    FOREIGN KEY (ProductPK) REFERENCES Products(ProductID) ON DELETE CASCADE
)
"#;

/// SQL to create the ProductDependencies table
pub const CREATE_PRODUCT_DEPENDENCIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ProductDependencies (
    ProductDependencyID INTEGER PRIMARY KEY AUTOINCREMENT,
    ProductPK INTEGER NOT NULL,
    DependencySourceGuid BLOB NOT NULL,
    DependencySubID INTEGER NOT NULL,
    DependencyFlags INTEGER NOT NULL,
    Platform TEXT NOT NULL DEFAULT '' COLLATE NOCASE,
    UnresolvedPath TEXT NOT NULL DEFAULT '' COLLATE NOCASE,
    UnresolvedDependencyType INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (ProductPK) REFERENCES Products(ProductID) ON DELETE CASCADE
)
"#;

/// SQL to create the Files table
pub const CREATE_FILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Files (
    FileID INTEGER PRIMARY KEY AUTOINCREMENT,
    ScanFolderPK INTEGER NOT NULL,
    FileName TEXT NOT NULL COLLATE NOCASE,
    IsFolder INTEGER NOT NULL,
    ModTime INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (ScanFolderPK) REFERENCES ScanFolders(ScanFolderID) ON DELETE CASCADE
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_sources_name ON Sources(SourceName)",
    "CREATE INDEX IF NOT EXISTS idx_sources_scanfolder ON Sources(ScanFolderPK)",
    "CREATE INDEX IF NOT EXISTS idx_sources_guid ON Sources(SourceGuid)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_source ON Jobs(SourcePK)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_key ON Jobs(JobKey)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_runkey ON Jobs(JobRunKey)",
    "CREATE INDEX IF NOT EXISTS idx_products_job ON Products(JobPK)",
    "CREATE INDEX IF NOT EXISTS idx_products_name ON Products(ProductName)",
    "CREATE INDEX IF NOT EXISTS idx_legacy_product ON LegacySubIDs(ProductPK)",
    "CREATE INDEX IF NOT EXISTS idx_source_dep_source ON SourceDependency(Source)",
    "CREATE INDEX IF NOT EXISTS idx_source_dep_depends_on ON SourceDependency(DependsOnSource)",
    "CREATE INDEX IF NOT EXISTS idx_source_dep_type ON SourceDependency(TypeOfDependency)",
    "CREATE INDEX IF NOT EXISTS idx_product_dep_product ON ProductDependencies(ProductPK)",
    "CREATE INDEX IF NOT EXISTS idx_product_dep_target ON ProductDependencies(DependencySourceGuid, DependencySubID)",
    "CREATE INDEX IF NOT EXISTS idx_files_name ON Files(FileName)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_DBINFO_TABLE,
        CREATE_SCAN_FOLDERS_TABLE,
        CREATE_SOURCES_TABLE,
        CREATE_BUILDER_INFO_TABLE,
        CREATE_SOURCE_DEPENDENCY_TABLE,
        CREATE_JOBS_TABLE,
        CREATE_PRODUCTS_TABLE,
        CREATE_LEGACY_SUB_IDS_TABLE,
        CREATE_PRODUCT_DEPENDENCIES_TABLE,
        CREATE_FILES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
