//! Named query catalog
//!
//! Every statement the connection runs is listed in [`Query`]. The connection
//! prepares the whole catalog into its statement cache when it opens, so a
//! statement that no longer matches the schema fails the open instead of a
//! later lookup.
//!
//! Queries that accept an optional platform bind it as `NULL` when absent
//! (`?N IS NULL OR Jobs.Platform = ?N`). Builder, job key and status are not
//! pushed into SQL; [`JobFilter`] checks them per row.

use crate::job::JobStatus;
use rusqlite::types::Value;
use rusqlite::Row;
use uuid::Uuid;

/// Escape character used by every LIKE in the catalog
pub const LIKE_ESCAPE: char = '|';

/// How a literal is turned into a LIKE pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LikeType {
    StartsWith,
    EndsWith,
    #[default]
    Matches,
    /// The value already is a pattern and is passed through untouched
    Raw,
}

impl std::str::FromStr for LikeType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "starts" | "startswith" | "starts_with" | "prefix" => Ok(LikeType::StartsWith),
            "ends" | "endswith" | "ends_with" | "suffix" => Ok(LikeType::EndsWith),
            "matches" | "contains" | "substring" => Ok(LikeType::Matches),
            "raw" | "pattern" => Ok(LikeType::Raw),
            _ => Err(crate::Error::Parse(format!("Unknown like type: {}", s))),
        }
    }
}

/// Build a LIKE pattern that only ever matches `value` literally (plus the
/// wildcard implied by `like_type`).
pub fn like_search_term(value: &str, like_type: LikeType) -> String {
    let escape = || {
        let mut escaped = String::with_capacity(value.len() + 2);
        for c in value.chars() {
            if matches!(c, '%' | '_' | LIKE_ESCAPE) {
                escaped.push(LIKE_ESCAPE);
            }
            escaped.push(c);
        }
        escaped
    };

    match like_type {
        LikeType::Raw => value.to_string(),
        LikeType::StartsWith => format!("{}%", escape()),
        LikeType::EndsWith => format!("%{}", escape()),
        LikeType::Matches => format!("%{}%", escape()),
    }
}

/// Optional job criteria applied to job, product, combined and job info queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFilter {
    pub builder_guid: Option<Uuid>,
    pub job_key: Option<String>,
    pub platform: Option<String>,
    pub status: JobStatus,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self {
            builder_guid: None,
            job_key: None,
            platform: None,
            status: JobStatus::Any,
        }
    }
}

impl JobFilter {
    /// A filter that accepts every row
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one builder; the nil GUID means any builder
    pub fn builder(mut self, guid: Uuid) -> Self {
        self.builder_guid = (!guid.is_nil()).then_some(guid);
        self
    }

    pub fn job_key(mut self, key: impl Into<String>) -> Self {
        self.job_key = Some(key.into());
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether any criterion must be checked per row
    pub fn has_row_criteria(&self) -> bool {
        self.builder_guid.is_some() || self.job_key.is_some() || self.status != JobStatus::Any
    }

    /// Bind value for the statement's platform parameter
    pub fn platform_value(&self) -> Value {
        match &self.platform {
            Some(p) => Value::Text(p.clone()),
            None => Value::Null,
        }
    }

    /// Test the row's job columns against the builder, job key and status.
    pub fn matches_row(&self, row: &Row<'_>) -> rusqlite::Result<bool> {
        if let Some(key) = &self.job_key {
            let job_key: String = row.get("JobKey")?;
            if &job_key != key {
                return Ok(false);
            }
        }
        if let Some(guid) = &self.builder_guid {
            let builder: Uuid = row.get("BuilderGuid")?;
            if &builder != guid {
                return Ok(false);
            }
        }
        if self.status != JobStatus::Any {
            let status: i32 = row.get("Status")?;
            if status != self.status.as_i32() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Every named statement of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    // Whole tables
    DatabaseInfoTable,
    BuilderInfoTable,
    ScanFoldersTable,
    SourcesTable,
    JobsTable,
    ProductsTable,
    ProductDependenciesTable,
    FilesTable,
    LegacySubIdsByProductId,

    // Scan folders
    ScanFolderById,
    ScanFolderByDisplayName,
    ScanFolderByPortableKey,
    ScanFolderBySourceId,
    ScanFolderByJobId,
    ScanFolderByProductId,

    // Sources
    SourceById,
    SourcesByScanFolderId,
    SourcesByGuid,
    SourcesBySourceName,
    SourceBySourceNameScanFolderId,
    SourcesLikeSourceName,
    SourceByJobId,
    SourceByProductId,
    SourcesAndScanFolders,
    SourceAnalysisFingerprint,

    // Jobs
    JobById,
    JobsByJobKey,
    JobsByJobRunKey,
    JobByProductId,
    JobsBySourceId,

    // Job info
    JobInfoByJobId,
    JobInfoByJobRunKey,
    JobInfoByJobKey,
    JobInfoBySourceName,

    // Products
    ProductById,
    ProductsByJobId,
    ProductsBySourceId,
    ProductsByProductName,
    ProductsLikeProductName,
    ProductsBySourceName,
    ProductsLikeSourceName,
    ProductByJobIdSubId,
    ProductsBySourceGuidSubId,

    // Combined
    Combined,
    CombinedBySourceId,
    CombinedByJobId,
    CombinedByProductId,
    CombinedBySourceGuidProductSubId,
    CombinedBySourceName,
    CombinedLikeSourceName,
    CombinedByProductName,
    CombinedLikeProductName,

    // Source dependencies
    SourceDependencyById,
    SourceDependenciesByDependsOnSource,
    SourceDependenciesByDependsOnSourceWildcard,
    DependsOnSourceBySource,

    // Product dependencies
    ProductDependencyById,
    ProductDependenciesByProductId,
    UnresolvedProductDependencies,
    DirectProductDependencies,

    // Files
    FileById,
    FilesByFileNameScanFolderId,
    FilesLikeFileName,
    FilesByScanFolderId,
}

const COMBINED_FROM_SOURCES: &str = "FROM Sources \
     LEFT JOIN Jobs ON Sources.SourceID = Jobs.SourcePK \
     INNER JOIN ScanFolders ON ScanFolders.ScanFolderID = Sources.ScanFolderPK \
     INNER JOIN Products ON Jobs.JobID = Products.JobPK";

impl Query {
    pub const ALL: &'static [Query] = &[
        Query::DatabaseInfoTable,
        Query::BuilderInfoTable,
        Query::ScanFoldersTable,
        Query::SourcesTable,
        Query::JobsTable,
        Query::ProductsTable,
        Query::ProductDependenciesTable,
        Query::FilesTable,
        Query::LegacySubIdsByProductId,
        Query::ScanFolderById,
        Query::ScanFolderByDisplayName,
        Query::ScanFolderByPortableKey,
        Query::ScanFolderBySourceId,
        Query::ScanFolderByJobId,
        Query::ScanFolderByProductId,
        Query::SourceById,
        Query::SourcesByScanFolderId,
        Query::SourcesByGuid,
        Query::SourcesBySourceName,
        Query::SourceBySourceNameScanFolderId,
        Query::SourcesLikeSourceName,
        Query::SourceByJobId,
        Query::SourceByProductId,
        Query::SourcesAndScanFolders,
        Query::SourceAnalysisFingerprint,
        Query::JobById,
        Query::JobsByJobKey,
        Query::JobsByJobRunKey,
        Query::JobByProductId,
        Query::JobsBySourceId,
        Query::JobInfoByJobId,
        Query::JobInfoByJobRunKey,
        Query::JobInfoByJobKey,
        Query::JobInfoBySourceName,
        Query::ProductById,
        Query::ProductsByJobId,
        Query::ProductsBySourceId,
        Query::ProductsByProductName,
        Query::ProductsLikeProductName,
        Query::ProductsBySourceName,
        Query::ProductsLikeSourceName,
        Query::ProductByJobIdSubId,
        Query::ProductsBySourceGuidSubId,
        Query::Combined,
        Query::CombinedBySourceId,
        Query::CombinedByJobId,
        Query::CombinedByProductId,
        Query::CombinedBySourceGuidProductSubId,
        Query::CombinedBySourceName,
        Query::CombinedLikeSourceName,
        Query::CombinedByProductName,
        Query::CombinedLikeProductName,
        Query::SourceDependencyById,
        Query::SourceDependenciesByDependsOnSource,
        Query::SourceDependenciesByDependsOnSourceWildcard,
        Query::DependsOnSourceBySource,
        Query::ProductDependencyById,
        Query::ProductDependenciesByProductId,
        Query::UnresolvedProductDependencies,
        Query::DirectProductDependencies,
        Query::FileById,
        Query::FilesByFileNameScanFolderId,
        Query::FilesLikeFileName,
        Query::FilesByScanFolderId,
    ];

    /// SQL text of the statement. Parameters are positional (`?N`).
    pub fn sql(&self) -> String {
        match self {
            Query::DatabaseInfoTable => "SELECT * FROM dbinfo".into(),
            Query::BuilderInfoTable => "SELECT * FROM BuilderInfo".into(),
            Query::ScanFoldersTable => "SELECT * FROM ScanFolders".into(),
            Query::SourcesTable => "SELECT * FROM Sources".into(),
            Query::JobsTable => "SELECT * FROM Jobs WHERE (?1 IS NULL OR Jobs.Platform = ?1)".into(),
            Query::ProductsTable => "SELECT * FROM Products \
                 INNER JOIN Jobs ON Jobs.JobID = Products.JobPK \
                 WHERE (?1 IS NULL OR Jobs.Platform = ?1)"
                .into(),
            Query::ProductDependenciesTable => "SELECT ProductDependencies.*, Sources.SourceGuid, Products.SubID \
                 FROM ProductDependencies \
                 INNER JOIN Products ON ProductDependencies.ProductPK = Products.ProductID \
                 INNER JOIN Jobs ON Products.JobPK = Jobs.JobID \
                 INNER JOIN Sources ON Jobs.SourcePK = Sources.SourceID"
                .into(),
            Query::FilesTable => "SELECT * FROM Files".into(),
            Query::LegacySubIdsByProductId => "SELECT * FROM LegacySubIDs WHERE ProductPK = ?1".into(),

            Query::ScanFolderById => "SELECT * FROM ScanFolders WHERE ScanFolderID = ?1".into(),
            Query::ScanFolderByDisplayName => "SELECT * FROM ScanFolders WHERE DisplayName = ?1".into(),
            Query::ScanFolderByPortableKey => "SELECT * FROM ScanFolders WHERE PortableKey = ?1".into(),
            Query::ScanFolderBySourceId => "SELECT ScanFolders.* FROM ScanFolders \
                 INNER JOIN Sources ON ScanFolders.ScanFolderID = Sources.ScanFolderPK \
                 WHERE Sources.SourceID = ?1"
                .into(),
            Query::ScanFolderByJobId => "SELECT ScanFolders.* FROM ScanFolders \
                 INNER JOIN Sources ON ScanFolders.ScanFolderID = Sources.ScanFolderPK \
                 INNER JOIN Jobs ON Sources.SourceID = Jobs.SourcePK \
                 WHERE Jobs.JobID = ?1"
                .into(),
            Query::ScanFolderByProductId => "SELECT ScanFolders.* FROM ScanFolders \
                 INNER JOIN Sources ON ScanFolders.ScanFolderID = Sources.ScanFolderPK \
                 INNER JOIN Jobs ON Sources.SourceID = Jobs.SourcePK \
                 INNER JOIN Products ON Jobs.JobID = Products.JobPK \
                 WHERE Products.ProductID = ?1"
                .into(),

            Query::SourceById => "SELECT * FROM Sources WHERE SourceID = ?1".into(),
            Query::SourcesByScanFolderId => "SELECT * FROM Sources WHERE ScanFolderPK = ?1".into(),
            Query::SourcesByGuid => "SELECT * FROM Sources WHERE SourceGuid = ?1".into(),
            Query::SourcesBySourceName => "SELECT * FROM Sources WHERE SourceName = ?1".into(),
            Query::SourceBySourceNameScanFolderId => {
                "SELECT * FROM Sources WHERE SourceName = ?1 AND ScanFolderPK = ?2".into()
            }
            Query::SourcesLikeSourceName => "SELECT * FROM Sources WHERE SourceName LIKE ?1 ESCAPE '|'".into(),
            Query::SourceByJobId => "SELECT Sources.* FROM Sources \
                 INNER JOIN Jobs ON Sources.SourceID = Jobs.SourcePK \
                 WHERE Jobs.JobID = ?1"
                .into(),
            Query::SourceByProductId => "SELECT Sources.* FROM Sources \
                 INNER JOIN Jobs ON Sources.SourceID = Jobs.SourcePK \
                 INNER JOIN Products ON Jobs.JobID = Products.JobPK \
                 WHERE Products.ProductID = ?1"
                .into(),
            Query::SourcesAndScanFolders => "SELECT * FROM Sources \
                 LEFT OUTER JOIN ScanFolders ON Sources.ScanFolderPK = ScanFolders.ScanFolderID"
                .into(),
            Query::SourceAnalysisFingerprint => {
                "SELECT AnalysisFingerprint FROM Sources WHERE SourceName = ?1 AND ScanFolderPK = ?2".into()
            }

            Query::JobById => "SELECT * FROM Jobs WHERE JobID = ?1".into(),
            Query::JobsByJobKey => "SELECT * FROM Jobs WHERE JobKey = ?1".into(),
            Query::JobsByJobRunKey => "SELECT * FROM Jobs WHERE JobRunKey = ?1".into(),
            Query::JobByProductId => "SELECT Jobs.* FROM Jobs \
                 INNER JOIN Products ON Jobs.JobID = Products.JobPK \
                 WHERE Products.ProductID = ?1"
                .into(),
            Query::JobsBySourceId => {
                "SELECT * FROM Jobs WHERE SourcePK = ?1 AND (?2 IS NULL OR Jobs.Platform = ?2)".into()
            }

            Query::JobInfoByJobId => job_info_sql("Jobs.JobID = ?1"),
            Query::JobInfoByJobRunKey => job_info_sql("Jobs.JobRunKey = ?1"),
            Query::JobInfoByJobKey => job_info_sql("Jobs.JobKey = ?1"),
            Query::JobInfoBySourceName => {
                job_info_sql("Sources.SourceName = ?1 AND (?2 IS NULL OR Jobs.Platform = ?2)")
            }

            Query::ProductById => "SELECT * FROM Products \
                 INNER JOIN Jobs ON Jobs.JobID = Products.JobPK \
                 WHERE Products.ProductID = ?1"
                .into(),
            Query::ProductsByJobId => "SELECT * FROM Products \
                 INNER JOIN Jobs ON Jobs.JobID = Products.JobPK \
                 WHERE Products.JobPK = ?1 AND (?2 IS NULL OR Jobs.Platform = ?2)"
                .into(),
            Query::ProductsBySourceId => "SELECT * FROM Products \
                 INNER JOIN Jobs ON Jobs.JobID = Products.JobPK \
                 WHERE Jobs.SourcePK = ?1 AND (?2 IS NULL OR Jobs.Platform = ?2)"
                .into(),
            Query::ProductsByProductName => "SELECT * FROM Products \
                 INNER JOIN Jobs ON Jobs.JobID = Products.JobPK \
                 WHERE Products.ProductName = ?1 AND (?2 IS NULL OR Jobs.Platform = ?2)"
                .into(),
            Query::ProductsLikeProductName => "SELECT * FROM Products \
                 INNER JOIN Jobs ON Jobs.JobID = Products.JobPK \
                 WHERE Products.ProductName LIKE ?1 ESCAPE '|' AND (?2 IS NULL OR Jobs.Platform = ?2)"
                .into(),
            Query::ProductsBySourceName => "SELECT * FROM Sources \
                 LEFT JOIN Jobs ON Sources.SourceID = Jobs.SourcePK \
                 INNER JOIN Products ON Jobs.JobID = Products.JobPK \
                 WHERE Sources.SourceName = ?1 AND (?2 IS NULL OR Jobs.Platform = ?2)"
                .into(),
            Query::ProductsLikeSourceName => "SELECT * FROM Sources \
                 LEFT JOIN Jobs ON Sources.SourceID = Jobs.SourcePK \
                 INNER JOIN Products ON Jobs.JobID = Products.JobPK \
                 WHERE Sources.SourceName LIKE ?1 ESCAPE '|' AND (?2 IS NULL OR Jobs.Platform = ?2)"
                .into(),
            Query::ProductByJobIdSubId => "SELECT * FROM Products WHERE JobPK = ?1 AND SubID = ?2".into(),
            Query::ProductsBySourceGuidSubId => "SELECT Products.* FROM Products \
                 INNER JOIN Jobs ON Jobs.JobID = Products.JobPK \
                 INNER JOIN Sources ON Sources.SourceID = Jobs.SourcePK \
                 WHERE Sources.SourceGuid = ?1 AND Products.SubID = ?2"
                .into(),

            Query::Combined => combined_sql("(?1 IS NULL OR Jobs.Platform = ?1)"),
            Query::CombinedBySourceId => {
                combined_sql("Sources.SourceID = ?1 AND (?2 IS NULL OR Jobs.Platform = ?2)")
            }
            Query::CombinedByJobId => combined_sql("Jobs.JobID = ?1 AND (?2 IS NULL OR Jobs.Platform = ?2)"),
            Query::CombinedByProductId => {
                combined_sql("Products.ProductID = ?1 AND (?2 IS NULL OR Jobs.Platform = ?2)")
            }
            // Primary GUID matches come before legacy GUID matches
            Query::CombinedBySourceGuidProductSubId => format!(
                "SELECT * {} WHERE Products.SubID = ?1 \
                 AND (Sources.SourceGuid = ?2 OR Products.LegacyGuid = ?2) \
                 AND (?3 IS NULL OR Jobs.Platform = ?3) \
                 ORDER BY (Sources.SourceGuid = ?2) DESC, Products.ProductID",
                COMBINED_FROM_SOURCES
            ),
            Query::CombinedBySourceName => {
                combined_sql("Sources.SourceName = ?1 AND (?2 IS NULL OR Jobs.Platform = ?2)")
            }
            Query::CombinedLikeSourceName => {
                combined_sql("Sources.SourceName LIKE ?1 ESCAPE '|' AND (?2 IS NULL OR Jobs.Platform = ?2)")
            }
            Query::CombinedByProductName => {
                combined_sql("Products.ProductName = ?1 AND (?2 IS NULL OR Jobs.Platform = ?2)")
            }
            Query::CombinedLikeProductName => {
                combined_sql("Products.ProductName LIKE ?1 ESCAPE '|' AND (?2 IS NULL OR Jobs.Platform = ?2)")
            }

            Query::SourceDependencyById => "SELECT * FROM SourceDependency WHERE SourceDependencyID = ?1".into(),
            Query::SourceDependenciesByDependsOnSource => "SELECT * FROM SourceDependency \
                 WHERE DependsOnSource = ?1 AND TypeOfDependency & ?2 AND Source LIKE ?3"
                .into(),
            Query::SourceDependenciesByDependsOnSourceWildcard => "SELECT * FROM SourceDependency \
                 WHERE ((TypeOfDependency & ?2 AND DependsOnSource = ?1) \
                 OR (TypeOfDependency = ?4 AND ?1 LIKE DependsOnSource)) \
                 AND Source LIKE ?3"
                .into(),
            Query::DependsOnSourceBySource => "SELECT * FROM SourceDependency \
                 WHERE Source = ?1 AND TypeOfDependency & ?2 AND DependsOnSource LIKE ?3"
                .into(),

            Query::ProductDependencyById => {
                "SELECT * FROM ProductDependencies WHERE ProductDependencyID = ?1".into()
            }
            Query::ProductDependenciesByProductId => "SELECT * FROM ProductDependencies WHERE ProductPK = ?1".into(),
            Query::UnresolvedProductDependencies => {
                "SELECT * FROM ProductDependencies WHERE UnresolvedPath != ''".into()
            }
            Query::DirectProductDependencies => "SELECT DISTINCT Products.* FROM Products \
                 INNER JOIN Jobs ON Jobs.JobID = Products.JobPK \
                 INNER JOIN Sources ON Sources.SourceID = Jobs.SourcePK \
                 INNER JOIN ProductDependencies \
                   ON Sources.SourceGuid = ProductDependencies.DependencySourceGuid \
                   AND Products.SubID = ProductDependencies.DependencySubID \
                 WHERE ProductDependencies.ProductPK = ?1 \
                 ORDER BY Products.ProductID"
                .into(),

            Query::FileById => "SELECT * FROM Files WHERE FileID = ?1".into(),
            Query::FilesByFileNameScanFolderId => {
                "SELECT * FROM Files WHERE FileName = ?1 AND ScanFolderPK = ?2".into()
            }
            Query::FilesLikeFileName => "SELECT * FROM Files WHERE FileName LIKE ?1 ESCAPE '|'".into(),
            Query::FilesByScanFolderId => "SELECT * FROM Files WHERE ScanFolderPK = ?1".into(),
        }
    }
}

fn job_info_sql(condition: &str) -> String {
    format!(
        "SELECT Jobs.*, Sources.SourceName, ScanFolders.ScanFolder FROM Jobs \
         LEFT JOIN Sources ON Sources.SourceID = Jobs.SourcePK \
         LEFT JOIN ScanFolders ON ScanFolders.ScanFolderID = Sources.ScanFolderPK \
         WHERE {}",
        condition
    )
}

fn combined_sql(condition: &str) -> String {
    format!("SELECT * {} WHERE {}", COMBINED_FROM_SOURCES, condition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_search_term_modes() {
        assert_eq!(like_search_term("tex", LikeType::StartsWith), "tex%");
        assert_eq!(like_search_term("tex", LikeType::EndsWith), "%tex");
        assert_eq!(like_search_term("tex", LikeType::Matches), "%tex%");
        assert_eq!(like_search_term("t_x%", LikeType::Raw), "t_x%");
        assert_eq!(like_search_term("a|b%", LikeType::Raw), "a|b%");
    }

    #[test]
    fn test_like_search_term_escapes_wildcards() {
        assert_eq!(like_search_term("100%_done", LikeType::Matches), "%100|%|_done%");
        assert_eq!(like_search_term("a|b", LikeType::StartsWith), "a||b%");
    }

    #[test]
    fn test_job_filter_defaults() {
        let filter = JobFilter::new();
        assert_eq!(filter.status, JobStatus::Any);
        assert!(!filter.has_row_criteria());
        assert_eq!(filter.platform_value(), Value::Null);

        let filter = filter.builder(Uuid::nil());
        assert!(filter.builder_guid.is_none());

        let filter = JobFilter::new().platform("pc").status(JobStatus::Completed);
        assert!(filter.has_row_criteria());
        assert_eq!(filter.platform_value(), Value::Text("pc".into()));
    }

    #[test]
    fn test_catalog_is_complete() {
        let unique: std::collections::HashSet<_> = Query::ALL.iter().collect();
        assert_eq!(unique.len(), Query::ALL.len());
        for query in Query::ALL {
            assert!(query.sql().starts_with("SELECT"), "{:?}", query);
        }
    }

    #[test]
    fn test_like_type_parse() {
        assert_eq!("prefix".parse::<LikeType>().unwrap(), LikeType::StartsWith);
        assert_eq!("ends".parse::<LikeType>().unwrap(), LikeType::EndsWith);
        assert!("fuzzy".parse::<LikeType>().is_err());
    }
}
