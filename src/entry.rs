//! Entity records
//!
//! Every record is a value materialized from one row (or one joined row) of
//! the asset database. Parents are referenced by primary key, never by
//! in-memory pointer.

use crate::job::JobEntry;
use crate::storage::DatabaseVersion;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary key of a record that has not been inserted yet
pub const NO_ID: i64 = -1;

/// Durable identity of an asset: the source GUID plus the product sub-id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId {
    pub guid: Uuid,
    pub sub_id: u32,
}

impl AssetId {
    pub fn new(guid: Uuid, sub_id: u32) -> Self {
        Self { guid, sub_id }
    }

    pub fn is_valid(&self) -> bool {
        !self.guid.is_nil()
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:x}", self.guid.braced(), self.sub_id)
    }
}

/// The single row of `dbinfo`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfoEntry {
    pub row_id: i64,
    pub version: DatabaseVersion,
}

/// A monitored root directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanFolderEntry {
    pub scan_folder_id: i64,
    /// Absolute path on this machine
    pub scan_folder: String,
    /// Blank means the folder is hidden from UIs
    pub display_name: String,
    /// Machine-independent key; this is the folder's identity
    pub portable_key: String,
    pub output_prefix: String,
    pub is_root: bool,
}

impl ScanFolderEntry {
    pub fn new(
        scan_folder: impl Into<String>,
        display_name: impl Into<String>,
        portable_key: impl Into<String>,
    ) -> Self {
        Self {
            scan_folder_id: NO_ID,
            scan_folder: scan_folder.into(),
            display_name: display_name.into(),
            portable_key: portable_key.into(),
            output_prefix: String::new(),
            is_root: false,
        }
    }

    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }

    pub fn as_root(mut self) -> Self {
        self.is_root = true;
        self
    }
}

// Two scan folders are the same folder when their portable keys match,
// whatever path or row id they carry on this machine.
impl PartialEq for ScanFolderEntry {
    fn eq(&self, other: &Self) -> bool {
        self.portable_key == other.portable_key
    }
}

impl Eq for ScanFolderEntry {}

impl std::hash::Hash for ScanFolderEntry {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.portable_key.hash(state);
    }
}

impl std::fmt::Display for ScanFolderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scan folder {} path:{} display:{} key:{}",
            self.scan_folder_id, self.scan_folder, self.display_name, self.portable_key
        )
    }
}

/// A source file under a scan folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub source_id: i64,
    pub scan_folder_pk: i64,
    /// Path relative to the scan folder
    pub source_name: String,
    pub source_guid: Uuid,
    /// Opaque; equal fingerprints mean the analysis can be skipped
    pub analysis_fingerprint: String,
}

impl SourceEntry {
    pub fn new(scan_folder_pk: i64, source_name: impl Into<String>, source_guid: Uuid) -> Self {
        Self {
            source_id: NO_ID,
            scan_folder_pk,
            source_name: source_name.into(),
            source_guid,
            analysis_fingerprint: String::new(),
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.analysis_fingerprint = fingerprint.into();
        self
    }
}

impl std::fmt::Display for SourceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "source {} scanfolder:{} name:{} guid:{}",
            self.source_id,
            self.scan_folder_pk,
            self.source_name,
            self.source_guid.braced()
        )
    }
}

/// Registry entry of a builder and the fingerprint of its analysis logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderInfoEntry {
    pub builder_info_id: i64,
    pub builder_uuid: Uuid,
    pub analysis_fingerprint: String,
}

impl BuilderInfoEntry {
    pub fn new(builder_uuid: Uuid, analysis_fingerprint: impl Into<String>) -> Self {
        Self {
            builder_info_id: NO_ID,
            builder_uuid,
            analysis_fingerprint: analysis_fingerprint.into(),
        }
    }
}

/// One output artifact of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductEntry {
    pub product_id: i64,
    pub job_pk: i64,
    /// Disambiguates the outputs of one job
    pub sub_id: u32,
    pub product_name: String,
    pub asset_type: Uuid,
    /// Back-compat identity derived from the product name
    pub legacy_guid: Uuid,
}

impl ProductEntry {
    pub fn new(job_pk: i64, sub_id: u32, product_name: impl Into<String>, asset_type: Uuid) -> Self {
        Self {
            product_id: NO_ID,
            job_pk,
            sub_id,
            product_name: product_name.into(),
            asset_type,
            legacy_guid: Uuid::nil(),
        }
    }

    pub fn with_legacy_guid(mut self, legacy_guid: Uuid) -> Self {
        self.legacy_guid = legacy_guid;
        self
    }
}

impl PartialEq for ProductEntry {
    fn eq(&self, other: &Self) -> bool {
        self.job_pk == other.job_pk
            && self.sub_id == other.sub_id
            && self.asset_type == other.asset_type
            && self.product_name == other.product_name
    }
}

impl Eq for ProductEntry {}

impl std::fmt::Display for ProductEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "product {} job:{} subid:{} name:{} type:{}",
            self.product_id,
            self.job_pk,
            self.sub_id,
            self.product_name,
            self.asset_type.braced()
        )
    }
}

/// A sub-id a product used to be known by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacySubIdEntry {
    pub sub_ids_entry_id: i64,
    pub product_pk: i64,
    pub sub_id: u32,
}

impl LegacySubIdEntry {
    pub fn new(product_pk: i64, sub_id: u32) -> Self {
        Self {
            sub_ids_entry_id: NO_ID,
            product_pk,
            sub_id,
        }
    }
}

/// A file or folder seen under a scan folder, recognized as a source or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub file_id: i64,
    pub scan_folder_pk: i64,
    pub file_name: String,
    pub is_folder: bool,
    pub mod_time: u64,
}

impl FileEntry {
    pub fn new(scan_folder_pk: i64, file_name: impl Into<String>, is_folder: bool, mod_time: u64) -> Self {
        Self {
            file_id: NO_ID,
            scan_folder_pk,
            file_name: file_name.into(),
            is_folder,
            mod_time,
        }
    }
}

impl PartialEq for FileEntry {
    fn eq(&self, other: &Self) -> bool {
        self.scan_folder_pk == other.scan_folder_pk
            && self.file_name == other.file_name
            && self.is_folder == other.is_folder
            && self.mod_time == other.mod_time
    }
}

impl Eq for FileEntry {}

impl std::fmt::Display for FileEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "file {} scanfolder:{} name:{} folder:{} modtime:{}",
            self.file_id, self.scan_folder_pk, self.file_name, self.is_folder, self.mod_time
        )
    }
}

/// A source with its scan folder, if the folder row still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAndScanFolderEntry {
    pub source: SourceEntry,
    pub scan_folder: Option<ScanFolderEntry>,
}

/// One row of the scan folder ⋈ source ⋈ job ⋈ product join.
///
/// Not comparable: the parts already carry their own equality rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedEntry {
    pub scan_folder: ScanFolderEntry,
    pub source: SourceEntry,
    pub job: JobEntry,
    pub product: ProductEntry,
    /// Filled only when legacy sub-ids were requested
    pub legacy_sub_ids: Vec<LegacySubIdEntry>,
}

impl CombinedEntry {
    pub fn asset_id(&self) -> AssetId {
        AssetId::new(self.source.source_guid, self.product.sub_id)
    }
}
