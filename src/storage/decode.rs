//! Row decoders
//!
//! Columns are read by name so the same decoder works for a plain table scan
//! and for a join that carries extra columns.

use crate::dependency::{ProductDependencyEntry, ProductDependencyType, SourceFileDependencyEntry, TypeOfDependency};
use crate::entry::{
    AssetId, BuilderInfoEntry, CombinedEntry, DatabaseInfoEntry, FileEntry, LegacySubIdEntry, ProductEntry,
    ScanFolderEntry, SourceAndScanFolderEntry, SourceEntry,
};
use crate::job::{JobEntry, JobInfo, JobStatus};
use crate::storage::DatabaseVersion;
use crate::Error;
use rusqlite::types::Type;
use rusqlite::Row;

/// Signature shared by every decoder
pub type Decoder<T> = fn(&Row<'_>) -> rusqlite::Result<T>;

fn conversion_failure(row: &Row<'_>, column: &str, message: String) -> rusqlite::Error {
    let index = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(Error::Parse(message)))
}

pub fn database_info(row: &Row<'_>) -> rusqlite::Result<DatabaseInfoEntry> {
    Ok(DatabaseInfoEntry {
        row_id: row.get("rowID")?,
        version: DatabaseVersion(row.get("version")?),
    })
}

pub fn scan_folder(row: &Row<'_>) -> rusqlite::Result<ScanFolderEntry> {
    Ok(ScanFolderEntry {
        scan_folder_id: row.get("ScanFolderID")?,
        scan_folder: row.get("ScanFolder")?,
        display_name: row.get("DisplayName")?,
        portable_key: row.get("PortableKey")?,
        output_prefix: row.get("OutputPrefix")?,
        is_root: row.get("IsRoot")?,
    })
}

pub fn source(row: &Row<'_>) -> rusqlite::Result<SourceEntry> {
    Ok(SourceEntry {
        source_id: row.get("SourceID")?,
        scan_folder_pk: row.get("ScanFolderPK")?,
        source_name: row.get("SourceName")?,
        source_guid: row.get("SourceGuid")?,
        analysis_fingerprint: row.get("AnalysisFingerprint")?,
    })
}

pub fn source_and_scan_folder(row: &Row<'_>) -> rusqlite::Result<SourceAndScanFolderEntry> {
    let scan_folder_id: Option<i64> = row.get("ScanFolderID")?;
    Ok(SourceAndScanFolderEntry {
        source: source(row)?,
        scan_folder: match scan_folder_id {
            Some(_) => Some(scan_folder(row)?),
            None => None,
        },
    })
}

pub fn analysis_fingerprint(row: &Row<'_>) -> rusqlite::Result<String> {
    row.get("AnalysisFingerprint")
}

pub fn builder_info(row: &Row<'_>) -> rusqlite::Result<BuilderInfoEntry> {
    Ok(BuilderInfoEntry {
        builder_info_id: row.get("BuilderID")?,
        builder_uuid: row.get("Guid")?,
        analysis_fingerprint: row.get("AnalysisFingerprint")?,
    })
}

pub fn job(row: &Row<'_>) -> rusqlite::Result<JobEntry> {
    let status_value: i32 = row.get("Status")?;
    let status = JobStatus::from_i32(status_value)
        .filter(|s| *s != JobStatus::Any)
        .ok_or_else(|| conversion_failure(row, "Status", format!("Invalid job status {}", status_value)))?;
    let job_run_key: i64 = row.get("JobRunKey")?;

    Ok(JobEntry {
        job_id: row.get("JobID")?,
        source_pk: row.get("SourcePK")?,
        job_key: row.get("JobKey")?,
        fingerprint: row.get("Fingerprint")?,
        platform: row.get("Platform")?,
        builder_guid: row.get("BuilderGuid")?,
        status,
        job_run_key: job_run_key as u64,
        first_fail_log_time: row.get("FirstFailLogTime")?,
        first_fail_log_file: row.get("FirstFailLogFile")?,
        last_fail_log_time: row.get("LastFailLogTime")?,
        last_fail_log_file: row.get("LastFailLogFile")?,
        last_log_time: row.get("LastLogTime")?,
        last_log_file: row.get("LastLogFile")?,
    })
}

pub fn job_info(row: &Row<'_>) -> rusqlite::Result<JobInfo> {
    let source_file: Option<String> = row.get("SourceName")?;
    let watch_folder: Option<String> = row.get("ScanFolder")?;
    Ok(JobInfo::from_job(
        job(row)?,
        source_file.unwrap_or_default(),
        watch_folder.unwrap_or_default(),
    ))
}

pub fn product(row: &Row<'_>) -> rusqlite::Result<ProductEntry> {
    Ok(ProductEntry {
        product_id: row.get("ProductID")?,
        job_pk: row.get("JobPK")?,
        sub_id: row.get("SubID")?,
        product_name: row.get("ProductName")?,
        asset_type: row.get("AssetType")?,
        legacy_guid: row.get("LegacyGuid")?,
    })
}

pub fn legacy_sub_id(row: &Row<'_>) -> rusqlite::Result<LegacySubIdEntry> {
    Ok(LegacySubIdEntry {
        sub_ids_entry_id: row.get("LegacySubID")?,
        product_pk: row.get("ProductPK")?,
        sub_id: row.get("SubID")?,
    })
}

pub fn product_dependency(row: &Row<'_>) -> rusqlite::Result<ProductDependencyEntry> {
    let type_value: u32 = row.get("UnresolvedDependencyType")?;
    let dependency_type = ProductDependencyType::from_u32(type_value).ok_or_else(|| {
        conversion_failure(
            row,
            "UnresolvedDependencyType",
            format!("Invalid product dependency type {}", type_value),
        )
    })?;
    let flags: i64 = row.get("DependencyFlags")?;

    Ok(ProductDependencyEntry {
        product_dependency_id: row.get("ProductDependencyID")?,
        product_pk: row.get("ProductPK")?,
        dependency_source_guid: row.get("DependencySourceGuid")?,
        dependency_sub_id: row.get("DependencySubID")?,
        dependency_flags: flags as u64,
        platform: row.get("Platform")?,
        unresolved_path: row.get("UnresolvedPath")?,
        dependency_type,
    })
}

/// A dependency paired with the asset id of the product that owns it
pub fn owned_product_dependency(row: &Row<'_>) -> rusqlite::Result<(AssetId, ProductDependencyEntry)> {
    let owner = AssetId::new(row.get("SourceGuid")?, row.get("SubID")?);
    Ok((owner, product_dependency(row)?))
}

pub fn source_dependency(row: &Row<'_>) -> rusqlite::Result<SourceFileDependencyEntry> {
    let bits: u32 = row.get("TypeOfDependency")?;
    let type_of_dependency = TypeOfDependency::from_bits(bits)
        .filter(TypeOfDependency::is_storable)
        .ok_or_else(|| conversion_failure(row, "TypeOfDependency", format!("Invalid dependency type {:#x}", bits)))?;

    Ok(SourceFileDependencyEntry {
        source_dependency_id: row.get("SourceDependencyID")?,
        builder_guid: row.get("BuilderGuid")?,
        source: row.get("Source")?,
        depends_on_source: row.get("DependsOnSource")?,
        type_of_dependency,
    })
}

pub fn file(row: &Row<'_>) -> rusqlite::Result<FileEntry> {
    let mod_time: i64 = row.get("ModTime")?;
    Ok(FileEntry {
        file_id: row.get("FileID")?,
        scan_folder_pk: row.get("ScanFolderPK")?,
        file_name: row.get("FileName")?,
        is_folder: row.get("IsFolder")?,
        mod_time: mod_time as u64,
    })
}

pub fn combined(row: &Row<'_>) -> rusqlite::Result<CombinedEntry> {
    Ok(CombinedEntry {
        scan_folder: scan_folder(row)?,
        source: source(row)?,
        job: job(row)?,
        product: product(row)?,
        legacy_sub_ids: Vec::new(),
    })
}
