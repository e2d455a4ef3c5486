//! Shared test data: a scan folder, source, job and product inserted in one go

use uuid::Uuid;

use super::AssetDatabaseConnection;
use crate::dependency::ProductDependencyEntry;
use crate::entry::{AssetId, ProductEntry, ScanFolderEntry, SourceEntry};
use crate::job::{JobEntry, JobStatus};

pub const BUILDER: Uuid = Uuid::from_u128(0x6f0e_2d4a_8c1b_4f3e_9a57_1d2c_3b4a_5e6f);
pub const ASSET_TYPE: Uuid = Uuid::from_u128(0x0a1b_2c3d_4e5f_6071_8293_a4b5_c6d7_e8f9);

pub struct Chain {
    pub scan_folder: ScanFolderEntry,
    pub source: SourceEntry,
    pub job: JobEntry,
    pub product: ProductEntry,
}

impl Chain {
    /// Insert one full chain under a scan folder keyed by the source name
    pub fn seed(db: &AssetDatabaseConnection, source_name: &str, platform: &str) -> Self {
        let mut scan_folder = ScanFolderEntry::new(
            format!("/project/{}", source_name),
            format!("folder for {}", source_name),
            format!("key:{}", source_name),
        );
        db.insert_scan_folder(&mut scan_folder).unwrap();

        let mut chain = Self::seed_in(db, &scan_folder, source_name, platform);
        chain.scan_folder = scan_folder;
        chain
    }

    /// Insert a source, job and product under an existing scan folder
    pub fn seed_in(
        db: &AssetDatabaseConnection,
        scan_folder: &ScanFolderEntry,
        source_name: &str,
        platform: &str,
    ) -> Self {
        let mut source = SourceEntry::new(scan_folder.scan_folder_id, source_name, Uuid::new_v4());
        db.insert_source(&mut source).unwrap();

        let mut job = JobEntry::new(
            source.source_id,
            "Compile",
            0xC0FFEE,
            platform,
            BUILDER,
            JobStatus::Completed,
            source.source_id as u64 * 100,
        );
        db.insert_job(&mut job).unwrap();

        let mut product = ProductEntry::new(job.job_id, 0, format!("{}/{}.out", platform, source_name), ASSET_TYPE);
        db.insert_product(&mut product).unwrap();

        Self {
            scan_folder: scan_folder.clone(),
            source,
            job,
            product,
        }
    }

    pub fn product_asset_id(&self) -> AssetId {
        AssetId::new(self.source.source_guid, self.product.sub_id)
    }

    /// Make this chain's product depend on `target`'s product
    pub fn depend_on(&self, db: &AssetDatabaseConnection, target: &Chain) -> ProductDependencyEntry {
        let mut dep = ProductDependencyEntry::new(
            self.product.product_id,
            target.source.source_guid,
            target.product.sub_id,
            0,
            self.job.platform.clone(),
        );
        db.insert_product_dependency(&mut dep).unwrap();
        dep
    }
}
