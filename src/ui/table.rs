use tabled::{settings::Style, Table, Tabled};

use crate::dependency::SourceFileDependencyEntry;
use crate::entry::{ProductEntry, SourceEntry};
use crate::job::JobInfo;
use crate::storage::DbStats;
use crate::ui::output::job_status;

#[derive(Tabled)]
pub struct StatRow {
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "Rows")]
    pub rows: usize,
}

#[derive(Tabled)]
pub struct SourceRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Source")]
    pub name: String,
    #[tabled(rename = "GUID")]
    pub guid: String,
}

#[derive(Tabled)]
pub struct JobRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Platform")]
    pub platform: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Run")]
    pub run_key: u64,
}

#[derive(Tabled)]
pub struct ProductRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Product")]
    pub name: String,
    #[tabled(rename = "SubID")]
    pub sub_id: String,
}

#[derive(Tabled)]
pub struct DependencyRow {
    #[tabled(rename = "Source")]
    pub source: String,
    #[tabled(rename = "Depends On")]
    pub depends_on: String,
    #[tabled(rename = "Type")]
    pub kind: String,
}

/// Rounded table, or nothing for no rows
pub fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn stats_table(stats: &DbStats) -> String {
    let rows: Vec<StatRow> = stats
        .tables
        .iter()
        .map(|(table, rows)| StatRow {
            table: table.clone(),
            rows: *rows,
        })
        .collect();
    render(&rows)
}

pub fn source_table(sources: &[SourceEntry]) -> String {
    let rows: Vec<SourceRow> = sources
        .iter()
        .map(|s| SourceRow {
            id: s.source_id,
            name: s.source_name.clone(),
            guid: s.source_guid.braced().to_string(),
        })
        .collect();
    render(&rows)
}

pub fn job_table(jobs: &[JobInfo]) -> String {
    let rows: Vec<JobRow> = jobs
        .iter()
        .map(|j| JobRow {
            id: j.job_id,
            key: j.job_key.clone(),
            platform: j.platform.clone(),
            status: job_status(j.status),
            run_key: j.job_run_key,
        })
        .collect();
    render(&rows)
}

pub fn product_table(products: &[ProductEntry]) -> String {
    let rows: Vec<ProductRow> = products
        .iter()
        .map(|p| ProductRow {
            id: p.product_id,
            name: p.product_name.clone(),
            sub_id: format!("{:#010x}", p.sub_id),
        })
        .collect();
    render(&rows)
}

pub fn dependency_table(deps: &[SourceFileDependencyEntry]) -> String {
    let rows: Vec<DependencyRow> = deps
        .iter()
        .map(|d| DependencyRow {
            source: d.source.clone(),
            depends_on: d.depends_on_source.clone(),
            kind: d.type_of_dependency.to_string(),
        })
        .collect();
    render(&rows)
}
