pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, failed_job, header, job_status, muted, section, status, success};
pub use table::{dependency_table, job_table, product_table, render, source_table, stats_table};
pub use theme::{theme, Theme};
