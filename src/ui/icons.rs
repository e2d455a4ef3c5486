pub struct Icons;

impl Icons {
    pub const DATABASE: &str = "🗄️";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const SEARCH: &str = "🔍";
    pub const SOURCE: &str = "📄";
    pub const PRODUCT: &str = "📦";
    pub const JOB: &str = "⚙️";
    pub const LINK: &str = "🔗";
    pub const DIRECT: &str = "🔴";
    pub const INDIRECT: &str = "🟠";
    pub const PENDING: &str = "⏳";
    pub const EMPTY: &str = "∅";
}
