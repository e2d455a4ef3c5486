//! Dependency edges
//!
//! Two kinds of edges are tracked:
//! - `SourceFileDependencyEntry`: source → source, produced by a builder's analysis
//! - `ProductDependencyEntry`: product → asset, addressed by the target's source GUID and sub-id
//!
//! Product dependencies point at an asset id rather than a product row so they
//! can be recorded before the target product exists.

use crate::entry::{AssetId, NO_ID};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Kind of a source file dependency, also used as a bitmask when querying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeOfDependency {
    /// Source file depends on another source file
    SourceToSource,
    /// Job depends on another job
    JobToJob,
    /// Mask matching both source and job dependencies
    SourceOrJob,
    /// The depends-on side is a LIKE pattern
    SourceLikeMatch,
    /// Query-only wildcard; never written to the database
    Any,
}

impl TypeOfDependency {
    pub fn bits(&self) -> u32 {
        match self {
            TypeOfDependency::SourceToSource => 1 << 0,
            TypeOfDependency::JobToJob => 1 << 1,
            TypeOfDependency::SourceOrJob => (1 << 0) | (1 << 1),
            TypeOfDependency::SourceLikeMatch => 1 << 2,
            TypeOfDependency::Any => 0xFFFF_FFFF,
        }
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.bits() == bits)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeOfDependency::SourceToSource => "source",
            TypeOfDependency::JobToJob => "job",
            TypeOfDependency::SourceOrJob => "source_or_job",
            TypeOfDependency::SourceLikeMatch => "like",
            TypeOfDependency::Any => "any",
        }
    }

    pub fn all() -> &'static [TypeOfDependency] {
        &[
            TypeOfDependency::SourceToSource,
            TypeOfDependency::JobToJob,
            TypeOfDependency::SourceOrJob,
            TypeOfDependency::SourceLikeMatch,
            TypeOfDependency::Any,
        ]
    }

    /// Whether a row of this type can be persisted. Masks are query-only.
    pub fn is_storable(&self) -> bool {
        matches!(
            self,
            TypeOfDependency::SourceToSource | TypeOfDependency::JobToJob | TypeOfDependency::SourceLikeMatch
        )
    }

    /// Whether this mask selects wildcard (LIKE) dependencies
    pub fn includes_like_match(&self) -> bool {
        self.bits() & TypeOfDependency::SourceLikeMatch.bits() != 0
    }
}

impl FromStr for TypeOfDependency {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "source" | "source_to_source" => Ok(TypeOfDependency::SourceToSource),
            "job" | "job_to_job" => Ok(TypeOfDependency::JobToJob),
            "source_or_job" | "both" => Ok(TypeOfDependency::SourceOrJob),
            "like" | "wildcard" | "source_like_match" => Ok(TypeOfDependency::SourceLikeMatch),
            "any" | "*" => Ok(TypeOfDependency::Any),
            _ => Err(crate::Error::Parse(format!("Unknown dependency type: {}", s))),
        }
    }
}

impl std::fmt::Display for TypeOfDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row of the `SourceDependency` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFileDependencyEntry {
    pub source_dependency_id: i64,
    /// Only this builder's analysis produced the edge
    pub builder_guid: Uuid,
    pub source: String,
    pub depends_on_source: String,
    pub type_of_dependency: TypeOfDependency,
}

impl SourceFileDependencyEntry {
    pub fn new(
        builder_guid: Uuid,
        source: impl Into<String>,
        depends_on_source: impl Into<String>,
        type_of_dependency: TypeOfDependency,
    ) -> Self {
        Self {
            source_dependency_id: NO_ID,
            builder_guid,
            source: source.into(),
            depends_on_source: depends_on_source.into(),
            type_of_dependency,
        }
    }
}

impl std::fmt::Display for SourceFileDependencyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "source dependency {} builder:{} {} -> {} ({})",
            self.source_dependency_id,
            self.builder_guid.braced(),
            self.source,
            self.depends_on_source,
            self.type_of_dependency
        )
    }
}

/// How the target of a product dependency was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductDependencyType {
    #[default]
    ProductFile,
    SourceFile,
}

impl ProductDependencyType {
    pub fn as_u32(&self) -> u32 {
        match self {
            ProductDependencyType::ProductFile => 0,
            ProductDependencyType::SourceFile => 1,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(ProductDependencyType::ProductFile),
            1 => Some(ProductDependencyType::SourceFile),
            _ => None,
        }
    }
}

/// A row of the `ProductDependencies` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDependencyEntry {
    pub product_dependency_id: i64,
    pub product_pk: i64,
    pub dependency_source_guid: Uuid,
    pub dependency_sub_id: u32,
    /// 64 semantic flags, e.g. "must be present at runtime"
    pub dependency_flags: u64,
    pub platform: String,
    /// Non-empty while the target has not been mapped to an asset yet
    pub unresolved_path: String,
    pub dependency_type: ProductDependencyType,
}

impl ProductDependencyEntry {
    pub fn new(
        product_pk: i64,
        dependency_source_guid: Uuid,
        dependency_sub_id: u32,
        dependency_flags: u64,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            product_dependency_id: NO_ID,
            product_pk,
            dependency_source_guid,
            dependency_sub_id,
            dependency_flags,
            platform: platform.into(),
            unresolved_path: String::new(),
            dependency_type: ProductDependencyType::ProductFile,
        }
    }

    /// A dependency on a path that could not be mapped to an asset yet
    pub fn unresolved(
        product_pk: i64,
        unresolved_path: impl Into<String>,
        dependency_type: ProductDependencyType,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            unresolved_path: unresolved_path.into(),
            dependency_type,
            ..Self::new(product_pk, Uuid::nil(), 0, 0, platform)
        }
    }

    pub fn is_unresolved(&self) -> bool {
        !self.unresolved_path.is_empty()
    }

    pub fn has_flag(&self, bit: u32) -> bool {
        bit < 64 && self.dependency_flags & (1u64 << bit) != 0
    }

    /// The asset this edge points at
    pub fn target(&self) -> AssetId {
        AssetId::new(self.dependency_source_guid, self.dependency_sub_id)
    }
}

impl PartialEq for ProductDependencyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.product_pk == other.product_pk
            && self.dependency_source_guid == other.dependency_source_guid
            && self.dependency_sub_id == other.dependency_sub_id
            && self.dependency_flags == other.dependency_flags
            && self.platform == other.platform
            && self.unresolved_path == other.unresolved_path
            && self.dependency_type == other.dependency_type
    }
}

impl Eq for ProductDependencyEntry {}

impl std::fmt::Display for ProductDependencyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "product dependency {} product:{} target:{} flags:{:#x} platform:{}",
            self.product_dependency_id,
            self.product_pk,
            self.target(),
            self.dependency_flags,
            self.platform
        )?;
        if self.is_unresolved() {
            write!(f, " unresolved:{}", self.unresolved_path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_of_dependency_bits() {
        for kind in TypeOfDependency::all() {
            assert_eq!(TypeOfDependency::from_bits(kind.bits()), Some(*kind));
        }
        assert_eq!(
            TypeOfDependency::SourceOrJob.bits(),
            TypeOfDependency::SourceToSource.bits() | TypeOfDependency::JobToJob.bits()
        );
        assert!(TypeOfDependency::Any.includes_like_match());
        assert!(!TypeOfDependency::SourceOrJob.includes_like_match());
    }

    #[test]
    fn test_only_concrete_types_are_storable() {
        assert!(TypeOfDependency::SourceToSource.is_storable());
        assert!(TypeOfDependency::SourceLikeMatch.is_storable());
        assert!(!TypeOfDependency::Any.is_storable());
        assert!(!TypeOfDependency::SourceOrJob.is_storable());
    }

    #[test]
    fn test_product_dependency_equality_ignores_id() {
        let guid = Uuid::new_v4();
        let mut a = ProductDependencyEntry::new(3, guid, 1, 0b101, "pc");
        let b = a.clone();
        a.product_dependency_id = 17;
        assert_eq!(a, b);
        assert!(a.has_flag(0));
        assert!(!a.has_flag(1));
        assert!(a.has_flag(2));
        assert!(!a.has_flag(64));
    }

    #[test]
    fn test_unresolved_dependency() {
        let dep = ProductDependencyEntry::unresolved(3, "textures/*.dds", ProductDependencyType::SourceFile, "pc");
        assert!(dep.is_unresolved());
        assert_eq!(dep.dependency_source_guid, Uuid::nil());
        assert!(!ProductDependencyEntry::new(3, Uuid::new_v4(), 0, 0, "pc").is_unresolved());
    }
}
