//! Product dependency resolution
//!
//! A product depends on an asset id (source GUID + sub-id), not on a product
//! row, so every hop maps the dependency's target back to the product that
//! currently carries that id. Products that do not exist yet are skipped.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use tracing::debug;

use crate::entry::ProductEntry;
use crate::storage::AssetDatabaseConnection;
use crate::Result;

/// A product reached while walking the dependency graph
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedDependency {
    pub product: ProductEntry,
    /// Hops from the root; direct dependencies are at depth 1
    pub depth: usize,
    /// Product through which this one was first reached
    pub via: i64,
}

impl ResolvedDependency {
    pub fn is_direct(&self) -> bool {
        self.depth == 1
    }
}

/// Walks product dependencies on top of a connection
pub struct DependencyResolver<'a> {
    db: &'a AssetDatabaseConnection,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(db: &'a AssetDatabaseConnection) -> Self {
        Self { db }
    }

    /// Products `product_id` depends on directly
    pub fn direct(&self, product_id: i64) -> Result<Vec<ProductEntry>> {
        self.db.query_direct_product_dependencies(product_id)?.collect_vec()
    }

    /// Every product reachable from `product_id`, excluding it, in breadth-first order
    pub fn transitive(&self, product_id: i64) -> Result<Vec<ResolvedDependency>> {
        self.walk(product_id, None)
    }

    /// Like [`transitive`](Self::transitive) but stops expanding after `max_depth` hops
    pub fn transitive_with_limit(&self, product_id: i64, max_depth: usize) -> Result<Vec<ResolvedDependency>> {
        self.walk(product_id, Some(max_depth))
    }

    fn walk(&self, root: i64, max_depth: Option<usize>) -> Result<Vec<ResolvedDependency>> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut results = Vec::new();

        visited.insert(root);
        queue.push_back((root, 0usize));

        while let Some((current, depth)) = queue.pop_front() {
            if max_depth.is_some_and(|max| depth >= max) {
                continue;
            }

            for product in self.direct(current)? {
                if !visited.insert(product.product_id) {
                    continue;
                }
                queue.push_back((product.product_id, depth + 1));
                results.push(ResolvedDependency {
                    product,
                    depth: depth + 1,
                    via: current,
                });
            }
        }

        debug!(root, found = results.len(), visited = visited.len(), "resolved product dependencies");
        Ok(results)
    }
}
