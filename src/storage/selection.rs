//! Lazy typed row iteration
//!
//! A [`Selection`] is a bound statement from the connection's cache plus the
//! decoder for its rows. Stepping happens only as the caller pulls rows, so
//! breaking out of a loop stops the query. Dropping the selection returns the
//! statement to the cache.

use super::decode::{self, Decoder};
use super::query::{JobFilter, Query};
use crate::entry::CombinedEntry;
use crate::Result;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, CachedStatement, Connection};
use tracing::{debug, error};

type Enricher<'c, T> = Box<dyn Fn(&mut T) -> rusqlite::Result<()> + 'c>;

/// A prepared, bound query whose rows decode to `T`.
pub struct Selection<'c, T> {
    conn: &'c Connection,
    query: Query,
    stmt: CachedStatement<'c>,
    params: Vec<Value>,
    decode: Decoder<T>,
    filter: Option<JobFilter>,
    enrich: Option<Enricher<'c, T>>,
}

impl<'c, T> Selection<'c, T> {
    pub(crate) fn new(conn: &'c Connection, query: Query, params: Vec<Value>, decode: Decoder<T>) -> Result<Self> {
        let stmt = conn.prepare_cached(&query.sql())?;
        Ok(Self {
            conn,
            query,
            stmt,
            params,
            decode,
            filter: None,
            enrich: None,
        })
    }

    /// Check builder, job key and status per row
    pub(crate) fn filtered(mut self, filter: &JobFilter) -> Self {
        if filter.has_row_criteria() {
            self.filter = Some(filter.clone());
        }
        self
    }

    /// The catalog entry this selection runs
    pub fn query(&self) -> Query {
        self.query
    }

    /// Execute the statement and iterate its rows
    pub fn rows(&mut self) -> Result<Rows<'_, T>> {
        debug!(query = ?self.query, params = self.params.len(), "executing");
        let rows = self.stmt.query(params_from_iter(self.params.iter()))?;
        Ok(Rows {
            query: self.query,
            rows,
            decode: self.decode,
            filter: self.filter.as_ref(),
            enrich: self.enrich.as_deref(),
            done: false,
        })
    }

    /// Drain every row
    pub fn collect_vec(mut self) -> Result<Vec<T>> {
        let items = self.rows()?.collect::<Result<Vec<T>>>();
        items
    }

    /// The first matching row, if any
    pub fn first(mut self) -> Result<Option<T>> {
        let item = self.rows()?.next().transpose();
        item
    }

    pub fn exists(self) -> Result<bool> {
        Ok(self.first()?.is_some())
    }

    /// Visit rows until `visit` returns false.
    ///
    /// Returns whether any row was delivered. Stopping early is not an error.
    pub fn for_each_while(mut self, mut visit: impl FnMut(T) -> bool) -> Result<bool> {
        let mut found = false;
        for item in self.rows()? {
            found = true;
            if !visit(item?) {
                break;
            }
        }
        Ok(found)
    }
}

impl<'c> Selection<'c, CombinedEntry> {
    /// Attach each product's legacy sub-ids, one extra lookup per row
    pub fn with_legacy_sub_ids(mut self) -> Self {
        let conn = self.conn;
        self.enrich = Some(Box::new(move |entry: &mut CombinedEntry| {
            let mut stmt = conn.prepare_cached(&Query::LegacySubIdsByProductId.sql())?;
            entry.legacy_sub_ids = stmt
                .query_map([entry.product.product_id], decode::legacy_sub_id)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(())
        }));
        self
    }
}

/// Single-pass iterator over the decoded rows of a [`Selection`].
///
/// A store error is yielded once and ends the iteration; rows already
/// yielded stay valid.
pub struct Rows<'s, T> {
    query: Query,
    rows: rusqlite::Rows<'s>,
    decode: Decoder<T>,
    filter: Option<&'s JobFilter>,
    enrich: Option<&'s dyn Fn(&mut T) -> rusqlite::Result<()>>,
    done: bool,
}

impl<T> Rows<'_, T> {
    fn fail(&mut self, err: rusqlite::Error) -> Option<Result<T>> {
        error!(query = ?self.query, error = %err, "row iteration failed");
        self.done = true;
        Some(Err(err.into()))
    }
}

impl<T> Iterator for Rows<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let row = match self.rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => return self.fail(e),
            };

            let decoded = match self.filter {
                Some(filter) => filter
                    .matches_row(row)
                    .and_then(|accepted| if accepted { (self.decode)(row).map(Some) } else { Ok(None) }),
                None => (self.decode)(row).map(Some),
            };

            let mut item = match decoded {
                Ok(Some(item)) => item,
                Ok(None) => continue,
                Err(e) => return self.fail(e),
            };

            if let Some(enrich) = self.enrich {
                if let Err(e) = enrich(&mut item) {
                    return self.fail(e);
                }
            }
            return Some(Ok(item));
        }
    }
}
