//! Read path: filtered hybrid query and point lookup.

use tracing::instrument;

use super::lifecycle::Membank;
use crate::engine::TableSearch;
use crate::error::Result;
use crate::filter::{compile_filters, id_predicate};
use crate::types::{MemoryRecord, QueryHit, QueryRequest, QueryResponse};

impl Membank {
    /// Hybrid search constrained by the request's filters. Vectors are never returned.
    #[instrument(skip(self, request), fields(limit = request.limit, rerank = request.rerank))]
    pub fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let predicate = compile_filters(request.filters.as_ref())?;
        let limit = if request.limit == 0 {
            self.config.default_query_limit
        } else {
            request.limit
        };

        let outcome = self.table.search(&TableSearch {
            query: request.q.clone(),
            predicate,
            limit,
            rerank: request.rerank,
        })?;

        let items: Vec<QueryHit> = outcome
            .hits
            .into_iter()
            .take(limit)
            .map(|hit| QueryHit {
                record: hit.record.without_vector(),
                score: hit.score,
            })
            .collect();
        tracing::debug!(hits = items.len(), engine = ?outcome.engine, "query complete");

        Ok(QueryResponse {
            items,
            engine: outcome.engine,
        })
    }

    /// Fetch one record by id, including its vector.
    pub fn get(&self, id: &str) -> Result<Option<MemoryRecord>> {
        Ok(self
            .table
            .select(Some(id_predicate(id).as_str()), 1)?
            .into_iter()
            .next())
    }
}
