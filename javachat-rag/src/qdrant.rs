//! Qdrant hybrid index backend.
//!
//! Provides [`QdrantVectorIndex`] which implements [`VectorIndex`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC. Each
//! collection carries a named dense slot (cosine distance) and a named sparse
//! slot with the IDF modifier. Queries prefetch from both slots and fuse the
//! candidate lists with reciprocal rank fusion.
//!
//! # Example
//!
//! ```rust,ignore
//! use javachat_rag::qdrant::QdrantVectorIndex;
//!
//! let index = QdrantVectorIndex::from_env(&RetrievalConfig::default())?;
//! index.ensure_collection("java-docs", 1536).await?;
//! let hits = index.query("java-docs", &query).await?;
//! ```

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, Fusion, Modifier,
    NamedVectors, PointStruct, PrefetchQueryBuilder, Query, QueryPointsBuilder, ScoredPoint,
    SparseVectorParamsBuilder, SparseVectorsConfigBuilder, UpsertPointsBuilder,
    Value as QdrantValue, Vector, VectorInput, VectorParamsBuilder, VectorsConfigBuilder,
};
use qdrant_client::{Payload as QdrantPayload, Qdrant, QdrantError};
use serde_json::{Number, Value};
use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::error::{RagError, Result};
use crate::vectorstore::{HybridQuery, IndexHit, IndexedPoint, Payload, PayloadFilter, VectorIndex};

const BACKEND: &str = "qdrant";

/// Default gRPC endpoint of a local Qdrant.
pub const DEFAULT_URL: &str = "http://localhost:6334";

/// A [`VectorIndex`] backed by [Qdrant](https://qdrant.tech/).
pub struct QdrantVectorIndex {
    client: Qdrant,
    dense_vector_name: String,
    sparse_vector_name: String,
}

impl QdrantVectorIndex {
    /// Connect to `url` using the vector slot names from `config`.
    ///
    /// The client-side timeout is the longest per-operation deadline in
    /// `config`; tighter per-call deadlines are enforced by the retry executor.
    pub fn new(url: &str, api_key: Option<String>, config: &RetrievalConfig) -> Result<Self> {
        let timeout = config.upsert_timeout.max(config.delete_timeout).max(config.search_timeout);
        let client = Qdrant::from_url(url)
            .api_key(api_key.filter(|k| !k.trim().is_empty()))
            .timeout(timeout)
            .build()
            .map_err(map_err)?;
        Ok(Self::from_client(client, config))
    }

    /// Connect using `QDRANT_URL` (default [`DEFAULT_URL`]) and `QDRANT_API_KEY`.
    pub fn from_env(config: &RetrievalConfig) -> Result<Self> {
        let url = std::env::var("QDRANT_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        Self::new(&url, std::env::var("QDRANT_API_KEY").ok(), config)
    }

    /// Wrap an existing client.
    pub fn from_client(client: Qdrant, config: &RetrievalConfig) -> Self {
        Self {
            client,
            dense_vector_name: config.dense_vector_name.clone(),
            sparse_vector_name: config.sparse_vector_name.clone(),
        }
    }

    fn to_point(&self, point: &IndexedPoint) -> Result<PointStruct> {
        let mut vectors = NamedVectors::default()
            .add_vector(self.dense_vector_name.clone(), Vector::new_dense(point.dense.clone()));
        if let Some(sparse) = &point.sparse {
            vectors = vectors.add_vector(
                self.sparse_vector_name.clone(),
                Vector::new_sparse(sparse.indices().to_vec(), sparse.values().to_vec()),
            );
        }
        let payload = QdrantPayload::try_from(Value::Object(point.payload.clone())).map_err(map_err)?;
        Ok(PointStruct::new(point.id.clone(), vectors, payload))
    }
}

fn map_err(e: QdrantError) -> RagError {
    RagError::from_backend(BACKEND, e.to_string())
}

fn to_filter(filter: &PayloadFilter) -> Filter {
    Filter::must(
        filter
            .conditions()
            .iter()
            .map(|(field, value)| Condition::matches(field.clone(), value.clone())),
    )
}

fn to_json(value: &QdrantValue) -> Option<Value> {
    match &value.kind {
        Some(Kind::StringValue(s)) => Some(Value::String(s.clone())),
        Some(Kind::IntegerValue(n)) => Some(Value::from(*n)),
        Some(Kind::DoubleValue(n)) => Number::from_f64(*n).map(Value::Number),
        Some(Kind::BoolValue(b)) => Some(Value::Bool(*b)),
        _ => None,
    }
}

fn to_hit(point: ScoredPoint) -> IndexHit {
    let id = point
        .id
        .as_ref()
        .and_then(|pid| match &pid.point_id_options {
            Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
            Some(PointIdOptions::Num(n)) => Some(n.to_string()),
            None => None,
        })
        .unwrap_or_default();
    let payload: Payload = point
        .payload
        .iter()
        .filter_map(|(key, value)| to_json(value).map(|v| (key.clone(), v)))
        .collect();
    IndexHit { id, score: point.score, payload }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> Result<()> {
        if self.client.collection_exists(collection).await.map_err(map_err)? {
            debug!(collection, "qdrant collection already exists, skipping creation");
            return Ok(());
        }

        let mut dense = VectorsConfigBuilder::default();
        dense.add_named_vector_params(
            self.dense_vector_name.clone(),
            VectorParamsBuilder::new(dimensions as u64, Distance::Cosine),
        );
        let mut sparse = SparseVectorsConfigBuilder::default();
        sparse.add_named_vector_params(
            self.sparse_vector_name.clone(),
            SparseVectorParamsBuilder::default().modifier(Modifier::Idf),
        );

        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(dense)
                    .sparse_vectors_config(sparse),
            )
            .await
            .map_err(map_err)?;

        info!(collection, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn upsert_points(&self, collection: &str, points: &[IndexedPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let points = points.iter().map(|p| self.to_point(p)).collect::<Result<Vec<_>>>()?;
        let count = points.len();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(map_err)?;

        debug!(collection, count, "upserted points to qdrant");
        Ok(())
    }

    async fn delete_by_filter(&self, collection: &str, filter: &PayloadFilter) -> Result<()> {
        if filter.is_empty() {
            return Err(RagError::InvalidArgument(
                "refusing to delete with an empty filter".to_string(),
            ));
        }
        self.client
            .delete_points(DeletePointsBuilder::new(collection).points(to_filter(filter)).wait(true))
            .await
            .map_err(map_err)?;

        debug!(collection, conditions = filter.conditions().len(), "deleted points from qdrant");
        Ok(())
    }

    async fn query(&self, collection: &str, query: &HybridQuery) -> Result<Vec<IndexHit>> {
        let filter = query.filter.as_ref().map(to_filter);
        let mut request = QueryPointsBuilder::new(collection)
            .limit(query.limit as u64)
            .with_payload(true);

        match &query.sparse {
            Some(sparse) => {
                let mut dense_stage = PrefetchQueryBuilder::default()
                    .query(Query::new_nearest(query.dense.clone()))
                    .using(self.dense_vector_name.clone())
                    .limit(query.prefetch_limit as u64);
                let mut sparse_stage = PrefetchQueryBuilder::default()
                    .query(Query::new_nearest(VectorInput::new_sparse(
                        sparse.indices().to_vec(),
                        sparse.values().to_vec(),
                    )))
                    .using(self.sparse_vector_name.clone())
                    .limit(query.prefetch_limit as u64);
                if let Some(filter) = &filter {
                    dense_stage = dense_stage.filter(filter.clone());
                    sparse_stage = sparse_stage.filter(filter.clone());
                }
                request = request
                    .add_prefetch(dense_stage)
                    .add_prefetch(sparse_stage)
                    .query(Fusion::Rrf);
            }
            None => {
                request = request
                    .query(Query::new_nearest(query.dense.clone()))
                    .using(self.dense_vector_name.clone());
            }
        }
        if let Some(filter) = filter {
            request = request.filter(filter);
        }

        let response = self.client.query(request).await.map_err(map_err)?;
        let hits: Vec<IndexHit> = response.result.into_iter().map(to_hit).collect();
        debug!(collection, count = hits.len(), "qdrant query completed");
        Ok(hits)
    }
}
