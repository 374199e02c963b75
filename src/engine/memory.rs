//! In-process engine
//!
//! Keeps every index in memory behind one lock. Mirrors the behavior the
//! store relies on from a real engine: mappings are enforced on write,
//! unknown names are auto-created as dynamic indices, aliases resolve to
//! their bound indices in binding order, and reads fan out over every index
//! an alias points to.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::SearchEngine;
use crate::config::IndexSettings;
use crate::error::{Result, StoreError};
use crate::models::{
    BulkItemResult, BulkOperation, DocumentId, EngineRequest, EngineResponse, Filter, ItemError,
    SearchHit, SearchRequest, SearchResponse, SubSearchResult, WriteAck, WriteResult,
};
use crate::query::matcher::{compare_sort_keys, project_source, Matcher, SortValue};
use crate::schema::IndexMapping;
use crate::tokenizer::Analyzers;

struct StoredDoc {
    source: Value,
    version: u64,
}

struct IndexState {
    settings: IndexSettings,
    mapping: IndexMapping,
    docs: BTreeMap<DocumentId, StoredDoc>,
}

impl IndexState {
    fn new(settings: IndexSettings, mapping: IndexMapping) -> Self {
        Self {
            settings,
            mapping,
            docs: BTreeMap::new(),
        }
    }
}

#[derive(Default)]
struct EngineState {
    indices: BTreeMap<String, IndexState>,
    /// alias -> bound indices, in binding order
    aliases: BTreeMap<String, Vec<String>>,
}

impl EngineState {
    /// Physical indices a read against `names` covers. `names` is a
    /// comma-separated list of indices and aliases.
    fn read_targets(&self, names: &str) -> Result<Vec<String>> {
        let mut targets: Vec<String> = Vec::new();
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let resolved = if self.indices.contains_key(name) {
                vec![name.to_string()]
            } else {
                match self.aliases.get(name) {
                    Some(bound) if !bound.is_empty() => bound.clone(),
                    _ => return Err(StoreError::Query(format!("no such index [{}]", name))),
                }
            };
            for target in resolved {
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }
        if targets.is_empty() {
            return Err(StoreError::Query(format!("no such index [{}]", names)));
        }
        Ok(targets)
    }

    /// Physical index a write against `name` lands in: the index itself, or
    /// the most recently bound index of an alias
    fn write_target(&self, name: &str) -> String {
        self.aliases
            .get(name)
            .and_then(|bound| bound.last())
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

/// Candidate hit collected during a search
struct Candidate<'s> {
    /// Position of the index among the read targets
    generation: usize,
    index: &'s str,
    id: &'s str,
    source: &'s Value,
    key: Vec<SortValue>,
}

/// Engine keeping all indices in process memory
pub struct MemoryEngine {
    state: RwLock<EngineState>,
    analyzers: Analyzers,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EngineState::default()),
            analyzers: Analyzers::default(),
        }
    }

    /// Names of all physical indices
    pub fn index_names(&self) -> Vec<String> {
        self.state.read().indices.keys().cloned().collect()
    }

    /// Number of documents in a physical index
    pub fn document_count(&self, index: &str) -> Option<usize> {
        self.state.read().indices.get(index).map(|i| i.docs.len())
    }

    /// Settings a physical index was created with
    pub fn index_settings(&self, index: &str) -> Option<IndexSettings> {
        self.state.read().indices.get(index).map(|i| i.settings.clone())
    }

    /// Current mapping of a physical index
    pub fn index_mapping(&self, index: &str) -> Option<IndexMapping> {
        self.state.read().indices.get(index).map(|i| i.mapping.clone())
    }

    fn create_index(&self, index: String, settings: IndexSettings, mapping: IndexMapping) -> Result<EngineResponse> {
        let mut state = self.state.write();
        if state.indices.contains_key(&index) {
            return Err(StoreError::Conflict(format!("index [{}] already exists", index)));
        }
        if state.aliases.contains_key(&index) {
            return Err(StoreError::Conflict(format!(
                "index name [{}] is already used by an alias",
                index
            )));
        }
        debug!(index = %index, shards = settings.number_of_shards, "creating index");
        state.indices.insert(index, IndexState::new(settings, mapping));
        Ok(EngineResponse::Acknowledged)
    }

    fn delete_index(&self, index: &str) -> Result<EngineResponse> {
        let mut state = self.state.write();
        if state.indices.remove(index).is_none() {
            return Err(StoreError::Query(format!("no such index [{}]", index)));
        }
        for bound in state.aliases.values_mut() {
            bound.retain(|name| name != index);
        }
        state.aliases.retain(|_, bound| !bound.is_empty());
        debug!(index, "deleted index");
        Ok(EngineResponse::Acknowledged)
    }

    fn put_alias(&self, index: String, alias: String) -> Result<EngineResponse> {
        let mut state = self.state.write();
        if !state.indices.contains_key(&index) {
            return Err(StoreError::Query(format!("no such index [{}]", index)));
        }
        if state.indices.contains_key(&alias) {
            return Err(StoreError::Conflict(format!(
                "alias [{}] clashes with an existing index",
                alias
            )));
        }
        let bound = state.aliases.entry(alias).or_default();
        if !bound.contains(&index) {
            bound.push(index);
        }
        Ok(EngineResponse::Acknowledged)
    }

    fn delete_alias(&self, index: &str, alias: &str) -> Result<EngineResponse> {
        let mut state = self.state.write();
        let Some(bound) = state.aliases.get_mut(alias) else {
            return Err(StoreError::Query(format!("alias [{}] missing", alias)));
        };
        let before = bound.len();
        bound.retain(|name| name != index);
        if bound.len() == before {
            return Err(StoreError::Query(format!(
                "alias [{}] is not bound to index [{}]",
                alias, index
            )));
        }
        if bound.is_empty() {
            state.aliases.remove(alias);
        }
        Ok(EngineResponse::Acknowledged)
    }

    fn get_alias(&self, alias: &str) -> EngineResponse {
        let state = self.state.read();
        EngineResponse::Aliases(state.aliases.get(alias).cloned().unwrap_or_default())
    }

    fn index_document(
        state: &mut EngineState,
        index: &str,
        id: Option<DocumentId>,
        document: Value,
    ) -> Result<WriteAck> {
        let target = state.write_target(index);
        let index_state = state.indices.entry(target.clone()).or_insert_with(|| {
            debug!(index = %target, "auto-creating index with dynamic mapping");
            IndexState::new(IndexSettings::default(), IndexMapping::new())
        });

        index_state
            .mapping
            .validate_document(&document)
            .map_err(StoreError::InvalidRecord)?;
        index_state.mapping.merge_dynamic(&document);

        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let (result, version) = match index_state.docs.get(&id) {
            Some(existing) => (WriteResult::Updated, existing.version + 1),
            None => (WriteResult::Created, 1),
        };
        index_state.docs.insert(
            id.clone(),
            StoredDoc {
                source: document,
                version,
            },
        );

        Ok(WriteAck {
            index: target,
            id,
            result,
            version,
        })
    }

    /// Newest generation first, so a document rewritten during a migration
    /// is read back from where the write landed
    fn get_document(&self, index: &str, id: &str) -> Result<EngineResponse> {
        let state = self.state.read();
        for target in state.read_targets(index)?.into_iter().rev() {
            let Some(index_state) = state.indices.get(&target) else {
                continue;
            };
            if let Some(doc) = index_state.docs.get(id) {
                return Ok(EngineResponse::Document(Some(SearchHit {
                    index: target,
                    id: id.to_string(),
                    source: doc.source.clone(),
                    sort: Vec::new(),
                })));
            }
        }
        Ok(EngineResponse::Document(None))
    }

    fn count(&self, index: &str, query: &Filter) -> Result<u64> {
        let state = self.state.read();
        let mut total = 0u64;
        for target in state.read_targets(index)? {
            let Some(index_state) = state.indices.get(&target) else {
                continue;
            };
            let matcher = Matcher::new(&target, &index_state.mapping, &self.analyzers);
            matcher.check(query)?;
            total += index_state
                .docs
                .values()
                .filter(|doc| matcher.matches(query, &doc.source))
                .count() as u64;
        }
        Ok(total)
    }

    fn sum(&self, index: &str, field: &str, query: &Filter) -> Result<f64> {
        let state = self.state.read();
        let mut total = 0.0;
        for target in state.read_targets(index)? {
            let Some(index_state) = state.indices.get(&target) else {
                continue;
            };
            let matcher = Matcher::new(&target, &index_state.mapping, &self.analyzers);
            matcher.check(query)?;
            matcher.check_numeric(field)?;
            total += index_state
                .docs
                .values()
                .filter(|doc| matcher.matches(query, &doc.source))
                .flat_map(|doc| matcher.numeric_values(field, &doc.source))
                .sum::<f64>();
        }
        Ok(total)
    }

    fn run_search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let started = Instant::now();
        let after: Option<Vec<SortValue>> = match &request.search_after {
            None => None,
            Some(values) => {
                if values.len() != request.sort.len() {
                    return Err(StoreError::Query(format!(
                        "search_after has {} value(s) but sort has {}",
                        values.len(),
                        request.sort.len()
                    )));
                }
                Some(values.iter().map(SortValue::from_json).collect())
            }
        };

        let state = self.state.read();
        let targets = state.read_targets(&request.index)?;
        let mut candidates: Vec<Candidate<'_>> = Vec::new();

        for (generation, target) in targets.iter().enumerate() {
            let Some((name, index_state)) = state.indices.get_key_value(target) else {
                continue;
            };
            let matcher = Matcher::new(name, &index_state.mapping, &self.analyzers);
            matcher.check(&request.query)?;
            matcher.check_sort(&request.sort)?;

            for (id, doc) in &index_state.docs {
                if matcher.matches(&request.query, &doc.source) {
                    candidates.push(Candidate {
                        generation,
                        index: name,
                        id,
                        source: &doc.source,
                        key: matcher.sort_key(&request.sort, &doc.source),
                    });
                }
            }
        }

        let total_hits = candidates.len() as u64;
        if let Some(after) = &after {
            candidates.retain(|c| compare_sort_keys(&c.key, after, &request.sort) == Ordering::Greater);
        }
        candidates.sort_by(|a, b| {
            compare_sort_keys(&a.key, &b.key, &request.sort)
                .then_with(|| b.generation.cmp(&a.generation))
                .then_with(|| a.id.cmp(b.id))
        });

        let hits = candidates
            .into_iter()
            .take(request.size)
            .map(|c| SearchHit {
                index: c.index.to_string(),
                id: c.id.to_string(),
                source: match &request.source_includes {
                    Some(includes) => project_source(c.source, includes),
                    None => c.source.clone(),
                },
                sort: c.key.iter().map(SortValue::to_json).collect(),
            })
            .collect();

        Ok(SearchResponse {
            hits,
            total_hits,
            took_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[async_trait]
impl SearchEngine for MemoryEngine {
    async fn execute(&self, request: EngineRequest) -> Result<EngineResponse> {
        match request {
            EngineRequest::CreateIndex {
                index,
                settings,
                mapping,
            } => self.create_index(index, settings, mapping),
            EngineRequest::DeleteIndex { index } => self.delete_index(&index),
            EngineRequest::PutAlias { index, alias } => self.put_alias(index, alias),
            EngineRequest::DeleteAlias { index, alias } => self.delete_alias(&index, &alias),
            EngineRequest::GetAlias { alias } => Ok(self.get_alias(&alias)),
            EngineRequest::Index {
                index,
                id,
                document,
            } => {
                let mut state = self.state.write();
                Self::index_document(&mut state, &index, id, document).map(EngineResponse::Indexed)
            }
            EngineRequest::Get { index, id } => self.get_document(&index, &id),
            EngineRequest::Count { index, query } => self.count(&index, &query).map(EngineResponse::Count),
            EngineRequest::Sum { index, field, query } => {
                self.sum(&index, &field, &query).map(EngineResponse::Sum)
            }
            EngineRequest::MultiSearch(requests) => Ok(EngineResponse::MultiSearch(
                requests
                    .iter()
                    .map(|req| match self.run_search(req) {
                        Ok(response) => SubSearchResult::Ok(response),
                        Err(e) => SubSearchResult::Err(ItemError::from(e)),
                    })
                    .collect(),
            )),
        }
    }

    async fn bulk(&self, operations: Vec<BulkOperation>) -> Result<Vec<BulkItemResult>> {
        let mut state = self.state.write();
        let results = operations
            .into_iter()
            .map(|op| match op {
                BulkOperation::Index {
                    index,
                    id,
                    document,
                } => Self::index_document(&mut state, &index, id, document).map_err(ItemError::from),
            })
            .collect();
        Ok(results)
    }

    async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        self.run_search(&request)
    }
}
