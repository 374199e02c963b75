//! Logical collection names
//!
//! A logical collection is an alias bound to one or more physical
//! generations. Callers always use the logical name; migrations build a new
//! generation and move the alias over with [`AliasManager::cutover`].

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::engine::{with_timeout, SearchEngine};
use crate::error::{Result, StoreError};
use crate::models::{EngineRequest, EngineResponse};

pub struct AliasManager {
    engine: Arc<dyn SearchEngine>,
    request_timeout: Duration,
}

impl AliasManager {
    pub fn new(engine: Arc<dyn SearchEngine>, request_timeout: Duration) -> Self {
        Self {
            engine,
            request_timeout,
        }
    }

    async fn execute(&self, request: EngineRequest) -> Result<EngineResponse> {
        let name = request.name();
        with_timeout(self.request_timeout, name, self.engine.execute(request)).await
    }

    /// Physical generations bound to `alias`, in binding order. Empty when the
    /// alias does not exist.
    pub async fn bindings(&self, alias: &str) -> Result<Vec<String>> {
        let response = self
            .execute(EngineRequest::GetAlias {
                alias: alias.to_string(),
            })
            .await?;
        match response {
            EngineResponse::Aliases(bound) => Ok(bound),
            other => Err(StoreError::Internal(format!(
                "unexpected response to GetAlias: {:?}",
                other
            ))),
        }
    }

    /// Physical generations to use for `alias`.
    ///
    /// Never fails: an unbound alias, or one that cannot be looked up,
    /// resolves to itself so the same name works with or without aliasing.
    pub async fn resolve(&self, alias: &str) -> Vec<String> {
        match self.bindings(alias).await {
            Ok(bound) if !bound.is_empty() => bound,
            Ok(_) => {
                debug!(alias, "alias not bound, using it as a physical name");
                vec![alias.to_string()]
            }
            Err(e) => {
                warn!(alias, error = %e, "alias lookup failed, using it as a physical name");
                vec![alias.to_string()]
            }
        }
    }

    /// Bind `alias` to `physical`. Existing bindings are kept.
    pub async fn bind(&self, alias: &str, physical: &str) -> Result<()> {
        self.execute(EngineRequest::PutAlias {
            index: physical.to_string(),
            alias: alias.to_string(),
        })
        .await?;
        info!(alias, index = physical, "bound alias");
        Ok(())
    }

    /// Remove every binding of `alias`. Returns the generations it was
    /// removed from.
    pub async fn unbind(&self, alias: &str) -> Result<Vec<String>> {
        let bound = self.bindings(alias).await?;
        for physical in &bound {
            self.remove_binding(alias, physical).await?;
        }
        Ok(bound)
    }

    async fn remove_binding(&self, alias: &str, physical: &str) -> Result<()> {
        self.execute(EngineRequest::DeleteAlias {
            index: physical.to_string(),
            alias: alias.to_string(),
        })
        .await?;
        info!(alias, index = physical, "unbound alias");
        Ok(())
    }

    /// Move `alias` to `physical`: bind the new generation first, then drop
    /// every other binding. Readers may briefly see both generations, never
    /// neither. Returns the generations that were unbound.
    pub async fn cutover(&self, alias: &str, physical: &str) -> Result<Vec<String>> {
        self.bind(alias, physical).await?;
        let stale: Vec<String> = self
            .bindings(alias)
            .await?
            .into_iter()
            .filter(|bound| bound != physical)
            .collect();
        for old in &stale {
            self.remove_binding(alias, old).await?;
        }
        info!(alias, index = physical, unbound = stale.len(), "alias cutover complete");
        Ok(stale)
    }
}
