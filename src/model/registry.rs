use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::PgBindError;
use crate::template::{self, CompiledSql};

use super::accessor::FieldAccessors;
use super::resolver::resolve_paths;
use super::Model;

/// Cache of parsed models and their compiled templates.
///
/// Owned by the client; both cache levels follow a check-lock-recheck
/// discipline so concurrent first use of a (model, template) pair does the
/// expensive work exactly once. Failed resolutions and compilations are
/// returned to the caller and never cached.
pub struct ModelRegistry {
    models: RwLock<HashMap<TypeId, Arc<ParsedModel>>>,
}

/// One model's resolved accessors plus its compiled-template cache.
pub(crate) struct ParsedModel {
    pub(crate) accessors: FieldAccessors,
    queries: RwLock<HashMap<String, Arc<CompiledSql>>>,
    #[cfg(test)]
    pub(crate) template_compiles: std::sync::atomic::AtomicUsize,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        ModelRegistry {
            models: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve and cache `M`'s shape. Idempotent; the first caller for a
    /// given model type does the work, later callers observe the cached
    /// result.
    ///
    /// # Errors
    /// Returns resolution failures (which are not cached).
    pub fn register<M: Model>(&self) -> Result<(), PgBindError> {
        self.parsed::<M>().map(|_| ())
    }

    pub(crate) fn parsed<M: Model>(&self) -> Result<Arc<ParsedModel>, PgBindError> {
        let type_id = TypeId::of::<M>();

        if let Some(parsed) = read_lock(&self.models).get(&type_id) {
            return Ok(parsed.clone());
        }

        let mut models = write_lock(&self.models);
        if let Some(parsed) = models.get(&type_id) {
            return Ok(parsed.clone());
        }

        let shape = M::shape();
        let paths = resolve_paths(&shape)?;
        debug!(
            model = std::any::type_name::<M>(),
            fields = paths.len(),
            "registered model"
        );
        let parsed = Arc::new(ParsedModel {
            accessors: FieldAccessors::compile(shape, &paths),
            queries: RwLock::new(HashMap::new()),
            #[cfg(test)]
            template_compiles: std::sync::atomic::AtomicUsize::new(0),
        });
        models.insert(type_id, parsed.clone());
        Ok(parsed)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParsedModel {
    /// Look up or compile the template. Idempotent per template string;
    /// compilation errors are not cached, so a later call may retry.
    pub(crate) fn sql_func(&self, sql: &str) -> Result<Arc<CompiledSql>, PgBindError> {
        if let Some(compiled) = read_lock(&self.queries).get(sql) {
            return Ok(compiled.clone());
        }

        let mut queries = write_lock(&self.queries);
        if let Some(compiled) = queries.get(sql) {
            return Ok(compiled.clone());
        }

        let compiled = Arc::new(template::compile(sql)?);
        #[cfg(test)]
        self.template_compiles
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        debug!(
            placeholders = compiled.bindings().len(),
            "compiled sql template"
        );
        queries.insert(sql.to_string(), compiled.clone());
        Ok(compiled)
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
