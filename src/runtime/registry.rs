//! Backend registry and active-backend selection

use super::{Backend, BackendId};
use crate::dtype::{PromotionMode, PromotionTable};
use crate::error::{Error, Result};
use crate::value::Value;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

/// Environment variable naming the backend selected at startup
pub const BACKEND_ENV: &str = "POLYARR_BACKEND";
/// Environment variable naming the promotion rule set
pub const PROMOTION_ENV: &str = "POLYARR_PROMOTION";

/// Settings applied when a [`Registry`] is built
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Backend selected immediately, if any
    pub default_backend: Option<BackendId>,
    /// Promotion rule set used by every dispatch
    pub promotion: PromotionMode,
}

impl RegistryConfig {
    /// Default configuration: no backend preselected, extended promotion
    pub fn new() -> Self {
        Self::default()
    }

    /// Preselect a backend
    pub fn with_default_backend(mut self, backend: BackendId) -> Self {
        self.default_backend = Some(backend);
        self
    }

    /// Choose the promotion rule set
    pub fn with_promotion(mut self, promotion: PromotionMode) -> Self {
        self.promotion = promotion;
        self
    }

    /// Read [`BACKEND_ENV`] and [`PROMOTION_ENV`] from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`RegistryConfig::from_env`] with a custom variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(name) = lookup(BACKEND_ENV).filter(|v| !v.trim().is_empty()) {
            let backend = name.parse().map_err(|_| Error::InvalidConfig {
                key: BACKEND_ENV,
                reason: format!("unknown backend '{name}'"),
            })?;
            config.default_backend = Some(backend);
        }
        if let Some(mode) = lookup(PROMOTION_ENV).filter(|v| !v.trim().is_empty()) {
            config.promotion = mode.parse().map_err(|_| Error::InvalidConfig {
                key: PROMOTION_ENV,
                reason: format!("unknown promotion mode '{mode}'"),
            })?;
        }
        Ok(config)
    }
}

/// The set of available backends plus a stack of active selections
///
/// Every dispatch reads the active backend through
/// [`Registry::active_backend`]. Selections push onto a stack so a scoped
/// switch ([`Registry::with_backend`]) restores whatever was active before.
/// Arrays are never converted on a switch; using one from a backend that is no
/// longer active fails with [`Error::StaleArray`].
#[derive(Debug)]
pub struct Registry {
    backends: IndexMap<BackendId, Arc<dyn Backend>>,
    stack: RwLock<Vec<BackendId>>,
    promotion: PromotionMode,
}

impl Registry {
    /// Registry with every compiled-in backend and nothing selected
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(super::cpu::CpuBackend::new()));
        #[cfg(feature = "columnar")]
        registry.register(Arc::new(super::columnar::ColumnarBackend::new()));
        registry
    }

    /// Registry with no backends at all
    pub fn empty() -> Self {
        Self {
            backends: IndexMap::new(),
            stack: RwLock::new(Vec::new()),
            promotion: PromotionMode::default(),
        }
    }

    /// Build from a configuration, selecting its default backend if set
    pub fn with_config(config: &RegistryConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.promotion = config.promotion;
        if let Some(id) = config.default_backend {
            registry.set_backend(id)?;
        }
        log::debug!(
            "registry built: backends {:?}, promotion {}, active {:?}",
            registry.available(),
            registry.promotion,
            registry.active_id()
        );
        Ok(registry)
    }

    /// Add or replace a backend
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        self.backends.insert(backend.id(), backend);
    }

    /// Registered backend ids, in registration order
    pub fn available(&self) -> Vec<BackendId> {
        self.backends.keys().copied().collect()
    }

    /// A registered backend
    pub fn backend(&self, id: BackendId) -> Result<Arc<dyn Backend>> {
        self.backends
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::UnknownBackend(id.to_string()))
    }

    /// Make `id` the active backend
    pub fn set_backend(&self, id: BackendId) -> Result<()> {
        self.backend(id)?;
        let mut stack = self.stack.write();
        log::debug!("backend set: {:?} -> {id}", stack.last());
        stack.push(id);
        Ok(())
    }

    /// Make the backend registered under `name` active
    pub fn set_backend_name(&self, name: &str) -> Result<()> {
        self.set_backend(name.parse()?)
    }

    /// Drop the most recent selection, returning it
    pub fn unset_backend(&self) -> Option<BackendId> {
        let mut stack = self.stack.write();
        let popped = stack.pop();
        log::debug!("backend unset: {popped:?} -> {:?}", stack.last());
        popped
    }

    /// Drop every selection
    pub fn clear(&self) {
        self.stack.write().clear();
        log::debug!("backend selection cleared");
    }

    /// Id of the active backend
    pub fn active_id(&self) -> Option<BackendId> {
        self.stack.read().last().copied()
    }

    /// The active backend
    pub fn active_backend(&self) -> Option<Arc<dyn Backend>> {
        self.active_id().and_then(|id| self.backends.get(&id).cloned())
    }

    /// Run `f` with `id` active, then restore the previous selection
    pub fn with_backend<R>(&self, id: BackendId, f: impl FnOnce(&Self) -> R) -> Result<R> {
        self.backend(id)?;
        let previous = {
            let mut stack = self.stack.write();
            let previous = stack.clone();
            stack.push(id);
            previous
        };

        struct Restore<'a> {
            stack: &'a RwLock<Vec<BackendId>>,
            previous: Vec<BackendId>,
        }
        impl Drop for Restore<'_> {
            fn drop(&mut self) {
                *self.stack.write() = std::mem::take(&mut self.previous);
            }
        }
        let _restore = Restore {
            stack: &self.stack,
            previous,
        };
        Ok(f(self))
    }

    /// Promotion rule set of this registry
    pub fn promotion(&self) -> PromotionMode {
        self.promotion
    }

    /// Promotion table for this registry's rule set
    pub fn promotion_table(&self) -> &'static PromotionTable {
        PromotionTable::for_mode(self.promotion)
    }

    /// Backend that must run a call over `values`.
    ///
    /// The active backend, unless every array among the arguments is a raw
    /// native tensor of one other registered backend. Unified arrays from an
    /// inactive backend are stale; arguments from two backends are ambiguous.
    pub fn resolve_backend_for(&self, op: &'static str, values: &[&Value]) -> Result<Arc<dyn Backend>> {
        let active = self.active_backend().ok_or(Error::NoBackendSelected { op })?;

        let mut origin: Option<Origin> = None;
        for value in values {
            collect_origin(value, &mut origin)?;
        }

        match origin {
            Some(o) if o.backend != active.id() => {
                if o.has_unified {
                    Err(Error::StaleArray {
                        array: o.backend,
                        active: active.id(),
                    })
                } else {
                    self.backend(o.backend)
                }
            }
            _ => Ok(active),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone)]
struct Origin {
    backend: BackendId,
    has_unified: bool,
}

fn note_origin(backend: BackendId, unified: bool, origin: &mut Option<Origin>) -> Result<()> {
    match origin {
        None => {
            *origin = Some(Origin {
                backend,
                has_unified: unified,
            });
            Ok(())
        }
        Some(o) if o.backend == backend => {
            o.has_unified |= unified;
            Ok(())
        }
        Some(o) => Err(Error::AmbiguousBackend {
            first: o.backend,
            second: backend,
        }),
    }
}

fn collect_origin(value: &Value, origin: &mut Option<Origin>) -> Result<()> {
    match value {
        Value::Array(a) => note_origin(a.backend(), true, origin),
        Value::Native(n) => note_origin(n.backend(), false, origin),
        Value::Seq(items) => items.iter().try_for_each(|v| collect_origin(v, origin)),
        Value::Map(map) => map.values().try_for_each(|v| collect_origin(v, origin)),
        Value::Record(r) => r.fields.iter().try_for_each(|(_, v)| collect_origin(v, origin)),
        Value::Container(c) => c.iter().try_for_each(|(_, v)| collect_origin(v, origin)),
        Value::None | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) => Ok(()),
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Process-wide registry.
///
/// Built on first use from [`RegistryConfig::from_env`]; an invalid
/// environment is logged and ignored. Selects the configured backend, or the
/// first available one.
pub fn registry() -> &'static Registry {
    GLOBAL.get_or_init(|| {
        let config = RegistryConfig::from_env().unwrap_or_else(|e| {
            log::warn!("ignoring environment configuration: {e}");
            RegistryConfig::default()
        });
        let registry = Registry::with_config(&config).unwrap_or_else(|e| {
            log::warn!("ignoring default backend: {e}");
            Registry::new()
        });
        if registry.active_id().is_none() {
            if let Some(&first) = registry.backends.keys().next() {
                let _ = registry.set_backend(first);
            }
        }
        registry
    })
}
