//! # Connection Resolution
//!
//! Resolves named connections (connection strings, endpoints, secrets) for a
//! backend. Lookup is delegated to a `ConnectionSource`; successful lookups are
//! cached for the lifetime of the resolver, which lives as long as the host
//! instance that owns it.
//!
//! The same sources back `%name%` setting references in option values, e.g.
//! `hub_name = "%OrdersHubName%"`. `%%` is a literal percent sign.

use crate::backend::{BackendKind, RawOptions};
use crate::error::{BootstrapError, BootstrapResult};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Raw lookup of a connection value by name
pub trait ConnectionSource: Send + Sync {
    fn lookup(&self, name: &str) -> Option<String>;

    /// Source name for logging
    fn source_name(&self) -> &'static str;
}

/// Looks connections up in process environment variables.
///
/// Tries the name itself, then `ConnectionStrings__<name>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvironmentConnectionSource;

impl ConnectionSource for EnvironmentConnectionSource {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name)
            .or_else(|_| std::env::var(format!("ConnectionStrings__{name}")))
            .ok()
    }

    fn source_name(&self) -> &'static str {
        "environment"
    }
}

/// Fixed name → value map, typically the `connections` config section.
///
/// Exact names win; otherwise names match case-insensitively, since
/// configuration keys may arrive lowercased.
#[derive(Debug, Default, Clone)]
pub struct StaticConnectionSource {
    values: HashMap<String, String>,
}

impl StaticConnectionSource {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl ConnectionSource for StaticConnectionSource {
    fn lookup(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned().or_else(|| {
            self.values
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.clone())
        })
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// Sources consulted in order; the first hit wins
pub struct ChainedConnectionSource {
    sources: Vec<Arc<dyn ConnectionSource>>,
}

impl ChainedConnectionSource {
    pub fn new(sources: Vec<Arc<dyn ConnectionSource>>) -> Self {
        Self { sources }
    }
}

impl ConnectionSource for ChainedConnectionSource {
    fn lookup(&self, name: &str) -> Option<String> {
        self.sources.iter().find_map(|source| source.lookup(name))
    }

    fn source_name(&self) -> &'static str {
        "chained"
    }
}

/// A connection name with its resolved value
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    name: String,
    value: String,
}

impl ConnectionDescriptor {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved secret; never log this
    pub fn value(&self) -> &str {
        &self.value
    }
}

// Secret values stay out of Debug output.
impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Whether a missing connection is an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

/// Caching resolver owned by one host instance
pub struct ConnectionResolver {
    source: Arc<dyn ConnectionSource>,
    cache: DashMap<String, ConnectionDescriptor>,
}

impl ConnectionResolver {
    pub fn new(source: Arc<dyn ConnectionSource>) -> Self {
        Self {
            source,
            cache: DashMap::new(),
        }
    }

    pub fn from_environment() -> Self {
        Self::new(Arc::new(EnvironmentConnectionSource))
    }

    /// Resolve `name` on behalf of `backend`.
    ///
    /// Empty values count as absent. Only successful lookups are cached.
    pub fn resolve(
        &self,
        name: &str,
        requirement: Requirement,
        backend: BackendKind,
    ) -> BootstrapResult<Option<ConnectionDescriptor>> {
        if let Some(hit) = self.cache.get(name) {
            debug!(connection = %name, backend = %backend, "Connection cache hit");
            return Ok(Some(hit.clone()));
        }

        match self.source.lookup(name).filter(|value| !value.trim().is_empty()) {
            Some(value) => {
                debug!(
                    connection = %name,
                    backend = %backend,
                    source = self.source.source_name(),
                    "Connection resolved"
                );
                let descriptor = self
                    .cache
                    .entry(name.to_string())
                    .or_insert_with(|| ConnectionDescriptor::new(name, value))
                    .clone();
                Ok(Some(descriptor))
            }
            None if requirement == Requirement::Required => {
                Err(BootstrapError::missing_connection(backend, name))
            }
            None => Ok(None),
        }
    }

    /// Resolve a connection that must exist
    pub fn require(&self, name: &str, backend: BackendKind) -> BootstrapResult<ConnectionDescriptor> {
        self.resolve(name, Requirement::Required, backend)?
            .ok_or_else(|| BootstrapError::missing_connection(backend, name))
    }

    /// Drop a cached entry so the next resolve consults the source again
    pub(crate) fn invalidate(&self, name: &str) {
        self.cache.remove(name);
    }

    pub fn cached_connections(&self) -> usize {
        self.cache.len()
    }

    /// Replace `%name%` references in every string option with the named
    /// setting. Settings are read straight from the source, never cached.
    pub fn expand_setting_references(
        &self,
        options: &mut RawOptions,
        backend: BackendKind,
    ) -> BootstrapResult<()> {
        self.expand_object(options, None, backend)
    }

    fn expand_object(
        &self,
        options: &mut RawOptions,
        parent: Option<&str>,
        backend: BackendKind,
    ) -> BootstrapResult<()> {
        for (key, value) in options.iter_mut() {
            let field = match parent {
                Some(parent) => format!("{parent}.{key}"),
                None => key.clone(),
            };
            match value {
                Value::String(text) if text.contains('%') => {
                    *text = self.expand_setting(text, &field, backend)?;
                }
                Value::Object(nested) => self.expand_object(nested, Some(&field), backend)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn expand_setting(
        &self,
        text: &str,
        field: &str,
        backend: BackendKind,
    ) -> BootstrapResult<String> {
        let mut expanded = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find('%') {
            expanded.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('%') else {
                expanded.push_str(&rest[start..]);
                return Ok(expanded);
            };
            let name = &after[..end];
            if name.is_empty() {
                expanded.push('%');
            } else {
                let setting = self
                    .source
                    .lookup(name)
                    .filter(|value| !value.trim().is_empty())
                    .ok_or_else(|| {
                        BootstrapError::invalid_configuration(
                            backend,
                            field,
                            format!("references setting `{name}`, which is not defined"),
                        )
                    })?;
                debug!(setting = %name, field, backend = %backend, "Setting reference expanded");
                expanded.push_str(&setting);
            }
            rest = &after[end + 1..];
        }
        expanded.push_str(rest);
        Ok(expanded)
    }
}

impl fmt::Debug for ConnectionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionResolver")
            .field("source", &self.source.source_name())
            .field("cached", &self.cache.len())
            .finish()
    }
}
