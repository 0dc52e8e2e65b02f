//! # Options Binder
//!
//! Binds raw key/value configuration into one strongly-typed options value.
//! Absent fields take the backend's declared defaults. Keys the backend does
//! not declare are rejected. Binding is pure.

use super::options::{
    BackendOptions, CloudStoreOptions, EmulatorOptions, KeyValueStoreOptions, OrchestrationOptions,
};
use super::BackendKind;
use crate::error::{BootstrapError, BootstrapResult};
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;

/// Key naming the backend inside a raw `storage_provider` section
pub const BACKEND_TYPE_KEY: &str = "type";

/// Raw configuration as it arrives from the configuration system
pub type RawOptions = Map<String, Value>;

/// Binds raw configuration for one backend
pub trait OptionsBinder: Send + Sync {
    fn backend_kind(&self) -> BackendKind;

    /// Options synthesized with no external configuration at all
    fn default_options(&self) -> OrchestrationOptions;

    /// Bind and validate raw configuration
    fn bind(&self, raw: &RawOptions) -> BootstrapResult<OrchestrationOptions>;
}

/// Serde-backed binder for one `BackendOptions` type
pub struct TypedOptionsBinder<T> {
    _options: PhantomData<fn() -> T>,
}

impl<T> TypedOptionsBinder<T> {
    pub fn new() -> Self {
        Self {
            _options: PhantomData,
        }
    }
}

impl<T> Default for TypedOptionsBinder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: BackendOptions> OptionsBinder for TypedOptionsBinder<T> {
    fn backend_kind(&self) -> BackendKind {
        T::KIND
    }

    fn default_options(&self) -> OrchestrationOptions {
        T::default().into()
    }

    fn bind(&self, raw: &RawOptions) -> BootstrapResult<OrchestrationOptions> {
        let mut fields = raw.clone();
        if let Some(declared) = fields.remove(BACKEND_TYPE_KEY) {
            let declared = declared.as_str().unwrap_or_default().to_string();
            if BackendKind::parse(&declared) != Some(T::KIND) {
                return Err(BootstrapError::mismatched_backend(declared, T::KIND));
            }
        }

        reject_unknown_keys::<T>(&fields)?;

        let options: T = serde_json::from_value(Value::Object(fields)).map_err(|e| {
            BootstrapError::invalid_configuration(T::KIND, "storage_provider", e.to_string())
        })?;
        options.validate()?;
        Ok(options.into())
    }
}

/// Fail on the first key `T` does not declare, nested records included
fn reject_unknown_keys<T: BackendOptions>(fields: &RawOptions) -> BootstrapResult<()> {
    let declared = serde_json::to_value(T::default()).map_err(|e| {
        BootstrapError::Configuration(format!("{} has no field set: {e}", T::TYPE_NAME))
    })?;
    match declared {
        Value::Object(declared) => check_keys(T::KIND, None, fields, &declared),
        _ => Ok(()),
    }
}

fn check_keys(
    kind: BackendKind,
    parent: Option<&str>,
    fields: &RawOptions,
    declared: &Map<String, Value>,
) -> BootstrapResult<()> {
    for (key, value) in fields {
        let path = match parent {
            Some(parent) => format!("{parent}.{key}"),
            None => key.clone(),
        };
        match (declared.get(key), value) {
            (None, _) => {
                return Err(BootstrapError::invalid_configuration(
                    kind,
                    path,
                    format!("is not an option of the {kind} backend"),
                ));
            }
            (Some(Value::Object(nested)), Value::Object(value)) => {
                check_keys(kind, Some(&path), value, nested)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Binder for `kind`
pub fn binder_for(kind: BackendKind) -> Arc<dyn OptionsBinder> {
    match kind {
        BackendKind::CloudStore => Arc::new(TypedOptionsBinder::<CloudStoreOptions>::new()),
        BackendKind::KeyValueStore => Arc::new(TypedOptionsBinder::<KeyValueStoreOptions>::new()),
        BackendKind::Emulator => Arc::new(TypedOptionsBinder::<EmulatorOptions>::new()),
    }
}

/// Backend named by the raw `type` key.
///
/// A missing key is a configuration error; an unrecognised value is an
/// unsupported backend naming that value.
pub fn backend_kind_of(raw: &RawOptions) -> BootstrapResult<BackendKind> {
    let Some(value) = raw.get(BACKEND_TYPE_KEY) else {
        return Err(BootstrapError::Configuration(format!(
            "storage_provider.{BACKEND_TYPE_KEY} is required to select a backend"
        )));
    };
    let declared = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    BackendKind::parse(&declared).ok_or_else(|| BootstrapError::unsupported_backend(declared))
}

/// Select the backend from raw configuration and bind its options
pub fn bind_raw(raw: &RawOptions) -> BootstrapResult<OrchestrationOptions> {
    let kind = backend_kind_of(raw)?;
    binder_for(kind).bind(raw)
}
