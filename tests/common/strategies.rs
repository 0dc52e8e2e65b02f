//! Proptest strategies for raw backend configuration.

use durable_bootstrap::RawOptions;
use proptest::prelude::*;
use serde_json::{json, Value};

/// Hub names the cloud store accepts
pub fn hub_name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9]{2,30}"
}

fn common_fields() -> impl Strategy<Value = Vec<(String, Value)>> {
    (
        proptest::option::of(hub_name_strategy()),
        proptest::option::of(1u32..64),
        proptest::option::of(1u32..10),
    )
        .prop_map(|(hub, activities, attempts)| {
            let mut fields = Vec::new();
            if let Some(hub) = hub {
                fields.push(("hub_name".to_string(), json!(hub)));
            }
            if let Some(activities) = activities {
                fields.push((
                    "max_concurrent_activity_functions".to_string(),
                    json!(activities),
                ));
            }
            if let Some(attempts) = attempts {
                fields.push(("retry".to_string(), json!({ "max_attempts": attempts })));
            }
            fields
        })
}

/// Partial cloud store configuration, any subset of fields present
pub fn cloud_store_raw_strategy() -> impl Strategy<Value = RawOptions> {
    (
        common_fields(),
        proptest::option::of(1i32..=16),
        proptest::option::of(1u32..=32),
        proptest::option::of(any::<bool>()),
    )
        .prop_map(|(common, partitions, batch, lease)| {
            let mut raw = RawOptions::new();
            raw.insert("type".into(), json!("cloud_store"));
            raw.extend(common);
            if let Some(partitions) = partitions {
                raw.insert("partition_count".into(), json!(partitions));
            }
            if let Some(batch) = batch {
                raw.insert("control_queue_batch_size".into(), json!(batch));
            }
            if let Some(lease) = lease {
                raw.insert("use_app_lease".into(), json!(lease));
            }
            raw
        })
}

/// Partial key-value store configuration
pub fn key_value_raw_strategy() -> impl Strategy<Value = RawOptions> {
    (
        common_fields(),
        proptest::option::of(0i32..=15),
        proptest::option::of("[a-z]{1,12}"),
    )
        .prop_map(|(common, database, prefix)| {
            let mut raw = RawOptions::new();
            raw.insert("type".into(), json!("key_value_store"));
            raw.extend(common);
            if let Some(database) = database {
                raw.insert("database".into(), json!(database));
            }
            if let Some(prefix) = prefix {
                raw.insert("key_prefix".into(), json!(prefix));
            }
            raw
        })
}

/// Partial emulator configuration
pub fn emulator_raw_strategy() -> impl Strategy<Value = RawOptions> {
    (common_fields(), proptest::option::of(1usize..10_000)).prop_map(|(common, max)| {
        let mut raw = RawOptions::new();
        raw.insert("type".into(), json!("emulator"));
        raw.extend(common);
        if let Some(max) = max {
            raw.insert("max_orchestration_instances".into(), json!(max));
        }
        raw
    })
}

/// Valid partial configuration for any backend
pub fn raw_options_strategy() -> impl Strategy<Value = RawOptions> {
    prop_oneof![
        cloud_store_raw_strategy(),
        key_value_raw_strategy(),
        emulator_raw_strategy(),
    ]
}

/// Backend type names that are not recognised
pub fn unknown_type_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z]{1,16}".prop_filter("must not name a known backend", |name| {
        durable_bootstrap::BackendKind::parse(name).is_none()
    })
}
