//! Sample request bodies for a feature schema.
//!
//! Every feature gets a numeric placeholder; categorical features need their
//! placeholder replaced with a real category before the sample is sent.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

use crate::errors::{ServeError, ServeResult};
use crate::feature_schema::FeatureSchema;

pub const SINGLE_PAYLOAD_FILE: &str = "sample_single_payload.json";
pub const BATCH_PAYLOAD_FILE: &str = "sample_batch_payload.json";

fn placeholder_row(schema: &FeatureSchema, fill: i64) -> Map<String, Value> {
    schema
        .names()
        .iter()
        .map(|name| (name.clone(), Value::from(fill)))
        .collect()
}

/// `{"features": {name: 0, ...}}`
pub fn build_single_payload(schema: &FeatureSchema) -> Value {
    json!({ "features": placeholder_row(schema, 0) })
}

/// `{"instances": [{name: 0, ...}, {name: 1, ...}]}`
pub fn build_batch_payload(schema: &FeatureSchema) -> Value {
    json!({ "instances": [placeholder_row(schema, 0), placeholder_row(schema, 1)] })
}

/// Write both samples into `out_dir`, returning their paths.
pub fn write_payloads(schema: &FeatureSchema, out_dir: &Path) -> ServeResult<(PathBuf, PathBuf)> {
    let single = out_dir.join(SINGLE_PAYLOAD_FILE);
    let batch = out_dir.join(BATCH_PAYLOAD_FILE);

    for (path, payload) in [
        (&single, build_single_payload(schema)),
        (&batch, build_batch_payload(schema)),
    ] {
        let text = serde_json::to_string_pretty(&payload)
            .map_err(|e| ServeError::serialization(format!("rendering {}", path.display()), e))?;
        std::fs::write(path, text + "\n")
            .map_err(|e| ServeError::io(format!("writing {}", path.display()), e))?;
    }

    Ok((single, batch))
}
