//! JSON canónico mínimo: claves de objeto ordenadas, sin espacios.
//! Dos payloads semánticamente iguales producen el mismo texto y, por tanto,
//! el mismo `ArtifactRef`.

use serde_json::Value;
use std::collections::BTreeMap;

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let tree: BTreeMap<&String, String> = map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            let items: Vec<String> = tree.into_iter()
                                         .map(|(k, v)| format!("{}:{}", quote(k), v))
                                         .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

// `Display` de `Value` no puede fallar y aplica el escapado JSON estándar.
fn quote(s: &str) -> String {
    Value::String(s.to_owned()).to_string()
}
