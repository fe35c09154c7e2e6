use std::collections::{BTreeMap, HashMap};

use super::value::RawValue;

/// Any request-parameter bag the validator can read from (query, form body,
/// headers, cookies, decoded JSON)
pub trait InputSource {
    fn get(&self, field: &str) -> Option<RawValue>;
}

impl InputSource for HashMap<String, String> {
    fn get(&self, field: &str) -> Option<RawValue> {
        HashMap::get(self, field).map(|v| RawValue::Text(v.clone()))
    }
}

impl InputSource for BTreeMap<String, String> {
    fn get(&self, field: &str) -> Option<RawValue> {
        BTreeMap::get(self, field).map(|v| RawValue::Text(v.clone()))
    }
}

impl InputSource for HashMap<String, RawValue> {
    fn get(&self, field: &str) -> Option<RawValue> {
        HashMap::get(self, field).cloned()
    }
}

impl InputSource for serde_json::Map<String, serde_json::Value> {
    fn get(&self, field: &str) -> Option<RawValue> {
        serde_json::Map::get(self, field).cloned().map(RawValue::from)
    }
}

/// Top-level object lookup; any other JSON shape has no fields
impl InputSource for serde_json::Value {
    fn get(&self, field: &str) -> Option<RawValue> {
        self.as_object()
            .and_then(|map| map.get(field))
            .cloned()
            .map(RawValue::from)
    }
}

impl<S: InputSource + ?Sized> InputSource for &S {
    fn get(&self, field: &str) -> Option<RawValue> {
        (**self).get(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_sources() {
        let mut query = HashMap::new();
        query.insert("page".to_string(), "2".to_string());
        assert_eq!(InputSource::get(&query, "page"), Some(RawValue::from("2")));
        assert_eq!(InputSource::get(&query, "missing"), None);
    }

    #[test]
    fn test_json_source() {
        let body = json!({"tags": ["a", "b"], "n": 3});
        assert_eq!(
            InputSource::get(&body, "tags"),
            Some(RawValue::List(vec!["a".into(), "b".into()]))
        );
        assert_eq!(InputSource::get(&body, "n"), Some(RawValue::Int(3)));
        assert_eq!(InputSource::get(&json!([1, 2]), "n"), None);
    }
}
