/// Strip human-prose fields from a JSON Schema, keeping structural/type
/// constraints. Used by `tools/list` minification (spec §4.5).
pub fn minify_schema(schema: &serde_json::Value) -> serde_json::Value {
    const PROSE_FIELDS: &[&str] = &["description", "title", "examples", "$schema", "default", "additionalProperties"];

    match schema {
        serde_json::Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                if PROSE_FIELDS.contains(&k.as_str()) {
                    continue;
                }
                out.insert(k.clone(), minify_schema(v));
            }
            serde_json::Value::Object(out)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(minify_schema).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minify_drops_prose_fields_but_keeps_structure() {
        let schema = serde_json::json!({
            "type": "object",
            "title": "Search params",
            "description": "What to search for",
            "properties": {
                "query": { "type": "string", "description": "the query" }
            },
            "required": ["query"],
            "additionalProperties": false
        });
        let minified = minify_schema(&schema);
        assert_eq!(minified["type"], "object");
        assert!(minified.get("title").is_none());
        assert!(minified.get("description").is_none());
        assert!(minified.get("additionalProperties").is_none());
        assert_eq!(minified["properties"]["query"]["type"], "string");
        assert!(minified["properties"]["query"].get("description").is_none());
        assert_eq!(minified["required"][0], "query");
    }
}
