//! Fill-missing auto-completion of component element metadata.

use crate::error::Result;
use crate::loader;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::OnceLock;

const BUNDLED_TEMPLATE: &str = include_str!("../defaults/auto_schema.yml");

// ---------------------------------------------------------------------------
// AutoSchemaTemplate
// ---------------------------------------------------------------------------

/// Element-role name → default field mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoSchemaTemplate {
    pub elements: Map<String, Value>,
}

static BUNDLED: OnceLock<AutoSchemaTemplate> = OnceLock::new();

impl AutoSchemaTemplate {
    /// The template compiled into the binary, parsed on first use.
    pub fn bundled() -> &'static AutoSchemaTemplate {
        BUNDLED.get_or_init(|| {
            Self::from_yaml(BUNDLED_TEMPLATE).unwrap_or_else(|e| {
                tracing::error!("bundled auto-schema template is invalid: {e}");
                Self::default()
            })
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let value = loader::parse_yaml(Path::new("auto_schema.yml"), text)?;
        let elements = match value.get("elements") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        Ok(Self { elements })
    }

    pub fn defaults_for(&self, role: &str) -> Option<&Map<String, Value>> {
        self.elements.get(role).and_then(Value::as_object)
    }
}

// ---------------------------------------------------------------------------
// Merge helpers
// ---------------------------------------------------------------------------

/// Copy every key of `defaults` that is absent from `target`. Existing keys
/// are never touched, even when their value is null. Returns the number of
/// keys filled.
pub fn merge_missing(target: &mut Map<String, Value>, defaults: &Map<String, Value>) -> usize {
    let mut filled = 0;
    for (key, value) in defaults {
        if !target.contains_key(key) {
            target.insert(key.clone(), value.clone());
            filled += 1;
        }
    }
    filled
}

/// Unify the two authoring styles of `elements`.
///
/// A sequence of bare names becomes `name → {}`; sequence entries that are
/// single-key mappings are folded in as-is. In a mapping, null entries become
/// `{}`.
pub fn normalize_elements(elements: Value) -> Value {
    match elements {
        Value::Array(entries) => {
            let mut out = Map::new();
            for entry in entries {
                match entry {
                    Value::String(name) => {
                        out.entry(name).or_insert_with(empty_object);
                    }
                    Value::Object(map) => {
                        for (name, value) in map {
                            out.insert(name, null_to_empty(value));
                        }
                    }
                    Value::Null => {}
                    other => {
                        out.entry(scalar_name(&other)).or_insert_with(empty_object);
                    }
                }
            }
            Value::Object(out)
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(name, value)| (name, null_to_empty(value)))
                .collect(),
        ),
        Value::Null => Value::Object(Map::new()),
        other => other,
    }
}

/// Apply the template to a component config (or an `items` sub-schema) in
/// place, recursing into `items`.
pub fn autocomplete(config: &mut Map<String, Value>, template: &AutoSchemaTemplate) {
    if let Some(elements) = config.get_mut("elements") {
        *elements = normalize_elements(std::mem::take(elements));
        if let Value::Object(map) = elements {
            for (role, element) in map.iter_mut() {
                let (Some(defaults), Value::Object(element)) =
                    (template.defaults_for(role), element)
                else {
                    continue;
                };
                merge_missing(element, defaults);
            }
        }
    }

    match config.get_mut("items") {
        Some(Value::Object(items)) => autocomplete(items, template),
        Some(Value::Array(items)) => {
            for item in items.iter_mut() {
                if let Value::Object(item) = item {
                    autocomplete(item, template);
                }
            }
        }
        _ => {}
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn null_to_empty(value: Value) -> Value {
    if value.is_null() {
        empty_object()
    } else {
        value
    }
}

fn scalar_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> AutoSchemaTemplate {
        AutoSchemaTemplate::from_yaml(
            "elements:\n  title:\n    label: Title\n    type: text\n  image:\n    type: image\n    alt: ''\n",
        )
        .unwrap()
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn bundled_template_has_common_roles() {
        let tpl = AutoSchemaTemplate::bundled();
        assert!(tpl.defaults_for("title").is_some());
        assert!(tpl.defaults_for("image").is_some());
        assert!(tpl.defaults_for("nonexistent").is_none());
    }

    #[test]
    fn merge_missing_fills_gaps_only() {
        let mut target = obj(json!({"foo": "explicit", "nullish": null}));
        let defaults = obj(json!({"foo": "default", "nullish": 1, "bar": 2}));
        let filled = merge_missing(&mut target, &defaults);
        assert_eq!(filled, 1);
        assert_eq!(
            Value::Object(target),
            json!({"foo": "explicit", "nullish": null, "bar": 2})
        );
    }

    #[test]
    fn bare_name_sequence_normalizes_to_empty_objects() {
        let normalized = normalize_elements(json!(["title", "image"]));
        assert_eq!(normalized, json!({"title": {}, "image": {}}));
    }

    #[test]
    fn mixed_sequence_and_null_entries_normalize() {
        let normalized = normalize_elements(json!(["title", {"image": {"alt": "x"}}, {"icon": null}]));
        assert_eq!(
            normalized,
            json!({"title": {}, "image": {"alt": "x"}, "icon": {}})
        );
        assert_eq!(
            normalize_elements(json!({"title": null, "body": {"type": "md"}})),
            json!({"title": {}, "body": {"type": "md"}})
        );
    }

    #[test]
    fn autocomplete_fills_known_roles() {
        let mut config = obj(json!({"elements": ["title", "custom"]}));
        autocomplete(&mut config, &template());
        assert_eq!(
            config["elements"],
            json!({"title": {"label": "Title", "type": "text"}, "custom": {}})
        );
    }

    #[test]
    fn autocomplete_never_overwrites_explicit_fields() {
        let mut config = obj(json!({"elements": {"title": {"label": "Headline"}}}));
        autocomplete(&mut config, &template());
        assert_eq!(config["elements"]["title"]["label"], "Headline");
        assert_eq!(config["elements"]["title"]["type"], "text");
    }

    #[test]
    fn autocomplete_is_idempotent() {
        let mut once = obj(json!({
            "elements": ["title", "image"],
            "items": {"elements": {"image": {"alt": "kept"}}},
        }));
        autocomplete(&mut once, &template());
        let mut twice = once.clone();
        autocomplete(&mut twice, &template());
        assert_eq!(once, twice);
    }

    #[test]
    fn autocomplete_recurses_into_items() {
        let mut config = obj(json!({
            "elements": ["title"],
            "items": {
                "elements": ["image"],
                "items": [{"elements": {"title": null}}],
            },
        }));
        autocomplete(&mut config, &template());
        assert_eq!(
            config["items"]["elements"]["image"],
            json!({"type": "image", "alt": ""})
        );
        assert_eq!(
            config["items"]["items"][0]["elements"]["title"],
            json!({"label": "Title", "type": "text"})
        );
    }

    #[test]
    fn config_without_elements_is_untouched() {
        let mut config = obj(json!({"label": "Plain"}));
        autocomplete(&mut config, &template());
        assert_eq!(Value::Object(config), json!({"label": "Plain"}));
    }
}
