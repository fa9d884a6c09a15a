use serde_json::{Map, Value};

use super::{FlatLocale, LocaleTree, MergeStats};

/// Merge `updates` into `base`, recursing where both sides hold objects.
///
/// Keys missing from `updates` are left alone. New keys are appended in
/// update order, existing keys keep their position.
pub fn deep_merge(base: &mut LocaleTree, updates: &LocaleTree) -> MergeStats {
    let mut stats = MergeStats::default();

    for (key, value) in updates {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                stats.absorb(deep_merge(existing, incoming));
            }
            (Some(existing), _) => {
                if *existing == *value {
                    stats.unchanged += leaf_count(value);
                } else {
                    stats.changed += leaf_count(value);
                    *existing = value.clone();
                }
            }
            (None, _) => {
                stats.added += leaf_count(value);
                base.insert(key.clone(), value.clone());
            }
        }
    }

    stats
}

/// `dict.update` semantics: every top-level key of `updates` replaces the base value.
pub fn shallow_merge(base: &mut LocaleTree, updates: &LocaleTree) -> MergeStats {
    let mut stats = MergeStats::default();

    for (key, value) in updates {
        match base.get_mut(key) {
            Some(existing) if *existing == *value => stats.unchanged += leaf_count(value),
            Some(existing) => {
                stats.changed += leaf_count(value);
                *existing = value.clone();
            }
            None => {
                stats.added += leaf_count(value);
                base.insert(key.clone(), value.clone());
            }
        }
    }

    stats
}

/// Number of non-object leaves below (and including) `value`
pub fn leaf_count(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.values().map(leaf_count).sum(),
        _ => 1,
    }
}

/// Flatten a nested document into `parent<sep>child` keys
pub fn flatten(tree: &LocaleTree, sep: &str) -> FlatLocale {
    let mut flat = Map::new();
    flatten_into(tree, "", sep, &mut flat);
    flat
}

fn flatten_into(tree: &LocaleTree, prefix: &str, sep: &str, out: &mut FlatLocale) {
    for (key, value) in tree {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}{}{}", prefix, sep, key)
        };

        match value {
            Value::Object(child) => flatten_into(child, &full_key, sep, out),
            other => {
                out.insert(full_key, other.clone());
            }
        }
    }
}

/// Rebuild a nested document from flattened keys. Later keys win.
pub fn unflatten(flat: &FlatLocale, sep: &str) -> LocaleTree {
    let mut tree = Map::new();
    for (key, value) in flat {
        let parts: Vec<&str> = key.split(sep).collect();
        set_parts(&mut tree, &parts, value.clone());
    }
    tree
}

/// Insert `value` at a dotted path, creating intermediate objects
pub fn set_path(tree: &mut LocaleTree, dotted: &str, value: Value) {
    let parts: Vec<&str> = dotted.split('.').collect();
    set_parts(tree, &parts, value);
}

fn set_parts(tree: &mut LocaleTree, parts: &[&str], value: Value) {
    let Some((last, parents)) = parts.split_last() else {
        return;
    };

    let mut node = tree;
    for part in parents {
        let entry = node
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(map) = entry else { return };
        node = map;
    }

    node.insert(last.to_string(), value);
}

/// Resolve a dotted key such as `alerts.error`
pub fn lookup<'a>(tree: &'a LocaleTree, dotted: &str) -> Option<&'a Value> {
    let mut parts = dotted.split('.');
    let mut current = tree.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

pub fn contains_key(tree: &LocaleTree, dotted: &str) -> bool {
    lookup(tree, dotted).is_some()
}

/// Number of string leaves
pub fn count_strings(tree: &LocaleTree) -> usize {
    tree.values()
        .map(|value| match value {
            Value::Object(child) => count_strings(child),
            Value::String(_) => 1,
            _ => 0,
        })
        .sum()
}

/// Source strings whose counterpart exists in `target` and differs from the source
pub fn count_translated(source: &LocaleTree, target: &LocaleTree) -> usize {
    let mut translated = 0;
    for (key, value) in source {
        match value {
            Value::Object(child) => {
                if let Some(Value::Object(target_child)) = target.get(key) {
                    translated += count_translated(child, target_child);
                }
            }
            Value::String(text) => {
                if let Some(Value::String(target_text)) = target.get(key) {
                    if target_text != text {
                        translated += 1;
                    }
                }
            }
            _ => {}
        }
    }
    translated
}

/// String leaves starting with `marker`
pub fn count_pending(tree: &LocaleTree, marker: &str) -> usize {
    tree.values()
        .map(|value| match value {
            Value::Object(child) => count_pending(child, marker),
            Value::String(text) if text.starts_with(marker) => 1,
            _ => 0,
        })
        .sum()
}

/// Copy of `tree` with every string leaf passed through `f`
pub fn map_strings<F>(tree: &LocaleTree, f: &mut F) -> LocaleTree
where
    F: FnMut(&str) -> String,
{
    tree.iter()
        .map(|(key, value)| {
            let mapped = match value {
                Value::Object(child) => Value::Object(map_strings(child, f)),
                Value::String(text) => Value::String(f(text)),
                other => other.clone(),
            };
            (key.clone(), mapped)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> LocaleTree {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fixture must be an object"),
        }
    }

    #[test]
    fn deep_merge_recurses_and_keeps_siblings() {
        let mut base = tree(json!({
            "alerts": { "error": "Error", "success": "Éxito" },
            "common": { "save": "Guardar" }
        }));
        let updates = tree(json!({
            "alerts": { "multiples_dispositivos": "Múltiples Dispositivos", "error": "Error" }
        }));

        let stats = deep_merge(&mut base, &updates);

        assert_eq!(stats, MergeStats { added: 1, changed: 0, unchanged: 1 });
        assert_eq!(base["alerts"]["success"], "Éxito");
        assert_eq!(base["alerts"]["multiples_dispositivos"], "Múltiples Dispositivos");
        assert_eq!(base["common"]["save"], "Guardar");
        let keys: Vec<_> = base["alerts"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["error", "success", "multiples_dispositivos"]);
    }

    #[test]
    fn deep_merge_replaces_scalar_with_object() {
        let mut base = tree(json!({ "profiles": "legacy" }));
        let updates = tree(json!({ "profiles": { "unknown": "Desconocido" } }));

        let stats = deep_merge(&mut base, &updates);

        assert_eq!(stats.changed, 1);
        assert_eq!(base["profiles"]["unknown"], "Desconocido");
    }

    #[test]
    fn shallow_merge_replaces_whole_sections() {
        let mut base = tree(json!({ "fec": { "old": "x", "carplay_name": "CarPlay" } }));
        let updates = tree(json!({ "fec": { "carplay_name": "Apple CarPlay" } }));

        let stats = shallow_merge(&mut base, &updates);

        assert_eq!(stats.changed, 1);
        assert!(base["fec"].get("old").is_none());
    }

    #[test]
    fn flatten_and_unflatten_preserve_structure() {
        let source = tree(json!({
            "tabs": { "home": "Inicio", "nested": { "deep": "Profundo" } },
            "count": 3
        }));

        let flat = flatten(&source, ".");
        let keys: Vec<_> = flat.keys().cloned().collect();
        assert_eq!(keys, vec!["tabs.home", "tabs.nested.deep", "count"]);

        assert_eq!(unflatten(&flat, "."), source);
    }

    #[test]
    fn unflatten_promotes_scalars_to_objects() {
        let mut flat = Map::new();
        flat.insert("a".into(), json!("scalar"));
        flat.insert("a.b".into(), json!("leaf"));

        let nested = unflatten(&flat, ".");
        assert_eq!(Value::Object(nested), json!({ "a": { "b": "leaf" } }));
    }

    #[test]
    fn lookup_resolves_dotted_keys() {
        let doc = tree(json!({ "alerts": { "error": "Error" }, "title": "MIB2" }));

        assert_eq!(lookup(&doc, "alerts.error"), Some(&json!("Error")));
        assert!(contains_key(&doc, "title"));
        assert!(!contains_key(&doc, "title.sub"));
        assert!(!contains_key(&doc, "alerts.missing"));
    }

    #[test]
    fn translation_counters() {
        let es = tree(json!({ "a": "Hola", "b": { "c": "Guardar", "d": "USB" }, "n": 1 }));
        let en = tree(json!({ "a": "Hello", "b": { "c": "[TODO: Guardar]", "d": "USB" } }));

        assert_eq!(count_strings(&es), 3);
        assert_eq!(count_translated(&es, &en), 2);
        assert_eq!(count_pending(&en, "[TODO:"), 1);
    }

    #[test]
    fn map_strings_leaves_other_values() {
        let doc = tree(json!({ "a": "x", "b": { "c": "y" }, "n": 2 }));
        let upper = map_strings(&doc, &mut |s: &str| s.to_uppercase());
        assert_eq!(Value::Object(upper), json!({ "a": "X", "b": { "c": "Y" }, "n": 2 }));
    }
}
