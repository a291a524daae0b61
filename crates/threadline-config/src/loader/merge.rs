//! JSON merge helpers for layered configuration.

use serde_json::{Map, Value};

/// Recursively overlay `top` onto `base`; objects merge, everything else
/// replaces.
pub(super) fn overlay(base: &mut Value, top: &Value) {
    if let (Value::Object(base_map), Value::Object(top_map)) = (&mut *base, top) {
        for (key, value) in top_map {
            match base_map.get_mut(key) {
                Some(slot) => overlay(slot, value),
                None => {
                    base_map.insert(key.clone(), value.clone());
                }
            }
        }
        return;
    }
    *base = top.clone();
}

/// Overlay `top` onto `base`, leaving every leaf present in `constraints`
/// untouched.
pub(super) fn overlay_constrained(base: &mut Value, top: &Value, constraints: Option<&Value>) {
    let Some(constraints) = constraints else {
        overlay(base, top);
        return;
    };
    let (Value::Object(base_map), Value::Object(top_map), Value::Object(locked)) =
        (&mut *base, top, constraints)
    else {
        // A non-object constraint locks the whole subtree.
        return;
    };
    for (key, value) in top_map {
        match locked.get(key) {
            None => match base_map.get_mut(key) {
                Some(slot) => overlay(slot, value),
                None => {
                    base_map.insert(key.clone(), value.clone());
                }
            },
            Some(nested @ Value::Object(_)) => {
                let slot = base_map
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                overlay_constrained(slot, value, Some(nested));
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn overlay_merges_nested_objects() {
        let mut base = json!({
            "migration": { "page_size": 10 },
            "completion": { "success_message": "ok" }
        });
        overlay(&mut base, &json!({ "migration": { "page_size": 20 } }));
        assert_eq!(
            base,
            json!({
                "migration": { "page_size": 20 },
                "completion": { "success_message": "ok" }
            })
        );
    }

    #[test]
    fn constrained_leaf_is_not_overridden() {
        let constraints = json!({ "completion": { "max_continuation_steps": 1 } });
        let mut base = constraints.clone();
        overlay_constrained(
            &mut base,
            &json!({ "completion": { "max_continuation_steps": 5, "success_message": "ok" } }),
            Some(&constraints),
        );
        assert_eq!(
            base,
            json!({ "completion": { "max_continuation_steps": 1, "success_message": "ok" } })
        );
    }
}
