use serde::{Deserialize, Serialize};

/// What happened to one extracted field between two versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldChange {
    Added,
    Removed,
    Changed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDiff {
    pub field: String,
    pub change: FieldChange,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Compare the extracted fields of two versions, key by key over the
/// union of both maps, sorted by field name. Empty strings count as
/// absent so an extractor that emits `""` does not fabricate changes.
pub fn compare_fields(
    old: &serde_json::Map<String, serde_json::Value>,
    new: &serde_json::Map<String, serde_json::Value>,
) -> Vec<FieldDiff> {
    let mut keys: Vec<&String> = old.keys().chain(new.keys()).collect();
    keys.sort();
    keys.dedup();

    let mut diffs = Vec::new();
    for key in keys {
        let old_value = old.get(key).and_then(render_value);
        let new_value = new.get(key).and_then(render_value);

        let change = match (&old_value, &new_value) {
            (None, None) => continue,
            (None, Some(_)) => FieldChange::Added,
            (Some(_), None) => FieldChange::Removed,
            (Some(a), Some(b)) if a == b => continue,
            (Some(_), Some(_)) => FieldChange::Changed,
        };

        diffs.push(FieldDiff {
            field: key.clone(),
            change,
            old_value,
            new_value,
        });
    }
    diffs
}

fn render_value(value: &serde_json::Value) -> Option<String> {
    let rendered = match value {
        serde_json::Value::Null => return None,
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if rendered.is_empty() {
        None
    } else {
        Some(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn added_removed_and_changed_detected() {
        let old = fields(&[
            ("monthly_rent", json!("950 EUR")),
            ("landlord", json!("Schmidt")),
        ]);
        let new = fields(&[
            ("monthly_rent", json!("990 EUR")),
            ("deposit", json!("1900 EUR")),
        ]);

        let diffs = compare_fields(&old, &new);
        assert_eq!(diffs.len(), 3);
        // sorted by field name
        assert_eq!(diffs[0].field, "deposit");
        assert_eq!(diffs[0].change, FieldChange::Added);
        assert_eq!(diffs[1].field, "landlord");
        assert_eq!(diffs[1].change, FieldChange::Removed);
        assert_eq!(diffs[2].field, "monthly_rent");
        assert_eq!(diffs[2].change, FieldChange::Changed);
        assert_eq!(diffs[2].old_value.as_deref(), Some("950 EUR"));
        assert_eq!(diffs[2].new_value.as_deref(), Some("990 EUR"));
    }

    #[test]
    fn swapped_arguments_mirror_the_diff() {
        let old = fields(&[
            ("monthly_rent", json!("950 EUR")),
            ("landlord", json!("Schmidt")),
        ]);
        let new = fields(&[
            ("monthly_rent", json!("990 EUR")),
            ("deposit", json!("1900 EUR")),
        ]);

        let forward = compare_fields(&old, &new);
        let backward = compare_fields(&new, &old);
        assert_eq!(forward.len(), backward.len());

        for (f, b) in forward.iter().zip(backward.iter()) {
            assert_eq!(f.field, b.field);
            assert_eq!(f.old_value, b.new_value);
            assert_eq!(f.new_value, b.old_value);
            let mirrored = match f.change {
                FieldChange::Added => FieldChange::Removed,
                FieldChange::Removed => FieldChange::Added,
                FieldChange::Changed => FieldChange::Changed,
            };
            assert_eq!(b.change, mirrored);
        }
    }

    #[test]
    fn identical_maps_produce_no_diffs() {
        let m = fields(&[("iban", json!("DE44 5001 0517"))]);
        assert!(compare_fields(&m, &m).is_empty());
    }

    #[test]
    fn empty_string_equals_absent() {
        let old = fields(&[("notes", json!(""))]);
        let new = fields(&[]);
        assert!(compare_fields(&old, &new).is_empty());

        let with_null = fields(&[("notes", json!(null))]);
        assert!(compare_fields(&with_null, &new).is_empty());
    }

    #[test]
    fn non_string_values_render_as_json() {
        let old = fields(&[("rooms", json!(2))]);
        let new = fields(&[("rooms", json!(3))]);
        let diffs = compare_fields(&old, &new);
        assert_eq!(diffs[0].old_value.as_deref(), Some("2"));
        assert_eq!(diffs[0].new_value.as_deref(), Some("3"));
    }
}
