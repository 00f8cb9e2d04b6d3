use serde::Serialize;
use serde_json::Value;

use super::{kind_of, FilterError};

pub const NAME: &str = "dict2ini";

/// One INI assignment, ready to drive an `ini_file` loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigRecord {
    pub section: String,
    pub option: String,
    pub value: Value,
}

/// Flatten `{section: {option: value}}` into records, keeping input order.
///
/// String values are wrapped in double quotes when `quote` is set, since some
/// ini/toml consumers need quoted strings. Anything nested deeper than two
/// levels is passed through untouched.
pub fn flatten(data: &Value, quote: bool) -> Result<Vec<ConfigRecord>, FilterError> {
    let sections = data
        .as_object()
        .ok_or_else(|| FilterError::NotAMapping(kind_of(data)))?;

    let mut records = Vec::new();
    for (section, elements) in sections {
        let options = elements
            .as_object()
            .ok_or_else(|| FilterError::SectionNotMapping {
                section: section.clone(),
                found: kind_of(elements),
            })?;

        for (option, value) in options {
            let value = match value {
                Value::String(s) if quote => Value::String(format!("\"{s}\"")),
                other => other.clone(),
            };
            records.push(ConfigRecord {
                section: section.clone(),
                option: option.clone(),
                value,
            });
        }
    }

    Ok(records)
}

/// Registry entry point: same as [`flatten`] but yields a plain list value.
pub fn filter(data: &Value, quote: bool) -> Result<Value, FilterError> {
    let records = flatten(data, quote)?;
    Ok(serde_json::to_value(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quoted_string() {
        let out = flatten(&json!({"s": {"o": "v"}}), true).unwrap();
        assert_eq!(
            out,
            vec![ConfigRecord {
                section: "s".into(),
                option: "o".into(),
                value: json!("\"v\""),
            }]
        );
    }

    #[test]
    fn test_unquoted_string() {
        let out = flatten(&json!({"s": {"o": "v"}}), false).unwrap();
        assert_eq!(out[0].value, json!("v"));
    }

    #[test]
    fn test_non_string_never_quoted() {
        for quote in [true, false] {
            let out = flatten(&json!({"s": {"o": 5, "b": true}}), quote).unwrap();
            assert_eq!(out[0].value, json!(5));
            assert_eq!(out[1].value, json!(true));
        }
    }

    #[test]
    fn test_order_follows_input() {
        let content = r#"
zeta:
  b: 1
  a: 2
alpha:
  y: x
  c: d
"#;
        let data: Value = serde_yaml::from_str(content).unwrap();
        let out = flatten(&data, false).unwrap();
        let pairs: Vec<(&str, &str)> = out
            .iter()
            .map(|r| (r.section.as_str(), r.option.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("zeta", "b"), ("zeta", "a"), ("alpha", "y"), ("alpha", "c")]
        );
    }

    #[test]
    fn test_record_count_matches_options() {
        let data = json!({
            "one": {"a": 1, "b": 2, "c": 3},
            "two": {},
            "three": {"d": "x"},
        });
        assert_eq!(flatten(&data, true).unwrap().len(), 4);
    }

    #[test]
    fn test_deeper_nesting_passes_through() {
        let out = flatten(&json!({"s": {"o": {"deep": "v"}}}), true).unwrap();
        assert_eq!(out[0].value, json!({"deep": "v"}));
    }

    #[test]
    fn test_section_not_mapping() {
        let err = flatten(&json!({"s": "flat"}), true).unwrap_err();
        assert!(matches!(
            err,
            FilterError::SectionNotMapping { ref section, found: "string" } if section == "s"
        ));
    }

    #[test]
    fn test_top_level_not_mapping() {
        assert!(matches!(
            flatten(&json!(["a"]), true),
            Err(FilterError::NotAMapping("list"))
        ));
    }

    #[test]
    fn test_filter_yields_record_mappings() {
        let out = filter(&json!({"b": {"y": "2"}, "a": {"x": true}}), true).unwrap();
        assert_eq!(
            serde_json::to_string(&out).unwrap(),
            r#"[{"section":"b","option":"y","value":"\"2\""},{"section":"a","option":"x","value":true}]"#
        );
    }
}
