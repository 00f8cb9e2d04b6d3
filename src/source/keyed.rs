use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use super::error::{Result, SourceError};
use super::options::KeyedGroup;
use crate::inventory::InventorySink;

static INVALID_GROUP_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid group name regex"));

pub fn sanitize_group_name(name: &str) -> String {
    INVALID_GROUP_CHARS.replace_all(name, "_").into_owned()
}

/// Follow a dotted path (`tags.role`, `ips.0`) through a host's vars.
pub fn lookup_path<'a>(vars: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = vars.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(m) => m.get(part)?,
            Value::Array(a) => a.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Raw (unprefixed) group names a keyed group yields for one host.
fn bare_names(keyed: &KeyedGroup, value: &Value, host: &str) -> Result<Vec<String>> {
    let default = keyed.default_value.as_deref();
    let or_default = |name: String| match default {
        Some(d) if name.is_empty() => d.to_string(),
        _ => name,
    };

    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                scalar(item).map(or_default).ok_or_else(|| {
                    SourceError::Parse(format!(
                        "key '{}' of host {host} holds a list of non-scalar values",
                        keyed.key
                    ))
                })
            })
            .collect(),
        Value::Object(map) => Ok(map
            .iter()
            .map(|(name, val)| {
                let val = scalar(val).unwrap_or_default();
                match default {
                    _ if !val.is_empty() => format!("{name}{}{val}", keyed.separator),
                    Some(d) => format!("{name}{}{d}", keyed.separator),
                    None if !keyed.trailing_separator => name.clone(),
                    None => format!("{name}{}", keyed.separator),
                }
            })
            .collect()),
        other => scalar(other).map(|s| vec![or_default(s)]).ok_or_else(|| {
            SourceError::Parse(format!(
                "invalid group name format for key '{}' of host {host}, expected a string, \
                 a list or a mapping",
                keyed.key
            ))
        }),
    }
}

fn is_empty(value: &Value) -> bool {
    matches!(value, Value::Null) || value.as_str().is_some_and(str::is_empty)
}

/// Create groups out of host variable values, as ansible's `keyed_groups`.
pub fn add_keyed_groups<S: InventorySink + ?Sized>(
    sink: &mut S,
    hostvars: &Map<String, Value>,
    keyed_groups: &[KeyedGroup],
    strict: bool,
) -> Result<()> {
    for (host, vars) in hostvars {
        let Some(vars) = vars.as_object() else {
            continue;
        };

        for keyed in keyed_groups {
            let value = lookup_path(vars, &keyed.key).filter(|v| !is_empty(v));
            let names = match (value, &keyed.default_value) {
                (Some(value), _) => bare_names(keyed, value, host)?,
                (None, Some(default)) => vec![default.clone()],
                (None, None) => {
                    if strict {
                        return Err(SourceError::Parse(format!(
                            "no key or key resulted empty for {} in host {host}, invalid entry",
                            keyed.key
                        )));
                    }
                    continue;
                }
            };

            let sep = if keyed.prefix.is_empty() && !keyed.leading_separator {
                ""
            } else {
                keyed.separator.as_str()
            };

            for bare in names {
                let group = sanitize_group_name(&format!("{}{sep}{bare}", keyed.prefix));
                debug!("Add keyed group: {group} for host {host}");
                sink.add_group(&group)?;
                sink.add_host(host, Some(&group))?;
                if let Some(parent) = &keyed.parent_group {
                    let parent = sanitize_group_name(parent);
                    sink.add_group(&parent)?;
                    sink.add_child(&parent, &group)?;
                }
            }
        }
    }
    Ok(())
}
