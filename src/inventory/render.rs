use std::collections::HashSet;

use serde_json::{json, Map, Value};

use super::types::{Inventory, ALL};

/// Render the `ansible-inventory --list` document, restricted to `available`
/// hosts. Empty keys are dropped, and so are groups left without any
/// available host, together with the `children` entries naming them.
pub fn to_list(inventory: &Inventory, available: &[String]) -> Value {
    let available: HashSet<&str> = available.iter().map(String::as_str).collect();

    let mut hostvars = Map::new();
    for host in inventory.hosts.values() {
        if available.contains(host.name.as_str()) {
            hostvars.insert(host.name.clone(), Value::Object(host.vars.clone()));
        }
    }

    let mut results = Map::new();
    results.insert("_meta".to_string(), json!({ "hostvars": hostvars }));

    let emitted = non_empty_groups(inventory, &available);
    let mut seen = HashSet::new();
    format_group(inventory, ALL, &available, &emitted, &mut seen, &mut results);
    Value::Object(results)
}

/// Groups that hold at least one available host, directly or through a
/// descendant. Only these get an entry in the `--list` document.
fn non_empty_groups<'a>(
    inventory: &'a Inventory,
    available: &HashSet<&str>,
) -> HashSet<&'a str> {
    let mut emitted: HashSet<&str> = inventory
        .groups
        .values()
        .filter(|g| g.name != ALL && g.hosts.iter().any(|h| available.contains(h.as_str())))
        .map(|g| g.name.as_str())
        .collect();
    loop {
        let before = emitted.len();
        for group in inventory.groups.values() {
            if group.children.iter().any(|c| emitted.contains(c.as_str())) {
                emitted.insert(group.name.as_str());
            }
        }
        if emitted.len() == before {
            return emitted;
        }
    }
}

fn format_group<'a>(
    inventory: &'a Inventory,
    name: &'a str,
    available: &HashSet<&str>,
    emitted: &HashSet<&str>,
    seen: &mut HashSet<&'a str>,
    results: &mut Map<String, Value>,
) {
    let Some(group) = inventory.groups.get(name) else {
        return;
    };
    seen.insert(name);

    let mut entry = Map::new();
    if name != ALL {
        let hosts: Vec<Value> = group
            .hosts
            .iter()
            .filter(|h| available.contains(h.as_str()))
            .map(|h| Value::String(h.clone()))
            .collect();
        if !hosts.is_empty() {
            entry.insert("hosts".to_string(), Value::Array(hosts));
        }
    }
    let children: Vec<&String> = group
        .children
        .iter()
        .filter(|c| emitted.contains(c.as_str()))
        .collect();
    if !children.is_empty() {
        entry.insert(
            "children".to_string(),
            Value::Array(children.iter().map(|c| Value::String(c.to_string())).collect()),
        );
    }

    // Parent first so the document reads top-down
    if !entry.is_empty() {
        results.insert(name.to_string(), Value::Object(entry));
    }

    for child in children {
        if !seen.contains(child.as_str()) {
            format_group(inventory, child, available, emitted, seen, results);
        }
    }
}

/// Variables of a single host, the `--host NAME` document.
pub fn to_host(inventory: &Inventory, name: &str) -> Option<Value> {
    inventory
        .hosts
        .get(name)
        .map(|h| Value::Object(h.vars.clone()))
}

/// Render the `--graph` tree starting at `root`. Children and hosts are
/// sorted by name.
pub fn to_graph(inventory: &Inventory, root: &str, available: &[String]) -> Option<String> {
    inventory.groups.get(root)?;
    let available: HashSet<&str> = available.iter().map(String::as_str).collect();
    let mut lines = Vec::new();
    graph_group(inventory, root, 0, &available, &mut lines);
    Some(lines.join("\n"))
}

fn graph_name(name: &str, depth: usize) -> String {
    if depth == 0 {
        name.to_string()
    } else {
        format!("{}--{name}", "  |".repeat(depth))
    }
}

fn graph_group(
    inventory: &Inventory,
    name: &str,
    depth: usize,
    available: &HashSet<&str>,
    lines: &mut Vec<String>,
) {
    let Some(group) = inventory.groups.get(name) else {
        return;
    };
    lines.push(graph_name(&format!("@{name}:"), depth));

    let mut children: Vec<&String> = group.children.iter().collect();
    children.sort();
    for child in children {
        graph_group(inventory, child, depth + 1, available, lines);
    }

    if name != ALL {
        let mut hosts: Vec<&String> = group
            .hosts
            .iter()
            .filter(|h| available.contains(h.as_str()))
            .collect();
        hosts.sort();
        for host in hosts {
            lines.push(graph_name(host, depth + 1));
        }
    }
}
