use std::collections::HashSet;
use std::sync::LazyLock;

use glob_match::glob_match;
use regex::Regex;
use tracing::warn;

use super::sink::InventoryError;
use super::types::{Inventory, ALL};

// Terms of a colon-separated pattern; a bracketed range counts as one piece.
static COLON_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[^\s:\[\]]|\[[^\]]*\])+").expect("valid pattern split regex")
});

static SUBSCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)\[(?:(-?[0-9]+)|([0-9]+)?\s*:\s*([0-9]+)?)\]$")
        .expect("valid subscript regex")
});

/// Resolve an ansible host pattern (`--limit`) to host names.
///
/// Terms are separated by `,` (or `:` when no comma is present). Each term
/// is a group or host name, a glob (`web*`, `db[12]`), or a regex when
/// prefixed with `~`. A group term selects the hosts of the group and its
/// descendants, `all` and `*` select every host. `!term` removes hosts,
/// `&term` keeps only hosts also selected by `term`, and a trailing
/// `[i]` / `[start:end]` subscript picks from the term's hosts.
///
/// Hosts come back in inventory order, without duplicates.
pub fn apply_limit(inventory: &Inventory, limit: &str) -> Result<Vec<String>, InventoryError> {
    let terms = order_terms(split_pattern(limit));

    let mut hosts: Vec<String> = Vec::new();
    for term in &terms {
        if let Some(pattern) = term.strip_prefix('!') {
            let that: HashSet<String> = match_term(inventory, pattern)?.into_iter().collect();
            hosts.retain(|h| !that.contains(h));
        } else if let Some(pattern) = term.strip_prefix('&') {
            let that: HashSet<String> = match_term(inventory, pattern)?.into_iter().collect();
            hosts.retain(|h| that.contains(h));
        } else {
            for host in match_term(inventory, term)? {
                push_unique(&mut hosts, host);
            }
        }
    }
    Ok(hosts)
}

fn split_pattern(pattern: &str) -> Vec<String> {
    let terms: Vec<&str> = if pattern.contains(',') {
        pattern.split(',').collect()
    } else {
        COLON_TERMS
            .find_iter(pattern)
            .map(|m| m.as_str())
            .collect()
    };
    terms
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Plain terms first, then intersections, then exclusions. A pattern made
/// only of `!`/`&` terms starts from `all`.
fn order_terms(terms: Vec<String>) -> Vec<String> {
    let (mut regular, mut intersect, mut exclude) = (Vec::new(), Vec::new(), Vec::new());
    for term in terms {
        if term.starts_with('!') {
            exclude.push(term);
        } else if term.starts_with('&') {
            intersect.push(term);
        } else {
            regular.push(term);
        }
    }
    if regular.is_empty() {
        regular.push(ALL.to_string());
    }
    regular.extend(intersect);
    regular.extend(exclude);
    regular
}

enum Subscript {
    Index(i64),
    Range(usize, Option<usize>),
}

fn split_subscript(term: &str) -> (&str, Option<Subscript>) {
    // A regex may end in a bracket expression of its own
    if term.starts_with('~') {
        return (term, None);
    }
    let Some(caps) = SUBSCRIPT.captures(term) else {
        return (term, None);
    };
    let base = caps.get(1).map_or(term, |m| m.as_str());
    let subscript = if let Some(index) = caps.get(2) {
        index.as_str().parse().ok().map(Subscript::Index)
    } else {
        let start = caps.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        let end = caps.get(4).and_then(|m| m.as_str().parse().ok());
        Some(Subscript::Range(start, end))
    };
    (base, subscript)
}

fn apply_subscript(hosts: Vec<String>, subscript: Subscript) -> Vec<String> {
    match subscript {
        Subscript::Index(i) => {
            let len = hosts.len() as i64;
            let i = if i < 0 { len + i } else { i };
            if (0..len).contains(&i) {
                vec![hosts[i as usize].clone()]
            } else {
                Vec::new()
            }
        }
        // The end index is inclusive
        Subscript::Range(start, end) => {
            let end = end.map_or(hosts.len(), |e| (e + 1).min(hosts.len()));
            hosts.get(start..end).map(<[String]>::to_vec).unwrap_or_default()
        }
    }
}

enum Matcher {
    Regex(Regex),
    Glob(String),
}

impl Matcher {
    fn new(pattern: &str) -> Result<Self, InventoryError> {
        match pattern.strip_prefix('~') {
            Some(re) => Regex::new(re)
                .map(Matcher::Regex)
                .map_err(|e| InventoryError::InvalidPattern(format!("{pattern}: {e}"))),
            None => Ok(Matcher::Glob(pattern.to_string())),
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::Regex(re) => re.is_match(name),
            Matcher::Glob(glob) => glob == name || glob_match(glob, name),
        }
    }
}

fn match_term(inventory: &Inventory, term: &str) -> Result<Vec<String>, InventoryError> {
    let (pattern, subscript) = split_subscript(term);
    let matcher = Matcher::new(pattern)?;

    let mut hosts: Vec<String> = Vec::new();
    let groups: Vec<&str> = inventory
        .groups
        .keys()
        .map(String::as_str)
        .filter(|g| matcher.matches(g))
        .collect();
    for group in &groups {
        for host in inventory.hosts_in_group(group) {
            push_unique(&mut hosts, host);
        }
    }

    // Host names are only consulted when no group matched, or when the
    // pattern could match more than one name.
    let wide = pattern.starts_with('~') || pattern.contains(['.', '?', '*', '[']);
    if groups.is_empty() || wide {
        for host in inventory.hosts.keys().filter(|h| matcher.matches(h)) {
            push_unique(&mut hosts, host.clone());
        }
    }

    if hosts.is_empty() {
        warn!("Could not match supplied host pattern, ignoring: {pattern}");
    }

    Ok(match subscript {
        Some(subscript) => apply_subscript(hosts, subscript),
        None => hosts,
    })
}

fn push_unique(hosts: &mut Vec<String>, host: String) {
    if !hosts.contains(&host) {
        hosts.push(host);
    }
}
