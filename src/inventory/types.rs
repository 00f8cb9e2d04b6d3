use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::sink::{InventoryError, InventorySink};

pub const ALL: &str = "all";
pub const UNGROUPED: &str = "ungrouped";

#[derive(Debug, Clone)]
pub struct Host {
    pub name: String,
    /// Variables in the order the source delivered them.
    pub vars: Map<String, Value>,
    /// Groups this host is a direct member of (never includes `all`).
    pub groups: Vec<String>,
}

impl Host {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vars: Map::new(),
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub hosts: Vec<String>,
    pub children: Vec<String>,
    pub parents: Vec<String>,
}

impl Group {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            hosts: Vec::new(),
            children: Vec::new(),
            parents: Vec::new(),
        }
    }
}

/// In-memory inventory graph following Ansible's rules: `all` and
/// `ungrouped` always exist, membership is deduplicated, group edges
/// may not form cycles.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub hosts: IndexMap<String, Host>,
    pub groups: IndexMap<String, Group>,
}

impl Default for Inventory {
    fn default() -> Self {
        let mut groups = IndexMap::new();
        let mut all = Group::new(ALL);
        let mut ungrouped = Group::new(UNGROUPED);
        all.children.push(UNGROUPED.to_string());
        ungrouped.parents.push(ALL.to_string());
        groups.insert(ALL.to_string(), all);
        groups.insert(UNGROUPED.to_string(), ungrouped);
        Self {
            hosts: IndexMap::new(),
            groups,
        }
    }
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_hosts(&self) -> Vec<&Host> {
        let mut hosts: Vec<&Host> = self.hosts.values().collect();
        hosts.sort_by(|a, b| a.name.cmp(&b.name));
        hosts
    }

    /// Hosts of a group and, recursively, of its children.
    pub fn hosts_in_group(&self, group_name: &str) -> Vec<String> {
        if group_name == ALL {
            return self.hosts.keys().cloned().collect();
        }
        let mut result = Vec::new();
        if let Some(group) = self.groups.get(group_name) {
            result.extend(group.hosts.clone());
            for child in &group.children {
                result.extend(self.hosts_in_group(child));
            }
        }
        result
    }

    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.keys().cloned().collect();
        names.sort();
        names
    }

    fn is_descendant(&self, ancestor: &str, name: &str) -> bool {
        match self.groups.get(ancestor) {
            Some(group) => group
                .children
                .iter()
                .any(|c| c == name || self.is_descendant(c, name)),
            None => false,
        }
    }

    fn join_group(&mut self, host: &str, group: &str) {
        if let Some(h) = self.hosts.get_mut(host) {
            if !h.groups.iter().any(|g| g == group) {
                h.groups.push(group.to_string());
            }
        }
        if let Some(g) = self.groups.get_mut(group) {
            if !g.hosts.iter().any(|h| h == host) {
                g.hosts.push(host.to_string());
            }
        }
    }

    /// Attach parentless groups to `all` and groupless hosts to `ungrouped`.
    pub fn reconcile(&mut self) {
        let orphans: Vec<String> = self
            .groups
            .values()
            .filter(|g| g.name != ALL && g.parents.is_empty())
            .map(|g| g.name.clone())
            .collect();
        for name in orphans {
            if let Some(g) = self.groups.get_mut(&name) {
                g.parents.push(ALL.to_string());
            }
            if let Some(all) = self.groups.get_mut(ALL) {
                all.children.push(name);
            }
        }

        let mut lonely = Vec::new();
        let mut grouped = Vec::new();
        for host in self.hosts.values() {
            if host.groups.iter().all(|g| g == UNGROUPED) {
                lonely.push(host.name.clone());
            } else if host.groups.iter().any(|g| g == UNGROUPED) {
                grouped.push(host.name.clone());
            }
        }
        for name in lonely {
            self.join_group(&name, UNGROUPED);
        }
        for name in grouped {
            if let Some(h) = self.hosts.get_mut(&name) {
                h.groups.retain(|g| g != UNGROUPED);
            }
            if let Some(g) = self.groups.get_mut(UNGROUPED) {
                g.hosts.retain(|h| h != &name);
            }
        }
    }
}

fn check_name(name: &str) -> Result<(), InventoryError> {
    if name.trim().is_empty() {
        return Err(InventoryError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl InventorySink for Inventory {
    fn add_group(&mut self, name: &str) -> Result<(), InventoryError> {
        check_name(name)?;
        if !self.groups.contains_key(name) {
            self.groups.insert(name.to_string(), Group::new(name));
        }
        Ok(())
    }

    fn add_host(&mut self, host: &str, group: Option<&str>) -> Result<(), InventoryError> {
        check_name(host)?;
        if let Some(group) = group {
            if !self.groups.contains_key(group) {
                return Err(InventoryError::NoSuchGroup(group.to_string()));
            }
        }

        self.hosts
            .entry(host.to_string())
            .or_insert_with(|| Host::new(host));

        if let Some(group) = group {
            if group != ALL {
                self.join_group(host, group);
            }
        }
        Ok(())
    }

    fn add_child(&mut self, parent: &str, child: &str) -> Result<(), InventoryError> {
        if !self.groups.contains_key(parent) {
            return Err(InventoryError::NoSuchGroup(parent.to_string()));
        }

        if self.groups.contains_key(child) {
            if parent == child || self.is_descendant(child, parent) {
                return Err(InventoryError::RecursiveGroup {
                    parent: parent.to_string(),
                    child: child.to_string(),
                });
            }
            if let Some(p) = self.groups.get_mut(parent) {
                if !p.children.iter().any(|c| c == child) {
                    p.children.push(child.to_string());
                }
            }
            if let Some(c) = self.groups.get_mut(child) {
                if !c.parents.iter().any(|p| p == parent) {
                    c.parents.push(parent.to_string());
                }
            }
            Ok(())
        } else if self.hosts.contains_key(child) {
            if parent != ALL {
                self.join_group(child, parent);
            }
            Ok(())
        } else {
            Err(InventoryError::UnknownMember {
                parent: parent.to_string(),
                child: child.to_string(),
            })
        }
    }

    fn set_host_vars(
        &mut self,
        host: &str,
        vars: &Map<String, Value>,
    ) -> Result<(), InventoryError> {
        self.add_host(host, None)?;
        if let Some(h) = self.hosts.get_mut(host) {
            for (k, v) in vars {
                h.vars.insert(k.clone(), v.clone());
            }
        }
        Ok(())
    }
}
