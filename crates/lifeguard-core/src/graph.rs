//! Dependency graph construction and validation.
//!
//! The graph merges a small fixed backbone (coarse startup phases from
//! configuration) with dynamically-discovered services, then validates
//! acyclicity and the no-orphan invariant and computes a deterministic
//! topological order. Building is a pure function over its inputs: every
//! structural problem is reported before any module is ever started.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::GraphError;

/// The fixed coarse-phase dependency scaffold supplied at construction
/// time, immutable thereafter.
///
/// Two module names are distinguished:
///
/// - `core`: the phase that unlisted services are anchored after, and
/// - `root`: the aggregate that awaits every unlisted service before it
///   is considered running.
///
/// Both are synthesized as aggregates if the backbone does not declare
/// them, so an empty backbone still forms a valid two-phase scaffold.
#[derive(Debug, Clone)]
pub struct Backbone {
    modules: BTreeMap<String, Vec<String>>,
    core: String,
    root: String,
}

impl Backbone {
    pub fn new(core: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            modules: BTreeMap::new(),
            core: core.into(),
            root: root.into(),
        }
    }

    /// Declare a backbone module and its prerequisites.
    pub fn module(mut self, name: &str, prerequisites: &[&str]) -> Self {
        self.modules.insert(
            name.to_string(),
            prerequisites.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    pub fn core(&self) -> &str {
        &self.core
    }

    pub fn root(&self) -> &str {
        &self.root
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    InProgress,
    Done,
}

/// A validated module dependency graph with a precomputed start order.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, Vec<String>>,
    start_order: Vec<String>,
    root: String,
}

impl DependencyGraph {
    /// Merge the backbone with the enabled service names and validate.
    ///
    /// For every service not explicitly present in the backbone, two
    /// edges are synthesized: the service depends on the core phase, and
    /// the root aggregate depends on the service. Services that *are*
    /// listed in the backbone keep exactly their declared edges.
    ///
    /// Validation order: duplicate service names, unknown prerequisite
    /// references, cycles, then orphans (every module except the root
    /// must be a prerequisite of at least one other module).
    pub fn build(backbone: &Backbone, service_names: &[String]) -> Result<Self, GraphError> {
        let mut seen = BTreeSet::new();
        for name in service_names {
            if !seen.insert(name.as_str()) {
                return Err(GraphError::DuplicateName(name.clone()));
            }
        }

        let core = backbone.core().to_string();
        let root = backbone.root().to_string();

        let mut nodes = backbone.modules.clone();
        nodes.entry(core.clone()).or_default();
        let root_was_declared = nodes.contains_key(&root);
        let root_deps = nodes.entry(root.clone()).or_default();
        if !root_was_declared && root != core {
            root_deps.push(core.clone());
        }

        // Dynamic augmentation for services the backbone does not list.
        for name in service_names {
            if nodes.contains_key(name) {
                continue;
            }
            nodes.insert(name.clone(), vec![core.clone()]);
            if let Some(deps) = nodes.get_mut(&root) {
                deps.push(name.clone());
            }
        }

        // Drop repeated prerequisites, keeping first occurrence.
        for deps in nodes.values_mut() {
            let mut kept = BTreeSet::new();
            deps.retain(|dep| kept.insert(dep.clone()));
        }

        for (module, deps) in &nodes {
            for dep in deps {
                if !nodes.contains_key(dep) {
                    return Err(GraphError::UnknownPrerequisite {
                        module: module.clone(),
                        prerequisite: dep.clone(),
                    });
                }
            }
        }

        // Depth-first post-order over sorted keys: detects cycles and
        // yields a deterministic prerequisites-first start order.
        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(nodes.len());
        let mut start_order = Vec::with_capacity(nodes.len());
        for name in nodes.keys() {
            Self::visit(name, &nodes, &mut marks, &mut start_order)?;
        }

        let mut required: BTreeSet<&str> = BTreeSet::new();
        for deps in nodes.values() {
            for dep in deps {
                required.insert(dep);
            }
        }
        for module in nodes.keys() {
            if *module != root && !required.contains(module.as_str()) {
                return Err(GraphError::Orphan(module.clone()));
            }
        }

        Ok(Self {
            nodes,
            start_order,
            root,
        })
    }

    fn visit<'a>(
        name: &'a str,
        nodes: &'a BTreeMap<String, Vec<String>>,
        marks: &mut HashMap<&'a str, Mark>,
        order: &mut Vec<String>,
    ) -> Result<(), GraphError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => return Err(GraphError::Cycle(name.to_string())),
            None => {}
        }
        marks.insert(name, Mark::InProgress);
        for dep in &nodes[name] {
            Self::visit(dep, nodes, marks, order)?;
        }
        marks.insert(name, Mark::Done);
        order.push(name.to_string());
        Ok(())
    }

    /// Module names in start order: prerequisites strictly first.
    pub fn start_order(&self) -> &[String] {
        &self.start_order
    }

    /// Module names in stop order: exact reverse of the start order.
    pub fn stop_order(&self) -> impl Iterator<Item = &str> {
        self.start_order.iter().rev().map(String::as_str)
    }

    pub fn prerequisites(&self, module: &str) -> &[String] {
        self.nodes
            .get(module)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn modules(&self) -> impl Iterator<Item = &String> {
        self.nodes.keys()
    }

    pub fn contains(&self, module: &str) -> bool {
        self.nodes.contains_key(module)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
