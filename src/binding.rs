//! Binding model and watcher graph.
//!
//! Bindings are registered in first-seen order. Each one contributes one or
//! more observed chains; chains are merged into a forest of watchers stored in
//! an arena, where siblings are matched structurally on `(kind, name)`.

use serde::{Deserialize, Serialize};
use tracing::trace;

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING ENTRIES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BindingSource {
    /// Dotted member path. `class_qualifier` is set when the path starts at a
    /// static member of another class.
    #[serde(rename_all = "camelCase")]
    DottedPath {
        class_qualifier: Option<String>,
        path: String,
    },
    /// Body of an anonymous getter, `return <expr>;`.
    Getter { body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingEntry {
    pub index: usize,
    pub source: BindingSource,
    /// Dotted path of the value slot the binding writes to.
    pub destination: Option<String>,
    /// Statement assigning `value` to the destination, when the destination is
    /// an arbitrary expression rather than a property slot.
    pub destination_setter: Option<String>,
    /// Leaf watchers whose firing re-evaluates this binding.
    pub watcher_refs: Vec<usize>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// WATCHERS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WatcherKind {
    Function,
    StaticProperty,
    Property,
    Xml,
}

impl WatcherKind {
    /// Fixed codes shared with the runtime.
    pub fn code(self) -> u8 {
        match self {
            WatcherKind::Function => 0,
            WatcherKind::StaticProperty => 1,
            WatcherKind::Property => 2,
            WatcherKind::Xml => 3,
        }
    }
}

/// One step of an observed chain, e.g. `b` in `a.b.c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSegment {
    pub kind: WatcherKind,
    pub name: String,
    pub events: Vec<String>,
    /// Declaring class of a static member.
    pub class_qualifier: Option<String>,
    /// Argument list text of a function watcher.
    pub arguments: Option<String>,
}

impl WatchSegment {
    pub fn property(name: &str, events: &[&str]) -> Self {
        WatchSegment {
            kind: WatcherKind::Property,
            name: name.to_string(),
            events: events.iter().map(|e| e.to_string()).collect(),
            class_qualifier: None,
            arguments: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherNode {
    pub index: usize,
    pub kind: WatcherKind,
    pub name: String,
    pub event_names: Vec<String>,
    pub binding_refs: Vec<usize>,
    pub children: Vec<usize>,
    pub is_root: bool,
    pub class_qualifier: Option<String>,
    pub arguments: Option<String>,
}

impl WatcherNode {
    fn matches(&self, segment: &WatchSegment) -> bool {
        self.kind == segment.kind
            && self.name == segment.name
            && self.class_qualifier == segment.class_qualifier
    }

    fn absorb_events(&mut self, events: &[String]) {
        for event in events {
            if !self.event_names.contains(event) {
                self.event_names.push(event.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WatcherGraph {
    nodes: Vec<WatcherNode>,
    roots: Vec<usize>,
}

impl WatcherGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn get(&self, index: usize) -> &WatcherNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[WatcherNode] {
        &self.nodes
    }

    /// Walk `chain` from the roots, reusing watchers that already observe the
    /// same segment and creating the rest. `binding` is recorded on the leaf,
    /// whose index is returned.
    pub fn attach(&mut self, chain: &[WatchSegment], binding: usize) -> Option<usize> {
        let mut parent: Option<usize> = None;
        for segment in chain {
            let siblings = match parent {
                Some(p) => &self.nodes[p].children,
                None => &self.roots,
            };
            let existing = siblings
                .iter()
                .copied()
                .find(|&i| self.nodes[i].matches(segment));

            let index = match existing {
                Some(index) => index,
                None => self.insert(segment, parent),
            };
            self.nodes[index].absorb_events(&segment.events);
            parent = Some(index);
        }

        let leaf = parent?;
        let refs = &mut self.nodes[leaf].binding_refs;
        if !refs.contains(&binding) {
            refs.push(binding);
        }
        Some(leaf)
    }

    fn insert(&mut self, segment: &WatchSegment, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        trace!(index, name = %segment.name, kind = ?segment.kind, "watcher created");
        self.nodes.push(WatcherNode {
            index,
            kind: segment.kind,
            name: segment.name.clone(),
            event_names: Vec::new(),
            binding_refs: Vec::new(),
            children: Vec::new(),
            is_root: parent.is_none(),
            class_qualifier: segment.class_qualifier.clone(),
            arguments: segment.arguments.clone(),
        });
        match parent {
            Some(p) => self.nodes[p].children.push(index),
            None => self.roots.push(index),
        }
        index
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING GRAPH
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct BindingGraph {
    entries: Vec<BindingEntry>,
    watchers: WatcherGraph,
}

impl BindingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BindingEntry] {
        &self.entries
    }

    pub fn watchers(&self) -> &WatcherGraph {
        &self.watchers
    }

    /// Register a binding and merge its observed chains into the watcher forest.
    pub fn register(
        &mut self,
        source: BindingSource,
        destination: Option<String>,
        destination_setter: Option<String>,
        chains: &[Vec<WatchSegment>],
    ) -> usize {
        let index = self.entries.len();
        let mut watcher_refs = Vec::new();
        for chain in chains {
            if let Some(leaf) = self.watchers.attach(chain, index) {
                if !watcher_refs.contains(&leaf) {
                    watcher_refs.push(leaf);
                }
            }
        }
        trace!(index, ?source, ?destination, "binding registered");
        self.entries.push(BindingEntry {
            index,
            source,
            destination,
            destination_setter,
            watcher_refs,
        });
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(names: &[&str]) -> Vec<WatchSegment> {
        names
            .iter()
            .map(|n| WatchSegment::property(n, &["propertyChange"]))
            .collect()
    }

    fn path(p: &str) -> BindingSource {
        BindingSource::DottedPath {
            class_qualifier: None,
            path: p.to_string(),
        }
    }

    #[test]
    fn test_shared_prefix_merges_into_one_chain() {
        let mut graph = BindingGraph::new();
        let x = graph.register(path("obj.a.x"), Some("inst0.text".into()), None, &[chain(&["obj", "a", "x"])]);
        let y = graph.register(path("obj.a.y"), Some("inst1.text".into()), None, &[chain(&["obj", "a", "y"])]);

        let watchers = graph.watchers();
        assert_eq!(watchers.roots().len(), 1);
        let obj = watchers.get(watchers.roots()[0]);
        assert_eq!(obj.name, "obj");
        assert!(obj.is_root);
        assert_eq!(obj.children.len(), 1);

        let a = watchers.get(obj.children[0]);
        assert_eq!(a.name, "a");
        assert_eq!(a.children.len(), 2);
        assert!(a.binding_refs.is_empty());

        let leaf_x = watchers.get(a.children[0]);
        let leaf_y = watchers.get(a.children[1]);
        assert_eq!((leaf_x.name.as_str(), leaf_x.binding_refs.as_slice()), ("x", &[x][..]));
        assert_eq!((leaf_y.name.as_str(), leaf_y.binding_refs.as_slice()), ("y", &[y][..]));
        assert_eq!(graph.entries()[x].watcher_refs, vec![leaf_x.index]);
    }

    #[test]
    fn test_distinct_roots_per_top_level_expression() {
        let mut graph = BindingGraph::new();
        graph.register(path("a"), None, None, &[chain(&["a"]), chain(&["b"])]);
        graph.register(path("a"), None, None, &[chain(&["a"])]);
        assert_eq!(graph.watchers().roots().len(), 2);
        assert_eq!(graph.watchers().get(0).binding_refs, vec![0, 1]);
    }

    #[test]
    fn test_kind_is_part_of_the_merge_key() {
        let mut graph = BindingGraph::new();
        let mut call = chain(&["size"]);
        call[0].kind = WatcherKind::Function;
        graph.register(path("size"), None, None, &[chain(&["size"])]);
        graph.register(path("size"), None, None, &[call]);
        assert_eq!(graph.watchers().roots().len(), 2);
    }

    #[test]
    fn test_event_names_accumulate_first_seen() {
        let mut graph = BindingGraph::new();
        let first = vec![WatchSegment::property("model", &["modelChanged", "propertyChange"])];
        let second = vec![WatchSegment::property("model", &["propertyChange", "reset"])];
        graph.register(path("model"), None, None, &[first]);
        graph.register(path("model"), None, None, &[second]);

        let model = graph.watchers().get(0);
        assert_eq!(model.event_names, vec!["modelChanged", "propertyChange", "reset"]);
    }

    #[test]
    fn test_watcher_codes_are_fixed() {
        assert_eq!(WatcherKind::Function.code(), 0);
        assert_eq!(WatcherKind::StaticProperty.code(), 1);
        assert_eq!(WatcherKind::Property.code(), 2);
        assert_eq!(WatcherKind::Xml.code(), 3);
    }
}
