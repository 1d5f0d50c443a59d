//! Traversal and per-document compilation state.
//!
//! [`TraversalContext`] answers "where does the next descriptor attach" while
//! the builder descends the AST. [`CompilationContext`] owns everything a
//! single document accumulates. Sub-documents get fresh values of both; nothing
//! is shared with the enclosing document.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::ast::{ComponentFactoryNode, InstanceNode};
use crate::binding::BindingGraph;
use crate::compiler::CompiledDocument;
use crate::descriptor::{DescriptorArena, EventDescriptor, InstanceId, NodeId, PropertyShape};
use crate::diagnostics::CompilerProblem;
use crate::states::CompiledState;

// ═══════════════════════════════════════════════════════════════════════════════
// TRAVERSAL CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// One frame of traversal state. Entering a scope pushes it; leaving pops it and
/// checks the popped frame is the one that was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Instance(NodeId),
    Property(NodeId),
    /// An array element or object literal. With `bypass` set only the
    /// property-specifier stack moves: scalar containers are not instances.
    Element { node: NodeId, bypass: bool },
}

#[derive(Debug, Clone, Default)]
pub struct TraversalContext {
    instances: Vec<NodeId>,
    properties: Vec<NodeId>,
    in_content: bool,
}

impl TraversalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_instance(&self) -> Option<NodeId> {
        self.instances.last().copied()
    }

    pub fn current_property_specifier(&self) -> Option<NodeId> {
        self.properties.last().copied()
    }

    /// Whether top-level instances currently belong to the declared content.
    pub fn in_content(&self) -> bool {
        self.in_content
    }

    pub fn set_in_content(&mut self, in_content: bool) -> bool {
        std::mem::replace(&mut self.in_content, in_content)
    }

    pub fn push_instance(&mut self, node: NodeId) {
        self.instances.push(node);
    }

    pub fn pop_instance(&mut self) -> NodeId {
        self.instances
            .pop()
            .unwrap_or_else(|| panic!("instance stack underflow: mismatched visitor"))
    }

    pub fn push_property_specifier(&mut self, node: NodeId) {
        self.properties.push(node);
    }

    pub fn pop_property_specifier(&mut self) -> NodeId {
        self.properties
            .pop()
            .unwrap_or_else(|| panic!("property specifier stack underflow: mismatched visitor"))
    }

    pub fn push_element(&mut self, node: NodeId, bypass: bool) {
        if !bypass {
            self.push_instance(node);
        }
        self.push_property_specifier(node);
    }

    pub fn pop_element(&mut self, bypass: bool) -> NodeId {
        let node = self.pop_property_specifier();
        if !bypass {
            let instance = self.pop_instance();
            assert_eq!(instance, node, "element frames popped out of order");
        }
        node
    }

    pub fn enter(&mut self, scope: Scope) {
        match scope {
            Scope::Instance(node) => self.push_instance(node),
            Scope::Property(node) => self.push_property_specifier(node),
            Scope::Element { node, bypass } => self.push_element(node, bypass),
        }
    }

    pub fn leave(&mut self, scope: Scope) {
        let (expected, popped) = match scope {
            Scope::Instance(node) => (node, self.pop_instance()),
            Scope::Property(node) => (node, self.pop_property_specifier()),
            Scope::Element { node, bypass } => (node, self.pop_element(bypass)),
        };
        assert_eq!(popped, expected, "left {:?} but the top frame was {:?}", scope, popped);
    }

    pub fn depth(&self) -> (usize, usize) {
        (self.instances.len(), self.properties.len())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILATION CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    pub id: String,
    pub class_name: String,
}

/// Everything one document accumulates while it compiles.
#[derive(Debug)]
pub struct CompilationContext {
    pub arena: DescriptorArena,
    /// Attributes on the document's own tag.
    pub properties_root: NodeId,
    /// The document's declared content.
    pub descriptor_root: NodeId,
    pub instances: Vec<InstanceRecord>,
    pub events: Vec<EventDescriptor>,
    pub scripts: Vec<String>,
    pub bindings: BindingGraph,
    pub states: Vec<CompiledState>,
    pub sub_documents: Vec<CompiledDocument>,
    pub problems: Vec<CompilerProblem>,
    instance_ids: HashMap<*const InstanceNode, InstanceId>,
    /// Class names of inline components already compiled and hoisted.
    sub_document_names: HashMap<*const ComponentFactoryNode, String>,
    recorded: HashSet<String>,
    reserved_ids: HashSet<String>,
    instance_counter: u32,
    event_counter: u32,
    override_counter: u32,
    component_counter: u32,
}

impl CompilationContext {
    /// `reserved_ids` are the explicit and markup-derived ids of the document;
    /// synthesized ids never reuse them.
    pub fn new(document_class: &str, content_property: &str, reserved_ids: HashSet<String>) -> Self {
        let mut arena = DescriptorArena::new();
        let properties_root = arena.instance(document_class, None);
        let descriptor_root = arena.property(
            content_property,
            PropertyShape {
                is_array: true,
                ..PropertyShape::default()
            },
        );
        CompilationContext {
            arena,
            properties_root,
            descriptor_root,
            instances: Vec::new(),
            events: Vec::new(),
            scripts: Vec::new(),
            bindings: BindingGraph::new(),
            states: Vec::new(),
            sub_documents: Vec::new(),
            problems: Vec::new(),
            instance_ids: HashMap::new(),
            sub_document_names: HashMap::new(),
            recorded: HashSet::new(),
            reserved_ids,
            instance_counter: 0,
            event_counter: 0,
            override_counter: 0,
            component_counter: 0,
        }
    }

    /// Id for an instance node: explicit, else markup-derived, else `instN`.
    /// A node compiled more than once keeps its first id.
    pub fn instance_id(&mut self, node: &InstanceNode) -> InstanceId {
        let key = node as *const InstanceNode;
        if let Some(id) = self.instance_ids.get(&key) {
            return id.clone();
        }
        let id = self.assign_id(node.id.as_deref(), node.effective_id.as_deref());
        self.instance_ids.insert(key, id.clone());
        id
    }

    /// Id already assigned to `node` by an earlier visit.
    pub fn known_instance_id(&self, node: &InstanceNode) -> Option<&InstanceId> {
        self.instance_ids.get(&(node as *const InstanceNode))
    }

    pub fn assign_id(&mut self, explicit: Option<&str>, effective: Option<&str>) -> InstanceId {
        if let Some(id) = explicit {
            return InstanceId::Explicit(id.to_string());
        }
        if let Some(id) = effective {
            return InstanceId::Effective(id.to_string());
        }
        loop {
            let candidate = format!("inst{}", self.instance_counter);
            self.instance_counter += 1;
            if !self.reserved_ids.contains(&candidate) {
                return InstanceId::Synthesized(candidate);
            }
        }
    }

    pub fn known_sub_document(&self, node: &ComponentFactoryNode) -> Option<&str> {
        self.sub_document_names
            .get(&(node as *const ComponentFactoryNode))
            .map(String::as_str)
    }

    pub fn remember_sub_document(&mut self, node: &ComponentFactoryNode, class_name: String) {
        self.sub_document_names
            .insert(node as *const ComponentFactoryNode, class_name);
    }

    pub fn record_instance(&mut self, id: &InstanceId, class_name: &str) {
        if self.recorded.insert(id.as_str().to_string()) {
            self.instances.push(InstanceRecord {
                id: id.as_str().to_string(),
                class_name: class_name.to_string(),
            });
        }
    }

    pub fn next_handler_name(&mut self) -> String {
        let name = format!("event{}", self.event_counter);
        self.event_counter += 1;
        name
    }

    pub fn next_override_id(&mut self, document_short_name: &str, kind: &str) -> String {
        self.override_counter += 1;
        format!("_{}_{}{}", document_short_name, kind, self.override_counter)
    }

    pub fn next_component_name(&mut self, document_class: &str) -> String {
        let name = format!("{}_component{}", document_class.replace('.', "_"), self.component_counter);
        self.component_counter += 1;
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(arena: &mut DescriptorArena) -> (NodeId, NodeId) {
        let a = arena.instance("A", None);
        let b = arena.property("b", PropertyShape::default());
        (a, b)
    }

    #[test]
    fn test_stacks_are_independent() {
        let mut arena = DescriptorArena::new();
        let (instance, property) = ids(&mut arena);
        let mut traversal = TraversalContext::new();
        assert_eq!(traversal.current_instance(), None);

        traversal.enter(Scope::Instance(instance));
        traversal.enter(Scope::Property(property));
        assert_eq!(traversal.current_instance(), Some(instance));
        assert_eq!(traversal.current_property_specifier(), Some(property));

        traversal.leave(Scope::Property(property));
        assert_eq!(traversal.current_property_specifier(), None);
        assert_eq!(traversal.current_instance(), Some(instance));
        traversal.leave(Scope::Instance(instance));
        assert_eq!(traversal.depth(), (0, 0));
    }

    #[test]
    fn test_bypass_leaves_instance_stack_alone() {
        let mut arena = DescriptorArena::new();
        let (instance, array) = ids(&mut arena);
        let mut traversal = TraversalContext::new();
        traversal.enter(Scope::Instance(instance));
        traversal.enter(Scope::Element {
            node: array,
            bypass: true,
        });
        assert_eq!(traversal.current_instance(), Some(instance));
        assert_eq!(traversal.current_property_specifier(), Some(array));
        traversal.leave(Scope::Element {
            node: array,
            bypass: true,
        });
        assert_eq!(traversal.depth(), (1, 0));
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn test_pop_underflow_is_fatal() {
        TraversalContext::new().pop_instance();
    }

    #[test]
    #[should_panic(expected = "top frame")]
    fn test_mismatched_leave_is_fatal() {
        let mut arena = DescriptorArena::new();
        let (a, b) = ids(&mut arena);
        let mut traversal = TraversalContext::new();
        traversal.enter(Scope::Property(a));
        traversal.leave(Scope::Property(b));
    }

    #[test]
    fn test_synthesized_ids_skip_reserved_names() {
        let reserved: HashSet<String> = ["inst1".to_string()].into_iter().collect();
        let mut cx = CompilationContext::new("Main", "mxmlContent", reserved);
        let first = cx.assign_id(None, None);
        let second = cx.assign_id(None, None);
        let explicit = cx.assign_id(Some("okButton"), Some("ignored"));
        assert_eq!(first, InstanceId::Synthesized("inst0".to_string()));
        assert_eq!(second, InstanceId::Synthesized("inst2".to_string()));
        assert_eq!(explicit, InstanceId::Explicit("okButton".to_string()));
    }
}
