//! State-dependent override compilation.
//!
//! Nodes that only exist in some states are left out of the base trees. For
//! each declared state the dependent nodes are re-derived into override
//! instructions: `AddItems` for instances (reverse document order), then
//! `SetProperty` / `SetStyle` / `SetEventHandler` for specifiers (document order).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::ast::{EventNode, InstanceNode, Node, PropertyNode, SpecifierKind};
use crate::builder::{DescriptorBuilder, PendingState};
use crate::context::Scope;
use crate::descriptor::{InstanceId, NodeId, PropertyShape};
use crate::render::{render_items_descriptors, render_property_value};

// ═══════════════════════════════════════════════════════════════════════════════
// OVERRIDE MODEL
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ItemsPosition {
    First,
    After { sibling: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OverrideValue {
    /// Rendered value text.
    Literal { text: String },
    /// Index of the binding that writes `<overrideId>.value`.
    Binding { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OverrideDescriptor {
    #[serde(rename_all = "camelCase")]
    SetProperty {
        id: String,
        target: Option<String>,
        name: String,
        value: OverrideValue,
    },
    #[serde(rename_all = "camelCase")]
    SetStyle {
        id: String,
        target: Option<String>,
        name: String,
        value: OverrideValue,
    },
    #[serde(rename_all = "camelCase")]
    SetEventHandler {
        id: String,
        target: Option<String>,
        event_name: String,
        handler_name: String,
    },
    #[serde(rename_all = "camelCase")]
    AddItems {
        id: String,
        items_descriptor_index: usize,
        destination: Option<String>,
        property_name: String,
        position: ItemsPosition,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledState {
    pub name: String,
    pub overrides: Vec<OverrideDescriptor>,
    /// One nested descriptor sequence per distinct instance added by this state.
    pub items_descriptors: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEPENDENCY COLLECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Owner of a dependent node; `None` is the document itself.
type Owner<'a> = Option<&'a InstanceNode>;

#[derive(Debug)]
struct DependentInstance<'a> {
    node: &'a InstanceNode,
    owner: Owner<'a>,
    property: String,
    /// Nearest earlier sibling that exists in every state.
    anchor: Option<&'a InstanceNode>,
}

#[derive(Debug)]
enum DependentSpecifier<'a> {
    Property(&'a PropertyNode, Owner<'a>),
    Event(&'a EventNode, Owner<'a>),
}

struct DependencyCollector<'a, 's> {
    state: &'s str,
    declared: &'s [&'a str],
    content_property: &'s str,
    instances: Vec<DependentInstance<'a>>,
    specifiers: Vec<DependentSpecifier<'a>>,
}

impl<'a, 's> DependencyCollector<'a, 's> {
    /// Walk a state-independent instance. Dependent children are recorded with
    /// their anchor and not descended into: their subtree compiles as a unit.
    fn collect(&mut self, owner: Owner<'a>, instance: &'a InstanceNode) {
        // Content merges across specifiers, so anchors may come from any earlier
        // content occurrence. Each occurrence is still collected in source order.
        let mut content: Vec<&'a InstanceNode> = Vec::new();

        for child in &instance.children {
            match child {
                Node::Property(property) => {
                    if property.is_state_dependent() {
                        if property.state_suffix.as_deref() == Some(self.state) {
                            self.specifiers
                                .push(DependentSpecifier::Property(property, owner));
                        }
                        continue;
                    }
                    if property.name == self.content_property
                        && property.specifier == SpecifierKind::Property
                    {
                        let start = content.len();
                        content.extend(instance_values(&property.values));
                        self.collect_group(owner, self.content_property, &content, start);
                    } else {
                        let group = instance_values(&property.values);
                        self.collect_group(owner, &property.name, &group, 0);
                    }
                }
                Node::Instance(bare) => {
                    let start = content.len();
                    content.push(bare);
                    self.collect_group(owner, self.content_property, &content, start);
                }
                Node::Event(event) if event.state_suffix.as_deref() == Some(self.state) => {
                    self.specifiers.push(DependentSpecifier::Event(event, owner));
                }
                _ => {}
            }
        }
    }

    /// Collect `siblings[start..]`; earlier siblings only serve as anchors.
    /// `owner` is the instance the group belongs to and the destination of any
    /// `AddItems` produced for it.
    fn collect_group(
        &mut self,
        owner: Owner<'a>,
        property: &str,
        siblings: &[&'a InstanceNode],
        start: usize,
    ) {
        for (index, &sibling) in siblings.iter().enumerate().skip(start) {
            if !sibling.is_state_dependent() {
                self.collect(Some(sibling), sibling);
                continue;
            }
            if !sibling.is_present_in(self.state, self.declared) {
                continue;
            }
            let anchor = siblings[..index]
                .iter()
                .rev()
                .copied()
                .find(|earlier| !earlier.is_state_dependent());
            self.instances.push(DependentInstance {
                node: sibling,
                owner,
                property: property.to_string(),
                anchor,
            });
        }
    }
}

/// Instances directly listed in a property's values, arrays flattened.
fn instance_values(values: &[Node]) -> Vec<&InstanceNode> {
    let mut out = Vec::new();
    for value in values {
        match value {
            Node::Instance(instance) => out.push(instance),
            Node::Array(array) => out.extend(instance_values(&array.elements)),
            _ => {}
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE COMPILATION
// ═══════════════════════════════════════════════════════════════════════════════

impl<'a> DescriptorBuilder<'a> {
    pub(crate) fn compile_state(&mut self, pending: PendingState<'a>) {
        let state = pending.node.name.as_str();
        debug!(document = %self.class_name, state, "compiling state overrides");

        let document = self.document;
        let options = self.options;
        let declared = self.declared_states.clone();
        let mut collector = DependencyCollector {
            state,
            declared: &declared,
            content_property: &options.content_property,
            instances: Vec::new(),
            specifiers: Vec::new(),
        };
        collector.collect(None, &document.root);
        for declaration in &document.declarations {
            if !declaration.is_state_dependent() {
                collector.collect(Some(declaration), declaration);
            }
        }
        let DependencyCollector {
            instances,
            specifiers,
            ..
        } = collector;

        let previous = self.active_state.replace(state);
        let mut overrides = Vec::new();
        let mut items: Vec<NodeId> = Vec::new();
        let mut cache: HashMap<*const InstanceNode, usize> = HashMap::new();

        for dependent in instances.iter().rev() {
            let key = dependent.node as *const InstanceNode;
            let index = match cache.get(&key) {
                Some(&index) => index,
                None => {
                    let container = self.cx.arena.property(
                        "itemsDescriptor",
                        PropertyShape {
                            is_array: true,
                            ..PropertyShape::default()
                        },
                    );
                    self.within(Scope::Property(container), |b| {
                        b.visit_instance(dependent.node);
                    });
                    items.push(container);
                    cache.insert(key, items.len() - 1);
                    items.len() - 1
                }
            };

            let position = match dependent.anchor {
                Some(sibling) => ItemsPosition::After {
                    sibling: self.compiled_id(sibling).to_string(),
                },
                None => ItemsPosition::First,
            };
            let destination = dependent.owner.map(|o| self.compiled_id(o).to_string());
            let id = self.cx.next_override_id(self.document.short_name(), "AddItems");
            overrides.push(OverrideDescriptor::AddItems {
                id,
                items_descriptor_index: index,
                destination,
                property_name: dependent.property.clone(),
                position,
            });
        }

        for dependent in &specifiers {
            let overridden = match *dependent {
                DependentSpecifier::Property(property, owner) => {
                    self.compile_set_property(property, owner)
                }
                DependentSpecifier::Event(event, owner) => {
                    let target = owner.map(|o| self.compiled_id(o).to_string());
                    let handler_name = self.compile_event(event);
                    OverrideDescriptor::SetEventHandler {
                        id: self.cx.next_override_id(self.document.short_name(), "SetEventHandler"),
                        target,
                        event_name: event.name.clone(),
                        handler_name,
                    }
                }
            };
            overrides.push(overridden);
        }
        self.active_state = previous;

        for descriptor in &overrides {
            let rendered = self.override_instance(descriptor);
            self.cx.arena.attach(pending.overrides, rendered);
        }

        let items_descriptors =
            render_items_descriptors(&self.cx.arena, &items, &self.options.content_property);
        self.cx.states.push(CompiledState {
            name: state.to_string(),
            overrides,
            items_descriptors,
        });
    }

    fn compile_set_property(
        &mut self,
        property: &'a PropertyNode,
        owner: Owner<'a>,
    ) -> OverrideDescriptor {
        let target = owner.map(|o| self.compiled_id(o).to_string());
        let kind = match property.specifier {
            SpecifierKind::Property => "SetProperty",
            SpecifierKind::Style => "SetStyle",
        };
        let id = self.cx.next_override_id(self.document.short_name(), kind);

        let value = match property.binding() {
            Some(binding) => {
                let destination = format!("{}.value", id);
                match self.register_binding(binding, Some(destination), None) {
                    Some(index) => OverrideValue::Binding { index },
                    None => OverrideValue::Literal {
                        text: "undefined".to_string(),
                    },
                }
            }
            None => {
                // Build the value detached from both trees, then render it.
                let slot = self.cx.arena.property(&property.name, PropertyShape::default());
                self.within(Scope::Property(slot), |b| b.visit_values(slot, &property.values));
                OverrideValue::Literal {
                    text: render_property_value(
                        &self.cx.arena,
                        slot,
                        &self.options.content_property,
                    ),
                }
            }
        };

        let name = property.name.clone();
        match property.specifier {
            SpecifierKind::Property => OverrideDescriptor::SetProperty {
                id,
                target,
                name,
                value,
            },
            SpecifierKind::Style => OverrideDescriptor::SetStyle {
                id,
                target,
                name,
                value,
            },
        }
    }

    /// Id of an instance the base walk or an earlier override already compiled.
    fn compiled_id(&self, node: &InstanceNode) -> &str {
        match self.cx.known_instance_id(node) {
            Some(id) => id.as_str(),
            None => panic!(
                "override references instance of '{}' at {}:{} that was never compiled",
                node.class_name, node.location.line, node.location.column
            ),
        }
    }

    /// Render an override as an instance of its runtime class under the state's
    /// `overrides` array.
    fn override_instance(&mut self, descriptor: &OverrideDescriptor) -> NodeId {
        let options = self.options;
        let (class_name, id) = match descriptor {
            OverrideDescriptor::SetProperty { id, .. } => (&options.set_property_class, id),
            OverrideDescriptor::SetStyle { id, .. } => (&options.set_style_class, id),
            OverrideDescriptor::SetEventHandler { id, .. } => (&options.set_event_handler_class, id),
            OverrideDescriptor::AddItems { id, .. } => (&options.add_items_class, id),
        };
        let instance = self
            .cx
            .arena
            .instance(class_name, Some(InstanceId::Synthesized(id.clone())));

        let mut fields: Vec<(&str, String, bool)> = Vec::new();
        match descriptor {
            OverrideDescriptor::SetProperty {
                target, name, value, ..
            }
            | OverrideDescriptor::SetStyle {
                target, name, value, ..
            } => {
                if let Some(target) = target {
                    fields.push(("target", target.clone(), true));
                }
                fields.push(("name", name.clone(), true));
                if let OverrideValue::Literal { text } = value {
                    fields.push(("value", text.clone(), false));
                }
            }
            OverrideDescriptor::SetEventHandler {
                target,
                event_name,
                handler_name,
                ..
            } => {
                if let Some(target) = target {
                    fields.push(("target", target.clone(), true));
                }
                fields.push(("name", event_name.clone(), true));
                fields.push(("handlerFunction", handler_name.clone(), false));
            }
            OverrideDescriptor::AddItems {
                items_descriptor_index,
                destination,
                property_name,
                position,
                ..
            } => {
                fields.push(("itemsDescriptorIndex", items_descriptor_index.to_string(), false));
                if let Some(destination) = destination {
                    fields.push(("destination", destination.clone(), true));
                }
                fields.push(("propertyName", property_name.clone(), true));
                match position {
                    ItemsPosition::First => fields.push(("position", "first".to_string(), true)),
                    ItemsPosition::After { sibling } => {
                        fields.push(("position", "after".to_string(), true));
                        fields.push(("relativeTo", sibling.clone(), true));
                    }
                }
            }
        }

        for (name, value, quoted) in fields {
            let field = self.cx.arena.scalar(name, value, quoted);
            self.cx.arena.attach(instance, field);
        }
        instance
    }
}
