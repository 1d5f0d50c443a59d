//! Text rendering of descriptor trees and the binding/watcher graph.
//!
//! Everything here is a pure function of the arena or graph it is given, so
//! identical inputs always render byte-identical text.

use crate::ast::{LiteralKind, Node, ObjectMember};
use crate::binding::{BindingGraph, BindingSource, WatcherGraph, WatcherKind, WatcherNode};
use crate::descriptor::{Descriptor, DescriptorArena, InstanceDescriptor, InstanceId, NodeId, PropertyDescriptor};

// ═══════════════════════════════════════════════════════════════════════════════
// LITERALS
// ═══════════════════════════════════════════════════════════════════════════════

/// Single-quote `value` with `\`, `'` and line-break escaping.
pub fn quote_single(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

pub fn literal_text(kind: LiteralKind, text: &str) -> String {
    match kind {
        LiteralKind::String => quote_single(text),
        LiteralKind::Number | LiteralKind::Boolean | LiteralKind::Null | LiteralKind::Class => {
            text.to_string()
        }
    }
}

fn scalar_text(node: &Node) -> Option<String> {
    match node {
        Node::Literal(literal) => Some(literal_text(literal.kind, &literal.text)),
        _ => None,
    }
}

/// `[1, 'a']` for an array whose elements are all scalar literals.
pub fn inline_array(elements: &[Node]) -> String {
    let parts: Vec<String> = elements.iter().filter_map(scalar_text).collect();
    format!("[{}]", parts.join(", "))
}

/// `{a: 1, b: 'x'}` for an object whose members are all scalar literals.
pub fn inline_object(members: &[ObjectMember]) -> String {
    let parts: Vec<String> = members
        .iter()
        .filter_map(|m| scalar_text(&m.value).map(|v| format!("{}: {}", m.name, v)))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DESCRIPTOR TREES
// ═══════════════════════════════════════════════════════════════════════════════

struct Renderer<'a> {
    arena: &'a DescriptorArena,
    content_property: &'a str,
}

/// The three per-instance sections plus the trailing children sequence.
#[derive(Default)]
struct Sections {
    properties: Vec<String>,
    styles: Vec<String>,
    events: Vec<String>,
    children: Option<String>,
    property_count: usize,
    style_count: usize,
    event_count: usize,
}

impl<'a> Renderer<'a> {
    fn sections(&self, node: NodeId, instance: &InstanceDescriptor) -> Sections {
        let mut sections = Sections::default();

        if let Some(id) = &instance.id {
            let key = match id {
                InstanceId::Explicit(_) | InstanceId::Effective(_) => "id",
                InstanceId::Synthesized(_) => "_id",
            };
            sections.properties.push(quote_single(key));
            sections.properties.push("true".to_string());
            sections.properties.push(quote_single(id.as_str()));
            sections.property_count += 1;
        }

        for &child in self.arena.children(node) {
            match self.arena.get(child) {
                Descriptor::Property(property) => {
                    if !property.shape.is_style && property.name == self.content_property {
                        sections.children = Some(self.sequence(child));
                        continue;
                    }
                    let (flag, value) = self.property_value(child, property);
                    let target = if property.shape.is_style {
                        sections.style_count += 1;
                        &mut sections.styles
                    } else {
                        sections.property_count += 1;
                        &mut sections.properties
                    };
                    target.push(quote_single(&property.name));
                    target.push(flag.to_string());
                    target.push(value);
                }
                Descriptor::Instance(nested) => {
                    // Declarations hang directly off the document root; they
                    // render as properties named after their id.
                    let name = nested.id.as_ref().map(InstanceId::as_str).unwrap_or_default();
                    sections.properties.push(quote_single(name));
                    sections.properties.push("false".to_string());
                    sections.properties.push(format!("[{}]", self.instance(child)));
                    sections.property_count += 1;
                }
            }
        }

        for (event, handler) in &instance.events {
            sections.events.push(quote_single(event));
            sections.events.push(handler.clone());
            sections.event_count += 1;
        }
        sections
    }

    fn instance_descriptor(&self, node: NodeId) -> &'a InstanceDescriptor {
        match self.arena.get(node) {
            Descriptor::Instance(instance) => instance,
            Descriptor::Property(p) => panic!("expected an instance descriptor, found property '{}'", p.name),
        }
    }

    /// Comma-separated items of one instance, without surrounding brackets.
    fn instance(&self, node: NodeId) -> String {
        let instance = self.instance_descriptor(node);
        let sections = self.sections(node, instance);
        let mut items = vec![instance.class_name.clone()];
        push_section(&mut items, sections.property_count, sections.properties);
        push_section(&mut items, sections.style_count, sections.styles);
        push_section(&mut items, sections.event_count, sections.events);
        items.push(sections.children.unwrap_or_else(|| "null".to_string()));
        items.join(", ")
    }

    /// `(flag, value)` for a property: `true` scalar, `false` single nested
    /// instance, `null` array.
    fn property_value(&self, node: NodeId, property: &PropertyDescriptor) -> (&'static str, String) {
        if property.shape.is_array {
            return ("null", self.sequence(node));
        }
        if let Some(value) = &property.value {
            let text = if property.shape.needs_quoting {
                quote_single(value)
            } else {
                value.clone()
            };
            return ("true", text);
        }
        match self.arena.children(node) {
            [only] if matches!(self.arena.get(*only), Descriptor::Instance(_)) => {
                ("false", format!("[{}]", self.instance(*only)))
            }
            [] => ("true", "null".to_string()),
            _ => ("null", self.sequence(node)),
        }
    }

    /// Children of an array-valued property. Instances are laid out inline one
    /// after another; scalars and nested arrays are single items.
    fn sequence(&self, node: NodeId) -> String {
        let items: Vec<String> = self
            .arena
            .children(node)
            .iter()
            .map(|&child| match self.arena.get(child) {
                Descriptor::Instance(_) => self.instance(child),
                Descriptor::Property(property) => self.property_value(child, property).1,
            })
            .collect();
        format!("[{}]", items.join(", "))
    }
}

fn push_section(items: &mut Vec<String>, count: usize, section: Vec<String>) {
    items.push(count.to_string());
    items.extend(section);
}

/// The document's content: its top instances, one after another.
pub fn render_descriptor_tree(arena: &DescriptorArena, root: NodeId, content_property: &str) -> String {
    Renderer {
        arena,
        content_property,
    }
    .sequence(root)
}

/// The document's own tag: the instance layout without class name or children.
pub fn render_properties_tree(arena: &DescriptorArena, root: NodeId, content_property: &str) -> String {
    let renderer = Renderer {
        arena,
        content_property,
    };
    let sections = renderer.sections(root, renderer.instance_descriptor(root));
    let mut items = Vec::new();
    push_section(&mut items, sections.property_count, sections.properties);
    push_section(&mut items, sections.style_count, sections.styles);
    push_section(&mut items, sections.event_count, sections.events);
    format!("[{}]", items.join(", "))
}

/// Value text of a detached property slot.
pub fn render_property_value(arena: &DescriptorArena, slot: NodeId, content_property: &str) -> String {
    let renderer = Renderer {
        arena,
        content_property,
    };
    match arena.get(slot) {
        Descriptor::Property(property) => renderer.property_value(slot, property).1,
        Descriptor::Instance(_) => format!("[{}]", renderer.instance(slot)),
    }
}

/// One nested sequence per items container, in cache order.
pub fn render_items_descriptors(arena: &DescriptorArena, items: &[NodeId], content_property: &str) -> String {
    let parts: Vec<String> = items
        .iter()
        .map(|&container| render_property_value(arena, container, content_property))
        .collect();
    format!("[{}]", parts.join(", "))
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDINGS AND WATCHERS
// ═══════════════════════════════════════════════════════════════════════════════

/// `[count, (source, setter, destination)*, watcher*]`, or `None` when the
/// document has no bindings.
pub fn render_bindings(graph: &BindingGraph) -> Option<String> {
    if graph.is_empty() {
        return None;
    }
    let mut items = vec![graph.entries().len().to_string()];
    for entry in graph.entries() {
        items.push(render_source(&entry.source));
        items.push(match &entry.destination_setter {
            Some(setter) => format!("function (value) {{ {} }}", setter),
            None => "null".to_string(),
        });
        items.push(match &entry.destination {
            Some(path) => quote_single(path),
            None => "null".to_string(),
        });
    }
    let watchers = graph.watchers();
    for &root in watchers.roots() {
        render_watcher(watchers, watchers.get(root), &mut items);
    }
    Some(format!("[{}]", items.join(", ")))
}

fn render_source(source: &BindingSource) -> String {
    match source {
        BindingSource::DottedPath {
            class_qualifier: None,
            path,
        } => quote_single(path),
        BindingSource::DottedPath {
            class_qualifier: Some(class),
            path,
        } => {
            let mut parts = vec![class.clone()];
            parts.extend(path.split('.').map(quote_single));
            format!("[{}]", parts.join(", "))
        }
        BindingSource::Getter { body } => format!("function() {{ {} }}", body),
    }
}

/// `null` when empty, the bare value when single, a list otherwise.
fn null_single_or_list(values: Vec<String>) -> String {
    match values.len() {
        0 => "null".to_string(),
        1 => values.into_iter().next().unwrap_or_default(),
        _ => format!("[{}]", values.join(", ")),
    }
}

fn render_watcher(graph: &WatcherGraph, watcher: &WatcherNode, out: &mut Vec<String>) {
    out.push(watcher.index.to_string());
    out.push(watcher.kind.code().to_string());
    out.push(quote_single(&watcher.name));
    out.push(null_single_or_list(
        watcher.event_names.iter().map(|e| quote_single(e)).collect(),
    ));
    out.push(null_single_or_list(
        watcher.binding_refs.iter().map(|b| b.to_string()).collect(),
    ));
    match watcher.kind {
        WatcherKind::StaticProperty => out.push(
            watcher
                .class_qualifier
                .clone()
                .unwrap_or_else(|| "null".to_string()),
        ),
        WatcherKind::Function => out.push(format!(
            "function() {{ return [{}]; }}",
            watcher.arguments.as_deref().unwrap_or_default()
        )),
        WatcherKind::Property | WatcherKind::Xml => {}
    }
    if watcher.children.is_empty() {
        out.push("null".to_string());
        return;
    }
    let mut children = Vec::new();
    for &child in &watcher.children {
        render_watcher(graph, graph.get(child), &mut children);
    }
    out.push(format!("[{}]", children.join(", ")));
}
