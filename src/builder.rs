//! Descriptor builder: turns the resolved AST into descriptor trees.
//!
//! The builder descends the AST by hand rather than through
//! [`crate::visitor::ComponentVisitor`] because every step consults and updates
//! the traversal context. Scopes are entered through [`DescriptorBuilder::within`],
//! which restores the previous frame when the closure returns.

use std::collections::HashSet;
use tracing::debug;

use crate::ast::{
    ArrayNode, BindingNode, ComponentDocument, ComponentFactoryNode, EventNode, InstanceNode,
    LiteralKind, LiteralNode, Node, ObjectNode, PropertyNode, SourceLocation, SpecifierKind,
    StateNode,
};
use crate::binding_expr::{
    destination_setter, observed_chains, resolve_source, simple_chain, ExpressionStringifier,
    UnsupportedExpression,
};
use crate::compiler::{compile_with, CompiledDocument};
use crate::context::{CompilationContext, Scope, TraversalContext};
use crate::descriptor::{Descriptor, EventDescriptor, NodeId, PropertyShape};
use crate::diagnostics::{
    CompilerProblem, PROBLEM_UNSUPPORTED_BINDING_DESTINATION, PROBLEM_UNSUPPORTED_BINDING_SOURCE,
};
use crate::options::CompileOptions;
use crate::render::{inline_array, inline_object, literal_text};
use crate::visitor::{walk_instance, ComponentVisitor};

/// A state declaration seen during the base walk, compiled once the base tree
/// has assigned every state-independent id.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingState<'a> {
    pub node: &'a StateNode,
    pub overrides: NodeId,
}

pub struct DescriptorBuilder<'a> {
    pub(crate) document: &'a ComponentDocument,
    pub(crate) options: &'a CompileOptions,
    pub(crate) stringifier: &'a dyn ExpressionStringifier,
    pub(crate) class_name: String,
    pub(crate) traversal: TraversalContext,
    pub(crate) cx: CompilationContext,
    pub(crate) declared_states: Vec<&'a str>,
    /// State whose dependent nodes are currently being compiled.
    pub(crate) active_state: Option<&'a str>,
    pub(crate) pending_states: Vec<PendingState<'a>>,
}

impl<'a> DescriptorBuilder<'a> {
    pub fn new(
        document: &'a ComponentDocument,
        options: &'a CompileOptions,
        stringifier: &'a dyn ExpressionStringifier,
        class_name: String,
    ) -> Self {
        let cx = CompilationContext::new(
            &class_name,
            &options.content_property,
            collect_reserved_ids(document),
        );
        DescriptorBuilder {
            document,
            options,
            stringifier,
            class_name,
            traversal: TraversalContext::new(),
            cx,
            declared_states: document.declared_states(),
            active_state: None,
            pending_states: Vec::new(),
        }
    }

    pub(crate) fn within<R>(&mut self, scope: Scope, f: impl FnOnce(&mut Self) -> R) -> R {
        self.traversal.enter(scope);
        let result = f(self);
        self.traversal.leave(scope);
        result
    }

    pub(crate) fn into_context(self) -> CompilationContext {
        self.cx
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DOCUMENT WALK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Build the base trees, then compile every declared state.
    pub fn build(&mut self) {
        let document = self.document;
        let root = self.cx.properties_root;

        self.within(Scope::Instance(root), |b| {
            for child in &document.root.children {
                b.visit_root_child(child);
            }
        });

        for declaration in &document.declarations {
            self.visit_instance(declaration);
        }

        for script in &document.scripts {
            let text = self.join_statements(&script.statements);
            self.cx.scripts.push(text);
        }

        for declaration in &document.bindings {
            self.compile_binding_declaration(declaration);
        }

        let pending = std::mem::take(&mut self.pending_states);
        for state in pending {
            self.compile_state(state);
        }
    }

    fn visit_root_child(&mut self, child: &'a Node) {
        match child {
            Node::Property(property)
                if property.name == self.options.content_property
                    && property.specifier == SpecifierKind::Property =>
            {
                if !self.is_specifier_active(property.state_suffix.as_deref()) {
                    return;
                }
                if let Some(binding) = property.binding() {
                    self.register_property_binding(None, property, binding);
                    return;
                }
                let previous = self.traversal.set_in_content(true);
                for value in &property.values {
                    self.visit_content_value(value);
                }
                self.traversal.set_in_content(previous);
            }
            Node::Instance(instance) => {
                let previous = self.traversal.set_in_content(true);
                self.visit_instance(instance);
                self.traversal.set_in_content(previous);
            }
            other => self.visit_specifier(other),
        }
    }

    fn visit_content_value(&mut self, value: &'a Node) {
        match value {
            Node::Instance(instance) => {
                self.visit_instance(instance);
            }
            Node::Array(array) => {
                for element in &array.elements {
                    self.visit_content_value(element);
                }
            }
            other => debug!(?other, "ignoring non-instance content value"),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INSTANCES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Whether `node` exists in the tree currently being built.
    fn is_instance_active(&self, node: &InstanceNode) -> bool {
        !node.is_state_dependent()
            || self
                .active_state
                .is_some_and(|state| node.is_present_in(state, &self.declared_states))
    }

    pub(crate) fn visit_instance(&mut self, node: &'a InstanceNode) -> Option<NodeId> {
        if !self.is_instance_active(node) {
            return None;
        }

        let id = self.cx.instance_id(node);
        self.cx.record_instance(&id, &node.class_name);
        let descriptor = self.cx.arena.instance(&node.class_name, Some(id));
        self.attach_instance(descriptor);

        self.within(Scope::Instance(descriptor), |b| {
            for child in &node.children {
                b.visit_specifier(child);
            }
        });
        Some(descriptor)
    }

    fn attach_instance(&mut self, descriptor: NodeId) {
        let parent = match self.traversal.current_property_specifier() {
            Some(property) => property,
            None => {
                if self.traversal.in_content() {
                    self.cx.descriptor_root
                } else {
                    self.cx.properties_root
                }
            }
        };
        self.cx.arena.attach(parent, descriptor);
    }

    fn current_owner(&self) -> NodeId {
        self.traversal
            .current_instance()
            .unwrap_or_else(|| panic!("property specifier visited outside of any instance"))
    }

    /// Dotted-path prefix for members of `owner`; `None` for the document itself.
    pub(crate) fn owner_path(&self, owner: NodeId) -> Option<String> {
        if owner == self.cx.properties_root {
            return None;
        }
        match self.cx.arena.get(owner) {
            Descriptor::Instance(instance) => {
                let id = instance
                    .id
                    .as_ref()
                    .unwrap_or_else(|| panic!("instance of '{}' has no id", instance.class_name));
                Some(id.as_str().to_string())
            }
            Descriptor::Property(property) => {
                panic!("property '{}' cannot own members", property.name)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SPECIFIERS
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn is_specifier_active(&self, suffix: Option<&str>) -> bool {
        match suffix {
            None | Some("") => true,
            Some(suffix) => self.active_state == Some(suffix),
        }
    }

    fn visit_specifier(&mut self, node: &'a Node) {
        match node {
            Node::Property(property) => self.visit_property(property),
            Node::Event(event) => self.visit_event(event),
            Node::Instance(instance) => {
                // Default-property shorthand: a bare child instance is content.
                let owner = self.current_owner();
                let content = self.content_property_of(owner);
                self.within(Scope::Property(content), |b| {
                    b.visit_instance(instance);
                });
            }
            other => debug!(?other, "ignoring non-specifier child of an instance"),
        }
    }

    fn content_property_of(&mut self, owner: NodeId) -> NodeId {
        let name = self.options.content_property.clone();
        if let Some(existing) = self.cx.arena.find_property(owner, &name) {
            return existing;
        }
        let content = self.cx.arena.property(
            &name,
            PropertyShape {
                is_array: true,
                ..PropertyShape::default()
            },
        );
        self.cx.arena.attach(owner, content);
        content
    }

    fn visit_property(&mut self, node: &'a PropertyNode) {
        if !self.is_specifier_active(node.state_suffix.as_deref()) {
            return;
        }
        let owner = self.current_owner();

        if let Some(binding) = node.binding() {
            self.register_property_binding(Some(owner), node, binding);
            return;
        }

        if node.name == self.options.content_property && node.specifier == SpecifierKind::Property
        {
            let content = self.content_property_of(owner);
            self.within(Scope::Property(content), |b| {
                for value in &node.values {
                    b.visit_content_value(value);
                }
            });
            return;
        }

        // A value made only of absent instances is added by state overrides.
        let absent = !node.values.is_empty()
            && node.values.iter().all(|value| {
                matches!(value, Node::Instance(instance) if !self.is_instance_active(instance))
            });
        if absent {
            return;
        }

        let property = self.cx.arena.property(
            &node.name,
            PropertyShape {
                is_style: node.specifier == SpecifierKind::Style,
                ..PropertyShape::default()
            },
        );
        self.cx.arena.attach(owner, property);
        self.within(Scope::Property(property), |b| {
            b.visit_values(property, &node.values)
        });
    }

    /// Fill `property` from its value nodes. Must run with `property` as the
    /// current property specifier.
    pub(crate) fn visit_values(&mut self, property: NodeId, values: &'a [Node]) {
        match values {
            [] => {}
            [Node::Literal(literal)] => self.set_literal(property, literal),
            [Node::Array(array)] => self.visit_array(property, array),
            [Node::Object(object)] => self.visit_object(property, object),
            [Node::Instance(instance)] => {
                self.visit_instance(instance);
            }
            [Node::Factory(factory)] => {
                let value = self.factory_value(&factory.class_name);
                self.set_value(property, value, false);
            }
            [Node::ComponentFactory(factory)] => {
                let class_name = self.compile_sub_document(factory);
                let value = self.factory_value(&class_name);
                self.set_value(property, value, false);
            }
            many => {
                self.mark_array(property);
                for value in many {
                    self.visit_element(value);
                }
            }
        }
    }

    fn set_literal(&mut self, property: NodeId, literal: &LiteralNode) {
        let quoted = literal.kind == LiteralKind::String;
        self.set_value(property, literal.text.clone(), quoted);
    }

    fn set_value(&mut self, property: NodeId, value: String, needs_quoting: bool) {
        let descriptor = self.cx.arena.as_property_mut(property);
        descriptor.value = Some(value);
        descriptor.shape.needs_quoting = needs_quoting;
    }

    fn mark_array(&mut self, property: NodeId) {
        self.cx.arena.as_property_mut(property).shape.is_array = true;
    }

    fn factory_value(&self, class_name: &str) -> String {
        format!("new {}({})", self.options.factory_class, class_name)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ARRAYS AND OBJECTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn visit_array(&mut self, property: NodeId, array: &'a ArrayNode) {
        if array.elements.iter().all(Node::is_scalar) {
            let value = inline_array(&array.elements);
            self.set_value(property, value, false);
            return;
        }
        self.mark_array(property);
        for element in &array.elements {
            self.visit_element(element);
        }
    }

    fn visit_object(&mut self, property: NodeId, object: &'a ObjectNode) {
        if !object.as_instance && object.members.iter().all(|m| m.value.is_scalar()) {
            let value = inline_object(&object.members);
            self.set_value(property, value, false);
            return;
        }
        self.visit_object_instance(object);
    }

    /// Compile an element of an array-valued property. The current property
    /// specifier is the array.
    fn visit_element(&mut self, element: &'a Node) {
        let array = self
            .traversal
            .current_property_specifier()
            .unwrap_or_else(|| panic!("array element visited outside of an array"));
        match element {
            Node::Instance(instance) => {
                self.visit_instance(instance);
            }
            Node::Literal(literal) => {
                let item = self.cx.arena.scalar(
                    "",
                    literal.text.clone(),
                    literal.kind == LiteralKind::String,
                );
                self.cx.arena.attach(array, item);
            }
            Node::Array(nested) => {
                let item = self.cx.arena.property("", PropertyShape::default());
                self.cx.arena.attach(array, item);
                self.within(
                    Scope::Element {
                        node: item,
                        bypass: true,
                    },
                    |b| b.visit_array(item, nested),
                );
            }
            Node::Object(object) => {
                if !object.as_instance && object.members.iter().all(|m| m.value.is_scalar()) {
                    let item = self.cx.arena.scalar("", inline_object(&object.members), false);
                    self.cx.arena.attach(array, item);
                } else {
                    self.visit_object_instance(object);
                }
            }
            Node::State(state) => self.visit_state(state),
            Node::Factory(factory) => {
                let value = self.factory_value(&factory.class_name);
                let item = self.cx.arena.scalar("", value, false);
                self.cx.arena.attach(array, item);
            }
            Node::ComponentFactory(factory) => {
                let class_name = self.compile_sub_document(factory);
                let value = self.factory_value(&class_name);
                let item = self.cx.arena.scalar("", value, false);
                self.cx.arena.attach(array, item);
            }
            other => debug!(?other, "ignoring unsupported array element"),
        }
    }

    /// An object literal compiled as an ordinary instance whose members are
    /// its properties.
    fn visit_object_instance(&mut self, object: &'a ObjectNode) -> NodeId {
        let id = self.cx.assign_id(object.id.as_deref(), None);
        self.cx.record_instance(&id, &object.class_name);
        let descriptor = self.cx.arena.instance(&object.class_name, Some(id));
        self.attach_instance(descriptor);

        self.within(
            Scope::Element {
                node: descriptor,
                bypass: false,
            },
            |b| {
                for member in &object.members {
                    if let Node::Binding(binding) = &member.value {
                        let destination = b
                            .owner_path(descriptor)
                            .map(|owner| format!("{}.{}", owner, member.name));
                        b.register_binding(binding, destination, None);
                        continue;
                    }
                    let property = b.cx.arena.property(&member.name, PropertyShape::default());
                    b.cx.arena.attach(descriptor, property);
                    b.within(Scope::Property(property), |b| {
                        b.visit_values(property, std::slice::from_ref(&member.value))
                    });
                }
            },
        );
        descriptor
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EVENTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn visit_event(&mut self, node: &'a EventNode) {
        if !self.is_specifier_active(node.state_suffix.as_deref()) {
            return;
        }
        let owner = self.current_owner();
        let handler = self.compile_event(node);
        self.cx
            .arena
            .as_instance_mut(owner)
            .events
            .push((node.name.clone(), handler));
    }

    /// Record the handler for `node` in the document's event list and return
    /// its synthesized name.
    pub(crate) fn compile_event(&mut self, node: &EventNode) -> String {
        let handler_name = self.cx.next_handler_name();
        let body = self.join_statements(&node.statements);
        self.cx.events.push(EventDescriptor {
            handler_name: handler_name.clone(),
            event_name: node.name.clone(),
            event_type: node.event_type.clone(),
            body,
        });
        handler_name
    }

    fn join_statements(&mut self, statements: &[crate::ast::Statement]) -> String {
        let mut parts = Vec::with_capacity(statements.len());
        for statement in statements {
            match self.stringifier.stringify_statement(statement) {
                Ok(text) => parts.push(text),
                Err(unsupported) => self.report(PROBLEM_UNSUPPORTED_BINDING_SOURCE, unsupported),
            }
        }
        parts.join(";\n")
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STATES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Emit the state's own descriptor now; its overrides are filled in after
    /// the base walk.
    fn visit_state(&mut self, node: &'a StateNode) {
        let state_class = self.options.state_class.clone();
        let descriptor = self.cx.arena.instance(&state_class, None);
        self.attach_instance(descriptor);

        let name = self.cx.arena.scalar("name", node.name.clone(), true);
        self.cx.arena.attach(descriptor, name);
        let overrides = self.cx.arena.property(
            "overrides",
            PropertyShape {
                is_array: true,
                ..PropertyShape::default()
            },
        );
        self.cx.arena.attach(descriptor, overrides);
        self.pending_states.push(PendingState { node, overrides });
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FACTORIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Compile an inline component as its own document. Its output is hoisted
    /// into this document's side buffer; the returned class name is what the
    /// factory value refers to.
    fn compile_sub_document(&mut self, node: &ComponentFactoryNode) -> String {
        if let Some(known) = self.cx.known_sub_document(node) {
            return known.to_string();
        }
        let class_name = if node.document.class_name.is_empty() {
            self.cx.next_component_name(&self.class_name)
        } else {
            node.document.class_name.clone()
        };
        debug!(parent = %self.class_name, component = %class_name, "compiling inline component");

        let mut compiled: CompiledDocument =
            compile_with(&node.document, self.options, self.stringifier, class_name.clone());
        let nested = std::mem::take(&mut compiled.sub_documents);
        self.cx.sub_documents.push(compiled);
        self.cx.sub_documents.extend(nested);
        self.cx.remember_sub_document(node, class_name.clone());
        class_name
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BINDINGS
    // ═══════════════════════════════════════════════════════════════════════════

    fn register_property_binding(
        &mut self,
        owner: Option<NodeId>,
        property: &PropertyNode,
        binding: &BindingNode,
    ) {
        let owner_path = owner.and_then(|o| self.owner_path(o));
        match property.specifier {
            SpecifierKind::Property => {
                let destination = match owner_path {
                    Some(path) => format!("{}.{}", path, property.name),
                    None => property.name.clone(),
                };
                self.register_binding(binding, Some(destination), None);
            }
            SpecifierKind::Style => {
                let target = owner_path.unwrap_or_else(|| "this".to_string());
                let setter = format!(
                    "{}.setStyle({}, value);",
                    target,
                    literal_text(LiteralKind::String, &property.name)
                );
                self.register_binding(binding, None, Some(setter));
            }
        }
    }

    /// Resolve `binding` and add it to the graph. Unsupported shapes are
    /// reported and the binding is dropped.
    pub(crate) fn register_binding(
        &mut self,
        binding: &BindingNode,
        destination: Option<String>,
        setter: Option<String>,
    ) -> Option<usize> {
        let resolved = resolve_source(binding, self.stringifier)
            .and_then(|source| Ok((source, observed_chains(binding, self.stringifier)?)));
        match resolved {
            Ok((source, chains)) => {
                Some(self.cx.bindings.register(source, destination, setter, &chains))
            }
            Err(unsupported) => {
                self.report(PROBLEM_UNSUPPORTED_BINDING_SOURCE, unsupported);
                None
            }
        }
    }

    fn compile_binding_declaration(&mut self, declaration: &crate::ast::BindingDeclaration) {
        let destination = match self.destination_of(&declaration.destination) {
            Ok(destination) => destination,
            Err(unsupported) => {
                self.report(PROBLEM_UNSUPPORTED_BINDING_DESTINATION, unsupported);
                return;
            }
        };
        let (path, setter) = destination;
        self.register_binding(&declaration.source, path, Some(setter));

        if declaration.two_way {
            let [source] = declaration.source.expressions.as_slice() else {
                self.report(
                    PROBLEM_UNSUPPORTED_BINDING_DESTINATION,
                    UnsupportedExpression {
                        description: "two-way binding source must be a single expression"
                            .to_string(),
                        location: declaration.location,
                    },
                );
                return;
            };
            let reverse_destination = match self.destination_of(source) {
                Ok(destination) => destination,
                Err(unsupported) => {
                    self.report(PROBLEM_UNSUPPORTED_BINDING_DESTINATION, unsupported);
                    return;
                }
            };
            let reverse = BindingNode {
                simple_path: None,
                expressions: vec![declaration.destination.clone()],
                location: declaration.location,
            };
            let (path, setter) = reverse_destination;
            self.register_binding(&reverse, path, Some(setter));
        }
    }

    /// Dotted path (when the destination is a plain chain) and setter statement.
    fn destination_of(
        &self,
        destination: &crate::ast::Expr,
    ) -> Result<(Option<String>, String), UnsupportedExpression> {
        let text = self.stringifier.stringify(destination)?;
        let path = simple_chain(destination)?.map(|(segments, _)| segments.join("."));
        Ok((path, destination_setter(&text)))
    }

    pub(crate) fn report(&mut self, code: &str, unsupported: UnsupportedExpression) {
        let location: SourceLocation = unsupported.location;
        self.cx.problems.push(CompilerProblem::new(
            code,
            &unsupported.description,
            &self.document.file_path,
            location,
        ));
    }
}

/// Explicit and markup-derived ids in the document. Synthesized ids avoid them.
fn collect_reserved_ids(document: &ComponentDocument) -> HashSet<String> {
    struct IdCollector(HashSet<String>);

    impl<'a> ComponentVisitor<'a> for IdCollector {
        fn visit_instance(&mut self, instance: &'a InstanceNode) {
            if let Some(id) = instance.id.as_ref().or(instance.effective_id.as_ref()) {
                self.0.insert(id.clone());
            }
            walk_instance(self, instance);
        }

        fn visit_object(&mut self, object: &'a ObjectNode) {
            if let Some(id) = &object.id {
                self.0.insert(id.clone());
            }
            crate::visitor::walk_object(self, object);
        }
    }

    let mut collector = IdCollector(HashSet::new());
    collector.visit_document(document);
    collector.0
}
