use crate::ast::{
    ArrayNode, ComponentDocument, EventNode, InstanceNode, Node, ObjectNode, PropertyNode,
};

/// The ComponentVisitor trait is the shared read-only traversal over a resolved
/// component AST.
///
/// Rules:
/// 1. Traversal order is source order and fixed.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers MUST call `walk_*` functions to continue traversal unless pruning is intended.
/// 4. Inline component factories are separate documents and are never entered.
///
/// The descriptor builder does not use this trait: it needs to thread traversal
/// context through every step and dispatches by hand.
pub trait ComponentVisitor<'a> {
    fn visit_document(&mut self, document: &'a ComponentDocument) {
        walk_document(self, document);
    }

    fn visit_node(&mut self, node: &'a Node) {
        walk_node(self, node);
    }

    fn visit_instance(&mut self, instance: &'a InstanceNode) {
        walk_instance(self, instance);
    }

    fn visit_property(&mut self, property: &'a PropertyNode) {
        walk_property(self, property);
    }

    fn visit_event(&mut self, _event: &'a EventNode) {
        // Leaf node, nothing to walk by default
    }

    fn visit_array(&mut self, array: &'a ArrayNode) {
        walk_array(self, array);
    }

    fn visit_object(&mut self, object: &'a ObjectNode) {
        walk_object(self, object);
    }
}

pub fn walk_document<'a, V: ComponentVisitor<'a> + ?Sized>(
    visitor: &mut V,
    document: &'a ComponentDocument,
) {
    walk_instance(visitor, &document.root);
    for declaration in &document.declarations {
        visitor.visit_instance(declaration);
    }
}

pub fn walk_node<'a, V: ComponentVisitor<'a> + ?Sized>(visitor: &mut V, node: &'a Node) {
    match node {
        Node::Instance(i) => visitor.visit_instance(i),
        Node::Property(p) => visitor.visit_property(p),
        Node::Event(e) => visitor.visit_event(e),
        Node::Array(a) => visitor.visit_array(a),
        Node::Object(o) => visitor.visit_object(o),
        Node::Literal(_)
        | Node::Binding(_)
        | Node::Factory(_)
        | Node::ComponentFactory(_)
        | Node::State(_) => {}
    }
}

pub fn walk_instance<'a, V: ComponentVisitor<'a> + ?Sized>(
    visitor: &mut V,
    instance: &'a InstanceNode,
) {
    for child in &instance.children {
        visitor.visit_node(child);
    }
}

pub fn walk_property<'a, V: ComponentVisitor<'a> + ?Sized>(
    visitor: &mut V,
    property: &'a PropertyNode,
) {
    for value in &property.values {
        visitor.visit_node(value);
    }
}

pub fn walk_array<'a, V: ComponentVisitor<'a> + ?Sized>(visitor: &mut V, array: &'a ArrayNode) {
    for element in &array.elements {
        visitor.visit_node(element);
    }
}

pub fn walk_object<'a, V: ComponentVisitor<'a> + ?Sized>(visitor: &mut V, object: &'a ObjectNode) {
    for member in &object.members {
        visitor.visit_node(&member.value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;

    #[derive(Default)]
    struct ClassCollector(Vec<String>);

    impl<'a> ComponentVisitor<'a> for ClassCollector {
        fn visit_instance(&mut self, instance: &'a InstanceNode) {
            self.0.push(instance.class_name.clone());
            walk_instance(self, instance);
        }
    }

    #[test]
    fn test_source_order_and_factories_not_entered() {
        let inner = document("acme.Renderer", vec![content(vec![instance_child(instance("Hidden"))])]);
        let list = instance_with(
            "List",
            vec![
                prop("layout", vec![instance_child(instance("VerticalLayout"))]),
                prop("itemRenderer", vec![component_factory(inner)]),
            ],
        );
        let mut doc = document(
            "acme.Main",
            vec![content(vec![array(vec![instance_child(list)]), instance_child(instance("Button"))])],
        );
        doc.declarations.push(instance("mx.rpc.HTTPService"));

        let mut collector = ClassCollector::default();
        collector.visit_document(&doc);
        assert_eq!(
            collector.0,
            vec!["List", "VerticalLayout", "Button", "mx.rpc.HTTPService"]
        );
    }
}
