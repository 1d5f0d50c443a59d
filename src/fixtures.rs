//! AST constructors shared by the unit tests.

use crate::ast::*;

// ═══════════════════════════════════════════════════════════════════════════════
// DOCUMENTS AND NODES
// ═══════════════════════════════════════════════════════════════════════════════

pub fn document(class_name: &str, root_children: Vec<Node>) -> ComponentDocument {
    ComponentDocument {
        file_path: format!("{}.mxml", class_name.replace('.', "/")),
        class_name: class_name.to_string(),
        root: InstanceNode {
            class_name: "spark.components.Application".to_string(),
            id: None,
            effective_id: None,
            include_in: None,
            exclude_from: None,
            children: root_children,
            location: SourceLocation::default(),
        },
        declarations: Vec::new(),
        scripts: Vec::new(),
        bindings: Vec::new(),
    }
}

pub fn instance(class_name: &str) -> InstanceNode {
    instance_with(class_name, Vec::new())
}

pub fn instance_with(class_name: &str, children: Vec<Node>) -> InstanceNode {
    InstanceNode {
        class_name: class_name.to_string(),
        id: None,
        effective_id: None,
        include_in: None,
        exclude_from: None,
        children,
        location: SourceLocation::default(),
    }
}

pub fn with_id(mut node: InstanceNode, id: &str) -> InstanceNode {
    node.id = Some(id.to_string());
    node
}

pub fn include_in(mut node: InstanceNode, states: &[&str]) -> InstanceNode {
    node.include_in = Some(states.iter().map(|s| s.to_string()).collect());
    node
}

pub fn exclude_from(mut node: InstanceNode, states: &[&str]) -> InstanceNode {
    node.exclude_from = Some(states.iter().map(|s| s.to_string()).collect());
    node
}

pub fn instance_child(node: InstanceNode) -> Node {
    Node::Instance(node)
}

fn specifier(name: &str, kind: SpecifierKind, suffix: Option<&str>, values: Vec<Node>) -> Node {
    Node::Property(PropertyNode {
        name: name.to_string(),
        specifier: kind,
        state_suffix: suffix.map(str::to_string),
        values,
        location: SourceLocation::default(),
    })
}

pub fn prop(name: &str, values: Vec<Node>) -> Node {
    specifier(name, SpecifierKind::Property, None, values)
}

pub fn prop_in(name: &str, state: &str, values: Vec<Node>) -> Node {
    specifier(name, SpecifierKind::Property, Some(state), values)
}

pub fn style(name: &str, values: Vec<Node>) -> Node {
    specifier(name, SpecifierKind::Style, None, values)
}

pub fn style_in(name: &str, state: &str, values: Vec<Node>) -> Node {
    specifier(name, SpecifierKind::Style, Some(state), values)
}

pub fn content(values: Vec<Node>) -> Node {
    prop("mxmlContent", values)
}

pub fn literal(kind: LiteralKind, text: &str) -> Node {
    Node::Literal(LiteralNode {
        kind,
        text: text.to_string(),
        location: SourceLocation::default(),
    })
}

pub fn text(value: &str) -> Node {
    literal(LiteralKind::String, value)
}

pub fn number(value: &str) -> Node {
    literal(LiteralKind::Number, value)
}

pub fn array(elements: Vec<Node>) -> Node {
    Node::Array(ArrayNode {
        elements,
        location: SourceLocation::default(),
    })
}

pub fn object(members: Vec<(&str, Node)>) -> Node {
    Node::Object(ObjectNode {
        class_name: "Object".to_string(),
        id: None,
        members: members
            .into_iter()
            .map(|(name, value)| ObjectMember {
                name: name.to_string(),
                value,
            })
            .collect(),
        as_instance: false,
        location: SourceLocation::default(),
    })
}

/// Object literal typed as an instance of `class_name`.
pub fn object_instance(class_name: &str, id: Option<&str>, members: Vec<(&str, Node)>) -> Node {
    let Node::Object(mut node) = object(members) else {
        unreachable!("object() builds an object node")
    };
    node.class_name = class_name.to_string();
    node.id = id.map(str::to_string);
    node.as_instance = true;
    Node::Object(node)
}

pub fn bound(expressions: Vec<Expr>) -> Node {
    Node::Binding(bind(expressions))
}

pub fn event(name: &str, statements: &[&str]) -> Node {
    Node::Event(event_node(name, None, statements))
}

pub fn event_in(name: &str, state: &str, statements: &[&str]) -> Node {
    Node::Event(event_node(name, Some(state), statements))
}

fn event_node(name: &str, suffix: Option<&str>, statements: &[&str]) -> EventNode {
    EventNode {
        name: name.to_string(),
        event_type: "flash.events.MouseEvent".to_string(),
        state_suffix: suffix.map(str::to_string),
        statements: statements
            .iter()
            .map(|text| {
                Statement::Raw(RawStatement {
                    text: text.to_string(),
                })
            })
            .collect(),
        location: SourceLocation::default(),
    }
}

pub fn state(name: &str) -> Node {
    Node::State(StateNode {
        name: name.to_string(),
        location: SourceLocation::default(),
    })
}

/// `states` specifier declaring each named state.
pub fn states(names: &[&str]) -> Node {
    prop("states", names.iter().map(|name| state(name)).collect())
}

pub fn factory(class_name: &str) -> Node {
    Node::Factory(FactoryNode {
        class_name: class_name.to_string(),
        location: SourceLocation::default(),
    })
}

pub fn component_factory(document: ComponentDocument) -> Node {
    Node::ComponentFactory(ComponentFactoryNode {
        document: Box::new(document),
        location: SourceLocation::default(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSIONS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn bind(expressions: Vec<Expr>) -> BindingNode {
    BindingNode {
        simple_path: None,
        expressions,
        location: SourceLocation::default(),
    }
}

fn member_ref(name: &str) -> MemberRef {
    MemberRef {
        name: name.to_string(),
        declaring_class: None,
        is_static: false,
        is_public: true,
        is_xml: false,
        change_events: vec!["propertyChange".to_string()],
    }
}

pub fn ident(name: &str) -> Expr {
    Expr::Identifier(IdentifierExpr {
        member: member_ref(name),
        location: SourceLocation::default(),
    })
}

pub fn static_ident(class_name: &str, name: &str) -> Expr {
    let mut member = member_ref(name);
    member.declaring_class = Some(class_name.to_string());
    member.is_static = true;
    Expr::Identifier(IdentifierExpr {
        member,
        location: SourceLocation::default(),
    })
}

pub fn member(object: Expr, name: &str) -> Expr {
    Expr::MemberAccess(MemberAccessExpr {
        object: Box::new(object),
        member: member_ref(name),
        location: SourceLocation::default(),
    })
}

pub fn cast(expression: Expr, class_name: &str) -> Expr {
    Expr::Cast(CastExpr {
        expression: Box::new(expression),
        class_name: class_name.to_string(),
        location: SourceLocation::default(),
    })
}

pub fn call(callee: Expr, arguments: Vec<Expr>) -> Expr {
    Expr::Call(CallExpr {
        callee: Box::new(callee),
        arguments,
        location: SourceLocation::default(),
    })
}

pub fn string(value: &str) -> Expr {
    Expr::StringLiteral(StringLiteralExpr {
        value: value.to_string(),
        location: SourceLocation::default(),
    })
}

pub fn unsupported(description: &str) -> Expr {
    Expr::Unsupported(UnsupportedExpr {
        description: description.to_string(),
        location: SourceLocation { line: 7, column: 3 },
    })
}
