//! Resolved component AST consumed by the descriptor compiler.
//!
//! The upstream resolver owns parsing and type resolution; by the time a document
//! reaches this crate every class and member reference is qualified and every
//! binding expression has been lowered to an [`Expr`] tree.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE LOCATIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOCUMENT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDocument {
    #[serde(default)]
    pub file_path: String,
    /// Qualified name of the class this document defines.
    pub class_name: String,
    /// The document's own tag. Its specifiers feed the properties tree, except the
    /// content property which feeds the descriptor tree.
    pub root: InstanceNode,
    #[serde(default)]
    pub declarations: Vec<InstanceNode>,
    #[serde(default)]
    pub scripts: Vec<ScriptNode>,
    #[serde(default)]
    pub bindings: Vec<BindingDeclaration>,
}

impl ComponentDocument {
    /// Unqualified class name, used for synthesized override ids.
    pub fn short_name(&self) -> &str {
        self.class_name
            .rsplit('.')
            .next()
            .unwrap_or(self.class_name.as_str())
    }

    /// Names of every state declared on the document's own tag, in source order.
    /// States wrapped in an array literal count too.
    pub fn declared_states(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for child in &self.root.children {
            if let Node::Property(prop) = child {
                collect_state_names(&prop.values, &mut names);
            }
        }
        names
    }
}

fn collect_state_names<'a>(values: &'a [Node], out: &mut Vec<&'a str>) {
    for value in values {
        match value {
            Node::State(state) => out.push(state.name.as_str()),
            Node::Array(array) => collect_state_names(&array.elements, out),
            _ => {}
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Node {
    Instance(InstanceNode),
    Property(PropertyNode),
    Event(EventNode),
    Array(ArrayNode),
    Object(ObjectNode),
    Literal(LiteralNode),
    Binding(BindingNode),
    Factory(FactoryNode),
    ComponentFactory(ComponentFactoryNode),
    State(StateNode),
}

impl Node {
    /// Scalar literals are the only nodes an inline array/object value may hold.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Node::Literal(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceNode {
    pub class_name: String,
    #[serde(default)]
    pub id: Option<String>,
    /// Id the markup layer derived for this instance when no explicit id was given.
    #[serde(default)]
    pub effective_id: Option<String>,
    #[serde(default)]
    pub include_in: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_from: Option<Vec<String>>,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default)]
    pub location: SourceLocation,
}

impl InstanceNode {
    pub fn is_state_dependent(&self) -> bool {
        self.include_in.is_some() || self.exclude_from.is_some()
    }

    /// Whether this instance exists while `state` is active. `declared` is the
    /// full state list of the enclosing document, used to expand `excludeFrom`.
    pub fn is_present_in(&self, state: &str, declared: &[&str]) -> bool {
        if let Some(include) = &self.include_in {
            return include.iter().any(|s| s == state);
        }
        if let Some(exclude) = &self.exclude_from {
            return declared.contains(&state) && !exclude.iter().any(|s| s == state);
        }
        false
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpecifierKind {
    #[default]
    Property,
    Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyNode {
    pub name: String,
    #[serde(default)]
    pub specifier: SpecifierKind,
    #[serde(default)]
    pub state_suffix: Option<String>,
    #[serde(default)]
    pub values: Vec<Node>,
    #[serde(default)]
    pub location: SourceLocation,
}

impl PropertyNode {
    pub fn is_state_dependent(&self) -> bool {
        self.state_suffix.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// The binding driving this property's value, if any.
    ///
    /// A bound property has exactly one value; a binding with siblings means the
    /// resolver handed over a malformed specifier.
    pub fn binding(&self) -> Option<&BindingNode> {
        let binding = self.values.iter().find_map(|v| match v {
            Node::Binding(b) => Some(b),
            _ => None,
        })?;
        assert!(
            self.values.len() == 1,
            "bound property '{}' at {}:{} has {} values; a binding must be the only value",
            self.name,
            self.location.line,
            self.location.column,
            self.values.len()
        );
        Some(binding)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNode {
    pub name: String,
    /// Resolved type of the handler's event parameter.
    pub event_type: String,
    #[serde(default)]
    pub state_suffix: Option<String>,
    #[serde(default)]
    pub statements: Vec<Statement>,
    #[serde(default)]
    pub location: SourceLocation,
}

impl EventNode {
    pub fn is_state_dependent(&self) -> bool {
        self.state_suffix.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayNode {
    #[serde(default)]
    pub elements: Vec<Node>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectNode {
    #[serde(default = "default_object_class")]
    pub class_name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub members: Vec<ObjectMember>,
    /// Set when the owning property is typed to expect an object instance rather
    /// than an inline value.
    #[serde(default)]
    pub as_instance: bool,
    #[serde(default)]
    pub location: SourceLocation,
}

fn default_object_class() -> String {
    "Object".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMember {
    pub name: String,
    pub value: Node,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LiteralKind {
    String,
    Number,
    Boolean,
    Null,
    Class,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteralNode {
    pub kind: LiteralKind,
    /// Unquoted source text of the literal.
    pub text: String,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingNode {
    /// Path the resolver already proved to be a plain dotted path.
    #[serde(default)]
    pub simple_path: Option<String>,
    pub expressions: Vec<Expr>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingDeclaration {
    pub source: BindingNode,
    pub destination: Expr,
    #[serde(default)]
    pub two_way: bool,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryNode {
    pub class_name: String,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentFactoryNode {
    pub document: Box<ComponentDocument>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateNode {
    pub name: String,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptNode {
    #[serde(default)]
    pub statements: Vec<Statement>,
    #[serde(default)]
    pub location: SourceLocation,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CODE FRAGMENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Statement {
    Expression(ExpressionStatement),
    /// Statement text the resolver already rendered.
    Raw(RawStatement),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionStatement {
    pub expression: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatement {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberRef {
    pub name: String,
    /// Declaring class, present for static members.
    #[serde(default)]
    pub declaring_class: Option<String>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub is_xml: bool,
    /// Change-notification events that announce a new value for this member.
    #[serde(default)]
    pub change_events: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Expr {
    Identifier(IdentifierExpr),
    MemberAccess(MemberAccessExpr),
    Cast(CastExpr),
    Call(CallExpr),
    StringLiteral(StringLiteralExpr),
    Literal(LiteralExpr),
    Binary(BinaryExpr),
    /// Any expression kind the resolver did not lower for this crate.
    Unsupported(UnsupportedExpr),
}

impl Expr {
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::Identifier(e) => e.location,
            Expr::MemberAccess(e) => e.location,
            Expr::Cast(e) => e.location,
            Expr::Call(e) => e.location,
            Expr::StringLiteral(e) => e.location,
            Expr::Literal(e) => e.location,
            Expr::Binary(e) => e.location,
            Expr::Unsupported(e) => e.location,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierExpr {
    pub member: MemberRef,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAccessExpr {
    pub object: Box<Expr>,
    pub member: MemberRef,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastExpr {
    pub expression: Box<Expr>,
    pub class_name: String,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallExpr {
    pub callee: Box<Expr>,
    #[serde(default)]
    pub arguments: Vec<Expr>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringLiteralExpr {
    pub value: String,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteralExpr {
    pub text: String,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryExpr {
    pub operator: String,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsupportedExpr {
    pub description: String,
    #[serde(default)]
    pub location: SourceLocation,
}
