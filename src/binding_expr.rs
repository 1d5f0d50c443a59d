//! Binding expression analysis: source encoding, destination setters and the
//! observed chains that feed the watcher graph.

use lazy_static::lazy_static;
use regex::Regex;

use crate::ast::{BindingNode, Expr, MemberRef, SourceLocation, Statement};
use crate::binding::{BindingSource, WatchSegment, WatcherKind};

lazy_static! {
    /// `<object>.get_<member>()`, an accessor-backed destination.
    static ref GETTER_CALL_RE: Regex = Regex::new(r"^(.+)\.get_(\w+)\(\)$").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// STRINGIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// An expression shape the stringifier or path analysis cannot handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedExpression {
    pub description: String,
    pub location: SourceLocation,
}

/// Renders non-declarative code fragments: getter bodies, setter targets,
/// event handler and script statements.
pub trait ExpressionStringifier {
    fn stringify(&self, expr: &Expr) -> Result<String, UnsupportedExpression>;

    fn stringify_statement(&self, statement: &Statement) -> Result<String, UnsupportedExpression> {
        match statement {
            Statement::Expression(s) => self.stringify(&s.expression),
            Statement::Raw(raw) => Ok(raw.text.clone()),
        }
    }
}

/// Stringifier for the expression kinds the resolver lowers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStringifier;

impl ExpressionStringifier for DefaultStringifier {
    fn stringify(&self, expr: &Expr) -> Result<String, UnsupportedExpression> {
        Ok(match expr {
            Expr::Identifier(e) => match (&e.member.declaring_class, e.member.is_static) {
                (Some(class), true) => format!("{}.{}", class, e.member.name),
                _ => e.member.name.clone(),
            },
            Expr::MemberAccess(e) => format!("{}.{}", self.stringify(&e.object)?, e.member.name),
            Expr::Cast(e) => format!("({} as {})", self.stringify(&e.expression)?, e.class_name),
            Expr::Call(e) => format!(
                "{}({})",
                self.stringify(&e.callee)?,
                stringify_list(self, &e.arguments)?
            ),
            Expr::StringLiteral(e) => quote_double(&e.value),
            Expr::Literal(e) => e.text.clone(),
            Expr::Binary(e) => format!(
                "{} {} {}",
                self.stringify(&e.left)?,
                e.operator,
                self.stringify(&e.right)?
            ),
            Expr::Unsupported(e) => {
                return Err(UnsupportedExpression {
                    description: e.description.clone(),
                    location: e.location,
                })
            }
        })
    }
}

fn stringify_list(
    stringifier: &(impl ExpressionStringifier + ?Sized),
    exprs: &[Expr],
) -> Result<String, UnsupportedExpression> {
    let parts = exprs
        .iter()
        .map(|e| stringifier.stringify(e))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(", "))
}

pub fn quote_double(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE RESOLUTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Pick the source encoding for a binding: a precomputed path, a derived
/// dotted path, or an anonymous getter, in that order.
pub fn resolve_source(
    binding: &BindingNode,
    stringifier: &dyn ExpressionStringifier,
) -> Result<BindingSource, UnsupportedExpression> {
    let single = match binding.expressions.as_slice() {
        [only] => Some(only),
        _ => None,
    };

    if let Some(path) = &binding.simple_path {
        let class_qualifier = match single {
            Some(expr) => simple_chain(expr)?.and_then(|(_, qualifier)| qualifier),
            None => None,
        };
        return Ok(BindingSource::DottedPath {
            class_qualifier,
            path: path.clone(),
        });
    }

    if let Some(expr) = single {
        if let Some((segments, class_qualifier)) = simple_chain(expr)? {
            return Ok(BindingSource::DottedPath {
                class_qualifier,
                path: segments.join("."),
            });
        }
    }

    let parts = binding
        .expressions
        .iter()
        .map(|expr| match expr {
            Expr::StringLiteral(s) => Ok(quote_double(&s.value)),
            other => stringifier.stringify(other),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BindingSource::Getter {
        body: format!("return {};", parts.join(" + ")),
    })
}

/// Segments of a plain public member chain, plus the declaring class when the
/// chain starts at a static member. `None` means "not a simple path".
pub fn simple_chain(
    expr: &Expr,
) -> Result<Option<(Vec<String>, Option<String>)>, UnsupportedExpression> {
    match expr {
        Expr::Identifier(e) => {
            if !e.member.is_public {
                return Ok(None);
            }
            let qualifier = if e.member.is_static {
                e.member.declaring_class.clone()
            } else {
                None
            };
            Ok(Some((vec![e.member.name.clone()], qualifier)))
        }
        Expr::MemberAccess(e) => {
            if !e.member.is_public {
                return Ok(None);
            }
            Ok(simple_chain(&e.object)?.map(|(mut segments, qualifier)| {
                segments.push(e.member.name.clone());
                (segments, qualifier)
            }))
        }
        Expr::Cast(e) => simple_chain(&e.expression),
        Expr::Unsupported(e) => Err(UnsupportedExpression {
            description: e.description.clone(),
            location: e.location,
        }),
        _ => Ok(None),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DESTINATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Statement writing `value` into the stringified destination. Accessor-backed
/// destinations route through their setter.
pub fn destination_setter(destination: &str) -> String {
    match GETTER_CALL_RE.captures(destination) {
        Some(caps) => format!("{}.set_{}(value)", &caps[1], &caps[2]),
        None => format!("{} = value;", destination),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OBSERVED CHAINS
// ═══════════════════════════════════════════════════════════════════════════════

/// Every member chain the binding observes, one per top-level observed expression.
pub fn observed_chains(
    binding: &BindingNode,
    stringifier: &dyn ExpressionStringifier,
) -> Result<Vec<Vec<WatchSegment>>, UnsupportedExpression> {
    let mut chains = Vec::new();
    for expr in &binding.expressions {
        collect_chains(expr, stringifier, &mut chains)?;
    }
    Ok(chains)
}

fn collect_chains(
    expr: &Expr,
    stringifier: &dyn ExpressionStringifier,
    out: &mut Vec<Vec<WatchSegment>>,
) -> Result<(), UnsupportedExpression> {
    if let Some(chain) = chain_of(expr, stringifier, out)? {
        out.push(chain);
    }
    Ok(())
}

fn chain_of(
    expr: &Expr,
    stringifier: &dyn ExpressionStringifier,
    out: &mut Vec<Vec<WatchSegment>>,
) -> Result<Option<Vec<WatchSegment>>, UnsupportedExpression> {
    match expr {
        Expr::Identifier(e) => Ok(Some(vec![member_segment(&e.member)])),
        Expr::MemberAccess(e) => {
            let segment = member_segment(&e.member);
            Ok(Some(match chain_of(&e.object, stringifier, out)? {
                Some(mut chain) => {
                    chain.push(segment);
                    chain
                }
                None => vec![segment],
            }))
        }
        Expr::Cast(e) => chain_of(&e.expression, stringifier, out),
        Expr::Call(call) => {
            for argument in &call.arguments {
                collect_chains(argument, stringifier, out)?;
            }
            let arguments = Some(stringify_list(stringifier, &call.arguments)?);
            let (prefix, member) = match call.callee.as_ref() {
                Expr::Identifier(e) => (None, &e.member),
                Expr::MemberAccess(e) => (chain_of(&e.object, stringifier, out)?, &e.member),
                other => {
                    collect_chains(other, stringifier, out)?;
                    return Ok(None);
                }
            };
            let segment = WatchSegment {
                kind: WatcherKind::Function,
                name: member.name.clone(),
                events: member.change_events.clone(),
                class_qualifier: None,
                arguments,
            };
            let mut chain = prefix.unwrap_or_default();
            chain.push(segment);
            Ok(Some(chain))
        }
        Expr::Binary(e) => {
            collect_chains(&e.left, stringifier, out)?;
            collect_chains(&e.right, stringifier, out)?;
            Ok(None)
        }
        Expr::StringLiteral(_) | Expr::Literal(_) => Ok(None),
        Expr::Unsupported(e) => Err(UnsupportedExpression {
            description: e.description.clone(),
            location: e.location,
        }),
    }
}

fn member_segment(member: &MemberRef) -> WatchSegment {
    let kind = if member.is_xml {
        WatcherKind::Xml
    } else if member.is_static {
        WatcherKind::StaticProperty
    } else {
        WatcherKind::Property
    };
    WatchSegment {
        kind,
        name: member.name.clone(),
        events: member.change_events.clone(),
        class_qualifier: if kind == WatcherKind::StaticProperty {
            member.declaring_class.clone()
        } else {
            None
        },
        arguments: None,
    }
}
