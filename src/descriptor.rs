//! Descriptor model: the flattened instantiation tree handed to the runtime.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. The parent link
//! is a lookup aid only; order is always the parent's `children` sequence.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where an instance's id came from. Synthesized ids render under a private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceId {
    Explicit(String),
    Effective(String),
    Synthesized(String),
}

impl InstanceId {
    pub fn as_str(&self) -> &str {
        match self {
            InstanceId::Explicit(s) | InstanceId::Effective(s) | InstanceId::Synthesized(s) => s,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstanceDescriptor {
    pub class_name: String,
    pub id: Option<InstanceId>,
    /// Handler names of events declared on this instance.
    pub events: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyShape {
    pub is_array: bool,
    pub needs_quoting: bool,
    pub is_style: bool,
}

#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub name: String,
    /// Scalar value text. Never set together with children.
    pub value: Option<String>,
    pub shape: PropertyShape,
}

#[derive(Debug, Clone)]
pub enum Descriptor {
    Instance(InstanceDescriptor),
    Property(PropertyDescriptor),
}

#[derive(Debug, Clone)]
struct Slot {
    descriptor: Descriptor,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct DescriptorArena {
    slots: Vec<Slot>,
}

impl DescriptorArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Allocate a detached node. Roots stay detached for their whole life.
    pub fn alloc(&mut self, descriptor: Descriptor) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Slot {
            descriptor,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn instance(&mut self, class_name: &str, id: Option<InstanceId>) -> NodeId {
        self.alloc(Descriptor::Instance(InstanceDescriptor {
            class_name: class_name.to_string(),
            id,
            events: Vec::new(),
        }))
    }

    pub fn property(&mut self, name: &str, shape: PropertyShape) -> NodeId {
        self.alloc(Descriptor::Property(PropertyDescriptor {
            name: name.to_string(),
            value: None,
            shape,
        }))
    }

    pub fn scalar(&mut self, name: &str, value: String, needs_quoting: bool) -> NodeId {
        self.alloc(Descriptor::Property(PropertyDescriptor {
            name: name.to_string(),
            value: Some(value),
            shape: PropertyShape {
                needs_quoting,
                ..PropertyShape::default()
            },
        }))
    }

    /// Append `child` to `parent`'s children. A node has at most one parent.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        assert!(
            self.slots[child.index()].parent.is_none(),
            "descriptor node {:?} is already attached",
            child
        );
        self.slots[child.index()].parent = Some(parent);
        self.slots[parent.index()].children.push(child);
    }

    pub fn get(&self, id: NodeId) -> &Descriptor {
        &self.slots[id.index()].descriptor
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Descriptor {
        &mut self.slots[id.index()].descriptor
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slots[id.index()].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.index()].parent
    }

    pub fn as_instance_mut(&mut self, id: NodeId) -> &mut InstanceDescriptor {
        match self.get_mut(id) {
            Descriptor::Instance(instance) => instance,
            Descriptor::Property(p) => panic!("expected an instance descriptor, found property '{}'", p.name),
        }
    }

    pub fn as_property_mut(&mut self, id: NodeId) -> &mut PropertyDescriptor {
        match self.get_mut(id) {
            Descriptor::Property(property) => property,
            Descriptor::Instance(i) => panic!("expected a property descriptor, found instance of '{}'", i.class_name),
        }
    }

    /// Property child of `instance` named `name`, used to merge repeated content specifiers.
    pub fn find_property(&self, instance: NodeId, name: &str) -> Option<NodeId> {
        self.children(instance).iter().copied().find(|&child| {
            matches!(self.get(child), Descriptor::Property(p) if p.name == name && !p.shape.is_style)
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventDescriptor {
    pub handler_name: String,
    pub event_name: String,
    pub event_type: String,
    pub body: String,
}
