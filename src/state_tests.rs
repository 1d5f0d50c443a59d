#[cfg(test)]
mod tests {
    use crate::ast::{ComponentDocument, Node};
    use crate::compiler::{compile_document, CompiledDocument};
    use crate::fixtures::*;
    use crate::options::CompileOptions;
    use crate::states::{ItemsPosition, OverrideDescriptor, OverrideValue};

    fn compile(doc: &ComponentDocument) -> CompiledDocument {
        compile_document(doc, &CompileOptions::default())
    }

    fn with_states(names: &[&str], content_values: Vec<Node>) -> ComponentDocument {
        document("acme.Main", vec![states(names), content(content_values)])
    }

    fn add_items(id: &str, index: usize, destination: Option<&str>, position: ItemsPosition) -> OverrideDescriptor {
        OverrideDescriptor::AddItems {
            id: id.to_string(),
            items_descriptor_index: index,
            destination: destination.map(str::to_string),
            property_name: "mxmlContent".to_string(),
            position,
        }
    }

    fn after(sibling: &str) -> ItemsPosition {
        ItemsPosition::After {
            sibling: sibling.to_string(),
        }
    }

    #[test]
    fn test_dependent_instances_stay_out_of_the_base_tree() {
        let doc = with_states(
            &["s1", "s2"],
            vec![
                instance_child(instance("A")),
                instance_child(include_in(instance("B"), &["s2"])),
            ],
        );
        let out = compile(&doc);
        assert_eq!(out.descriptor, "[A, 1, '_id', true, 'inst0', 0, 0, null]");
    }

    #[test]
    fn test_add_items_reverse_order_with_anchors() {
        let doc = with_states(
            &["s1", "s2"],
            vec![
                instance_child(instance("A")),
                instance_child(include_in(instance("B"), &["s2"])),
                instance_child(instance("C")),
                instance_child(include_in(instance("D"), &["s2"])),
            ],
        );
        let out = compile(&doc);

        assert_eq!(out.states.len(), 2);
        assert_eq!(out.states[0].name, "s1");
        assert!(out.states[0].overrides.is_empty());
        assert_eq!(out.states[0].items_descriptors, "[]");

        let s2 = &out.states[1];
        assert_eq!(
            s2.overrides,
            vec![
                add_items("_Main_AddItems1", 0, None, after("inst1")),
                add_items("_Main_AddItems2", 1, None, after("inst0")),
            ]
        );
        assert_eq!(
            s2.items_descriptors,
            "[[D, 1, '_id', true, 'inst2', 0, 0, null], [B, 1, '_id', true, 'inst3', 0, 0, null]]"
        );
    }

    #[test]
    fn test_states_render_with_override_instances() {
        let doc = with_states(
            &["s1"],
            vec![
                instance_child(instance("A")),
                instance_child(include_in(instance("B"), &["s1"])),
            ],
        );
        let out = compile(&doc);
        assert_eq!(
            out.properties,
            "[1, 'states', null, [mx.states.State, 2, 'name', true, 's1', 'overrides', null, \
             [mx.states.AddItems, 5, '_id', true, '_Main_AddItems1', 'itemsDescriptorIndex', true, 0, \
             'propertyName', true, 'mxmlContent', 'position', true, 'after', 'relativeTo', true, 'inst0', \
             0, 0, null], 0, 0, null], 0, 0]"
        );
    }

    #[test]
    fn test_leading_dependent_instance_goes_first() {
        let doc = with_states(
            &["s1"],
            vec![
                instance_child(include_in(instance("B"), &["s1"])),
                instance_child(instance("A")),
            ],
        );
        let out = compile(&doc);
        assert_eq!(
            out.states[0].overrides,
            vec![add_items("_Main_AddItems1", 0, None, ItemsPosition::First)]
        );
    }

    #[test]
    fn test_exclude_from_expands_against_declared_states() {
        let doc = with_states(
            &["s1", "s2"],
            vec![instance_child(exclude_from(instance("B"), &["s1"]))],
        );
        let out = compile(&doc);
        assert!(out.states[0].overrides.is_empty());
        assert_eq!(out.states[1].overrides.len(), 1);
    }

    #[test]
    fn test_nested_group_is_the_destination() {
        let group = with_id(
            instance_with(
                "Group",
                vec![content(vec![
                    instance_child(instance("A")),
                    instance_child(include_in(instance("B"), &["s1"])),
                ])],
            ),
            "box",
        );
        let doc = with_states(&["s1"], vec![instance_child(group)]);
        let out = compile(&doc);
        assert_eq!(
            out.states[0].overrides,
            vec![add_items("_Main_AddItems1", 0, Some("box"), after("inst0"))]
        );
    }

    #[test]
    fn test_same_instance_keeps_its_id_across_states() {
        let doc = with_states(
            &["s1", "s2"],
            vec![
                instance_child(instance("A")),
                instance_child(include_in(instance("B"), &["s1", "s2"])),
            ],
        );
        let out = compile(&doc);
        let expected = "[[B, 1, '_id', true, 'inst1', 0, 0, null]]";
        assert_eq!(out.states[0].items_descriptors, expected);
        assert_eq!(out.states[1].items_descriptors, expected);
        let ids: Vec<_> = out.instances.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["inst0", "inst1"]);
    }

    #[test]
    fn test_add_items_precede_specifier_overrides() {
        let button = with_id(
            instance_with(
                "Button",
                vec![
                    prop("label", vec![text("OK")]),
                    prop_in("label", "s1", vec![text("Save")]),
                ],
            ),
            "ok",
        );
        let doc = with_states(
            &["s1"],
            vec![
                instance_child(button),
                instance_child(include_in(instance("B"), &["s1"])),
            ],
        );
        let out = compile(&doc);
        assert_eq!(
            out.descriptor,
            "[Button, 2, 'id', true, 'ok', 'label', true, 'OK', 0, 0, null]"
        );
        assert_eq!(
            out.states[0].overrides,
            vec![
                add_items("_Main_AddItems1", 0, None, after("ok")),
                OverrideDescriptor::SetProperty {
                    id: "_Main_SetProperty2".to_string(),
                    target: Some("ok".to_string()),
                    name: "label".to_string(),
                    value: OverrideValue::Literal {
                        text: "'Save'".to_string()
                    },
                },
            ]
        );
    }

    #[test]
    fn test_style_and_event_overrides_keep_document_order() {
        let button = with_id(
            instance_with(
                "Button",
                vec![
                    style_in("color", "s1", vec![number("0xFF0000")]),
                    event_in("click", "s1", &["save()"]),
                ],
            ),
            "ok",
        );
        let doc = with_states(&["s1"], vec![instance_child(button)]);
        let out = compile(&doc);
        assert_eq!(
            out.states[0].overrides,
            vec![
                OverrideDescriptor::SetStyle {
                    id: "_Main_SetStyle1".to_string(),
                    target: Some("ok".to_string()),
                    name: "color".to_string(),
                    value: OverrideValue::Literal {
                        text: "0xFF0000".to_string()
                    },
                },
                OverrideDescriptor::SetEventHandler {
                    id: "_Main_SetEventHandler2".to_string(),
                    target: Some("ok".to_string()),
                    event_name: "click".to_string(),
                    handler_name: "event0".to_string(),
                },
            ]
        );
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].body, "save()");
    }

    #[test]
    fn test_bound_override_value_targets_the_override() {
        let label = with_id(
            instance_with("Label", vec![prop_in("text", "s1", vec![bound(vec![ident("caption")])])]),
            "lbl",
        );
        let doc = with_states(&["s1"], vec![instance_child(label)]);
        let out = compile(&doc);
        assert_eq!(
            out.states[0].overrides,
            vec![OverrideDescriptor::SetProperty {
                id: "_Main_SetProperty1".to_string(),
                target: Some("lbl".to_string()),
                name: "text".to_string(),
                value: OverrideValue::Binding { index: 0 },
            }]
        );
        assert_eq!(
            out.bindings.as_deref(),
            Some("[1, 'caption', null, '_Main_SetProperty1.value', 0, 2, 'caption', 'propertyChange', 0, null]")
        );
    }

    #[test]
    fn test_dependent_subtree_compiles_as_a_unit() {
        let panel = include_in(
            instance_with("Panel", vec![content(vec![instance_child(instance("Label"))])]),
            &["s1"],
        );
        let doc = with_states(&["s1"], vec![instance_child(panel)]);
        let out = compile(&doc);
        assert_eq!(out.descriptor, "[]");
        assert_eq!(
            out.states[0].items_descriptors,
            "[[Panel, 1, '_id', true, 'inst0', 0, 0, [Label, 1, '_id', true, 'inst1', 0, 0, null]]]"
        );
    }

    #[test]
    fn test_states_declared_through_an_array_value() {
        let doc = document(
            "acme.Main",
            vec![
                prop("states", vec![array(vec![state("s1"), state("s2")])]),
                content(vec![instance_child(exclude_from(instance("B"), &["s1"]))]),
            ],
        );
        let out = compile(&doc);
        let names: Vec<_> = out.states.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["s1", "s2"]);
        assert!(out.states[0].overrides.is_empty());
        assert_eq!(
            out.states[1].overrides,
            vec![add_items("_Main_AddItems1", 0, None, ItemsPosition::First)]
        );
    }

    #[test]
    fn test_property_holding_only_a_dependent_instance_is_left_out() {
        let list = with_id(
            instance_with(
                "List",
                vec![prop(
                    "layout",
                    vec![instance_child(include_in(instance("VLayout"), &["s1"]))],
                )],
            ),
            "list",
        );
        let doc = with_states(&["s1"], vec![instance_child(list)]);
        let out = compile(&doc);
        assert_eq!(out.descriptor, "[List, 1, 'id', true, 'list', 0, 0, null]");
        assert_eq!(
            out.states[0].overrides,
            vec![OverrideDescriptor::AddItems {
                id: "_Main_AddItems1".to_string(),
                items_descriptor_index: 0,
                destination: Some("list".to_string()),
                property_name: "layout".to_string(),
                position: ItemsPosition::First,
            }]
        );
        assert_eq!(
            out.states[0].items_descriptors,
            "[[VLayout, 1, '_id', true, 'inst0', 0, 0, null]]"
        );
    }

    #[test]
    fn test_inline_component_compiles_once_across_states() {
        let inner = document("", vec![content(vec![instance_child(instance("Label"))])]);
        let list = include_in(
            instance_with("List", vec![prop("itemRenderer", vec![component_factory(inner)])]),
            &["s1", "s2"],
        );
        let doc = with_states(&["s1", "s2"], vec![instance_child(list)]);
        let out = compile(&doc);

        let names: Vec<_> = out.sub_documents.iter().map(|d| d.class_name.as_str()).collect();
        assert_eq!(names, vec!["acme_Main_component0"]);
        let expected = "[[List, 2, '_id', true, 'inst0', 'itemRenderer', true, \
                        new mx.core.ClassFactory(acme_Main_component0), 0, 0, null]]";
        assert_eq!(out.states[0].items_descriptors, expected);
        assert_eq!(out.states[1].items_descriptors, expected);
    }

    #[test]
    fn test_content_groups_collect_in_source_order() {
        let group = with_id(
            instance_with(
                "Group",
                vec![
                    content(vec![instance_child(instance("A"))]),
                    prop("icon", vec![instance_child(include_in(instance("I"), &["s1"]))]),
                    content(vec![instance_child(include_in(instance("B"), &["s1"]))]),
                ],
            ),
            "box",
        );
        let doc = with_states(&["s1"], vec![instance_child(group)]);
        let out = compile(&doc);

        assert_eq!(
            out.descriptor,
            "[Group, 1, 'id', true, 'box', 0, 0, [A, 1, '_id', true, 'inst0', 0, 0, null]]"
        );
        assert_eq!(
            out.states[0].overrides,
            vec![
                add_items("_Main_AddItems1", 0, Some("box"), after("inst0")),
                OverrideDescriptor::AddItems {
                    id: "_Main_AddItems2".to_string(),
                    items_descriptor_index: 1,
                    destination: Some("box".to_string()),
                    property_name: "icon".to_string(),
                    position: ItemsPosition::First,
                },
            ]
        );
        assert_eq!(
            out.states[0].items_descriptors,
            "[[B, 1, '_id', true, 'inst1', 0, 0, null], [I, 1, '_id', true, 'inst2', 0, 0, null]]"
        );
    }
}
