use serde::{Deserialize, Serialize};

/// Runtime class names and conventions the generated descriptors refer to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Deferred-instantiation wrapper used for factory and inline component values.
    pub factory_class: String,
    pub state_class: String,
    pub set_property_class: String,
    pub set_style_class: String,
    pub set_event_handler_class: String,
    pub add_items_class: String,
    /// Property whose values form an instance's child content.
    pub content_property: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            factory_class: "mx.core.ClassFactory".to_string(),
            state_class: "mx.states.State".to_string(),
            set_property_class: "mx.states.SetProperty".to_string(),
            set_style_class: "mx.states.SetStyle".to_string(),
            set_event_handler_class: "mx.states.SetEventHandler".to_string(),
            add_items_class: "mx.states.AddItems".to_string(),
            content_property: "mxmlContent".to_string(),
        }
    }
}

impl CompileOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
