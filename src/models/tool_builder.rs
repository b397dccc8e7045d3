use super::tool::ToolDefinition;
use crate::error::{LmChatError, Result};
use serde_json::{json, Map, Value};

const DEFAULT_DESCRIPTION: &str = "This tool processes input data and generates output.";

#[derive(Debug, Default, Clone)]
struct PropertySet {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl PropertySet {
    fn insert(&mut self, name: String, definition: Value, required: bool) {
        if required && !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, definition);
    }

    fn insert_object(&mut self, name: String, definition: Value, required: bool, is_array: bool) {
        let definition = if is_array {
            json!({"type": "array", "items": definition})
        } else {
            definition
        };
        self.insert(name, definition, required);
    }
}

fn scalar_property(field_type: &str, description: &str) -> Value {
    json!({"type": field_type, "description": description})
}

fn array_property(item_type: &str, description: &str) -> Value {
    json!({"type": "array", "description": description, "items": {"type": item_type}})
}

/// Fluent builder for [`ToolDefinition`]s.
///
/// ```
/// use lmchat::models::ToolBuilder;
///
/// let tool = ToolBuilder::new()
///     .name("get_weather")
///     .description("Look up the current weather")
///     .property("city", "string", "City name", true)
///     .build()
///     .unwrap();
/// assert_eq!(tool.name(), "get_weather");
/// ```
#[derive(Debug, Default, Clone)]
pub struct ToolBuilder {
    name: Option<String>,
    description: Option<String>,
    props: PropertySet,
    additional_properties: bool,
    instruction_header: Option<String>,
    keywords: Vec<String>,
    constraints: Vec<String>,
    instructions: Vec<String>,
}

impl ToolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn additional_properties(mut self, allow: bool) -> Self {
        self.additional_properties = allow;
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(
            keywords
                .into_iter()
                .map(Into::into)
                .filter(|k: &String| !k.is_empty()),
        );
        self
    }

    /// Limits on when or how the tool should be used.
    pub fn constraints<I, S>(mut self, constraints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.extend(
            constraints
                .into_iter()
                .map(Into::into)
                .filter(|c: &String| !c.is_empty()),
        );
        self
    }

    pub fn instruction_header(mut self, header: impl Into<String>) -> Self {
        let header = header.into();
        if !header.is_empty() {
            self.instruction_header = Some(header);
        }
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        if !instruction.is_empty() {
            self.instructions.push(instruction);
        }
        self
    }

    pub fn property(
        mut self,
        name: impl Into<String>,
        field_type: &str,
        description: &str,
        required: bool,
    ) -> Self {
        self.props
            .insert(name.into(), scalar_property(field_type, description), required);
        self
    }

    pub fn array_property(
        mut self,
        name: impl Into<String>,
        item_type: &str,
        description: &str,
        required: bool,
    ) -> Self {
        self.props
            .insert(name.into(), array_property(item_type, description), required);
        self
    }

    /// Adds a nested object (or array of objects when `is_array`) built by `build`.
    pub fn object<F>(
        mut self,
        name: impl Into<String>,
        description: &str,
        required: bool,
        is_array: bool,
        build: F,
    ) -> Self
    where
        F: FnOnce(ObjectBuilder) -> ObjectBuilder,
    {
        let definition = build(ObjectBuilder::new(description)).into_definition();
        self.props
            .insert_object(name.into(), definition, required, is_array);
        self
    }

    fn render_description(&self) -> String {
        let mut out = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION)
            .to_string();

        let keywords: Vec<&String> = self.keywords.iter().filter(|k| !k.trim().is_empty()).collect();
        if !keywords.is_empty() {
            out.push_str("\n\nKeywords:");
            for keyword in keywords {
                out.push_str(&format!("\n- {}", keyword));
            }
        }

        let constraints: Vec<&String> = self
            .constraints
            .iter()
            .filter(|c| !c.trim().is_empty())
            .collect();
        if !constraints.is_empty() {
            out.push_str("\n\nConstraints:");
            for (n, constraint) in constraints.iter().enumerate() {
                out.push_str(&format!("\n{}. {}", n + 1, constraint));
            }
        }

        let instructions: Vec<&String> = self
            .instructions
            .iter()
            .filter(|i| !i.trim().is_empty())
            .collect();
        if !instructions.is_empty() {
            out.push_str("\n\nInstructions:");
            if let Some(header) = self.instruction_header.as_deref().filter(|h| !h.trim().is_empty()) {
                out.push_str(&format!("\n# {} #", header));
            }
            for (n, instruction) in instructions.iter().enumerate() {
                out.push_str(&format!("\n{}. {}", n + 1, instruction));
            }
        }

        out.trim().to_string()
    }

    pub fn build(self) -> Result<ToolDefinition> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                LmChatError::ToolError("Tool name must be set before building.".to_string())
            })?
            .to_string();
        let description = self.render_description();

        let mut parameters = Map::new();
        parameters.insert("type".to_string(), json!("object"));
        parameters.insert(
            "properties".to_string(),
            Value::Object(self.props.properties),
        );
        parameters.insert(
            "additionalProperties".to_string(),
            json!(self.additional_properties),
        );
        if !self.props.required.is_empty() {
            parameters.insert("required".to_string(), json!(self.props.required));
        }

        Ok(ToolDefinition::new(name, description, Value::Object(parameters)))
    }
}

/// Builder for a nested object schema inside a tool's parameters.
#[derive(Debug, Clone)]
pub struct ObjectBuilder {
    description: String,
    props: PropertySet,
}

impl ObjectBuilder {
    fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            props: PropertySet::default(),
        }
    }

    pub fn property(
        mut self,
        name: impl Into<String>,
        field_type: &str,
        description: &str,
        required: bool,
    ) -> Self {
        self.props
            .insert(name.into(), scalar_property(field_type, description), required);
        self
    }

    pub fn array_property(
        mut self,
        name: impl Into<String>,
        item_type: &str,
        description: &str,
        required: bool,
    ) -> Self {
        self.props
            .insert(name.into(), array_property(item_type, description), required);
        self
    }

    pub fn object<F>(
        mut self,
        name: impl Into<String>,
        description: &str,
        required: bool,
        is_array: bool,
        build: F,
    ) -> Self
    where
        F: FnOnce(ObjectBuilder) -> ObjectBuilder,
    {
        let definition = build(ObjectBuilder::new(description)).into_definition();
        self.props
            .insert_object(name.into(), definition, required, is_array);
        self
    }

    fn into_definition(self) -> Value {
        let mut definition = Map::new();
        definition.insert("type".to_string(), json!("object"));
        definition.insert("description".to_string(), json!(self.description));
        definition.insert(
            "properties".to_string(),
            Value::Object(self.props.properties),
        );
        if !self.props.required.is_empty() {
            definition.insert("required".to_string(), json!(self.props.required));
        }
        Value::Object(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_name() {
        assert!(ToolBuilder::new().description("x").build().is_err());
        assert!(ToolBuilder::new().name("   ").build().is_err());
    }

    #[test]
    fn parameters_list_required_fields() {
        let tool = ToolBuilder::new()
            .name("search")
            .property("query", "string", "What to look for", true)
            .property("limit", "integer", "Max results", false)
            .build()
            .unwrap();

        let params = &tool.function.parameters;
        assert_eq!(params["type"], "object");
        assert_eq!(params["additionalProperties"], false);
        assert_eq!(params["required"], json!(["query"]));
        assert_eq!(params["properties"]["limit"]["type"], "integer");
    }

    #[test]
    fn required_is_omitted_when_empty() {
        let tool = ToolBuilder::new()
            .name("ping")
            .property("host", "string", "Host", false)
            .build()
            .unwrap();
        assert!(tool.function.parameters.get("required").is_none());
    }

    #[test]
    fn description_sections_are_rendered_in_order() {
        let tool = ToolBuilder::new()
            .name("save_note")
            .description("  Saves a note.  ")
            .keywords(["notes", "memory"])
            .constraints(["Only plain text"])
            .instruction_header("Usage")
            .instruction("Keep it short")
            .instruction("Use one note per fact")
            .build()
            .unwrap();

        assert_eq!(
            tool.function.description,
            "Saves a note.\n\nKeywords:\n- notes\n- memory\n\nConstraints:\n1. Only plain text\
             \n\nInstructions:\n# Usage #\n1. Keep it short\n2. Use one note per fact"
        );
    }

    #[test]
    fn missing_description_uses_default() {
        let tool = ToolBuilder::new().name("noop").build().unwrap();
        assert_eq!(tool.function.description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn nested_array_object_wraps_items() {
        let tool = ToolBuilder::new()
            .name("create_order")
            .object("items", "Line items", true, true, |item| {
                item.property("sku", "string", "Product code", true)
                    .property("qty", "integer", "Quantity", true)
                    .object("gift", "Gift options", false, false, |gift| {
                        gift.property("message", "string", "Card text", true)
                    })
            })
            .build()
            .unwrap();

        let items = &tool.function.parameters["properties"]["items"];
        assert_eq!(items["type"], "array");
        assert_eq!(items["items"]["type"], "object");
        assert_eq!(items["items"]["required"], json!(["sku", "qty"]));
        assert_eq!(
            items["items"]["properties"]["gift"]["required"],
            json!(["message"])
        );
        assert_eq!(tool.function.parameters["required"], json!(["items"]));
    }
}
