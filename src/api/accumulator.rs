use crate::api::models::ToolCallDelta;
use crate::models::{FunctionCall, ToolCall, FUNCTION_TOOL_TYPE};
use std::collections::BTreeMap;

/// Merges streamed tool-call fragments, keyed by the index the server assigns.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<u32, ToolCall>,
}

fn non_empty(fragment: Option<&String>) -> Option<&str> {
    fragment.map(String::as_str).filter(|s| !s.is_empty())
}

fn append_fragment(target: &mut String, fragment: Option<&String>) {
    if let Some(fragment) = non_empty(fragment) {
        target.push_str(fragment);
    }
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A delta without an index belongs to index 0.
    pub fn apply(&mut self, delta: &ToolCallDelta) {
        let index = delta.index.unwrap_or(0);
        let function = delta.function.as_ref();

        match self.calls.get_mut(&index) {
            None => {
                let call = ToolCall {
                    id: non_empty(delta.id.as_ref()).unwrap_or_default().to_string(),
                    tool_type: non_empty(delta.tool_type.as_ref())
                        .unwrap_or(FUNCTION_TOOL_TYPE)
                        .to_string(),
                    function: FunctionCall {
                        name: function
                            .and_then(|f| non_empty(f.name.as_ref()))
                            .unwrap_or_default()
                            .to_string(),
                        arguments: function
                            .and_then(|f| non_empty(f.arguments.as_ref()))
                            .unwrap_or_default()
                            .to_string(),
                    },
                };
                self.calls.insert(index, call);
            }
            Some(existing) => {
                append_fragment(&mut existing.id, delta.id.as_ref());
                if let Some(tool_type) = non_empty(delta.tool_type.as_ref()) {
                    existing.tool_type = tool_type.to_string();
                }
                if let Some(function) = function {
                    append_fragment(&mut existing.function.name, function.name.as_ref());
                    append_fragment(&mut existing.function.arguments, function.arguments.as_ref());
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Completed calls in ascending index order.
    pub fn finish(self) -> Vec<ToolCall> {
        self.calls.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::FunctionDelta;

    fn delta(index: u32, id: Option<&str>, name: Option<&str>, args: Option<&str>) -> ToolCallDelta {
        ToolCallDelta {
            index: Some(index),
            id: id.map(str::to_string),
            tool_type: None,
            function: if name.is_none() && args.is_none() {
                None
            } else {
                Some(FunctionDelta {
                    name: name.map(str::to_string),
                    arguments: args.map(str::to_string),
                })
            },
        }
    }

    #[test]
    fn fragments_concatenate_per_index() {
        let mut acc = ToolCallAccumulator::new();
        acc.apply(&delta(0, Some("abc"), None, None));
        acc.apply(&delta(0, None, Some("get_"), None));
        acc.apply(&delta(0, None, Some("weather"), Some("{\"ci")));
        acc.apply(&delta(0, None, None, Some("ty\":\"NYC\"}")));

        let calls = acc.finish();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "abc");
        assert_eq!(calls[0].tool_type, "function");
        assert_eq!(calls[0].function.name, "get_weather");
        assert_eq!(calls[0].function.arguments, "{\"city\":\"NYC\"}");
    }

    #[test]
    fn interleaved_indices_finish_in_index_order() {
        let mut acc = ToolCallAccumulator::new();
        acc.apply(&delta(2, Some("c"), Some("third"), Some("{")));
        acc.apply(&delta(0, Some("a"), Some("first"), Some("{")));
        acc.apply(&delta(1, Some("b"), Some("second"), Some("{")));
        acc.apply(&delta(0, None, None, Some("}")));
        acc.apply(&delta(2, None, None, Some("}")));
        acc.apply(&delta(1, None, None, Some("}")));

        let names: Vec<String> = acc.finish().into_iter().map(|c| c.function.name).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn id_may_arrive_split() {
        let mut acc = ToolCallAccumulator::new();
        acc.apply(&delta(0, Some("call_"), Some("f"), None));
        acc.apply(&delta(0, Some("123"), None, None));
        assert_eq!(acc.finish()[0].id, "call_123");
    }

    #[test]
    fn null_and_empty_fields_do_not_clear() {
        let mut acc = ToolCallAccumulator::new();
        acc.apply(&delta(0, Some("x"), Some("lookup"), Some("{}")));
        acc.apply(&delta(0, Some(""), Some(""), None));
        acc.apply(&ToolCallDelta {
            index: Some(0),
            ..Default::default()
        });

        let call = &acc.finish()[0];
        assert_eq!(call.id, "x");
        assert_eq!(call.function.name, "lookup");
        assert_eq!(call.function.arguments, "{}");
    }

    #[test]
    fn type_replaces_rather_than_appends() {
        let mut acc = ToolCallAccumulator::new();
        acc.apply(&ToolCallDelta {
            index: Some(0),
            tool_type: Some("function".to_string()),
            ..Default::default()
        });
        acc.apply(&ToolCallDelta {
            index: Some(0),
            tool_type: Some("function".to_string()),
            ..Default::default()
        });
        assert_eq!(acc.finish()[0].tool_type, "function");
    }

    #[test]
    fn arguments_only_index_keeps_empty_name() {
        let mut acc = ToolCallAccumulator::new();
        acc.apply(&delta(3, None, None, Some("{\"q\":1}")));
        let call = &acc.finish()[0];
        assert_eq!(call.function.name, "");
        assert_eq!(call.id, "");
        assert_eq!(call.function.arguments, "{\"q\":1}");
    }

    #[test]
    fn missing_index_defaults_to_zero() {
        let mut acc = ToolCallAccumulator::new();
        acc.apply(&ToolCallDelta {
            index: None,
            id: Some("a".to_string()),
            ..Default::default()
        });
        acc.apply(&delta(0, Some("b"), None, None));
        assert_eq!(acc.len(), 1);
        assert_eq!(acc.finish()[0].id, "ab");
    }
}
