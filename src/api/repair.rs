use crate::models::ToolCall;
use serde_json::Value;
use tracing::debug;

/// Unwraps arguments a model nested under its own function name, e.g.
/// `{"get_weather": {"city": "NYC"}}` becomes `{"city": "NYC"}`.
///
/// Returns whether the call was rewritten. Unparseable arguments are left alone.
pub fn repair_tool_call(call: &mut ToolCall) -> bool {
    let raw = call.function.arguments.trim();
    if raw.is_empty() {
        return false;
    }

    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            debug!(
                tool = %call.function.name,
                error = %e,
                "could not parse tool arguments for repair"
            );
            return false;
        }
    };

    let Value::Object(mut object) = parsed else {
        return false;
    };
    if object.len() != 1 || !object.contains_key(&call.function.name) {
        return false;
    }

    let inner = object.remove(&call.function.name).unwrap_or(Value::Null);
    call.function.arguments = match inner {
        Value::Null => "{}".to_string(),
        other => other.to_string(),
    };
    debug!(tool = %call.function.name, "fixed nested tool arguments");
    true
}

pub fn repair_tool_calls(calls: &mut [ToolCall]) {
    for call in calls.iter_mut() {
        repair_tool_call(call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_arguments_nested_under_function_name() {
        let mut call = ToolCall::new("1", "get_weather", r#"{"get_weather":{"city":"NYC"}}"#);
        assert!(repair_tool_call(&mut call));
        assert_eq!(call.function.arguments, r#"{"city":"NYC"}"#);
    }

    #[test]
    fn leaves_other_names_alone() {
        let original = r#"{"get_weather":{"city":"NYC"}}"#;
        let mut call = ToolCall::new("1", "other", original);
        assert!(!repair_tool_call(&mut call));
        assert_eq!(call.function.arguments, original);
    }

    #[test]
    fn leaves_multi_key_objects_alone() {
        let original = r#"{"f":{"a":1},"b":2}"#;
        let mut call = ToolCall::new("1", "f", original);
        assert!(!repair_tool_call(&mut call));
        assert_eq!(call.function.arguments, original);
    }

    #[test]
    fn unparseable_arguments_are_kept() {
        let mut call = ToolCall::new("1", "f", "{\"f\": ");
        assert!(!repair_tool_call(&mut call));
        assert_eq!(call.function.arguments, "{\"f\": ");
    }

    #[test]
    fn repair_is_idempotent() {
        let mut once = ToolCall::new("1", "get_weather", r#"{"get_weather":{"city":"NYC"}}"#);
        repair_tool_call(&mut once);
        let mut twice = once.clone();
        repair_tool_call(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn null_inner_value_becomes_empty_object() {
        let mut call = ToolCall::new("1", "f", r#"{"f":null}"#);
        assert!(repair_tool_call(&mut call));
        assert_eq!(call.function.arguments, "{}");
    }
}
