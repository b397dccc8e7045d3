mod output;

pub use output::{
    display_cancelled, display_content, display_delta, display_error, display_models,
    display_status, display_tool_calls,
};
