pub mod content;
mod message;
mod model_info;
mod tool;
mod tool_builder;

pub use content::ContentBlock;
pub use message::{Message, Role};
pub use model_info::{ModelInfo, ModelsListResponse};
pub use tool::{FunctionCall, FunctionDefinition, ToolCall, ToolDefinition, FUNCTION_TOOL_TYPE};
pub use tool_builder::{ObjectBuilder, ToolBuilder};
