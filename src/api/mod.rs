pub mod accumulator;
pub mod client;
pub mod endpoints;
pub mod models;
pub mod repair;
pub mod response;
pub mod streaming;

pub use accumulator::ToolCallAccumulator;
pub use client::{build_http_client, ensure_success, make_api_request};
pub use endpoints::ModelsClient;
pub use models::RequestBody;
pub use repair::{repair_tool_call, repair_tool_calls};
pub use response::process_non_streaming_response;
pub use streaming::{process_streaming_response, StreamOutcome, StreamingResult};
