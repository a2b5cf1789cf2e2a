//! Live Tools - tool execution for live sessions.
//!
//! The live model asks for tools by name with a flat argument map. Each tool
//! is backed by an HTTP cloud function; the executor resolves the endpoint,
//! calls it, and always hands back a JSON value the model can read, even when
//! the call failed.

pub mod cloud_function;
pub mod traits;

pub use cloud_function::CloudFunctionExecutor;
pub use traits::{ToolExecutor, ToolOutput};
