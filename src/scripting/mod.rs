//! Macro scripting re-exports from the `bytebench-scripting` crate.

pub use bytebench_scripting::context;
pub use bytebench_scripting::error;
pub use bytebench_scripting::executor;
pub use bytebench_scripting::process;
pub use bytebench_scripting::protocol;
pub use bytebench_scripting::script;
