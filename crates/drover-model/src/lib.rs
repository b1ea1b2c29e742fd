mod error;
pub use error::{ModelError, ModelResult};

mod exec;
pub use exec::ExecRequest;

mod job;
pub use job::{JobDefinition, TaskRole, TaskSpec};

mod properties;
pub use properties::RawProperties;
