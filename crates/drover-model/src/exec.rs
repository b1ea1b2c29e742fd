use serde::{Deserialize, Serialize};

/// Ad hoc process execution request carried by the `Execute` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecRequest {
    /// Program to run (e.g. `"/bin/echo"`).
    pub file: String,
    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ExecRequest {
    /// Create a new request.
    pub fn new<I, S>(file: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            file: file.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}
