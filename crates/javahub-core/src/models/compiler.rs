use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct CompileRequest {
    pub code: String,
}

/// Output of a compile-and-run. The server fills `errors` for both compile
/// errors and runtime exceptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CompileResult {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub errors: Option<String>,
}

impl CompileResult {
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn errors(&self) -> Option<&str> {
        self.errors.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn succeeded(&self) -> bool {
        self.errors().is_none()
    }
}
