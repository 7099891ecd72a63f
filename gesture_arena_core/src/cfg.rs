use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaCfg {
    /// Emit a `debug` trace line (target `gesture_arena`) for every arena
    /// state transition. Observational only.
    pub debug_diagnostics: bool,
}
