//! Content block types carried in `session/prompt` requests.

use serde::{Deserialize, Serialize};

/// A typed content block. The adapter only ever constructs the `Text`
/// variant (`runTurn` forwards plain prompt text); the `Deserialize` side
/// is kept so a future extension can round-trip richer blocks without a
/// wire-format break.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
}
