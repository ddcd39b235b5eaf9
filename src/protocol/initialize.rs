//! Handshake types for the `initialize` request/response exchange.

use serde::{Deserialize, Serialize};

/// Protocol version string the adapter advertises. The wire format is a
/// string (`"0.1"`), not a semver-style integer.
pub const PROTOCOL_VERSION: &str = "0.1";

/// Client identity the adapter advertises during `initialize`.
pub const CLIENT_NAME: &str = "openclaw";
pub const CLIENT_VERSION: &str = "1.0.0";

/// Parameters for the `initialize` request sent from adapter to agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub client_info: ClientInfo,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            client_info: ClientInfo {
                name: CLIENT_NAME.to_string(),
                version: CLIENT_VERSION.to_string(),
            },
        }
    }
}

/// Identifying information about the adapter, reported to the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_match_wire_shape() {
        let params = InitializeParams::default();
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["protocolVersion"], "0.1");
        assert_eq!(json["clientInfo"]["name"], "openclaw");
        assert_eq!(json["clientInfo"]["version"], "1.0.0");
    }
}
