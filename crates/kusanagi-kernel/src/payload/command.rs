//! Commands sent by the gateway.

use crate::payload::file::File;
use crate::payload::http::{HttpRequest, HttpResponse};
use crate::payload::meta::Meta;
use crate::payload::param::Param;
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top level payload for a gateway command.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CommandPayload {
    #[serde(rename = "c")]
    pub command: Command,

    #[serde(rename = "m", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<CommandMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Command {
    #[serde(rename = "n", default)]
    pub name: String,

    #[serde(rename = "a", default)]
    pub args: CommandArgs,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CommandMeta {
    #[serde(rename = "s", default)]
    pub scope: String,
}

/// Arguments carried by a command; all fields are optional and depend on
/// the processor the command targets.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CommandArgs {
    #[serde(rename = "m", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    pub call: Option<CallInfo>,

    #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
    pub http_request: Option<HttpRequest>,

    #[serde(rename = "R", default, skip_serializing_if = "Option::is_none")]
    pub http_response: Option<HttpResponse>,

    #[serde(rename = "T", default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,

    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Callee `[service, version, action]` triple for run-time calls.
    #[serde(rename = "C", default, skip_serializing_if = "Option::is_none")]
    pub callee: Option<Vec<String>>,

    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Param>>,

    #[serde(rename = "f", default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<File>>,

    #[serde(rename = "rv", default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,
}

/// The service call a request middleware can inspect and rewrite.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CallInfo {
    #[serde(rename = "s", default)]
    pub service: String,

    #[serde(rename = "v", default)]
    pub version: String,

    #[serde(rename = "a", default)]
    pub action: String,

    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Param>>,
}

impl CommandPayload {
    pub fn new(name: &str, scope: &str, args: CommandArgs) -> Self {
        Self {
            command: Command {
                name: name.to_string(),
                args,
            },
            meta: Some(CommandMeta {
                scope: scope.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.command.name
    }

    pub fn scope(&self) -> &str {
        self.meta.as_ref().map(|m| m.scope.as_str()).unwrap_or("")
    }

    pub fn args(&self) -> &CommandArgs {
        &self.command.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_stdin_shape() {
        let text = r#"{"c":{"n":"echo","a":{"a":"echo","T":{"m":{"g":["x","y"],"o":["s","1","echo"],"l":1}}}}}"#;
        let payload: CommandPayload = serde_json::from_str(text).unwrap();

        assert_eq!(payload.name(), "echo");
        assert_eq!(payload.args().action.as_deref(), Some("echo"));
        let transport = payload.args().transport.as_ref().unwrap();
        assert_eq!(transport.meta.public_gateway(), "y");
        assert_eq!(transport.meta.origin, vec!["s", "1", "echo"]);
        assert_eq!(transport.meta.level, 1);
    }

    #[test]
    fn test_roundtrip_preserves_tags() {
        let payload = CommandPayload::new(
            "users.list",
            "service",
            CommandArgs {
                action: Some("list".into()),
                ..CommandArgs::default()
            },
        );

        let bytes = crate::codec::pack(&payload).unwrap();
        let restored: CommandPayload = crate::codec::unpack(&bytes).unwrap();
        assert_eq!(restored, payload);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["c"]["n"], "users.list");
        assert_eq!(json["c"]["a"]["a"], "list");
        assert_eq!(json["m"]["s"], "service");
    }

    #[test]
    fn test_absent_args_stay_absent() {
        let payload = CommandPayload::default();
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["c"]["a"].as_object().unwrap().is_empty());
        assert!(json.get("m").is_none());
    }
}
