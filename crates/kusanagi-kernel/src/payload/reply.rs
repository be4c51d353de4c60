//! Replies returned to the gateway.
//!
//! A reply is either an error or a command result. The result shape
//! depends on the processor: action replies carry a transport, request
//! middleware replies carry a call, response middleware replies carry an
//! HTTP response.

use crate::payload::command::{CallInfo, CommandPayload};
use crate::payload::http::HttpResponse;
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_ERROR_MESSAGE: &str = "Unknown error";
pub const DEFAULT_ERROR_STATUS: &str = "500 Internal Server Error";

/// Top level reply payload.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReplyPayload {
    #[serde(rename = "cr", default, skip_serializing_if = "Option::is_none")]
    pub command_reply: Option<CommandReply>,

    #[serde(rename = "E", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CommandReply {
    #[serde(rename = "n", default)]
    pub name: String,

    #[serde(rename = "r", default)]
    pub result: ReplyResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReplyResult {
    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, String>>,

    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    pub call: Option<CallInfo>,

    #[serde(rename = "R", default, skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponse>,

    #[serde(rename = "T", default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,

    #[serde(rename = "rv", default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,
}

/// An error body, also used for transport error entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorPayload {
    #[serde(rename = "m", default = "default_message")]
    pub message: String,

    #[serde(rename = "c", default)]
    pub code: i64,

    #[serde(rename = "s", default = "default_status")]
    pub status: String,
}

fn default_message() -> String {
    DEFAULT_ERROR_MESSAGE.to_string()
}

fn default_status() -> String {
    DEFAULT_ERROR_STATUS.to_string()
}

impl Default for ErrorPayload {
    fn default() -> Self {
        Self {
            message: default_message(),
            code: 0,
            status: default_status(),
        }
    }
}

impl ErrorPayload {
    pub fn new(message: &str, code: i64, status: &str) -> Self {
        Self {
            message: if message.is_empty() {
                default_message()
            } else {
                message.to_string()
            },
            code,
            status: if status.is_empty() {
                default_status()
            } else {
                status.to_string()
            },
        }
    }
}

impl ReplyPayload {
    /// An error shaped reply.
    pub fn new_error(message: &str, code: i64, status: &str) -> Self {
        Self {
            command_reply: None,
            error: Some(ErrorPayload::new(message, code, status)),
        }
    }

    /// Reply skeleton for a service action: carries the command transport.
    pub fn for_action(command: &CommandPayload) -> Self {
        Self::with_result(
            command.name(),
            ReplyResult {
                transport: Some(command.args().transport.clone().unwrap_or_default()),
                ..ReplyResult::default()
            },
        )
    }

    /// Reply skeleton for a request middleware: carries the service call.
    pub fn for_request(command: &CommandPayload) -> Self {
        Self::with_result(
            command.name(),
            ReplyResult {
                call: Some(command.args().call.clone().unwrap_or_default()),
                ..ReplyResult::default()
            },
        )
    }

    /// Reply skeleton for a response middleware: carries the HTTP response.
    pub fn for_response(command: &CommandPayload) -> Self {
        Self::with_result(
            command.name(),
            ReplyResult {
                response: Some(command.args().http_response.clone().unwrap_or_default()),
                ..ReplyResult::default()
            },
        )
    }

    fn with_result(name: &str, result: ReplyResult) -> Self {
        Self {
            command_reply: Some(CommandReply {
                name: name.to_string(),
                result,
            }),
            error: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn result(&self) -> Option<&ReplyResult> {
        self.command_reply.as_ref().map(|reply| &reply.result)
    }

    pub fn result_mut(&mut self) -> Option<&mut ReplyResult> {
        self.command_reply.as_mut().map(|reply| &mut reply.result)
    }

    /// Turn a request shaped reply into a response shaped one.
    pub fn switch_to_response(&mut self, response: HttpResponse) {
        if let Some(result) = self.result_mut() {
            result.call = None;
            result.transport = None;
            result.return_value = None;
            result.response = Some(response);
        }
    }
}
