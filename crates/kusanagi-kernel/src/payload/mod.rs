//! Payload model for the gateway wire protocol.
//!
//! Every type here maps one-to-one onto a wire structure, with the short
//! tag names the gateway and the peer SDKs depend on kept bit-exactly
//! through serde renames. Optional fields serialize as omitted, never as
//! empty containers; consumers distinguish absence from emptiness.

pub mod command;
pub mod file;
pub mod http;
pub mod meta;
pub mod param;
pub mod reply;

pub use command::{CallInfo, Command, CommandArgs, CommandMeta, CommandPayload};
pub use file::{File, FileError, FileResult};
pub use http::{HttpRequest, HttpResponse};
pub use meta::{Meta, TransportMeta, format_datetime, parse_datetime};
pub use param::Param;
pub use reply::{CommandReply, ErrorPayload, ReplyPayload, ReplyResult};
