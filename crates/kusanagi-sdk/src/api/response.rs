//! Response middleware façade.
//!
//! A response middleware runs after the service chain finished. It can
//! read (but not change) the transport and shape the HTTP response that
//! goes back to the client.

use crate::api::Api;
use kusanagi_kernel::payload::command::CommandPayload;
use kusanagi_kernel::payload::http::{HttpRequest, HttpResponse};
use kusanagi_kernel::payload::meta::Meta;
use kusanagi_kernel::payload::reply::ReplyPayload;
use kusanagi_kernel::transport::Transport;
use serde_json::Value;
use std::collections::BTreeMap;

/// The response middleware view of a finished request.
pub struct Response {
    pub(crate) api: Api,
    pub(crate) meta: Meta,
    pub(crate) http_request: Option<HttpRequest>,
    pub(crate) http_response: HttpResponse,
    pub(crate) transport: Transport,
    pub(crate) return_value: Option<Value>,
    pub(crate) attributes: BTreeMap<String, String>,
}

impl Response {
    pub(crate) fn new(api: Api, command: &CommandPayload) -> Self {
        let args = command.args();
        let meta = args.meta.clone().unwrap_or_default();
        let attributes = meta.attributes.clone();
        Self {
            api,
            meta,
            http_request: args.http_request.clone(),
            http_response: args.http_response.clone().unwrap_or_default(),
            transport: args.transport.clone().unwrap_or_default(),
            return_value: args.return_value.clone(),
            attributes,
        }
    }

    /// Build the response a request middleware short-circuits with.
    pub(crate) fn from_request(
        request: crate::api::request::Request,
        http_response: HttpResponse,
    ) -> Self {
        Self {
            api: request.api,
            meta: request.meta,
            http_request: request.http_request,
            http_response,
            transport: Transport::default(),
            return_value: None,
            attributes: request.attributes,
        }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    /// Log a userland value at a syslog level.
    pub fn log(&self, value: &Value, level: u8) {
        self.api.log(value, level);
    }

    pub fn get_gateway_protocol(&self) -> &str {
        &self.meta.protocol
    }

    pub fn get_gateway_address(&self) -> &str {
        self.meta.public_gateway()
    }

    /// Attribute reads are case-sensitive.
    pub fn get_attribute(&self, name: &str, default: &str) -> String {
        self.attributes
            .get(name)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn get_http_request(&self) -> Option<&HttpRequest> {
        self.http_request.as_ref()
    }

    pub fn get_http_response(&self) -> &HttpResponse {
        &self.http_response
    }

    pub fn get_http_response_mut(&mut self) -> &mut HttpResponse {
        &mut self.http_response
    }

    pub fn get_status(&self) -> &str {
        self.http_response.status()
    }

    pub fn get_status_code(&self) -> u16 {
        self.http_response.status_code()
    }

    pub fn set_status(&mut self, code: u16, text: &str) {
        self.http_response.set_status(code, text);
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        self.http_response.set_header(name, value);
    }

    pub fn get_body(&self) -> &str {
        self.http_response.body()
    }

    pub fn set_body(&mut self, body: &str) {
        self.http_response.set_body(body);
    }

    /// Read-only view of the request transport.
    pub fn get_transport(&self) -> &Transport {
        &self.transport
    }

    pub fn has_return(&self) -> bool {
        self.return_value.is_some()
    }

    pub fn get_return(&self) -> Value {
        self.return_value.clone().unwrap_or(Value::Null)
    }

    /// Finalize the middleware reply in response shape.
    pub(crate) fn into_reply(self, command: &CommandPayload) -> ReplyPayload {
        let mut reply = ReplyPayload::for_response(command);
        if let Some(result) = reply.result_mut() {
            result.call = None;
            result.transport = None;
            result.response = Some(self.http_response);
            if !self.attributes.is_empty() {
                result.attributes = Some(self.attributes);
            }
        }
        reply
    }
}
