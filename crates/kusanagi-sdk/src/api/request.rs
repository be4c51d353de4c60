//! Request middleware façade.
//!
//! A request middleware sees the call the gateway is about to make and can
//! rewrite its target, adjust parameters, attach attributes, or
//! short-circuit the whole request by answering with a response of its
//! own.

use crate::api::Api;
use crate::api::response::Response;
use kusanagi_kernel::payload::command::{CallInfo, CommandPayload};
use kusanagi_kernel::payload::http::{HttpRequest, HttpResponse};
use kusanagi_kernel::payload::meta::Meta;
use kusanagi_kernel::payload::param::Param;
use kusanagi_kernel::payload::reply::ReplyPayload;
use serde_json::Value;
use std::collections::BTreeMap;

/// What a request middleware callback hands back to the runtime.
pub enum RequestReturn {
    Request(Box<Request>),
    Response(Box<Response>),
}

impl From<Request> for RequestReturn {
    fn from(request: Request) -> Self {
        RequestReturn::Request(Box::new(request))
    }
}

impl From<Response> for RequestReturn {
    fn from(response: Response) -> Self {
        RequestReturn::Response(Box::new(response))
    }
}

/// The request middleware view of an incoming request.
pub struct Request {
    pub(crate) api: Api,
    pub(crate) meta: Meta,
    pub(crate) call: CallInfo,
    pub(crate) http_request: Option<HttpRequest>,
    pub(crate) attributes: BTreeMap<String, String>,
    pub(crate) params: BTreeMap<String, Param>,
}

impl Request {
    pub(crate) fn new(api: Api, command: &CommandPayload) -> Self {
        let args = command.args();
        let meta = args.meta.clone().unwrap_or_default();
        let call = args.call.clone().unwrap_or_default();
        let attributes = meta.attributes.clone();
        let params = call
            .params
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|param| (param.name.clone(), param))
            .collect();
        Self {
            api,
            meta,
            call,
            http_request: args.http_request.clone(),
            attributes,
            params,
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

    pub fn get_client_address(&self) -> &str {
        &self.meta.client
    }

    pub fn get_request_id(&self) -> &str {
        &self.meta.id
    }

    pub fn get_request_timestamp(&self) -> &str {
        &self.meta.datetime
    }

    pub fn get_service_name(&self) -> &str {
        &self.call.service
    }

    pub fn set_service_name(&mut self, service: &str) {
        self.call.service = service.to_string();
    }

    pub fn get_service_version(&self) -> &str {
        &self.call.version
    }

    pub fn set_service_version(&mut self, version: &str) {
        self.call.version = version.to_string();
    }

    pub fn get_action_name(&self) -> &str {
        &self.call.action
    }

    pub fn set_action_name(&mut self, action: &str) {
        self.call.action = action.to_string();
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// A parameter by name; missing names yield an empty typed stub.
    pub fn get_param(&self, name: &str) -> Param {
        self.params
            .get(name)
            .cloned()
            .unwrap_or_else(|| Param::empty(name))
    }

    pub fn get_params(&self) -> Vec<Param> {
        self.params.values().cloned().collect()
    }

    pub fn set_param(&mut self, param: Param) {
        self.params.insert(param.name.clone(), param);
    }

    pub fn new_param(&self, name: &str, value: Value) -> Param {
        Param::new(name, value)
    }

    pub fn get_attribute(&self, name: &str, default: &str) -> String {
        self.attributes
            .get(name)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Register a request attribute the gateway carries to the reply.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    pub fn get_http_request(&self) -> Option<&HttpRequest> {
        self.http_request.as_ref()
    }

    /// Short-circuit the request with a response of the given status.
    ///
    /// The reply switches from request shape to response shape; return the
    /// [`Response`] from the callback for it to take effect.
    pub fn new_response(self, code: u16, text: &str) -> Response {
        Response::from_request(self, HttpResponse::new(code, text))
    }

    /// Finalize the middleware reply in request shape.
    pub(crate) fn into_reply(self, command: &CommandPayload) -> ReplyPayload {
        let mut reply = ReplyPayload::for_request(command);
        if let Some(result) = reply.result_mut() {
            let mut call = self.call;
            let params: Vec<Param> = self.params.into_values().collect();
            call.params = if params.is_empty() { None } else { Some(params) };
            result.call = Some(call);
            if !self.attributes.is_empty() {
                result.attributes = Some(self.attributes);
            }
        }
        reply
    }
}
