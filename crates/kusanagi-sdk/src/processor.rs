//! Bridges the component server to userland callbacks.
//!
//! One processor instance serves the whole process; per-request state
//! lives in the façade built for each command. Userland errors convert
//! according to the component kind: services turn them into transport
//! errors, middlewares into an HTTP 500 response carrying the error text.

use crate::api::Api;
use crate::api::action::Action;
use crate::api::request::{Request, RequestReturn};
use crate::api::response::Response;
use crate::component::{ComponentInfo, ErrorHook, Resource};
use kusanagi_kernel::payload::http::HttpResponse;
use kusanagi_kernel::payload::reply::{DEFAULT_ERROR_STATUS, ErrorPayload, ReplyPayload};
use kusanagi_runtime::server::{RequestContext, RequestProcessor};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

pub(crate) type ActionCallback =
    Arc<dyn Fn(Action) -> anyhow::Result<Action> + Send + Sync>;
pub(crate) type RequestCallback =
    Arc<dyn Fn(Request) -> anyhow::Result<RequestReturn> + Send + Sync>;
pub(crate) type ResponseCallback =
    Arc<dyn Fn(Response) -> anyhow::Result<Response> + Send + Sync>;

/// Callback dispatch table, one shape per component kind.
pub(crate) enum Callbacks {
    Service(BTreeMap<String, ActionCallback>),
    Middleware {
        request: Option<RequestCallback>,
        response: Option<ResponseCallback>,
    },
}

pub(crate) struct ComponentProcessor {
    info: Arc<ComponentInfo>,
    resources: Arc<BTreeMap<String, Resource>>,
    callbacks: Callbacks,
    error_hook: Option<ErrorHook>,
}

impl ComponentProcessor {
    pub(crate) fn new(
        info: Arc<ComponentInfo>,
        resources: Arc<BTreeMap<String, Resource>>,
        callbacks: Callbacks,
        error_hook: Option<ErrorHook>,
    ) -> Self {
        Self {
            info,
            resources,
            callbacks,
            error_hook,
        }
    }

    fn api(&self, context: &RequestContext) -> Api {
        Api {
            info: self.info.clone(),
            schemas: context.schemas.clone(),
            resources: self.resources.clone(),
            cancel: context.cancel.clone(),
            timeout_ms: context.timeout_ms,
        }
    }

    fn report(&self, err: &anyhow::Error) {
        if let Some(hook) = &self.error_hook {
            hook(err);
        }
    }

    fn process_action(
        &self,
        context: &RequestContext,
        actions: &BTreeMap<String, ActionCallback>,
    ) -> ReplyPayload {
        let action_name = context
            .command
            .args()
            .action
            .clone()
            .unwrap_or_else(|| context.action.clone());
        let Some(callback) = actions.get(&action_name) else {
            warn!("Undefined action requested: \"{action_name}\"");
            return ReplyPayload::new_error(
                &format!("Invalid action: \"{action_name}\""),
                0,
                DEFAULT_ERROR_STATUS,
            );
        };

        let action = Action::new(self.api(context), &context.command, action_name);
        match callback(action) {
            Ok(action) => action.into_reply(&context.command),
            Err(err) => {
                self.report(&err);
                // A failed action contributes its error to the transport.
                let mut reply = ReplyPayload::for_action(&context.command);
                if let Some(result) = reply.result_mut() {
                    if let Some(transport) = result.transport.as_mut() {
                        let (service, version) =
                            (self.info.name.clone(), self.info.version.clone());
                        transport.set_error(
                            &service,
                            &version,
                            ErrorPayload::new(&err.to_string(), 0, DEFAULT_ERROR_STATUS),
                        );
                    }
                }
                reply
            }
        }
    }

    fn process_request(
        &self,
        context: &RequestContext,
        callback: Option<&RequestCallback>,
    ) -> ReplyPayload {
        let Some(callback) = callback else {
            return middleware_error_reply(context, "Middleware has no request callback");
        };
        let request = Request::new(self.api(context), &context.command);
        match callback(request) {
            Ok(RequestReturn::Request(request)) => request.into_reply(&context.command),
            Ok(RequestReturn::Response(response)) => response.into_reply(&context.command),
            Err(err) => {
                self.report(&err);
                middleware_error_reply(context, &err.to_string())
            }
        }
    }

    fn process_response(
        &self,
        context: &RequestContext,
        callback: Option<&ResponseCallback>,
    ) -> ReplyPayload {
        let Some(callback) = callback else {
            return middleware_error_reply(context, "Middleware has no response callback");
        };
        let response = Response::new(self.api(context), &context.command);
        match callback(response) {
            Ok(response) => response.into_reply(&context.command),
            Err(err) => {
                self.report(&err);
                middleware_error_reply(context, &err.to_string())
            }
        }
    }
}

impl RequestProcessor for ComponentProcessor {
    fn process(&self, context: RequestContext) -> ReplyPayload {
        match &self.callbacks {
            Callbacks::Service(actions) => self.process_action(&context, actions),
            Callbacks::Middleware { request, response } => match context.action.as_str() {
                "request" => self.process_request(&context, request.as_ref()),
                "response" => self.process_response(&context, response.as_ref()),
                other => {
                    warn!("Undefined middleware stage requested: \"{other}\"");
                    ReplyPayload::new_error(
                        &format!("Invalid middleware stage: \"{other}\""),
                        0,
                        DEFAULT_ERROR_STATUS,
                    )
                }
            },
        }
    }
}

/// Userland middleware errors become an HTTP 500 response whose body is
/// the error text.
fn middleware_error_reply(context: &RequestContext, message: &str) -> ReplyPayload {
    let mut reply = ReplyPayload::for_request(&context.command);
    let mut response = HttpResponse::new(500, "Internal Server Error");
    response.set_body(message);
    reply.switch_to_response(response);
    reply
}
