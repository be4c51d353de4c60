//! Service action façade.
//!
//! An action owns a working copy of the request transport: userland
//! writes never touch the command payload, which stays immutable for the
//! lifetime of the request and seeds any run-time call. Schema-backed
//! mutators verify the action's schema permits the operation before
//! touching the transport; when the gateway has not shipped mappings yet
//! (single stdin invocations) the checks are skipped.

use crate::api::{Api, EXECUTION_TIMEOUT};
use crate::error::{PolicyError, SdkError, SdkResult};
use kusanagi_kernel::codec;
use kusanagi_kernel::payload::command::{CommandArgs, CommandPayload};
use kusanagi_kernel::payload::file::File;
use kusanagi_kernel::payload::meta::TransportMeta;
use kusanagi_kernel::payload::param::Param;
use kusanagi_kernel::payload::reply::{ErrorPayload, ReplyPayload};
use kusanagi_kernel::schema::ActionSchema;
use kusanagi_kernel::transport::{Call, Transaction, TransactionCommand, Transport};
use kusanagi_runtime::call::{self as runtime_call, CallError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;

/// The service view of an action invocation.
pub struct Action {
    pub(crate) api: Api,
    pub(crate) action_name: String,

    /// Working copy the reply is built from.
    pub(crate) transport: Transport,

    /// Immutable transport as received; seeds run-time call commands.
    pub(crate) command_transport: Transport,

    pub(crate) params: BTreeMap<String, Param>,
    pub(crate) files: BTreeMap<String, File>,
    pub(crate) return_value: Option<Value>,
}

impl Action {
    pub(crate) fn new(api: Api, command: &CommandPayload, action_name: String) -> Self {
        let args = command.args();
        let transport = args.transport.clone().unwrap_or_else(|| {
            let meta = args.meta.clone().unwrap_or_default();
            Transport::with_meta(TransportMeta {
                id: meta.id,
                version: meta.version,
                datetime: meta.datetime,
                gateway: meta.gateway,
                ..TransportMeta::default()
            })
        });
        let command_transport = transport.clone();

        let params: BTreeMap<String, Param> = args
            .params
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|param| (param.name.clone(), param))
            .collect();

        // Files for this action live under the current gateway address in
        // the transport; a run-time call ships them explicitly instead.
        let mut files: BTreeMap<String, File> = transport
            .files
            .as_ref()
            .and_then(|tree| tree.get(&transport.address()))
            .and_then(|services| services.get(&api.info.name))
            .and_then(|versions| versions.get(&api.info.version))
            .and_then(|actions| actions.get(&action_name))
            .map(|list| {
                list.iter()
                    .map(|file| (file.name.clone(), file.clone()))
                    .collect()
            })
            .unwrap_or_default();
        for file in args.files.clone().unwrap_or_default() {
            files.insert(file.name.clone(), file);
        }

        // A declared return type starts out as its zero value.
        let return_value = api
            .schemas
            .resolve(&api.info.name, &api.info.version)
            .ok()
            .and_then(|schema| schema.actions.get(&action_name))
            .filter(|schema| schema.has_return())
            .map(ActionSchema::default_return_value);

        Self {
            api,
            action_name,
            transport,
            command_transport,
            params,
            files,
            return_value,
        }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    /// Log a userland value at a syslog level.
    pub fn log(&self, value: &Value, level: u8) {
        self.api.log(value, level);
    }

    /// Whether this action is the origin of the whole request.
    pub fn is_origin(&self) -> bool {
        self.transport.meta.origin
            == [
                self.api.info.name.as_str(),
                self.api.info.version.as_str(),
                self.action_name.as_str(),
            ]
    }

    pub fn get_action_name(&self) -> &str {
        &self.action_name
    }

    /// Set a userland property on the transport meta.
    pub fn set_property(&mut self, name: &str, value: &str) {
        self.transport.meta.set_property(name, value);
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

    pub fn new_param(&self, name: &str, value: Value) -> Param {
        Param::new(name, value)
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// A file by name; missing names yield an empty stub.
    pub fn get_file(&self, name: &str) -> File {
        self.files
            .get(name)
            .cloned()
            .unwrap_or_else(|| File::empty(name))
    }

    pub fn get_files(&self) -> Vec<File> {
        self.files.values().cloned().collect()
    }

    pub fn new_file(&self, name: &str, path: &str, mime: &str) -> File {
        File::new(name, path, mime)
    }

    /// Set the response download.
    pub fn set_download(&mut self, file: File) -> SdkResult<()> {
        if file.is_local() {
            self.require_file_server()?;
        }
        self.transport.set_download(file);
        Ok(())
    }

    /// Set the action return value; the schema must declare a return type.
    pub fn set_return(&mut self, value: Value) -> SdkResult<()> {
        if let Some(schema) = self.own_action_schema()? {
            if !schema.has_return() {
                return Err(PolicyError::ReturnNotDeclared {
                    service: self.api.info.name.clone(),
                    version: self.api.info.version.clone(),
                    action: self.action_name.clone(),
                }
                .into());
            }
        }
        self.return_value = Some(value);
        Ok(())
    }

    /// Append an entity to the action data.
    pub fn set_entity(&mut self, entity: Value) {
        let (service, version, action) = self.identity();
        self.transport.set_data(&service, &version, &action, entity);
    }

    /// Append a collection to the action data.
    pub fn set_collection(&mut self, collection: Vec<Value>) {
        let (service, version, action) = self.identity();
        self.transport
            .set_data(&service, &version, &action, Value::Array(collection));
    }

    pub fn relate_one(&mut self, pk: &str, remote: &str, fk: &str) {
        let (service, _, _) = self.identity();
        self.transport.relate_one(&service, pk, remote, fk);
    }

    pub fn relate_many(&mut self, pk: &str, remote: &str, fks: Vec<String>) {
        let (service, _, _) = self.identity();
        self.transport.relate_many(&service, pk, remote, fks);
    }

    pub fn relate_one_remote(&mut self, pk: &str, address: &str, remote: &str, fk: &str) {
        let (service, _, _) = self.identity();
        self.transport
            .relate_one_remote(&service, pk, address, remote, fk);
    }

    pub fn relate_many_remote(&mut self, pk: &str, address: &str, remote: &str, fks: Vec<String>) {
        let (service, _, _) = self.identity();
        self.transport
            .relate_many_remote(&service, pk, address, remote, fks);
    }

    /// Set a link URI for this service.
    pub fn set_link(&mut self, name: &str, uri: &str) {
        let (service, _, _) = self.identity();
        self.transport.set_link(&service, name, uri);
    }

    /// Register a commit transaction.
    pub fn commit(&mut self, action: &str, params: Vec<Param>) {
        self.register_transaction(TransactionCommand::Commit, action, params);
    }

    /// Register a rollback transaction.
    pub fn rollback(&mut self, action: &str, params: Vec<Param>) {
        self.register_transaction(TransactionCommand::Rollback, action, params);
    }

    /// Register a complete transaction.
    pub fn complete(&mut self, action: &str, params: Vec<Param>) {
        self.register_transaction(TransactionCommand::Complete, action, params);
    }

    fn register_transaction(&mut self, command: TransactionCommand, action: &str, params: Vec<Param>) {
        let (service, version, caller) = self.identity();
        self.transport.set_transaction(
            command,
            Transaction {
                service,
                version,
                action: action.to_string(),
                caller,
                params: if params.is_empty() { None } else { Some(params) },
            },
        );
    }

    /// Report an error for this service call.
    pub fn error(&mut self, message: &str, code: i64, status: &str) {
        let (service, version, _) = self.identity();
        self.transport
            .set_error(&service, &version, ErrorPayload::new(message, code, status));
    }

    /// Make a synchronous run-time call and return its return value.
    ///
    /// The returned transport merges into this action's transport and a
    /// call record with the measured duration is appended whether the
    /// round-trip succeeded or not.
    pub fn call(
        &mut self,
        service: &str,
        version: &str,
        action: &str,
        params: Vec<Param>,
        files: Vec<File>,
        timeout: Option<u64>,
    ) -> SdkResult<Value> {
        if let Some(schema) = self.own_action_schema()? {
            if !schema.has_call(service, version, action) {
                return Err(PolicyError::CallNotDeclared {
                    service: service.to_string(),
                    version: version.to_string(),
                    action: action.to_string(),
                }
                .into());
            }
        }
        // Remote return values come back through the transport merge only.
        if let Ok(remote) = self.api.schemas.resolve(service, version) {
            if let Ok(remote_action) = remote.action(service, version, action) {
                if remote_action.has_return() {
                    return Err(PolicyError::RemoteReturnDeclared {
                        service: service.to_string(),
                        version: version.to_string(),
                        action: action.to_string(),
                    }
                    .into());
                }
            }
        }
        if files.iter().any(File::is_local) {
            self.require_file_server()?;
        }

        let timeout = timeout.unwrap_or(EXECUTION_TIMEOUT);
        let args = CommandArgs {
            action: Some(self.action_name.clone()),
            callee: Some(vec![
                service.to_string(),
                version.to_string(),
                action.to_string(),
            ]),
            transport: Some(self.command_transport.clone()),
            params: if params.is_empty() {
                None
            } else {
                Some(params.clone())
            },
            files: if files.is_empty() {
                None
            } else {
                Some(files.clone())
            },
            ..CommandArgs::default()
        };
        let command = CommandPayload::new("runtime-call", "service", args);
        let request = codec::pack(&command)?;

        let started = Instant::now();
        let outcome =
            runtime_call::execute(&self.api.info.address, &request, timeout, &self.api.cancel);
        let (duration, settled) = match outcome {
            Ok((bytes, duration)) => (duration, decode_call_reply(&bytes)),
            Err(err) => ((started.elapsed().as_millis() as u64).max(1), Err(err.into())),
        };
        let (child, value) = match settled {
            Ok((child, value)) => (child, Ok(value)),
            Err(err) => (None, Err(err)),
        };

        let record = Call {
            gateway: None,
            name: service.to_string(),
            version: version.to_string(),
            action: action.to_string(),
            caller: self.action_name.clone(),
            duration,
            timeout,
            params: if params.is_empty() { None } else { Some(params) },
            files: if files.is_empty() { None } else { Some(files) },
        };
        let (own_service, own_version, _) = self.identity();
        self.transport
            .set_call(&own_service, &own_version, record, child)?;

        value
    }

    /// Register a call for the gateway to execute after this action ends.
    pub fn defer_call(
        &mut self,
        service: &str,
        version: &str,
        action: &str,
        params: Vec<Param>,
        files: Vec<File>,
    ) -> SdkResult<()> {
        if let Some(schema) = self.own_action_schema()? {
            if !schema.has_defer_call(service, version, action) {
                return Err(PolicyError::DeferNotDeclared {
                    service: service.to_string(),
                    version: version.to_string(),
                    action: action.to_string(),
                }
                .into());
            }
        }
        if files.iter().any(File::is_local) {
            self.require_file_server()?;
        }

        let record = Call {
            gateway: None,
            name: service.to_string(),
            version: version.to_string(),
            action: action.to_string(),
            caller: self.action_name.clone(),
            duration: 0,
            timeout: 0,
            params: if params.is_empty() { None } else { Some(params) },
            files: if files.is_empty() { None } else { Some(files) },
        };
        let (own_service, own_version, _) = self.identity();
        self.transport.set_defer_call(&own_service, &own_version, record);
        Ok(())
    }

    /// Register a call to a service in another realm.
    #[allow(clippy::too_many_arguments)]
    pub fn remote_call(
        &mut self,
        address: &str,
        service: &str,
        version: &str,
        action: &str,
        params: Vec<Param>,
        files: Vec<File>,
        timeout: Option<u64>,
    ) -> SdkResult<()> {
        if !address.starts_with("ktp://") {
            return Err(PolicyError::InvalidRemoteAddress {
                address: address.to_string(),
            }
            .into());
        }
        if let Some(schema) = self.own_action_schema()? {
            if !schema.has_remote_call(address, service, version, action) {
                return Err(PolicyError::RemoteNotDeclared {
                    address: address.to_string(),
                    service: service.to_string(),
                    version: version.to_string(),
                    action: action.to_string(),
                }
                .into());
            }
        }
        if files.iter().any(File::is_local) {
            self.require_file_server()?;
        }

        let record = Call {
            gateway: Some(address.to_string()),
            name: service.to_string(),
            version: version.to_string(),
            action: action.to_string(),
            caller: self.action_name.clone(),
            duration: 0,
            timeout: timeout.unwrap_or(EXECUTION_TIMEOUT),
            params: if params.is_empty() { None } else { Some(params) },
            files: if files.is_empty() { None } else { Some(files) },
        };
        let (own_service, own_version, _) = self.identity();
        self.transport.set_remote_call(&own_service, &own_version, record);
        Ok(())
    }

    /// Finalize the action reply.
    pub(crate) fn into_reply(self, command: &CommandPayload) -> ReplyPayload {
        let mut reply = ReplyPayload::for_action(command);
        if let Some(result) = reply.result_mut() {
            result.transport = Some(self.transport);
            result.return_value = self.return_value;
        }
        reply
    }

    fn identity(&self) -> (String, String, String) {
        (
            self.api.info.name.clone(),
            self.api.info.version.clone(),
            self.action_name.clone(),
        )
    }

    /// Schema of this action, or `None` when no mappings were shipped.
    fn own_action_schema(&self) -> SdkResult<Option<&ActionSchema>> {
        if self.api.schemas.is_empty() {
            return Ok(None);
        }
        let schema = self
            .api
            .schemas
            .resolve(&self.api.info.name, &self.api.info.version)?;
        let action = schema.action(&self.api.info.name, &self.api.info.version, &self.action_name)?;
        Ok(Some(action))
    }

    fn require_file_server(&self) -> SdkResult<()> {
        if self.api.schemas.is_empty() {
            return Ok(());
        }
        let schema = self
            .api
            .schemas
            .resolve(&self.api.info.name, &self.api.info.version)?;
        if !schema.file_server {
            return Err(PolicyError::FileServerDisabled {
                service: self.api.info.name.clone(),
                version: self.api.info.version.clone(),
            }
            .into());
        }
        Ok(())
    }
}

fn decode_call_reply(bytes: &[u8]) -> SdkResult<(Option<Transport>, Value)> {
    let reply: ReplyPayload = codec::unpack(bytes)?;
    if let Some(error) = reply.error {
        // The remote error message is preserved verbatim.
        return Err(SdkError::Call(CallError::Remote(error.message)));
    }
    let result = reply.command_reply.map(|reply| reply.result).unwrap_or_default();
    Ok((result.transport, result.return_value.unwrap_or(Value::Null)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing;
    use kusanagi_kernel::payload::meta::TransportMeta;
    use kusanagi_kernel::schema::{
        ActionSchema, ReturnSchema, SchemaRegistry, ServiceSchema,
    };
    use kusanagi_runtime::cli::ComponentKind;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn command() -> CommandPayload {
        let transport = Transport::with_meta(TransportMeta {
            gateway: vec!["ktp://10.0.0.1:77".into(), "http://10.0.0.1:80".into()],
            origin: vec!["users".into(), "1.0.0".into(), "read".into()],
            ..TransportMeta::default()
        });
        CommandPayload::new(
            "users.read",
            "service",
            CommandArgs {
                action: Some("read".into()),
                transport: Some(transport),
                params: Some(vec![Param::new("id", json!(42))]),
                ..CommandArgs::default()
            },
        )
    }

    fn action() -> Action {
        Action::new(
            testing::api(ComponentKind::Service, "users", "1.0.0"),
            &command(),
            "read".into(),
        )
    }

    fn snapshot_with(schema: ServiceSchema) -> kusanagi_kernel::schema::SchemaSnapshot {
        let mut versions = BTreeMap::new();
        versions.insert("1.0.0".to_string(), schema);
        let mut mappings = BTreeMap::new();
        mappings.insert("users".to_string(), versions);

        let registry = SchemaRegistry::new();
        registry.update(&codec::pack(&mappings).unwrap()).unwrap();
        registry.snapshot()
    }

    fn action_with_schema(schema: ActionSchema, file_server: bool) -> Action {
        let mut actions = BTreeMap::new();
        actions.insert("read".to_string(), schema);
        let api = testing::api_with_schemas(
            ComponentKind::Service,
            "users",
            "1.0.0",
            snapshot_with(ServiceSchema {
                file_server,
                actions,
                ..ServiceSchema::default()
            }),
        );
        Action::new(api, &command(), "read".into())
    }

    #[test]
    fn test_origin_and_params() {
        let action = action();
        assert!(action.is_origin());
        assert!(action.has_param("id"));
        assert_eq!(action.get_param("id").as_i64(), 42);
        assert!(!action.get_param("ghost").exists());
    }

    #[test]
    fn test_entity_lands_under_gateway_address() {
        let mut action = action();
        action.set_entity(json!({"hello": "world"}));

        let items =
            &action.transport.data.as_ref().unwrap()["http://10.0.0.1:80"]["users"]["1.0.0"]["read"];
        assert_eq!(items[0], json!({"hello": "world"}));
    }

    #[test]
    fn test_collection_appends_as_one_element() {
        let mut action = action();
        action.set_collection(vec![json!({"id": 1}), json!({"id": 2})]);

        let items =
            &action.transport.data.as_ref().unwrap()["http://10.0.0.1:80"]["users"]["1.0.0"]["read"];
        assert_eq!(items.len(), 1);
        assert_eq!(items[0], json!([{"id": 1}, {"id": 2}]));
    }

    #[test]
    fn test_error_registers_transport_error() {
        let mut action = action();
        action.error("user not found", 44, "404 Not Found");

        let errors = &action.transport.errors.as_ref().unwrap()["http://10.0.0.1:80"]["users"]["1.0.0"];
        assert_eq!(errors[0].message, "user not found");
        assert_eq!(errors[0].code, 44);
    }

    #[test]
    fn test_transactions_carry_caller() {
        let mut action = action();
        action.commit("save", vec![]);
        action.rollback("undo", vec![Param::new("id", json!(1))]);

        let transactions = action.transport.transactions.as_ref().unwrap();
        assert_eq!(transactions["commit"][0].caller, "read");
        assert_eq!(transactions["commit"][0].action, "save");
        assert_eq!(transactions["rollback"][0].params.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_set_return_without_mappings_is_allowed() {
        let mut action = action();
        action.set_return(json!(99)).unwrap();
        assert_eq!(action.return_value, Some(json!(99)));
    }

    #[test]
    fn test_set_return_requires_declaration() {
        let mut action = action_with_schema(ActionSchema::default(), false);
        let result = action.set_return(json!(99));
        assert!(matches!(
            result,
            Err(SdkError::Policy(PolicyError::ReturnNotDeclared { .. }))
        ));
    }

    #[test]
    fn test_declared_return_starts_at_zero_value() {
        let action = action_with_schema(
            ActionSchema {
                return_value: Some(ReturnSchema {
                    return_type: "integer".into(),
                }),
                ..ActionSchema::default()
            },
            false,
        );
        assert_eq!(action.return_value, Some(json!(0)));
    }

    #[test]
    fn test_undeclared_call_fails_without_mutation() {
        let mut action = action_with_schema(ActionSchema::default(), false);
        let result = action.call("posts", "1.0.0", "list", vec![], vec![], None);
        assert!(matches!(
            result,
            Err(SdkError::Policy(PolicyError::CallNotDeclared { .. }))
        ));
        assert!(action.transport.calls.is_none());
    }

    #[test]
    fn test_local_download_requires_file_server() {
        let mut action = action_with_schema(ActionSchema::default(), false);
        let file = File {
            name: "report".into(),
            path: "file:///tmp/report.pdf".into(),
            ..File::default()
        };
        let result = action.set_download(file);
        assert!(matches!(
            result,
            Err(SdkError::Policy(PolicyError::FileServerDisabled { .. }))
        ));
    }

    #[test]
    fn test_remote_download_is_always_allowed() {
        let mut action = action_with_schema(ActionSchema::default(), false);
        let file = File {
            name: "report".into(),
            path: "http://files.internal/report.pdf".into(),
            token: "tok".into(),
            ..File::default()
        };
        action.set_download(file).unwrap();
        assert!(action.transport.has_download());
    }

    #[test]
    fn test_defer_call_records_pending_call() {
        let mut action = action_with_schema(
            ActionSchema {
                deferred_calls: vec![vec!["posts".into(), "1.0.0".into(), "create".into()]],
                ..ActionSchema::default()
            },
            false,
        );
        action
            .defer_call("posts", "1.0.0", "create", vec![], vec![])
            .unwrap();
        assert!(action.transport.has_calls("users", "1.0.0"));
    }

    #[test]
    fn test_remote_call_address_validation() {
        let mut action = action();
        let result = action.remote_call("http://x", "users", "1.0.0", "read", vec![], vec![], None);
        assert!(matches!(
            result,
            Err(SdkError::Policy(PolicyError::InvalidRemoteAddress { .. }))
        ));

        // Without mappings a ktp address passes the policy checks.
        action
            .remote_call("ktp://x", "users", "1.0.0", "read", vec![], vec![], None)
            .unwrap();
        let records = &action.transport.calls.as_ref().unwrap()["users"]["1.0.0"];
        assert_eq!(records[0].gateway.as_deref(), Some("ktp://x"));
    }

    /// Point an action's run-time calls at a test socket.
    fn action_at(address: &str) -> Action {
        let mut api = testing::api(ComponentKind::Service, "users", "1.0.0");
        let mut info = (*api.info).clone();
        info.address = address.to_string();
        api.info = std::sync::Arc::new(info);
        Action::new(api, &command(), "read".into())
    }

    #[test]
    fn test_call_merges_child_transport_and_records_duration() {
        let context = zmq::Context::new();
        let responder = context.socket(zmq::REP).unwrap();
        responder.bind("tcp://127.0.0.1:59890").unwrap();

        // Fake gateway: echo the call command back as a child reply with
        // one data entity and a return value.
        let gateway = std::thread::spawn(move || {
            let frames = responder.recv_multipart(0).unwrap();
            let command: CommandPayload = codec::unpack(&frames[1]).unwrap();
            assert_eq!(command.name(), "runtime-call");
            assert_eq!(command.scope(), "service");
            assert_eq!(
                command.args().callee.as_deref(),
                Some(["bar".to_string(), "1".to_string(), "run".to_string()].as_slice())
            );

            let mut child = command.args().transport.clone().unwrap();
            child.set_data("bar", "1", "run", json!({"n": 1}));
            let mut reply = ReplyPayload::for_action(&command);
            if let Some(result) = reply.result_mut() {
                result.transport = Some(child);
                result.return_value = Some(json!("done"));
            }
            responder.send(codec::pack(&reply).unwrap(), 0).unwrap();
        });

        let mut action = action_at("tcp://127.0.0.1:59890");
        let value = action
            .call("bar", "1", "run", vec![], vec![], Some(2_000))
            .unwrap();
        gateway.join().unwrap();

        assert_eq!(value, json!("done"));
        let items = &action.transport.data.as_ref().unwrap()["http://10.0.0.1:80"]["bar"]["1"]["run"];
        assert_eq!(items[0], json!({"n": 1}));
        let records = &action.transport.calls.as_ref().unwrap()["users"]["1.0.0"];
        assert_eq!(records[0].action, "run");
        assert!(records[0].duration > 0);
    }

    #[test]
    fn test_call_preserves_remote_error_and_records_call() {
        let context = zmq::Context::new();
        let responder = context.socket(zmq::REP).unwrap();
        responder.bind("tcp://127.0.0.1:59891").unwrap();

        let gateway = std::thread::spawn(move || {
            let _ = responder.recv_multipart(0).unwrap();
            let reply = ReplyPayload::new_error("user does not exist", 44, "404 Not Found");
            responder.send(codec::pack(&reply).unwrap(), 0).unwrap();
        });

        let mut action = action_at("tcp://127.0.0.1:59891");
        let result = action.call("bar", "1", "run", vec![], vec![], Some(2_000));
        gateway.join().unwrap();

        match result {
            Err(SdkError::Call(CallError::Remote(message))) => {
                assert_eq!(message, "user does not exist");
            }
            other => panic!("expected a remote call error, got {other:?}"),
        }
        // The failed round-trip is still recorded with its duration.
        let records = &action.transport.calls.as_ref().unwrap()["users"]["1.0.0"];
        assert!(records[0].duration > 0);
    }

    #[test]
    fn test_reply_carries_working_transport() {
        let mut action = action();
        action.set_entity(json!({"hello": "world"}));
        action.set_property("flow", "checkout");

        let reply = action.into_reply(&command());
        let transport = reply.result().unwrap().transport.as_ref().unwrap();
        assert!(transport.data.is_some());
        assert_eq!(transport.meta.get_property("flow"), Some("checkout"));
    }
}
