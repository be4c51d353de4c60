//! The per-request mergeable state object.
//!
//! A transport travels with the request across every component it touches.
//! Services write into it through semantic mutators and the gateway reads
//! the result back out of the reply. When a run-time call returns, the
//! child transport merges into the caller's: histories (data, files,
//! errors, transactions, calls) concatenate, while declarative facts
//! (relations, links) keep the first writer.

use crate::payload::file::File;
use crate::payload::meta::TransportMeta;
use crate::payload::param::Param;
use crate::payload::reply::ErrorPayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

type DataMap = BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<Value>>>>>;
type RelationsMap =
    BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeMap<String, Value>>>>>;
type LinksMap = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;
type CallsMap = BTreeMap<String, BTreeMap<String, Vec<Call>>>;
type TransactionsMap = BTreeMap<String, Vec<Transaction>>;
type ErrorsMap = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<ErrorPayload>>>>;
type FilesMap = BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<File>>>>>;

/// Errors raised by transport mutators.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    #[error("Call duration is required")]
    MissingDuration,
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A record of a run-time, deferred or remote call.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Call {
    /// Remote gateway address; only present for calls to another realm.
    #[serde(rename = "g", default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    #[serde(rename = "n", default)]
    pub name: String,

    #[serde(rename = "v", default)]
    pub version: String,

    #[serde(rename = "a", default)]
    pub action: String,

    /// Action that made the call.
    #[serde(rename = "C", default, skip_serializing_if = "String::is_empty")]
    pub caller: String,

    /// Execution time in milliseconds; zero means not yet executed.
    #[serde(rename = "D", default, skip_serializing_if = "is_zero")]
    pub duration: u64,

    #[serde(rename = "x", default, skip_serializing_if = "is_zero")]
    pub timeout: u64,

    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Param>>,

    #[serde(rename = "f", default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<File>>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

impl Call {
    /// Whether the call still awaits execution by the gateway.
    pub fn is_pending(&self) -> bool {
        self.duration == 0
    }
}

/// A transaction registered for execution after the request completes.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Transaction {
    #[serde(rename = "n", default)]
    pub service: String,

    #[serde(rename = "v", default)]
    pub version: String,

    /// Action to run when the transaction fires.
    #[serde(rename = "a", default)]
    pub action: String,

    /// Action that registered the transaction.
    #[serde(rename = "c", default, skip_serializing_if = "String::is_empty")]
    pub caller: String,

    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Param>>,
}

/// Transaction stages the gateway understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionCommand {
    Commit,
    Rollback,
    Complete,
}

impl TransactionCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionCommand::Commit => "commit",
            TransactionCommand::Rollback => "rollback",
            TransactionCommand::Complete => "complete",
        }
    }
}

/// The mergeable request state tree.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Transport {
    #[serde(rename = "m", default)]
    pub meta: TransportMeta,

    /// At most one download for the response.
    #[serde(rename = "b", default, skip_serializing_if = "Option::is_none")]
    pub body: Option<File>,

    #[serde(rename = "f", default, skip_serializing_if = "Option::is_none")]
    pub files: Option<FilesMap>,

    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataMap>,

    #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<RelationsMap>,

    #[serde(rename = "l", default, skip_serializing_if = "Option::is_none")]
    pub links: Option<LinksMap>,

    #[serde(rename = "C", default, skip_serializing_if = "Option::is_none")]
    pub calls: Option<CallsMap>,

    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<TransactionsMap>,

    #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorsMap>,
}

impl Transport {
    pub fn with_meta(meta: TransportMeta) -> Self {
        Self {
            meta,
            ..Self::default()
        }
    }

    /// The public gateway address writes are keyed under.
    pub fn address(&self) -> String {
        self.meta.public_gateway().to_string()
    }

    /// Set the response download.
    pub fn set_download(&mut self, file: File) {
        self.body = Some(file);
    }

    /// Append an entity or collection for an action, in call order.
    pub fn set_data(&mut self, service: &str, version: &str, action: &str, value: Value) {
        let address = self.address();
        self.data
            .get_or_insert_with(BTreeMap::new)
            .entry(address)
            .or_default()
            .entry(service.to_string())
            .or_default()
            .entry(version.to_string())
            .or_default()
            .entry(action.to_string())
            .or_default()
            .push(value);
    }

    /// Relate an entity to a single remote entity.
    pub fn relate_one(&mut self, service: &str, pk: &str, remote: &str, fk: &str) {
        let address = self.address();
        self.relate(service, pk, &address, remote, Value::String(fk.to_string()));
    }

    /// Relate an entity to multiple remote entities.
    pub fn relate_many(&mut self, service: &str, pk: &str, remote: &str, fks: Vec<String>) {
        let address = self.address();
        self.relate(service, pk, &address, remote, Value::from(fks));
    }

    pub fn relate_one_remote(
        &mut self,
        service: &str,
        pk: &str,
        remote_address: &str,
        remote: &str,
        fk: &str,
    ) {
        self.relate(service, pk, remote_address, remote, Value::String(fk.to_string()));
    }

    pub fn relate_many_remote(
        &mut self,
        service: &str,
        pk: &str,
        remote_address: &str,
        remote: &str,
        fks: Vec<String>,
    ) {
        self.relate(service, pk, remote_address, remote, Value::from(fks));
    }

    fn relate(&mut self, service: &str, pk: &str, remote_address: &str, remote: &str, value: Value) {
        let address = self.address();
        self.relations
            .get_or_insert_with(BTreeMap::new)
            .entry(address)
            .or_default()
            .entry(service.to_string())
            .or_default()
            .entry(pk.to_string())
            .or_default()
            .entry(remote_address.to_string())
            .or_default()
            .insert(remote.to_string(), value);
    }

    /// Set a link URI for the service.
    pub fn set_link(&mut self, service: &str, name: &str, uri: &str) {
        let address = self.address();
        self.links
            .get_or_insert_with(BTreeMap::new)
            .entry(address)
            .or_default()
            .entry(service.to_string())
            .or_default()
            .insert(name.to_string(), uri.to_string());
    }

    /// Register a transaction for a stage.
    pub fn set_transaction(&mut self, command: TransactionCommand, transaction: Transaction) {
        self.transactions
            .get_or_insert_with(BTreeMap::new)
            .entry(command.as_str().to_string())
            .or_default()
            .push(transaction);
    }

    /// Record an executed run-time call made by `(service, version)`.
    ///
    /// With a child transport the call is appended to the child first and
    /// the child then merges into this transport, so the record lands in
    /// history order together with everything the callee produced.
    pub fn set_call(
        &mut self,
        service: &str,
        version: &str,
        call: Call,
        child: Option<Transport>,
    ) -> TransportResult<()> {
        if call.duration == 0 {
            return Err(TransportError::MissingDuration);
        }
        match child {
            Some(mut child) => {
                child.append_call(service, version, call);
                self.merge(child);
            }
            None => self.append_call(service, version, call),
        }
        Ok(())
    }

    /// Record a deferred call; files travel with it and are registered
    /// under the callee action so the gateway can hand them over.
    pub fn set_defer_call(&mut self, service: &str, version: &str, call: Call) {
        if let Some(files) = &call.files {
            for file in files.clone() {
                self.add_file(&call.name, &call.version, &call.action, file);
            }
        }
        self.append_call(service, version, call);
    }

    /// Record a call to a service in another realm.
    pub fn set_remote_call(&mut self, service: &str, version: &str, call: Call) {
        self.set_defer_call(service, version, call);
    }

    fn append_call(&mut self, service: &str, version: &str, call: Call) {
        self.calls
            .get_or_insert_with(BTreeMap::new)
            .entry(service.to_string())
            .or_default()
            .entry(version.to_string())
            .or_default()
            .push(call);
    }

    /// Register an error reported by a service.
    pub fn set_error(&mut self, service: &str, version: &str, error: ErrorPayload) {
        let address = self.address();
        self.errors
            .get_or_insert_with(BTreeMap::new)
            .entry(address)
            .or_default()
            .entry(service.to_string())
            .or_default()
            .entry(version.to_string())
            .or_default()
            .push(error);
    }

    /// Register a file for an action at the current gateway.
    pub fn add_file(&mut self, service: &str, version: &str, action: &str, file: File) {
        let address = self.address();
        self.files
            .get_or_insert_with(BTreeMap::new)
            .entry(address)
            .or_default()
            .entry(service.to_string())
            .or_default()
            .entry(version.to_string())
            .or_default()
            .entry(action.to_string())
            .or_default()
            .push(file);
    }

    /// Whether any call for `(service, version)` still awaits execution.
    pub fn has_calls(&self, service: &str, version: &str) -> bool {
        self.calls
            .as_ref()
            .and_then(|calls| calls.get(service))
            .and_then(|versions| versions.get(version))
            .map(|records| records.iter().any(Call::is_pending))
            .unwrap_or(false)
    }

    pub fn has_files(&self) -> bool {
        self.files.as_ref().map(|m| !m.is_empty()).unwrap_or(false)
    }

    pub fn has_transactions(&self) -> bool {
        self.transactions
            .as_ref()
            .map(|m| !m.is_empty())
            .unwrap_or(false)
    }

    pub fn has_download(&self) -> bool {
        self.body.is_some()
    }

    /// Merge a transport returned by a run-time call into this one.
    ///
    /// Histories concatenate with the source appended after the target;
    /// relations and links keep whichever writer came first; userland
    /// properties never clobber existing keys; the body transfers only
    /// when the target has none.
    pub fn merge(&mut self, source: Transport) {
        if let Some(properties) = source.meta.properties {
            let target = self.meta.properties.get_or_insert_with(BTreeMap::new);
            for (name, value) in properties {
                target.entry(name).or_insert(value);
            }
        }

        if let Some(data) = source.data {
            let target = self.data.get_or_insert_with(BTreeMap::new);
            for (address, services) in data {
                let target = target.entry(address).or_default();
                for (service, versions) in services {
                    let target = target.entry(service).or_default();
                    for (version, actions) in versions {
                        let target = target.entry(version).or_default();
                        for (action, mut items) in actions {
                            target.entry(action).or_default().append(&mut items);
                        }
                    }
                }
            }
        }

        if let Some(files) = source.files {
            let target = self.files.get_or_insert_with(BTreeMap::new);
            for (address, services) in files {
                let target = target.entry(address).or_default();
                for (service, versions) in services {
                    let target = target.entry(service).or_default();
                    for (version, actions) in versions {
                        let target = target.entry(version).or_default();
                        for (action, mut items) in actions {
                            target.entry(action).or_default().append(&mut items);
                        }
                    }
                }
            }
        }

        if let Some(errors) = source.errors {
            let target = self.errors.get_or_insert_with(BTreeMap::new);
            for (address, services) in errors {
                let target = target.entry(address).or_default();
                for (service, versions) in services {
                    let target = target.entry(service).or_default();
                    for (version, mut items) in versions {
                        target.entry(version).or_default().append(&mut items);
                    }
                }
            }
        }

        if let Some(transactions) = source.transactions {
            let target = self.transactions.get_or_insert_with(BTreeMap::new);
            for (command, mut items) in transactions {
                target.entry(command).or_default().append(&mut items);
            }
        }

        if let Some(calls) = source.calls {
            let target = self.calls.get_or_insert_with(BTreeMap::new);
            for (service, versions) in calls {
                let target = target.entry(service).or_default();
                for (version, mut items) in versions {
                    target.entry(version).or_default().append(&mut items);
                }
            }
        }

        if let Some(relations) = source.relations {
            let target = self.relations.get_or_insert_with(BTreeMap::new);
            for (address, services) in relations {
                let target = target.entry(address).or_default();
                for (service, pks) in services {
                    let target = target.entry(service).or_default();
                    for (pk, remotes) in pks {
                        let target = target.entry(pk).or_default();
                        for (remote_address, remote_services) in remotes {
                            let target = target.entry(remote_address).or_default();
                            for (remote_service, value) in remote_services {
                                target.entry(remote_service).or_insert(value);
                            }
                        }
                    }
                }
            }
        }

        if let Some(links) = source.links {
            let target = self.links.get_or_insert_with(BTreeMap::new);
            for (address, services) in links {
                let target = target.entry(address).or_default();
                for (service, names) in services {
                    let target = target.entry(service).or_default();
                    for (name, uri) in names {
                        target.entry(name).or_insert(uri);
                    }
                }
            }
        }

        if self.body.is_none() {
            self.body = source.body;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::meta::TransportMeta;
    use serde_json::json;

    fn transport() -> Transport {
        Transport::with_meta(TransportMeta {
            gateway: vec!["ktp://10.0.0.1:77".into(), "http://10.0.0.1:80".into()],
            origin: vec!["users".into(), "1.0.0".into(), "list".into()],
            ..TransportMeta::default()
        })
    }

    #[test]
    fn test_data_appends_in_call_order() {
        let mut t = transport();
        t.set_data("users", "1.0.0", "list", json!({"id": 1}));
        t.set_data("users", "1.0.0", "list", json!([{"id": 2}]));

        let items = &t.data.as_ref().unwrap()["http://10.0.0.1:80"]["users"]["1.0.0"]["list"];
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], json!({"id": 1}));
        assert_eq!(items[1], json!([{"id": 2}]));
    }

    #[test]
    fn test_merge_keeps_first_link() {
        let mut parent = transport();
        parent.set_link("svc", "rel", "A");
        let mut child = transport();
        child.set_link("svc", "rel", "B");

        parent.merge(child);
        let uri = &parent.links.as_ref().unwrap()["http://10.0.0.1:80"]["svc"]["rel"];
        assert_eq!(uri, "A");
    }

    #[test]
    fn test_merge_takes_missing_link() {
        let mut parent = transport();
        let mut child = transport();
        child.set_link("svc", "self", "http://api/svc");

        parent.merge(child);
        assert!(parent.links.is_some());
    }

    #[test]
    fn test_merge_concatenates_calls_in_order() {
        let mut parent = transport();
        parent
            .set_call(
                "users",
                "1.0.0",
                Call {
                    name: "posts".into(),
                    version: "1.0.0".into(),
                    action: "list".into(),
                    duration: 5,
                    ..Call::default()
                },
                None,
            )
            .unwrap();

        let mut child = transport();
        child.append_call(
            "users",
            "1.0.0",
            Call {
                name: "tags".into(),
                version: "1.0.0".into(),
                action: "list".into(),
                duration: 9,
                ..Call::default()
            },
        );

        parent.merge(child);
        let records = &parent.calls.as_ref().unwrap()["users"]["1.0.0"];
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "posts");
        assert_eq!(records[1].name, "tags");
    }

    #[test]
    fn test_merge_properties_keep_existing_keys() {
        let mut parent = transport();
        parent.meta.set_property("stage", "parent");
        let mut child = transport();
        child.meta.set_property("stage", "child");
        child.meta.set_property("extra", "child");

        parent.merge(child);
        assert_eq!(parent.meta.get_property("stage"), Some("parent"));
        assert_eq!(parent.meta.get_property("extra"), Some("child"));
    }

    #[test]
    fn test_merge_body_only_fills_vacancy() {
        let mut parent = transport();
        parent.set_download(File::new("a", "", ""));
        let mut child = transport();
        child.set_download(File::new("b", "", ""));

        parent.merge(child);
        assert_eq!(parent.body.as_ref().unwrap().name, "a");

        let mut empty = transport();
        let mut child = transport();
        child.set_download(File::new("c", "", ""));
        empty.merge(child);
        assert_eq!(empty.body.as_ref().unwrap().name, "c");
    }

    #[test]
    fn test_has_calls_requires_pending_duration() {
        let mut t = transport();
        t.append_call(
            "users",
            "1.0.0",
            Call {
                name: "posts".into(),
                duration: 0,
                ..Call::default()
            },
        );
        t.append_call(
            "users",
            "1.0.0",
            Call {
                name: "tags".into(),
                duration: 5,
                ..Call::default()
            },
        );
        assert!(t.has_calls("users", "1.0.0"));

        let mut done = transport();
        done.append_call(
            "users",
            "1.0.0",
            Call {
                name: "posts".into(),
                duration: 3,
                ..Call::default()
            },
        );
        assert!(!done.has_calls("users", "1.0.0"));
        assert!(!done.has_calls("other", "1.0.0"));
    }

    #[test]
    fn test_set_call_requires_duration() {
        let mut t = transport();
        let result = t.set_call("users", "1.0.0", Call::default(), None);
        assert!(matches!(result, Err(TransportError::MissingDuration)));
        assert!(t.calls.is_none());
    }

    #[test]
    fn test_set_call_merges_child() {
        let mut parent = transport();
        let mut child = transport();
        child.set_data("posts", "1.0.0", "find", json!({"n": 1}));

        parent
            .set_call(
                "users",
                "1.0.0",
                Call {
                    name: "posts".into(),
                    version: "1.0.0".into(),
                    action: "find".into(),
                    duration: 12,
                    ..Call::default()
                },
                Some(child),
            )
            .unwrap();

        let items = &parent.data.as_ref().unwrap()["http://10.0.0.1:80"]["posts"]["1.0.0"]["find"];
        assert_eq!(items[0], json!({"n": 1}));
        let records = &parent.calls.as_ref().unwrap()["users"]["1.0.0"];
        assert!(records[0].duration > 0);
    }

    #[test]
    fn test_defer_call_registers_files() {
        let mut t = transport();
        t.set_defer_call(
            "users",
            "1.0.0",
            Call {
                name: "uploads".into(),
                version: "2.0.0".into(),
                action: "store".into(),
                files: Some(vec![File::new("doc", "", "")]),
                ..Call::default()
            },
        );

        assert!(t.has_calls("users", "1.0.0"));
        let files = &t.files.as_ref().unwrap()["http://10.0.0.1:80"]["uploads"]["2.0.0"]["store"];
        assert_eq!(files[0].name, "doc");
    }

    #[test]
    fn test_relations_first_writer_wins_on_merge() {
        let mut parent = transport();
        parent.relate_one("users", "1", "posts", "99");
        let mut child = transport();
        child.relate_one("users", "1", "posts", "42");
        child.relate_many("users", "2", "posts", vec!["7".into()]);

        parent.merge(child);
        let relations = parent.relations.as_ref().unwrap();
        let slot = &relations["http://10.0.0.1:80"]["users"]["1"]["http://10.0.0.1:80"]["posts"];
        assert_eq!(slot, &json!("99"));
        let added = &relations["http://10.0.0.1:80"]["users"]["2"]["http://10.0.0.1:80"]["posts"];
        assert_eq!(added, &json!(["7"]));
    }

    #[test]
    fn test_wire_omits_absent_sections() {
        let t = transport();
        let json = serde_json::to_value(&t).unwrap();
        assert!(json.get("d").is_none());
        assert!(json.get("l").is_none());
        assert!(json.get("C").is_none());
        assert!(json.get("m").is_some());
    }
}
