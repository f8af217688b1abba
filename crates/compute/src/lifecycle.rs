//! Create / get / update / delete workflows.
//!
//! Every workflow follows the same shape: qualify the input, submit it,
//! then poll the resource until its kind's [`StateMachine`] says it has
//! converged. A create whose wait fails is compensated by exactly one
//! delete. Updates are not compensated; there is no previous version to
//! restore.
//!
//! ```text
//! Submitted -> Polling -> Converged
//!                      -> Failed   -> RollingBack -> RolledBack | RollbackFailed
//!                      -> TimedOut -> RollingBack -> ...
//! ```

use crate::backend::Method;
use crate::client::Client;
use crate::codec;
use crate::error::{Error, Failure, Result};
use crate::qualify::Qualify;
use converge::{Observed, Sample, StateMachine, Verdict, WaitError, WaitOverride, WaitSpec};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::time::Instant;

/// A kind of remote resource the lifecycle can drive.
pub trait ResourceKind: DeserializeOwned + Qualify + Observed {
    /// Human-readable kind, used in errors and logs.
    const KIND: &'static str;
    /// Path new resources are posted to.
    const CONTAINER_PATH: &'static str;
    /// Path qualified names are appended to.
    const ROOT_PATH: &'static str;

    /// Create request.
    type Create: Serialize + Qualify + Clone;

    /// Default wait for a created or updated resource to converge.
    fn ready_wait() -> WaitSpec;

    /// Default wait for a deleted resource to disappear.
    fn delete_wait() -> WaitSpec;

    /// Classifies statuses while waiting for readiness.
    fn ready_machine() -> &'static StateMachine;

    /// Classifies statuses while waiting for deletion.
    fn delete_machine() -> &'static StateMachine;

    /// Name to report for a create request before the server has named it.
    fn create_name(input: &Self::Create) -> String;

    /// Reject a create request before anything is sent.
    fn validate(_input: &Self::Create) -> Result<()> {
        Ok(())
    }

    /// Describe why this resource failed.
    fn failure(&self) -> Failure {
        Failure::from_status(self.status())
    }
}

/// A kind whose resources can be updated in place.
pub trait Updatable: ResourceKind {
    /// Update request.
    type Update: Serialize + Qualify + Clone;

    /// Name of the resource being updated.
    fn update_name(input: &Self::Update) -> &str;

    /// Reject an update request before anything is sent.
    fn validate_update(_input: &Self::Update) -> Result<()> {
        Ok(())
    }
}

/// Where a lifecycle call currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Submitted,
    Polling,
    Converged,
    Failed,
    TimedOut,
    RollingBack,
    RolledBack,
    RollbackFailed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Polling => "polling",
            Self::Converged => "converged",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
            Self::RollingBack => "rolling back",
            Self::RolledBack => "rolled back",
            Self::RollbackFailed => "rollback failed",
        };
        f.write_str(s)
    }
}

/// State of one lifecycle call. Owned by the call, never shared.
#[derive(Debug)]
struct Lifecycle {
    kind: &'static str,
    /// Caller-facing name.
    name: String,
    /// Name as sent to the server.
    qualified: String,
    wait: WaitSpec,
    phase: Phase,
    history: Vec<Phase>,
}

impl Lifecycle {
    fn new(kind: &'static str, name: String, wait: WaitSpec) -> Self {
        Self {
            kind,
            name,
            qualified: String::new(),
            wait,
            phase: Phase::Pending,
            history: vec![Phase::Pending],
        }
    }

    fn enter(&mut self, phase: Phase) {
        log::debug!("{} {}: {} -> {}", self.kind, self.name, self.phase, phase);
        self.phase = phase;
        self.history.push(phase);
        if matches!(
            phase,
            Phase::Converged | Phase::RolledBack | Phase::RollbackFailed
        ) {
            log::trace!("{} {} phases: {:?}", self.kind, self.name, self.history);
        }
    }

    /// Record how a failed wait ended.
    fn fail(&mut self, err: &Error) {
        self.enter(match err {
            Error::ConvergenceTimeout { .. } => Phase::TimedOut,
            _ => Phase::Failed,
        });
    }
}

/// Lifecycle operations for one resource kind.
///
/// Obtained from [`Client::resources`] or one of the per-kind shortcuts.
pub struct Resources<'c, K> {
    client: &'c Client,
    kind: PhantomData<fn() -> K>,
}

impl<'c, K: ResourceKind> Resources<'c, K> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self {
            client,
            kind: PhantomData,
        }
    }

    /// Create a resource and wait for it to become ready.
    ///
    /// If the wait fails, the resource is deleted again (waiting for the
    /// delete with the same overrides) and the wait's error is returned. If
    /// that delete fails too, the result is [`Error::RollbackFailed`]
    /// carrying both.
    pub fn create(&self, input: &K::Create, wait: &WaitOverride) -> Result<K> {
        K::validate(input)?;
        let spec = K::ready_wait().with_override(wait)?;
        let rollback = K::delete_wait().with_override(wait)?;
        let mut lifecycle = Lifecycle::new(K::KIND, K::create_name(input), spec);
        self.run_create(&mut lifecycle, input, &rollback)
    }

    fn run_create(
        &self,
        lifecycle: &mut Lifecycle,
        input: &K::Create,
        rollback: &WaitSpec,
    ) -> Result<K> {
        let scope = self.client.scope();
        let mut body = input.clone();
        body.qualify(scope);

        let created: K = self.submit(Method::Post, K::CONTAINER_PATH, &body, &lifecycle.name)?;
        lifecycle.qualified = created.name().to_string();
        lifecycle.name = scope.unqualify(&lifecycle.qualified);
        lifecycle.enter(Phase::Submitted);

        let original = match self.await_ready(lifecycle) {
            Ok(resource) => return Ok(resource),
            Err(err) => err,
        };

        lifecycle.enter(Phase::RollingBack);
        log::warn!(
            "{} {} did not become ready, deleting it: {}",
            K::KIND,
            lifecycle.name,
            original
        );

        // The cancel flag may be what ended the wait; the cleanup still runs
        let result = match self.send_delete(&lifecycle.qualified, &lifecycle.name) {
            Ok(()) => self.await_deleted(&lifecycle.qualified, &lifecycle.name, rollback, false),
            // Already gone
            Err(Error::NotFound { .. }) => Ok(()),
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                lifecycle.enter(Phase::RolledBack);
                Err(original)
            }
            Err(rollback) => {
                lifecycle.enter(Phase::RollbackFailed);
                log::warn!(
                    "{} {} could not be rolled back: {}",
                    K::KIND,
                    lifecycle.name,
                    rollback
                );
                Err(Error::RollbackFailed {
                    kind: K::KIND,
                    name: lifecycle.name.clone(),
                    original: Box::new(original),
                    rollback: Box::new(rollback),
                })
            }
        }
    }

    /// Fetch a resource by name.
    pub fn get(&self, name: &str) -> Result<K> {
        let qualified = self.qualified_name(name)?;
        let mut resource = self.fetch(&qualified, name)?;
        resource.unqualify(self.client.scope());
        Ok(resource)
    }

    /// Delete a resource and wait until the server no longer knows it.
    ///
    /// A resource that is already gone when the delete is submitted is
    /// reported as [`Error::NotFound`].
    pub fn delete(&self, name: &str, wait: &WaitOverride) -> Result<()> {
        let qualified = self.qualified_name(name)?;
        let spec = K::delete_wait().with_override(wait)?;
        let mut lifecycle = Lifecycle::new(K::KIND, name.to_string(), spec);
        lifecycle.qualified = qualified;

        self.send_delete(&lifecycle.qualified, &lifecycle.name)?;
        lifecycle.enter(Phase::Submitted);
        lifecycle.enter(Phase::Polling);

        match self.await_deleted(&lifecycle.qualified, &lifecycle.name, &lifecycle.wait, true) {
            Ok(()) => {
                lifecycle.enter(Phase::Converged);
                Ok(())
            }
            Err(err) => {
                lifecycle.fail(&err);
                Err(err)
            }
        }
    }

    /// Poll until the resource converges, then return it unqualified.
    fn await_ready(&self, lifecycle: &mut Lifecycle) -> Result<K> {
        lifecycle.enter(Phase::Polling);
        let machine = K::ready_machine();
        let qualified = lifecycle.qualified.clone();
        let name = lifecycle.name.clone();

        let result = self.wait(&lifecycle.wait, &name, || {
            self.check_cancelled(&name)?;
            let mut resource = self.fetch(&qualified, &name)?;
            resource.unqualify(self.client.scope());
            self.judge(machine, resource, &name)
        });

        match result {
            Ok(resource) => {
                lifecycle.enter(Phase::Converged);
                Ok(resource)
            }
            Err(err) => {
                lifecycle.fail(&err);
                Err(err)
            }
        }
    }

    /// Poll until the server reports the resource as not found.
    fn await_deleted(
        &self,
        qualified: &str,
        name: &str,
        spec: &WaitSpec,
        cancellable: bool,
    ) -> Result<()> {
        let machine = K::delete_machine();
        self.wait(spec, name, || {
            if cancellable {
                self.check_cancelled(name)?;
            }
            let mut resource = match self.fetch(qualified, name) {
                Ok(resource) => resource,
                Err(Error::NotFound { .. }) => return Ok(Sample::Ready(())),
                Err(err) => return Err(err),
            };
            resource.unqualify(self.client.scope());
            self.judge(machine, resource, name).map(|sample| match sample {
                Sample::Ready(_) => Sample::Ready(()),
                Sample::Pending { status } => Sample::Pending { status },
            })
        })
    }

    /// Classify one sample.
    fn judge(&self, machine: &StateMachine, resource: K, name: &str) -> Result<Sample<K>> {
        match machine.classify_observed(&resource) {
            Verdict::Converged => Ok(Sample::Ready(resource)),
            Verdict::Transient => Ok(Sample::pending(resource.status())),
            Verdict::Failed => Err(Error::ResourceFailed {
                kind: K::KIND,
                name: name.to_string(),
                failure: resource.failure(),
                elapsed: Default::default(),
            }),
            Verdict::Unknown => Err(Error::UnknownStatus {
                kind: K::KIND,
                name: name.to_string(),
                status: resource.status().to_string(),
                elapsed: Default::default(),
            }),
        }
    }

    /// Run the poll loop and map its outcome into this crate's errors.
    fn wait<T, F>(&self, spec: &WaitSpec, name: &str, probe: F) -> Result<T>
    where
        F: FnMut() -> Result<Sample<T>>,
    {
        converge::wait_for_with(spec, self.client.observer(), probe).map_err(|err| match err {
            WaitError::Invalid(invalid) => Error::InvalidWait(invalid),
            WaitError::TimedOut {
                description,
                elapsed,
                attempts,
                last_status,
            } => Error::ConvergenceTimeout {
                kind: K::KIND,
                name: name.to_string(),
                description,
                last_status,
                elapsed,
                attempts,
            },
            WaitError::Probe {
                description,
                source,
                elapsed,
                attempts,
                last_status,
            } => source.ended_wait(K::KIND, name, description, elapsed, attempts, last_status),
        })
    }

    fn check_cancelled(&self, name: &str) -> Result<()> {
        if self.client.cancel_flag().is_some_and(|flag| flag.is_cancelled()) {
            return Err(Error::Cancelled {
                kind: K::KIND,
                name: name.to_string(),
                elapsed: Default::default(),
            });
        }
        Ok(())
    }

    fn qualified_name(&self, name: &str) -> Result<String> {
        if name.is_empty() {
            return Err(Error::invalid_input(K::KIND, "name is required"));
        }
        Ok(self.client.scope().qualify(name))
    }

    fn object_path(qualified: &str) -> String {
        format!("{}{}", K::ROOT_PATH, qualified)
    }

    fn fetch(&self, qualified: &str, name: &str) -> Result<K> {
        let path = Self::object_path(qualified);
        let bytes = self
            .client
            .transport()
            .send(Method::Get, &path, None)
            .map_err(|e| Error::from_transport(K::KIND, name, e))?;
        codec::decode(self.client.codec(), &bytes)
    }

    fn send_delete(&self, qualified: &str, name: &str) -> Result<()> {
        let path = Self::object_path(qualified);
        self.client
            .transport()
            .send(Method::Delete, &path, None)
            .map_err(|e| Error::from_transport(K::KIND, name, e))?;
        Ok(())
    }

    fn submit<B: Serialize>(&self, method: Method, path: &str, body: &B, name: &str) -> Result<K> {
        let started = Instant::now();
        let bytes = codec::encode(self.client.codec(), body)?;
        let response = self
            .client
            .transport()
            .send(method, path, Some(&bytes))
            .map_err(|e| Error::from_transport(K::KIND, name, e))?;
        log::debug!("{} {} submitted in {:?}", K::KIND, name, started.elapsed());
        codec::decode(self.client.codec(), &response)
    }
}

impl<K: Updatable> Resources<'_, K> {
    /// Replace a resource's definition and wait for it to converge again.
    ///
    /// Unlike [`Resources::create`], a failed wait leaves the resource as is.
    pub fn update(&self, input: &K::Update, wait: &WaitOverride) -> Result<K> {
        K::validate_update(input)?;
        let name = K::update_name(input).to_string();
        let qualified = self.qualified_name(&name)?;
        let spec = K::ready_wait().with_override(wait)?;
        let mut lifecycle = Lifecycle::new(K::KIND, name, spec);

        let mut body = input.clone();
        body.qualify(self.client.scope());
        let path = Self::object_path(&qualified);
        let updated: K = self.submit(Method::Put, &path, &body, &lifecycle.name)?;
        lifecycle.qualified = updated.name().to_string();
        lifecycle.enter(Phase::Submitted);

        self.await_ready(&mut lifecycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockResponse, MockTransport};
    use crate::error::ErrorCategory;
    use crate::kinds::orchestration::{
        DesiredState, ObjectTemplate, Orchestration, OrchestrationSpec,
    };
    use crate::kinds::instance::InstanceTemplate;
    use crate::kinds::storage_attachment::CreateStorageAttachmentInput;
    use crate::qualify::Scope;
    use converge::{CancelFlag, WaitObserver};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    const ORCH: &str = "/platform/v1/orchestration/acct-1/user-1/web-app";
    const ATT: &str = "/storage/attachment/acct-1/user-1/vm1/att-1";

    fn client(mock: &MockTransport) -> Client {
        Client::with_transport(Scope::new("/acct-1/user-1").unwrap(), Box::new(mock.clone()))
    }

    fn fast() -> WaitOverride {
        WaitOverride::none()
            .poll_interval(Duration::from_millis(5))
            .timeout(Duration::from_secs(5))
    }

    fn orchestration(status: &str) -> MockResponse {
        MockResponse::json(format!(
            r#"{{"name": "/acct-1/user-1/web-app", "desired_state": "active", "status": "{}",
                "objects": [{{"label": "vm1", "orchestration": "/acct-1/user-1/web-app", "type": "Instance",
                              "template": {{"name": "/acct-1/user-1/vm1", "shape": "oc3"}}}}]}}"#,
            status
        ))
    }

    fn attachment(state: &str) -> MockResponse {
        MockResponse::json(format!(
            r#"{{"name": "/acct-1/user-1/vm1/att-1", "index": 1,
                "instance_name": "/acct-1/user-1/vm1", "storage_volume_name": "/acct-1/user-1/data",
                "state": "{}"}}"#,
            state
        ))
    }

    fn web_app() -> OrchestrationSpec {
        OrchestrationSpec::new("web-app", DesiredState::Active).with_object(
            "vm1",
            ObjectTemplate::Instance(InstanceTemplate {
                name: "vm1".to_string(),
                shape: "oc3".to_string(),
                ..Default::default()
            }),
        )
    }

    fn script_create(mock: &MockTransport) {
        mock.push(Method::Post, "/platform/v1/orchestration/", orchestration("inactive"));
    }

    #[test]
    fn test_create_end_to_end() {
        let mock = MockTransport::new();
        script_create(&mock);
        mock.push_all(
            Method::Get,
            ORCH,
            [
                orchestration("activating"),
                orchestration("activating"),
                orchestration("active"),
            ],
        );

        struct Counter(Arc<AtomicU32>);
        impl WaitObserver for Counter {
            fn on_pending(&self, _: &str, _: u32, status: &str, _: Duration) {
                assert_eq!(status, "activating");
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        let pending = Arc::new(AtomicU32::new(0));
        let client = client(&mock).with_observer(Box::new(Counter(pending.clone())));

        let created = client.orchestrations().create(&web_app(), &fast()).unwrap();

        assert_eq!(created.name, "web-app");
        assert_eq!(created.status, "active");
        assert_eq!(created.objects[0].orchestration, "web-app");
        assert_eq!(pending.load(Ordering::SeqCst), 2);
        assert_eq!(mock.count_to(Method::Get, ORCH), 3);
        assert_eq!(mock.count(Method::Delete), 0);
    }

    #[test]
    fn test_create_sends_qualified_body() {
        let mock = MockTransport::new();
        script_create(&mock);
        mock.push(Method::Get, ORCH, orchestration("active"));

        client(&mock).orchestrations().create(&web_app(), &fast()).unwrap();

        let post = &mock.calls()[0];
        assert_eq!(post.method, Method::Post);
        assert_eq!(post.path, "/platform/v1/orchestration/");
        let body: serde_json::Value = serde_json::from_slice(post.body.as_ref().unwrap()).unwrap();
        assert_eq!(body["name"], "/acct-1/user-1/web-app");
        assert_eq!(body["objects"][0]["orchestration"], "/acct-1/user-1/web-app");
        assert_eq!(body["objects"][0]["type"], "Instance");
        assert_eq!(body["objects"][0]["template"]["name"], "/acct-1/user-1/vm1");
    }

    #[test]
    fn test_create_failure_rolls_back_once() {
        let mock = MockTransport::new();
        script_create(&mock);
        mock.push_all(
            Method::Get,
            ORCH,
            [orchestration("activating"), orchestration("terminal_error"), MockResponse::NotFound],
        );
        mock.push(Method::Delete, ORCH, MockResponse::Body(Vec::new()));

        let err = client(&mock)
            .orchestrations()
            .create(&web_app(), &fast())
            .unwrap_err();

        match err {
            Error::ResourceFailed { kind, name, failure, elapsed } => {
                assert_eq!(kind, "orchestration");
                assert_eq!(name, "web-app");
                assert_eq!(failure.status, "terminal_error");
                assert!(elapsed >= Duration::from_millis(5));
            }
            other => panic!("Expected ResourceFailed, got {:?}", other),
        }
        assert_eq!(mock.count(Method::Delete), 1);
    }

    #[test]
    fn test_create_timeout_rolls_back_and_returns_timeout() {
        let mock = MockTransport::new();
        script_create(&mock);
        // "stopping" keeps both the readiness and the delete poll waiting
        mock.push(Method::Get, ORCH, orchestration("stopping"));
        mock.push(Method::Delete, ORCH, MockResponse::Body(Vec::new()));

        let wait = WaitOverride::none()
            .poll_interval(Duration::from_millis(5))
            .timeout(Duration::from_millis(30));
        let client = client(&mock);
        let orchestrations = client.orchestrations();
        let mut lifecycle = Lifecycle::new(
            "orchestration",
            "web-app".to_string(),
            Orchestration::ready_wait().with_override(&wait).unwrap(),
        );
        let rollback = WaitSpec::new("orchestration to be deleted", Duration::from_millis(5), Duration::from_secs(5))
            .unwrap();

        // The server forgets the orchestration once the DELETE arrives
        let watcher = mock.clone();
        let handle = std::thread::spawn(move || {
            while watcher.count(Method::Delete) == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
            watcher.push(Method::Get, ORCH, MockResponse::NotFound);
        });

        let err = orchestrations
            .run_create(&mut lifecycle, &web_app(), &rollback)
            .unwrap_err();
        handle.join().unwrap();

        match err {
            Error::ConvergenceTimeout { description, last_status, .. } => {
                assert_eq!(description, "orchestration to be ready");
                assert_eq!(last_status.as_deref(), Some("stopping"));
            }
            other => panic!("Expected ConvergenceTimeout, got {:?}", other),
        }
        assert_eq!(mock.count(Method::Delete), 1);
        assert_eq!(
            lifecycle.history,
            vec![
                Phase::Pending,
                Phase::Submitted,
                Phase::Polling,
                Phase::TimedOut,
                Phase::RollingBack,
                Phase::RolledBack,
            ]
        );
    }

    #[test]
    fn test_rollback_failure_keeps_both_errors() {
        let mock = MockTransport::new();
        script_create(&mock);
        mock.push(Method::Get, ORCH, orchestration("reticulating"));
        mock.push(Method::Delete, ORCH, MockResponse::Status(500));

        let err = client(&mock)
            .orchestrations()
            .create(&web_app(), &fast())
            .unwrap_err();

        match &err {
            Error::RollbackFailed { name, original, rollback, .. } => {
                assert_eq!(name, "web-app");
                assert!(matches!(**original, Error::UnknownStatus { ref status, .. } if status == "reticulating"));
                assert!(matches!(**rollback, Error::Transport { .. }));
            }
            other => panic!("Expected RollbackFailed, got {:?}", other),
        }
        assert_eq!(err.category(), ErrorCategory::UnknownStatus);
        assert_eq!(mock.count(Method::Delete), 1);
    }

    #[test]
    fn test_rollback_delete_not_found_counts_as_rolled_back() {
        let mock = MockTransport::new();
        script_create(&mock);
        mock.push(Method::Get, ORCH, orchestration("terminal_error"));

        let err = client(&mock)
            .orchestrations()
            .create(&web_app(), &fast())
            .unwrap_err();

        assert!(matches!(err, Error::ResourceFailed { ref name, .. } if name == "web-app"));
        assert_eq!(mock.count(Method::Delete), 1);
        // No wait after a delete the server reports as already done
        assert_eq!(mock.count_to(Method::Get, ORCH), 1);
    }

    #[test]
    fn test_transport_error_mid_wait_keeps_progress() {
        let mock = MockTransport::new();
        script_create(&mock);
        mock.push_all(
            Method::Get,
            ORCH,
            [orchestration("activating"), MockResponse::Status(502)],
        );
        mock.push(Method::Delete, ORCH, MockResponse::Body(Vec::new()));

        let wait = WaitOverride::none()
            .poll_interval(Duration::from_millis(5))
            .timeout(Duration::from_millis(200));
        let err = client(&mock)
            .orchestrations()
            .create(&web_app(), &wait)
            .unwrap_err();

        // The rollback wait sees the same 502 and fails too
        let Error::RollbackFailed { original, .. } = &err else {
            panic!("Expected RollbackFailed, got {:?}", err);
        };
        match &**original {
            Error::Interrupted {
                name,
                description,
                attempts,
                last_status,
                source,
                ..
            } => {
                assert_eq!(name, "web-app");
                assert_eq!(description, "orchestration to be ready");
                assert_eq!(*attempts, 2);
                assert_eq!(last_status.as_deref(), Some("activating"));
                assert!(matches!(**source, Error::Transport { .. }));
            }
            other => panic!("Expected Interrupted, got {:?}", other),
        }
        assert_eq!(err.category(), ErrorCategory::Transport);
    }

    #[test]
    fn test_unknown_status_is_fatal_immediately() {
        let mock = MockTransport::new();
        script_create(&mock);
        mock.push(Method::Get, ORCH, orchestration("reticulating"));
        mock.push(Method::Delete, ORCH, MockResponse::Body(Vec::new()));

        let err = client(&mock).orchestrations().create(&web_app(), &fast());
        assert!(err.is_err());
        // One readiness probe, then one rollback probe that sees the same status
        assert_eq!(mock.count_to(Method::Get, ORCH), 2);
    }

    #[test]
    fn test_submit_failure_has_no_rollback() {
        let mock = MockTransport::new();
        mock.push(Method::Post, "/platform/v1/orchestration/", MockResponse::Status(409));

        let err = client(&mock)
            .orchestrations()
            .create(&web_app(), &fast())
            .unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn test_invalid_wait_rejected_before_submit() {
        let mock = MockTransport::new();
        let wait = WaitOverride::none().poll_interval(Duration::ZERO);
        let err = client(&mock)
            .orchestrations()
            .create(&web_app(), &wait)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_get_unqualifies() {
        let mock = MockTransport::new();
        mock.push(Method::Get, ATT, attachment("attached"));

        let info = client(&mock).storage_attachments().get("vm1/att-1").unwrap();
        assert_eq!(info.name, "vm1/att-1");
        assert_eq!(info.instance_name, "vm1");
        assert_eq!(info.storage_volume_name, "data");
    }

    #[test]
    fn test_get_not_found() {
        let mock = MockTransport::new();
        let err = client(&mock).storage_attachments().get("vm1/att-1").unwrap_err();
        match err {
            Error::NotFound { kind, name } => {
                assert_eq!(kind, "storage attachment");
                assert_eq!(name, "vm1/att-1");
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_get_empty_name_rejected() {
        let mock = MockTransport::new();
        assert!(client(&mock).orchestrations().get("").is_err());
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_attachment_create() {
        let mock = MockTransport::new();
        mock.push(Method::Post, "/storage/attachment/", attachment("attaching"));
        mock.push_all(Method::Get, ATT, [attachment("attaching"), attachment("attached")]);

        let input = CreateStorageAttachmentInput::new(1, "vm1", "data");
        let info = client(&mock).storage_attachments().create(&input, &fast()).unwrap();
        assert_eq!(info.name, "vm1/att-1");
        assert_eq!(info.state, "attached");

        let body: serde_json::Value =
            serde_json::from_slice(mock.calls()[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body["instance_name"], "/acct-1/user-1/vm1");
        assert_eq!(body["storage_volume_name"], "/acct-1/user-1/data");
        assert_eq!(body["index"], 1);
    }

    #[test]
    fn test_attachment_invalid_index_never_sent() {
        let mock = MockTransport::new();
        let input = CreateStorageAttachmentInput::new(11, "vm1", "data");
        let err = client(&mock).storage_attachments().create(&input, &fast()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_delete_race_not_found_ends_poll() {
        let mock = MockTransport::new();
        mock.push(Method::Delete, ATT, MockResponse::Body(Vec::new()));
        mock.push_all(Method::Get, ATT, [attachment("detaching"), MockResponse::NotFound]);

        client(&mock).storage_attachments().delete("vm1/att-1", &fast()).unwrap();
        assert_eq!(mock.count_to(Method::Get, ATT), 2);
    }

    #[test]
    fn test_delete_not_found_on_first_poll() {
        let mock = MockTransport::new();
        mock.push(Method::Delete, ATT, MockResponse::Body(Vec::new()));

        client(&mock).storage_attachments().delete("vm1/att-1", &fast()).unwrap();
        assert_eq!(mock.count_to(Method::Get, ATT), 1);
    }

    #[test]
    fn test_delete_of_missing_resource() {
        let mock = MockTransport::new();
        let err = client(&mock)
            .storage_attachments()
            .delete("vm1/att-1", &fast())
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(mock.count(Method::Get), 0);
    }

    #[test]
    fn test_delete_orchestration_with_untyped_object() {
        let stopping = || {
            MockResponse::json(
                r#"{"name": "/acct-1/user-1/web-app", "desired_state": "inactive", "status": "stopping",
                    "objects": [{"label": "ip", "orchestration": "/acct-1/user-1/web-app",
                                 "type": "ip-reservation",
                                 "template": {"name": "/acct-1/user-1/ip1", "parentpool": "/oracle/public/ippool"}}]}"#,
            )
        };
        let mock = MockTransport::new();
        mock.push(Method::Delete, ORCH, MockResponse::Body(Vec::new()));
        mock.push_all(Method::Get, ORCH, [stopping(), stopping(), MockResponse::NotFound]);

        let client = client(&mock);
        let info = client.orchestrations().get("web-app").unwrap();
        assert_eq!(info.objects[0].template.type_name(), "ip-reservation");
        assert_eq!(info.objects[0].orchestration, "web-app");

        client.orchestrations().delete("web-app", &fast()).unwrap();
        assert_eq!(mock.count_to(Method::Get, ORCH), 3);
    }

    #[test]
    fn test_delete_failed_status() {
        let mock = MockTransport::new();
        mock.push(Method::Delete, ATT, MockResponse::Body(Vec::new()));
        mock.push(Method::Get, ATT, attachment("unavailable"));

        let err = client(&mock)
            .storage_attachments()
            .delete("vm1/att-1", &fast())
            .unwrap_err();
        assert!(matches!(err, Error::ResourceFailed { .. }));
        assert_eq!(mock.count_to(Method::Get, ATT), 1);
    }

    #[test]
    fn test_delete_timeout() {
        let mock = MockTransport::new();
        mock.push(Method::Delete, ATT, MockResponse::Body(Vec::new()));
        mock.push(Method::Get, ATT, attachment("detaching"));

        let wait = WaitOverride::none()
            .poll_interval(Duration::from_millis(5))
            .timeout(Duration::from_millis(25));
        let err = client(&mock)
            .storage_attachments()
            .delete("vm1/att-1", &wait)
            .unwrap_err();
        match err {
            Error::ConvergenceTimeout { description, name, .. } => {
                assert_eq!(description, "storage attachment to be deleted");
                assert_eq!(name, "vm1/att-1");
            }
            other => panic!("Expected ConvergenceTimeout, got {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_wait() {
        let mock = MockTransport::new();
        mock.push(Method::Delete, ATT, MockResponse::Body(Vec::new()));
        mock.push(Method::Get, ATT, attachment("detaching"));

        let flag = CancelFlag::new();
        flag.cancel();
        let client = client(&mock).with_cancel_flag(flag);

        let err = client.storage_attachments().delete("vm1/att-1", &fast()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Cancelled);
        assert_eq!(mock.count(Method::Get), 0);
    }

    #[test]
    fn test_rollback_ignores_cancel_flag() {
        let mock = MockTransport::new();
        script_create(&mock);
        mock.push(Method::Delete, ORCH, MockResponse::Body(Vec::new()));

        let flag = CancelFlag::new();
        flag.cancel();
        let client = client(&mock).with_cancel_flag(flag);

        // Readiness is cancelled before any GET; the rollback polls and sees NotFound
        let err = client.orchestrations().create(&web_app(), &fast()).unwrap_err();
        assert!(matches!(err, Error::Cancelled { .. }));
        assert_eq!(mock.count(Method::Delete), 1);
        assert_eq!(mock.count_to(Method::Get, ORCH), 1);
    }

    #[test]
    fn test_update_has_no_rollback() {
        let mock = MockTransport::new();
        mock.push(Method::Put, ORCH, orchestration("activating"));
        mock.push(Method::Get, ORCH, orchestration("terminal_error"));

        let err = client(&mock)
            .orchestrations()
            .update(&web_app(), &fast())
            .unwrap_err();
        assert!(matches!(err, Error::ResourceFailed { .. }));
        assert_eq!(mock.count(Method::Delete), 0);

        let put = &mock.calls()[0];
        assert_eq!(put.path, ORCH);
        let body: serde_json::Value = serde_json::from_slice(put.body.as_ref().unwrap()).unwrap();
        assert_eq!(body["name"], "/acct-1/user-1/web-app");
    }

    #[test]
    fn test_update_converges() {
        let mock = MockTransport::new();
        mock.push(Method::Put, ORCH, orchestration("activating"));
        mock.push_all(Method::Get, ORCH, [orchestration("starting"), orchestration("active")]);

        let updated = client(&mock).orchestrations().update(&web_app(), &fast()).unwrap();
        assert_eq!(updated.name, "web-app");
        assert_eq!(mock.count_to(Method::Get, ORCH), 2);
    }

    #[test]
    fn test_failed_child_is_unqualified() {
        let mock = MockTransport::new();
        script_create(&mock);
        mock.push(
            Method::Get,
            ORCH,
            MockResponse::json(
                r#"{"name": "/acct-1/user-1/web-app", "desired_state": "active", "status": "terminal_error",
                    "objects": [{"label": "vm1", "orchestration": "/acct-1/user-1/web-app", "type": "Instance",
                                 "name": "/acct-1/user-1/web-app/vm1",
                                 "template": {"name": "/acct-1/user-1/vm1", "shape": "oc3"},
                                 "health": {"status": "terminal_error", "error": "quota exceeded"}}]}"#,
            ),
        );
        mock.push(Method::Delete, ORCH, MockResponse::Body(Vec::new()));

        let err = client(&mock)
            .orchestrations()
            .create(&web_app(), &fast())
            .unwrap_err();
        // The rollback poll sees terminal_error too and fails
        let original = match err {
            Error::RollbackFailed { original, .. } => *original,
            other => other,
        };
        match original {
            Error::ResourceFailed { failure, .. } => {
                assert_eq!(failure.child.as_deref(), Some("web-app/vm1"));
                assert_eq!(failure.error.as_deref(), Some("quota exceeded"));
            }
            other => panic!("Expected ResourceFailed, got {:?}", other),
        }
    }
}
