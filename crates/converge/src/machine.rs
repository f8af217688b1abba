//! Table-driven status classification
//!
//! Every remote resource kind reports its own status vocabulary. Instead of
//! one hand-written `match` per kind, a [`StateMachine`] is configured once
//! with a table of known statuses and asked to classify what a probe saw.
//! Anything missing from the table is [`Verdict::Unknown`] and must be
//! treated as fatal: waiting on a state this client does not understand
//! could hang until the timeout.

use std::collections::HashMap;
use std::fmt;

/// Classification of a sampled status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Desired state reached
    Converged,
    /// Expected intermediate state; keep polling
    Transient,
    /// Terminal failure
    Failed,
    /// Status not in the table; fail closed
    Unknown,
}

impl Verdict {
    /// Whether polling should stop with an error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Failed | Self::Unknown)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Converged => "converged",
            Self::Transient => "transient",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Something a [`StateMachine`] can classify
pub trait Observed {
    /// Identifier of the observed resource
    fn name(&self) -> &str;

    /// Status code as reported by the server
    fn status(&self) -> &str;

    /// Desired state echoed back by the server, for resources that have one
    fn desired_state(&self) -> Option<&str> {
        None
    }
}

/// Status table for one resource kind
///
/// # Example
///
/// ```
/// use converge::{StateMachine, Verdict};
///
/// let machine = StateMachine::new("orchestration")
///     .converged_on_desired()
///     .desired_alias("suspend", "suspended")
///     .transient(&["activating", "suspended"])
///     .failed(&["terminal_error"]);
///
/// assert_eq!(machine.classify("active", Some("active")), Verdict::Converged);
/// assert_eq!(machine.classify("suspended", Some("suspend")), Verdict::Converged);
/// assert_eq!(machine.classify("suspended", Some("active")), Verdict::Transient);
/// assert_eq!(machine.classify("exploded", Some("active")), Verdict::Unknown);
/// ```
#[derive(Debug, Clone)]
pub struct StateMachine {
    kind: &'static str,
    follow_desired: bool,
    aliases: HashMap<&'static str, &'static str>,
    table: HashMap<&'static str, Verdict>,
}

impl StateMachine {
    /// Create an empty machine for a resource kind
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            follow_desired: false,
            aliases: HashMap::new(),
            table: HashMap::new(),
        }
    }

    /// Treat "status equals echoed desired state" as converged
    pub fn converged_on_desired(mut self) -> Self {
        self.follow_desired = true;
        self
    }

    /// Declare that `status` satisfies the desired state `desired`
    ///
    /// Used where the desired-state vocabulary and the status vocabulary
    /// differ, e.g. desired `suspend` is reached at status `suspended`.
    pub fn desired_alias(mut self, desired: &'static str, status: &'static str) -> Self {
        self.aliases.insert(desired, status);
        self
    }

    /// Statuses that are always converged
    pub fn converged(self, statuses: &[&'static str]) -> Self {
        self.with(statuses, Verdict::Converged)
    }

    /// Statuses that mean "keep waiting"
    pub fn transient(self, statuses: &[&'static str]) -> Self {
        self.with(statuses, Verdict::Transient)
    }

    /// Statuses that are terminal failures
    pub fn failed(self, statuses: &[&'static str]) -> Self {
        self.with(statuses, Verdict::Failed)
    }

    fn with(mut self, statuses: &[&'static str], verdict: Verdict) -> Self {
        for status in statuses {
            self.table.insert(*status, verdict);
        }
        self
    }

    /// Resource kind this machine classifies
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Classify a status, given the desired state if the resource has one
    ///
    /// A desired-state match wins over the table, so a status listed as
    /// transient still converges when it is exactly what was asked for.
    pub fn classify(&self, status: &str, desired: Option<&str>) -> Verdict {
        if self.follow_desired
            && let Some(desired) = desired
        {
            let target = self.aliases.get(desired).copied().unwrap_or(desired);
            if status == desired || status == target {
                return Verdict::Converged;
            }
        }

        self.table.get(status).copied().unwrap_or(Verdict::Unknown)
    }

    /// Classify an observed resource
    pub fn classify_observed(&self, observed: &impl Observed) -> Verdict {
        self.classify(observed.status(), observed.desired_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment() -> StateMachine {
        StateMachine::new("storage attachment")
            .converged(&["attached"])
            .transient(&["attaching"])
            .failed(&["unavailable"])
    }

    fn orchestration() -> StateMachine {
        StateMachine::new("orchestration")
            .converged_on_desired()
            .desired_alias("suspend", "suspended")
            .transient(&["activating", "stopping", "suspended"])
            .failed(&["terminal_error"])
    }

    struct Fake {
        status: &'static str,
        desired: Option<&'static str>,
    }

    impl Observed for Fake {
        fn name(&self) -> &str {
            "fake"
        }
        fn status(&self) -> &str {
            self.status
        }
        fn desired_state(&self) -> Option<&str> {
            self.desired
        }
    }

    #[test]
    fn test_fixed_table() {
        let machine = attachment();
        assert_eq!(machine.classify("attached", None), Verdict::Converged);
        assert_eq!(machine.classify("attaching", None), Verdict::Transient);
        assert_eq!(machine.classify("unavailable", None), Verdict::Failed);
    }

    #[test]
    fn test_unlisted_status_is_unknown_never_transient() {
        let machine = attachment();
        for status in ["", "ATTACHED", "detached", "pending", "reticulating"] {
            let verdict = machine.classify(status, None);
            assert_eq!(verdict, Verdict::Unknown, "status {status:?}");
            assert!(verdict.is_fatal());
        }
    }

    #[test]
    fn test_desired_state_echo_converges() {
        let machine = orchestration();
        assert_eq!(machine.classify("active", Some("active")), Verdict::Converged);
        assert_eq!(
            machine.classify("inactive", Some("inactive")),
            Verdict::Converged
        );
    }

    #[test]
    fn test_desired_state_not_followed_unless_enabled() {
        let machine = attachment();
        assert_eq!(
            machine.classify("whatever", Some("whatever")),
            Verdict::Unknown
        );
    }

    #[test]
    fn test_desired_alias() {
        let machine = orchestration();
        assert_eq!(
            machine.classify("suspended", Some("suspend")),
            Verdict::Converged
        );
        assert_eq!(
            machine.classify("suspended", Some("active")),
            Verdict::Transient
        );
    }

    #[test]
    fn test_status_other_than_desired_uses_table() {
        let machine = orchestration();
        assert_eq!(
            machine.classify("activating", Some("active")),
            Verdict::Transient
        );
        assert_eq!(
            machine.classify("terminal_error", Some("active")),
            Verdict::Failed
        );
        // "active" is only converged because it is desired; it is not in the table
        assert_eq!(machine.classify("active", Some("inactive")), Verdict::Unknown);
    }

    #[test]
    fn test_classify_observed() {
        let machine = orchestration();
        let fake = Fake {
            status: "active",
            desired: Some("active"),
        };
        assert_eq!(machine.classify_observed(&fake), Verdict::Converged);
        let fake = Fake {
            status: "boom",
            desired: None,
        };
        assert_eq!(machine.classify_observed(&fake), Verdict::Unknown);
    }

    #[test]
    fn test_kind_and_display() {
        assert_eq!(orchestration().kind(), "orchestration");
        assert_eq!(Verdict::Transient.to_string(), "transient");
        assert!(!Verdict::Converged.is_fatal());
    }
}
