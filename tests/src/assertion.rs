//! Assertion types and builders for verifying step outcomes.

use terra_core::Change;
use terra_transaction::EventOutcome;

use crate::error::{ScenarioError, ScenarioResult};

/// The broad kind of outcome a step should have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Committed,
    RolledBack,
    Unsatisfied,
    Failed,
}

impl Expected {
    fn of(outcome: &EventOutcome) -> Self {
        match outcome {
            EventOutcome::Committed { .. } => Expected::Committed,
            EventOutcome::RolledBack { .. } => Expected::RolledBack,
            EventOutcome::Unsatisfied { .. } => Expected::Unsatisfied,
            EventOutcome::Failed { .. } => Expected::Failed,
        }
    }
}

/// A complete assertion for a step outcome.
#[derive(Default)]
pub struct Assertion {
    pub outcome: Option<Expected>,
    pub created: Option<usize>,
    pub updated: Option<usize>,
    pub deleted: Option<usize>,
    pub attempts: Option<u32>,
    pub error: Option<String>,

    #[allow(clippy::type_complexity)]
    pub custom: Option<Box<dyn Fn(&EventOutcome) -> bool + Send + Sync>>,
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assertion")
            .field("outcome", &self.outcome)
            .field("created", &self.created)
            .field("updated", &self.updated)
            .field("deleted", &self.deleted)
            .field("attempts", &self.attempts)
            .field("error", &self.error)
            .field("custom", &self.custom.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

fn count(changes: &[Change], kind: fn(&Change) -> bool) -> usize {
    changes.iter().filter(|c| kind(c)).count()
}

impl Assertion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify the assertion against an outcome.
    pub fn verify(&self, step: &str, outcome: &EventOutcome) -> ScenarioResult<()> {
        let fail = |message: String| Err(ScenarioError::assertion_failed(step, message));

        if let Some(expected) = self.outcome {
            let actual = Expected::of(outcome);
            if actual != expected {
                return fail(format!("expected {expected:?}, got {outcome:?}"));
            }
        }

        if let Some(ref needle) = self.error {
            match outcome {
                EventOutcome::Failed { error } if error.to_string().contains(needle.as_str()) => {}
                other => {
                    return fail(format!("expected failure containing '{needle}', got {other:?}"))
                }
            }
        }

        let changes = outcome.changes();
        let checks = [
            ("created", self.created, count(changes, |c| matches!(c, Change::Create { .. }))),
            ("updated", self.updated, count(changes, |c| matches!(c, Change::Update { .. }))),
            ("deleted", self.deleted, count(changes, |c| matches!(c, Change::Delete { .. }))),
        ];
        for (what, expected, actual) in checks {
            if let Some(expected) = expected {
                if expected != actual {
                    return fail(format!("expected {expected} {what}, got {actual}"));
                }
            }
        }

        if let Some(expected) = self.attempts {
            match outcome {
                EventOutcome::Committed { attempts, .. } if *attempts == expected => {}
                other => {
                    return fail(format!("expected commit on attempt {expected}, got {other:?}"))
                }
            }
        }

        if let Some(ref custom) = self.custom {
            if !custom(outcome) {
                return fail(format!("custom assertion rejected {outcome:?}"));
            }
        }

        Ok(())
    }
}

/// Fluent builder for [`Assertion`].
#[derive(Debug, Default)]
pub struct AssertionBuilder {
    assertion: Assertion,
}

impl AssertionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn committed(mut self) -> Self {
        self.assertion.outcome = Some(Expected::Committed);
        self
    }

    pub fn rolled_back(mut self) -> Self {
        self.assertion.outcome = Some(Expected::RolledBack);
        self
    }

    pub fn unsatisfied(mut self) -> Self {
        self.assertion.outcome = Some(Expected::Unsatisfied);
        self
    }

    pub fn failed(mut self) -> Self {
        self.assertion.outcome = Some(Expected::Failed);
        self
    }

    /// Expect a failure whose message contains `needle`.
    pub fn error(mut self, needle: impl Into<String>) -> Self {
        self.assertion.outcome = Some(Expected::Failed);
        self.assertion.error = Some(needle.into());
        self
    }

    pub fn created(mut self, n: usize) -> Self {
        self.assertion.created = Some(n);
        self
    }

    pub fn updated(mut self, n: usize) -> Self {
        self.assertion.updated = Some(n);
        self
    }

    pub fn deleted(mut self, n: usize) -> Self {
        self.assertion.deleted = Some(n);
        self
    }

    pub fn attempts(mut self, n: u32) -> Self {
        self.assertion.attempts = Some(n);
        self
    }

    pub fn custom<F>(mut self, f: F) -> Self
    where
        F: Fn(&EventOutcome) -> bool + Send + Sync + 'static,
    {
        self.assertion.custom = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Assertion {
        self.assertion
    }
}
