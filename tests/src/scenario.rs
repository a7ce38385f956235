//! Scenario definition and builder.

use terra_core::{EngineConfig, Entity};
use tracing::info;

use crate::assertion::{Assertion, AssertionBuilder};
use crate::error::{ScenarioError, ScenarioResult};
use crate::fixtures::{test_config, Harness};
use crate::game::GameEvent;
use crate::telemetry::init_tracing;

/// A step in a scenario with its assertion.
#[derive(Debug)]
pub struct Step {
    pub name: String,
    pub event: GameEvent,
    pub assertion: Assertion,
}

/// A complete test scenario: a seeded world and a sequence of events.
pub struct Scenario {
    name: String,
    seed: Vec<Entity>,
    config: EngineConfig,
    steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seed: Vec::new(),
            config: test_config(),
            steps: Vec::new(),
        }
    }

    /// Entities present before the first step.
    pub fn seed(mut self, entities: impl IntoIterator<Item = Entity>) -> Self {
        self.seed.extend(entities);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a step with an assertion.
    pub fn step<F>(mut self, name: impl Into<String>, event: GameEvent, assertion_fn: F) -> Self
    where
        F: FnOnce(AssertionBuilder) -> AssertionBuilder,
    {
        self.steps.push(Step {
            name: name.into(),
            event,
            assertion: assertion_fn(AssertionBuilder::new()).build(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Run every step in order and hand back the harness for further checks.
    pub async fn run(self) -> ScenarioResult<Harness> {
        init_tracing();
        let harness = Harness::with_config(self.seed, self.config)
            .await
            .map_err(|e| match e {
                ScenarioError::Store(source) => ScenarioError::seed(&self.name, source),
                other => other,
            })?;
        for step in &self.steps {
            info!(scenario = %self.name, step = %step.name, "running step");
            let outcome = harness.driver.process(&step.event).await;
            step.assertion.verify(&step.name, &outcome)?;
        }
        Ok(harness)
    }
}
