//! Render Pipeline - Single Entry Point
//!
//! CRITICAL: render_command MUST validate the binding first. No bypass.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::RenderError;
use crate::hashing::{command_fingerprint, rule_fingerprint};
use crate::render::RenderPlan;
use crate::rules::{Rule, RuleRegistry};
use crate::validation::{BindingValidator, ValidationResult, ValidationViolation};
use crate::values::ValueBinding;
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub rule: String,
    #[serde(default)]
    pub values: ValueBinding,
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedCommand {
    pub rule: String,
    pub command_line: String,
    /// Command line preceded by the rule's tool name, when it has one.
    pub invocation: String,
    pub fingerprint: String,
    /// Fingerprint of the rule schema the command was rendered from.
    pub rule_fingerprint: String,
    pub engine_version: String,
    #[serde(default)]
    pub warnings: Vec<ValidationViolation>,
}

/// The render pipeline - single entry point for request-level rendering
pub struct RenderPipeline {
    registry: RuleRegistry,
    validator: BindingValidator,
}

impl RenderPipeline {
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry,
            validator: BindingValidator::new(),
        }
    }

    pub fn list_rules(&self) -> Vec<&Rule> {
        self.registry.list()
    }

    pub fn get_rule(&self, name: &str) -> Option<&Rule> {
        self.registry.get(name)
    }

    /// Diagnose a binding against the properties `template` selects.
    ///
    /// This is the ONLY validation entry point.
    pub fn check_bindings(
        &self,
        rule_name: &str,
        bindings: &ValueBinding,
        template: Option<&str>,
    ) -> Result<ValidationResult, PipelineError> {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let rule = self.require_rule(rule_name)?;
        let plan = plan_for(rule, template)?;
        let selection: Vec<_> = plan.properties().collect();

        Ok(self.validator.validate(rule, bindings, &selection))
    }

    /// Render a request.
    ///
    /// CRITICAL: This ALWAYS calls check_bindings first. No bypass possible.
    pub fn render_command(
        &self,
        request: &RenderRequest,
    ) -> Result<RenderedCommand, PipelineError> {
        let rule = self.require_rule(&request.rule)?;
        let template = request.template.as_deref();

        let validation = self.check_bindings(&request.rule, &request.values, template)?;
        if !validation.valid {
            let messages: Vec<_> = validation
                .errors()
                .map(|v| format!("{}: {}", v.property, v.message))
                .collect();
            return Err(PipelineError::ValidationFailed(messages.join("; ")));
        }
        for warning in validation.warnings() {
            warn!(rule = rule.name(), property = %warning.property, "{}", warning.message);
        }

        let command_line = plan_for(rule, template)?.execute(&request.values)?;
        let fingerprint = command_fingerprint(rule.name(), &command_line);
        debug!(rule = rule.name(), %fingerprint, "rendered");

        Ok(RenderedCommand {
            rule: rule.name().to_string(),
            invocation: rule.invocation(&command_line),
            command_line,
            fingerprint,
            rule_fingerprint: rule_fingerprint(rule)?,
            engine_version: ENGINE_VERSION.to_string(),
            warnings: validation.warnings().cloned().collect(),
        })
    }

    fn require_rule(&self, name: &str) -> Result<&Rule, PipelineError> {
        self.registry
            .get(name)
            .ok_or_else(|| PipelineError::RuleNotFound(name.to_string()))
    }
}

fn plan_for<'r>(rule: &'r Rule, template: Option<&str>) -> Result<RenderPlan<'r>, RenderError> {
    match template {
        Some(template) => RenderPlan::from_template(rule, template),
        None => Ok(RenderPlan::for_rule(rule)),
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new(RuleRegistry::default())
    }
}
