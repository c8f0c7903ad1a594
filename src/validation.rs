//! Binding Validation - Full Diagnosis Before Rendering
//!
//! Checks produce structured violations; the renderer itself stops at the
//! first failure, the validator reports all of them.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::rules::{Property, PropertyKind, Rule};
use crate::values::{coerce, Coerced, ValueBinding};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub check: String,
    pub severity: ViolationSeverity,
    pub property: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl ValidationViolation {
    fn error(
        check: &str,
        property: &Property,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check: check.to_string(),
            severity: ViolationSeverity::Error,
            property: property.name.clone(),
            message: message.into(),
            kind: Some(kind),
            expected: Some(property.kind.name().to_string()),
            actual: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
    pub rule: String,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Warning)
    }
}

/// One aspect of a binding checked against the selected properties of a rule.
pub trait BindingCheck {
    fn name(&self) -> &'static str;
    fn check(
        &self,
        rule: &Rule,
        bindings: &ValueBinding,
        selection: &[&Property],
    ) -> Vec<ValidationViolation>;
}

// --- Concrete Checks ---

pub struct RequiredValues;

impl BindingCheck for RequiredValues {
    fn name(&self) -> &'static str { "required_values" }

    fn check(
        &self,
        _rule: &Rule,
        bindings: &ValueBinding,
        selection: &[&Property],
    ) -> Vec<ValidationViolation> {
        selection
            .iter()
            .filter(|p| p.required)
            .filter(|p| match bindings.get(&p.name) {
                None => true,
                // A mismatched shape is reported by ValueShapes.
                Some(value) => coerce(p, value).map_or(false, |c| c.is_empty()),
            })
            .map(|p| {
                ValidationViolation::error(
                    self.name(),
                    p,
                    ErrorKind::MissingRequiredValue,
                    "Required property has no value",
                )
            })
            .collect()
    }
}

pub struct ValueShapes;

impl BindingCheck for ValueShapes {
    fn name(&self) -> &'static str { "value_shapes" }

    fn check(
        &self,
        _rule: &Rule,
        bindings: &ValueBinding,
        selection: &[&Property],
    ) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for property in selection {
            let Some(value) = bindings.get(&property.name) else { continue };
            if let Err(e) = coerce(property, value) {
                let mut violation = ValidationViolation::error(
                    self.name(),
                    property,
                    ErrorKind::TypeMismatch,
                    e.to_string(),
                );
                violation.actual = Some(value.kind_name().to_string());
                violations.push(violation);
            }
        }
        violations
    }
}

pub struct EnumValues;

impl BindingCheck for EnumValues {
    fn name(&self) -> &'static str { "enum_values" }

    fn check(
        &self,
        _rule: &Rule,
        bindings: &ValueBinding,
        selection: &[&Property],
    ) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for property in selection {
            let PropertyKind::Enumeration { values } = &property.kind else { continue };
            let Some(value) = bindings.get(&property.name) else { continue };
            if let Ok(Coerced::Choice(name)) = coerce(property, value) {
                if property.enum_value(name).is_none() {
                    let known: Vec<_> = values.iter().map(|v| v.name.as_str()).collect();
                    violations.push(ValidationViolation {
                        check: self.name().to_string(),
                        severity: ViolationSeverity::Error,
                        property: property.name.clone(),
                        message: format!("Unknown enum value '{}'", name),
                        kind: Some(ErrorKind::UnknownProperty),
                        expected: Some(known.join(", ")),
                        actual: Some(name.to_string()),
                    });
                }
            }
        }
        violations
    }
}

/// Switches with a `[value]` placeholder on a property kind that supplies no
/// value: a `true` boolean, or the chosen value of an enumeration.
pub struct SwitchPlaceholders;

impl BindingCheck for SwitchPlaceholders {
    fn name(&self) -> &'static str { "switch_placeholders" }

    fn check(
        &self,
        _rule: &Rule,
        bindings: &ValueBinding,
        selection: &[&Property],
    ) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for property in selection {
            let Some(value) = bindings.get(&property.name) else { continue };
            let switch = match coerce(property, value) {
                Ok(Coerced::Flag(true)) => property.switch.as_ref(),
                Ok(Coerced::Choice(name)) => {
                    property.enum_value(name).and_then(|v| v.switch.as_ref())
                }
                _ => None,
            };
            if let Some(switch) = switch.filter(|s| s.has_placeholder()) {
                let mut violation = ValidationViolation::error(
                    self.name(),
                    property,
                    ErrorKind::TypeMismatch,
                    format!("Switch '{}' expects a value the property cannot supply", switch),
                );
                violation.actual = Some(switch.to_string());
                violations.push(violation);
            }
        }
        violations
    }
}

/// Bound names the rule does not declare. They never render, so only a warning.
pub struct UnknownBindings;

impl BindingCheck for UnknownBindings {
    fn name(&self) -> &'static str { "unknown_bindings" }

    fn check(
        &self,
        rule: &Rule,
        bindings: &ValueBinding,
        _selection: &[&Property],
    ) -> Vec<ValidationViolation> {
        bindings
            .iter()
            .filter(|(name, _)| rule.lookup(name).is_none())
            .map(|(name, value)| ValidationViolation {
                check: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                property: name.to_string(),
                message: format!("Rule '{}' has no property named '{}'", rule.name(), name),
                kind: None,
                expected: None,
                actual: Some(value.kind_name().to_string()),
            })
            .collect()
    }
}

/// Runs every check and decides validity: any error-severity violation fails.
pub struct BindingValidator {
    checks: Vec<Box<dyn BindingCheck + Send + Sync>>,
}

impl BindingValidator {
    pub fn new() -> Self {
        Self {
            checks: vec![
                Box::new(RequiredValues),
                Box::new(ValueShapes),
                Box::new(EnumValues),
                Box::new(SwitchPlaceholders),
                Box::new(UnknownBindings),
            ],
        }
    }

    pub fn validate(
        &self,
        rule: &Rule,
        bindings: &ValueBinding,
        selection: &[&Property],
    ) -> ValidationResult {
        let violations: Vec<_> = self
            .checks
            .iter()
            .flat_map(|check| check.check(rule, bindings, selection))
            .collect();

        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);
        ValidationResult { valid, violations, rule: rule.name().to_string() }
    }
}

impl Default for BindingValidator {
    fn default() -> Self {
        Self::new()
    }
}
