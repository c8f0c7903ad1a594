//! Command-Line Renderer
//!
//! Pure and synchronous: a rule plus a binding always renders the same
//! string. Selection happens first (`RenderPlan`), then each selected
//! property contributes zero or more tokens.

use tracing::{debug, trace};

use crate::error::RenderError;
use crate::rules::{Property, PropertyKind, Rule};
use crate::template::{parse_rendering_template, Segment, SwitchTemplate};
use crate::values::{coerce, Coerced, ValueBinding};

/// Render `rule` with `bindings`, in declaration order or following `template`.
pub fn render(
    rule: &Rule,
    bindings: &ValueBinding,
    template: Option<&str>,
) -> Result<String, RenderError> {
    let plan = match template {
        Some(template) => RenderPlan::from_template(rule, template)?,
        None => RenderPlan::for_rule(rule),
    };
    plan.execute(bindings)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step<'r> {
    Literal(String),
    Property(&'r Property),
}

/// Which properties get rendered, in which order, with which literal text around them.
#[derive(Debug, Clone)]
pub struct RenderPlan<'r> {
    rule: &'r Rule,
    steps: Vec<Step<'r>>,
    templated: bool,
}

impl<'r> RenderPlan<'r> {
    /// Declaration order, leaving out properties excluded from the command line.
    pub fn for_rule(rule: &'r Rule) -> Self {
        let steps = rule
            .properties()
            .iter()
            .filter(|p| p.include_in_command_line)
            .map(Step::Property)
            .collect();
        Self { rule, steps, templated: false }
    }

    /// Template order. Every token must name a property of `rule`.
    pub fn from_template(rule: &'r Rule, template: &str) -> Result<Self, RenderError> {
        let segments =
            parse_rendering_template(template).map_err(|e| RenderError::MalformedTemplate {
                template: template.to_string(),
                position: e.position,
                reason: e.reason,
            })?;

        let mut steps = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                Segment::Literal(text) => steps.push(Step::Literal(text.to_string())),
                Segment::Token(name) => {
                    let property = rule.lookup(name).ok_or_else(|| RenderError::UnknownProperty {
                        rule: rule.name().to_string(),
                        name: name.to_string(),
                    })?;
                    steps.push(Step::Property(property));
                }
            }
        }

        Ok(Self { rule, steps, templated: true })
    }

    pub fn rule(&self) -> &'r Rule {
        self.rule
    }

    pub fn is_templated(&self) -> bool {
        self.templated
    }

    /// Selected properties in render order.
    pub fn properties(&self) -> impl Iterator<Item = &'r Property> + '_ {
        self.steps.iter().filter_map(|step| match step {
            Step::Property(property) => Some(*property),
            Step::Literal(_) => None,
        })
    }

    pub fn execute(&self, bindings: &ValueBinding) -> Result<String, RenderError> {
        debug!(
            rule = self.rule.name(),
            templated = self.templated,
            bound = bindings.len(),
            "rendering command line"
        );

        if !self.templated {
            let mut tokens = Vec::new();
            for property in self.properties() {
                tokens.extend(render_property(self.rule, property, bindings)?);
            }
            return Ok(tokens.join(" "));
        }

        let mut out = String::new();
        for step in &self.steps {
            match step {
                Step::Literal(text) => out.push_str(text),
                Step::Property(property) => {
                    out.push_str(&render_property(self.rule, property, bindings)?.join(" "));
                }
            }
        }
        Ok(out)
    }
}

/// Generator bound to one rule and binding; the template can be swapped between runs.
pub struct CommandLineGenerator<'a> {
    rule: &'a Rule,
    bindings: &'a ValueBinding,
    template: Option<String>,
}

impl<'a> CommandLineGenerator<'a> {
    pub fn new(rule: &'a Rule, bindings: &'a ValueBinding) -> Self {
        Self { rule, bindings, template: None }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn set_template(&mut self, template: Option<String>) {
        self.template = template;
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn generate(&self) -> Result<String, RenderError> {
        render(self.rule, self.bindings, self.template.as_deref())
    }
}

/// Tokens contributed by one property; empty when it is unbound or empty.
fn render_property(
    rule: &Rule,
    property: &Property,
    bindings: &ValueBinding,
) -> Result<Vec<String>, RenderError> {
    let coerced = match bindings.get(&property.name) {
        Some(value) => coerce(property, value)?,
        None if property.required => return Err(missing(property)),
        None => {
            trace!(property = %property.name, "unbound, skipped");
            return Ok(vec![]);
        }
    };

    if coerced.is_empty() {
        if property.required {
            return Err(missing(property));
        }
        trace!(property = %property.name, "empty, skipped");
        return Ok(vec![]);
    }

    let prefix = rule.prefix_for(property);
    let switch = property.switch.as_ref();

    let tokens = match (&property.kind, coerced) {
        (PropertyKind::Boolean, Coerced::Flag(_)) => match switch {
            Some(switch) => vec![with_prefix(prefix, value_less(property, switch)?)],
            None => vec![],
        },

        (PropertyKind::String, Coerced::Text(text))
        | (PropertyKind::Integer, Coerced::Text(text)) => {
            vec![switched(prefix, switch, &text)]
        }

        (PropertyKind::StringList { separator }, Coerced::List(items))
        | (PropertyKind::ItemList { separator }, Coerced::List(items)) => match separator {
            Some(separator) => vec![switched(prefix, switch, &items.join(separator.as_str()))],
            None => items.iter().map(|item| switched(prefix, switch, item)).collect(),
        },

        (PropertyKind::Enumeration { .. }, Coerced::Choice(name)) => {
            let value = property.enum_value(name).ok_or_else(|| RenderError::UnknownEnumValue {
                property: property.name.clone(),
                value: name.to_string(),
            })?;
            match &value.switch {
                Some(switch) => vec![with_prefix(prefix, value_less(property, switch)?)],
                None => vec![],
            }
        }

        (kind, _) => {
            return Err(RenderError::TypeMismatch {
                property: property.name.clone(),
                expected: kind.name().to_string(),
                found: "incompatible value".to_string(),
            })
        }
    };

    Ok(tokens)
}

fn missing(property: &Property) -> RenderError {
    RenderError::MissingRequiredValue {
        property: property.name.clone(),
        expected: property.kind.name().to_string(),
    }
}

fn with_prefix(prefix: &str, switch: &str) -> String {
    format!("{}{}", prefix, switch)
}

/// Switch text for kinds that have nothing to substitute.
fn value_less<'s>(property: &Property, switch: &'s SwitchTemplate) -> Result<&'s str, RenderError> {
    switch.literal().ok_or_else(|| RenderError::PlaceholderWithoutValue {
        property: property.name.clone(),
        expected: property.kind.name().to_string(),
        switch: switch.to_string(),
    })
}

/// A value token: the prefixed switch with the value substituted, or the bare value.
fn switched(prefix: &str, switch: Option<&SwitchTemplate>, value: &str) -> String {
    match switch {
        Some(switch) => with_prefix(prefix, &switch.substitute(value)),
        None => value.to_string(),
    }
}
