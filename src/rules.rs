//! Rule Model - Declarative Tool Switch Schemas
//!
//! A rule is read-only once built. Property names are indexed by their
//! normalized form so lookups never case-fold at render time.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::template::{SwitchTemplate, TemplateError};
use crate::SCHEMA_VERSION;

/// Key used for every case-insensitive name comparison.
pub(crate) fn normalize(name: &str) -> String {
    name.to_lowercase()
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Rule '{rule}' declares property '{name}' more than once")]
    DuplicateProperty { rule: String, name: String },

    #[error("Property '{property}' declares enum value '{value}' more than once")]
    DuplicateEnumValue { property: String, value: String },

    #[error("Rule '{rule}' has a property with an empty name")]
    EmptyName { rule: String },

    #[error("Invalid switch '{switch}' on property '{property}': {source}")]
    InvalidSwitch {
        property: String,
        switch: String,
        source: TemplateError,
    },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid rule document {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Rule '{rule}' uses schema {version}, supported is {supported}")]
    UnsupportedSchema {
        rule: String,
        version: String,
        supported: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValue {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch: Option<SwitchTemplate>,
}

impl EnumValue {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), display_name: None, switch: None }
    }

    pub fn with_switch(mut self, switch: &str) -> Result<Self, RuleError> {
        self.switch = Some(parse_switch(&self.name, switch)?);
        Ok(self)
    }
}

/// The closed set of property kinds a rule can declare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PropertyKind {
    Boolean,
    String,
    StringList {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        separator: Option<String>,
    },
    Integer,
    Enumeration {
        #[serde(default)]
        values: Vec<EnumValue>,
    },
    ItemList {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        separator: Option<String>,
    },
}

impl PropertyKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::StringList { .. } => "string list",
            Self::Integer => "integer",
            Self::Enumeration { .. } => "enumeration",
            Self::ItemList { .. } => "item list",
        }
    }
}

fn default_true() -> bool { true }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch: Option<SwitchTemplate>,
    /// Overrides the rule prefix for this property only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_prefix: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// When false the property is left out of declaration-order rendering.
    #[serde(default = "default_true")]
    pub include_in_command_line: bool,
    #[serde(flatten)]
    pub kind: PropertyKind,
}

impl Property {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            category: None,
            switch: None,
            switch_prefix: None,
            required: false,
            include_in_command_line: true,
            kind,
        }
    }

    pub fn with_switch(mut self, switch: &str) -> Result<Self, RuleError> {
        self.switch = Some(parse_switch(&self.name, switch)?);
        Ok(self)
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_switch_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.switch_prefix = Some(prefix.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.include_in_command_line = false;
        self
    }

    /// Enum values are matched case-sensitively, unlike property names.
    pub fn enum_value(&self, name: &str) -> Option<&EnumValue> {
        match &self.kind {
            PropertyKind::Enumeration { values } => values.iter().find(|v| v.name == name),
            _ => None,
        }
    }
}

fn parse_switch(owner: &str, switch: &str) -> Result<SwitchTemplate, RuleError> {
    SwitchTemplate::parse(switch).map_err(|source| RuleError::InvalidSwitch {
        property: owner.to_string(),
        switch: switch.to_string(),
        source,
    })
}

fn default_prefix() -> String { "/".to_string() }

fn default_schema_version() -> Version { Version::new(1, 0, 0) }

/// Serialized shape of a rule document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleDocument {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
    #[serde(default = "default_prefix")]
    switch_prefix: String,
    #[serde(default = "default_schema_version")]
    schema_version: Version,
    #[serde(default)]
    properties: Vec<Property>,
}

/// A tool's switch schema: ordered, typed properties plus a switch prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RuleDocument", into = "RuleDocument")]
pub struct Rule {
    name: String,
    display_name: Option<String>,
    tool_name: Option<String>,
    switch_prefix: String,
    schema_version: Version,
    properties: Vec<Property>,
    index: HashMap<String, usize>,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        switch_prefix: impl Into<String>,
        properties: Vec<Property>,
    ) -> Result<Self, RuleError> {
        let name = name.into();
        let mut index = HashMap::with_capacity(properties.len());

        for (position, property) in properties.iter().enumerate() {
            if property.name.trim().is_empty() {
                return Err(RuleError::EmptyName { rule: name });
            }
            if index.insert(normalize(&property.name), position).is_some() {
                return Err(RuleError::DuplicateProperty {
                    rule: name,
                    name: property.name.clone(),
                });
            }
            if let PropertyKind::Enumeration { values } = &property.kind {
                for (i, value) in values.iter().enumerate() {
                    if values[..i].iter().any(|earlier| earlier.name == value.name) {
                        return Err(RuleError::DuplicateEnumValue {
                            property: property.name.clone(),
                            value: value.name.clone(),
                        });
                    }
                }
            }
        }

        Ok(Self {
            name,
            display_name: None,
            tool_name: None,
            switch_prefix: switch_prefix.into(),
            schema_version: default_schema_version(),
            properties,
            index,
        })
    }

    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }

    pub fn switch_prefix(&self) -> &str {
        &self.switch_prefix
    }

    pub fn schema_version(&self) -> &Version {
        &self.schema_version
    }

    /// Case-insensitive property lookup.
    pub fn lookup(&self, name: &str) -> Option<&Property> {
        self.index.get(&normalize(name)).map(|&i| &self.properties[i])
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Effective prefix for one of this rule's properties.
    pub fn prefix_for<'a>(&'a self, property: &'a Property) -> &'a str {
        property.switch_prefix.as_deref().unwrap_or(&self.switch_prefix)
    }

    /// Full invocation: the tool name followed by the command line.
    pub fn invocation(&self, command_line: &str) -> String {
        match &self.tool_name {
            Some(tool) if command_line.is_empty() => tool.clone(),
            Some(tool) => format!("{} {}", tool, command_line),
            None => command_line.to_string(),
        }
    }
}

impl TryFrom<RuleDocument> for Rule {
    type Error = RuleError;

    fn try_from(doc: RuleDocument) -> Result<Self, Self::Error> {
        let mut rule = Rule::new(doc.name, doc.switch_prefix, doc.properties)?;
        rule.display_name = doc.display_name;
        rule.tool_name = doc.tool_name;
        rule.schema_version = doc.schema_version;
        Ok(rule)
    }
}

impl From<Rule> for RuleDocument {
    fn from(rule: Rule) -> Self {
        Self {
            name: rule.name,
            display_name: rule.display_name,
            tool_name: rule.tool_name,
            switch_prefix: rule.switch_prefix,
            schema_version: rule.schema_version,
            properties: rule.properties,
        }
    }
}

/// Rule registry - loads and caches rules by name
pub struct RuleRegistry {
    rules: HashMap<String, Rule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self { rules: HashMap::new() }
    }

    /// Load every `*.json` rule document in `dir`.
    ///
    /// Documents that fail to parse or target another schema major are
    /// skipped with a warning. A missing directory yields an empty registry.
    pub fn load_from_dir(dir: &Path) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        if !dir.exists() {
            warn!(dir = %dir.display(), "rules directory does not exist");
            return Ok(registry);
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            match Self::load_file(&path) {
                Ok(rule) => {
                    debug!(rule = rule.name(), path = %path.display(), "loaded rule");
                    if let Some(replaced) = registry.register(rule) {
                        warn!(
                            rule = replaced.name(),
                            path = %path.display(),
                            "rule name declared twice; keeping the later file"
                        );
                    }
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping rule document"),
            }
        }

        info!(count = registry.rules.len(), dir = %dir.display(), "rules loaded");
        Ok(registry)
    }

    pub fn load_file(path: &Path) -> Result<Rule, RegistryError> {
        let content = fs::read_to_string(path)?;
        let rule: Rule = serde_json::from_str(&content).map_err(|source| RegistryError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        check_schema_version(&rule)?;
        Ok(rule)
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(&normalize(name))
    }

    /// All rules, ordered by name.
    pub fn list(&self) -> Vec<&Rule> {
        let mut rules: Vec<_> = self.rules.values().collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        rules
    }

    /// Add `rule`, returning the rule it replaced under the same name (in any case).
    pub fn register(&mut self, rule: Rule) -> Option<Rule> {
        self.rules.insert(normalize(&rule.name), rule)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn check_schema_version(rule: &Rule) -> Result<(), RegistryError> {
    let supported = Version::parse(SCHEMA_VERSION).map_err(|_| RegistryError::UnsupportedSchema {
        rule: rule.name.clone(),
        version: rule.schema_version.to_string(),
        supported: SCHEMA_VERSION.to_string(),
    })?;

    if rule.schema_version.major != supported.major {
        return Err(RegistryError::UnsupportedSchema {
            rule: rule.name.clone(),
            version: rule.schema_version.to_string(),
            supported: SCHEMA_VERSION.to_string(),
        });
    }
    Ok(())
}
