//! ToolSwitch Core - Rule-Driven Command-Line Generator
//!
//! # The Five Laws (Non-Negotiable)
//! 1. Rules Are Read-Only
//! 2. Declaration Order Is the Default Order
//! 3. Names Match Without Case, Enum Values With Case
//! 4. Rendering Is Pure and Deterministic
//! 5. A Failed Render Returns No Partial Output

pub mod error;
pub mod template;
pub mod rules;
pub mod values;
pub mod render;
pub mod validation;
pub mod hashing;
pub mod pipeline;
pub mod logging;

pub use error::{ErrorKind, RenderError};
pub use rules::{EnumValue, Property, PropertyKind, Rule, RuleError, RuleRegistry, RegistryError};
pub use values::{TaskItem, Value, ValueBinding};
pub use render::{render, CommandLineGenerator, RenderPlan};
pub use validation::{BindingValidator, ValidationResult, ValidationViolation, ViolationSeverity};
pub use hashing::{canonical_json, command_fingerprint, rule_fingerprint};
pub use pipeline::{PipelineError, RenderPipeline, RenderRequest, RenderedCommand};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Rule documents must share this schema major version.
pub const SCHEMA_VERSION: &str = "1.0.0";
