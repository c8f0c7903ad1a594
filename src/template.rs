//! Template Grammar - Switch Patterns and Rendering Templates
//!
//! Both grammars are handled in two passes: split the text into literal and
//! placeholder segments first, substitute afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Marker substituted by a property's value inside a switch.
pub const VALUE_PLACEHOLDER: &str = "[value]";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} at byte {position}")]
pub struct TemplateError {
    pub position: usize,
    pub reason: String,
}

impl TemplateError {
    fn new(position: usize, reason: impl Into<String>) -> Self {
        Self { position, reason: reason.into() }
    }
}

/// One piece of a rendering template such as `"[Sources] [Program]"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Token(&'a str),
}

/// Split a rendering template into literal text and bracketed property tokens.
///
/// Token names are trimmed. Unclosed, nested, stray or empty brackets are errors.
pub fn parse_rendering_template(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut open: Option<usize> = None;

    for (pos, ch) in template.char_indices() {
        match (ch, open) {
            ('[', None) => {
                if pos > literal_start {
                    segments.push(Segment::Literal(&template[literal_start..pos]));
                }
                open = Some(pos);
            }
            ('[', Some(start)) => {
                return Err(TemplateError::new(
                    pos,
                    format!("nested '[' inside token opened at byte {}", start),
                ));
            }
            (']', Some(start)) => {
                let name = template[start + 1..pos].trim();
                if name.is_empty() {
                    return Err(TemplateError::new(start, "empty token"));
                }
                segments.push(Segment::Token(name));
                open = None;
                literal_start = pos + 1;
            }
            (']', None) => {
                return Err(TemplateError::new(pos, "']' without matching '['"));
            }
            _ => {}
        }
    }

    if let Some(start) = open {
        return Err(TemplateError::new(start, "'[' is never closed"));
    }
    if literal_start < template.len() {
        segments.push(Segment::Literal(&template[literal_start..]));
    }

    Ok(segments)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SwitchPiece {
    Literal(String),
    Value,
}

/// A property switch such as `S[value]_postfix`, parsed once when the rule is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SwitchTemplate {
    raw: String,
    pieces: Vec<SwitchPiece>,
}

impl SwitchTemplate {
    /// Parse a switch. At most one `[value]` marker is allowed; it is matched
    /// ignoring ASCII case.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let mut pieces = Vec::new();
        let lowered = raw.to_ascii_lowercase();
        let mut rest = 0;
        let mut placeholders = 0;

        while let Some(offset) = lowered[rest..].find(VALUE_PLACEHOLDER) {
            let at = rest + offset;
            placeholders += 1;
            if placeholders > 1 {
                return Err(TemplateError::new(at, "switch has more than one value placeholder"));
            }
            if at > rest {
                pieces.push(SwitchPiece::Literal(raw[rest..at].to_string()));
            }
            pieces.push(SwitchPiece::Value);
            rest = at + VALUE_PLACEHOLDER.len();
        }
        if rest < raw.len() {
            pieces.push(SwitchPiece::Literal(raw[rest..].to_string()));
        }

        Ok(Self { raw: raw.to_string(), pieces })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn has_placeholder(&self) -> bool {
        self.pieces.contains(&SwitchPiece::Value)
    }

    /// The switch text for kinds that carry no value; `None` if it expects one.
    pub fn literal(&self) -> Option<&str> {
        if self.has_placeholder() {
            None
        } else {
            Some(&self.raw)
        }
    }

    /// Render the switch with `value` in place of the marker.
    ///
    /// A switch without a marker gets the value appended, the way `X` renders
    /// `Xone` for a string list element.
    pub fn substitute(&self, value: &str) -> String {
        if !self.has_placeholder() {
            return format!("{}{}", self.raw, value);
        }
        let mut out = String::with_capacity(self.raw.len() + value.len());
        for piece in &self.pieces {
            match piece {
                SwitchPiece::Literal(text) => out.push_str(text),
                SwitchPiece::Value => out.push_str(value),
            }
        }
        out
    }
}

impl TryFrom<String> for SwitchTemplate {
    type Error = TemplateError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<SwitchTemplate> for String {
    fn from(switch: SwitchTemplate) -> Self {
        switch.raw
    }
}

impl fmt::Display for SwitchTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_tokens_and_literals() {
        let segments = parse_rendering_template("[Sources] [Program]").unwrap();
        assert_eq!(
            segments,
            vec![Segment::Token("Sources"), Segment::Literal(" "), Segment::Token("Program")]
        );
    }

    #[test]
    fn test_template_leading_and_trailing_literals() {
        let segments = parse_rendering_template("cl.exe [ Program ] -- end").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("cl.exe "),
                Segment::Token("Program"),
                Segment::Literal(" -- end"),
            ]
        );
    }

    #[test]
    fn test_template_without_tokens() {
        assert_eq!(parse_rendering_template("plain").unwrap(), vec![Segment::Literal("plain")]);
        assert!(parse_rendering_template("").unwrap().is_empty());
    }

    #[test]
    fn test_template_unclosed_bracket() {
        let err = parse_rendering_template("[Sources] [Program").unwrap_err();
        assert_eq!(err.position, 10);
    }

    #[test]
    fn test_template_empty_token() {
        let err = parse_rendering_template("a [  ] b").unwrap_err();
        assert_eq!(err.position, 2);
        assert!(err.reason.contains("empty"));
    }

    #[test]
    fn test_template_nested_and_stray_brackets() {
        assert!(parse_rendering_template("[a[b]]").is_err());
        assert_eq!(parse_rendering_template("a] [b]").unwrap_err().position, 1);
    }

    #[test]
    fn test_switch_substitution_keeps_surroundings() {
        let switch = SwitchTemplate::parse("S[value]_postfix").unwrap();
        assert!(switch.has_placeholder());
        assert_eq!(switch.substitute("SubstituteThis!"), "SSubstituteThis!_postfix");
        assert_eq!(switch.literal(), None);
    }

    #[test]
    fn test_switch_placeholder_at_end_and_mixed_case() {
        let switch = SwitchTemplate::parse("AtEnd[Value]").unwrap();
        assert_eq!(switch.substitute("Substitute\\"), "AtEndSubstitute\\");
    }

    #[test]
    fn test_switch_without_placeholder() {
        let switch = SwitchTemplate::parse("X").unwrap();
        assert_eq!(switch.literal(), Some("X"));
        assert_eq!(switch.substitute("one"), "Xone");
    }

    #[test]
    fn test_switch_rejects_two_placeholders() {
        assert!(SwitchTemplate::parse("[value]:[value]").is_err());
    }
}
