use serde::{Deserialize, Serialize};

/// UI type tag of a parameter, e.g. `input.hidden` or `select.select`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParameterType {
    Hidden,
    Text,
    Number,
    Select,
    Other(String),
}

impl ParameterType {
    pub fn as_str(&self) -> &str {
        match self {
            ParameterType::Hidden => "input.hidden",
            ParameterType::Text => "input.text",
            ParameterType::Number => "input.number",
            ParameterType::Select => "select.select",
            ParameterType::Other(s) => s,
        }
    }
}

impl From<String> for ParameterType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "input.hidden" => ParameterType::Hidden,
            "input.text" => ParameterType::Text,
            "input.number" => ParameterType::Number,
            "select.select" => ParameterType::Select,
            _ => ParameterType::Other(value),
        }
    }
}

impl From<ParameterType> for String {
    fn from(value: ParameterType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterOption {
    pub name: String,
    pub value: String,
}

/// Source of a task output parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ValueFrom {
    pub json_path: String,
}

/// A named workflow parameter.
///
/// The same shape serves workflow arguments (with UI metadata), task
/// arguments, template inputs and template outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Parameter {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<ValueFrom>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<ParameterType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ParameterOption>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

impl Parameter {
    /// A bare parameter declaration, as used for template inputs.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// A hidden system parameter carrying a fixed value.
    pub fn hidden(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            param_type: Some(ParameterType::Hidden),
            ..Self::with_value(name, value)
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.param_type == Some(ParameterType::Hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tag_round_trips_unknown_values() {
        let t: ParameterType = serde_yaml_ng::from_str("textarea.textarea").unwrap();
        assert_eq!(t, ParameterType::Other("textarea.textarea".into()));
        assert_eq!(t.as_str(), "textarea.textarea");

        let t: ParameterType = serde_yaml_ng::from_str("input.number").unwrap();
        assert_eq!(t, ParameterType::Number);
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let yaml = serde_yaml_ng::to_string(&Parameter::hidden("sys-uid", "uid")).unwrap();
        assert_eq!(yaml, "name: sys-uid\nvalue: uid\ntype: input.hidden\n");
    }

    #[test]
    fn test_unknown_parameter_field_rejected() {
        let result: Result<Parameter, _> = serde_yaml_ng::from_str("name: a\nvalu: b\n");
        assert!(result.is_err());
    }
}
