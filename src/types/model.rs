use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A chat-completions model identifier.
///
/// The five known models are the ones offered in the model selector; any other identifier is
/// carried through verbatim as a custom model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier (for newer or private models)
    Custom(String),
}

/// Known chat-completions models.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// GPT-4 Turbo
    #[serde(rename = "gpt-4-turbo")]
    Gpt4Turbo,

    /// GPT-4
    #[serde(rename = "gpt-4")]
    Gpt4,

    /// GPT-3.5 Turbo
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,

    /// GPT-4o
    #[serde(rename = "gpt-4o")]
    Gpt4o,

    /// GPT-4o mini
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
}

impl KnownModel {
    /// Every known model, in selector order.
    pub const ALL: [KnownModel; 5] = [
        KnownModel::Gpt4Turbo,
        KnownModel::Gpt4,
        KnownModel::Gpt35Turbo,
        KnownModel::Gpt4o,
        KnownModel::Gpt4oMini,
    ];

    /// The wire identifier for this model.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Gpt4Turbo => "gpt-4-turbo",
            KnownModel::Gpt4 => "gpt-4",
            KnownModel::Gpt35Turbo => "gpt-3.5-turbo",
            KnownModel::Gpt4o => "gpt-4o",
            KnownModel::Gpt4oMini => "gpt-4o-mini",
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Gpt35Turbo)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{}", known_model),
            Model::Custom(custom) => write!(f, "{}", custom),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KnownModel::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| format!("unknown model: {s}"))
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<KnownModel>()
            .map(Model::Known)
            .unwrap_or_else(|_| Model::Custom(s.to_string())))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        match model.parse::<KnownModel>() {
            Ok(known) => Model::Known(known),
            Err(_) => Model::Custom(model),
        }
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Model::from(model.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_serialization() {
        let model = Model::Known(KnownModel::Gpt4oMini);
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#""gpt-4o-mini""#);

        let model = Model::Known(KnownModel::Gpt35Turbo);
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#""gpt-3.5-turbo""#);
    }

    #[test]
    fn custom_model_serialization() {
        let model = Model::Custom("gpt-5-preview".to_string());
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#""gpt-5-preview""#);
    }

    #[test]
    fn model_deserialization() {
        let model: Model = serde_json::from_str(r#""gpt-4-turbo""#).unwrap();
        assert_eq!(model, Model::Known(KnownModel::Gpt4Turbo));

        let model: Model = serde_json::from_str(r#""my-finetune""#).unwrap();
        assert_eq!(model, Model::Custom("my-finetune".to_string()));
    }

    #[test]
    fn parse_prefers_known_models() {
        assert_eq!("gpt-4".parse::<Model>().unwrap(), KnownModel::Gpt4.into());
        assert_eq!(
            "gpt-4.1".parse::<Model>().unwrap(),
            Model::Custom("gpt-4.1".to_string())
        );
        assert_eq!(Model::from("gpt-4o"), Model::Known(KnownModel::Gpt4o));
    }

    #[test]
    fn default_is_gpt_35_turbo() {
        assert_eq!(Model::default().to_string(), "gpt-3.5-turbo");
    }

    #[test]
    fn five_known_models() {
        let names: Vec<_> = KnownModel::ALL.iter().map(|m| m.to_string()).collect();
        assert_eq!(
            names,
            vec!["gpt-4-turbo", "gpt-4", "gpt-3.5-turbo", "gpt-4o", "gpt-4o-mini"]
        );
    }
}
