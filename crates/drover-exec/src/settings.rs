use serde::Deserialize;

use drover_core::ProviderError;
use drover_model::{ExecRequest, RawProperties};

/// `Args` written either as one scalar or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum ArgList {
    One(String),
    Many(Vec<String>),
}

/// `File` / `Args` properties shared by the process providers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct ExecSettings {
    #[serde(rename = "File")]
    file: String,
    #[serde(rename = "Args", default)]
    args: Option<ArgList>,
}

impl ExecSettings {
    pub(crate) fn parse(provider: &str, props: &RawProperties) -> Result<Self, ProviderError> {
        let settings: Self = props.decode()?;
        if settings.file.trim().is_empty() {
            return Err(ProviderError::InvalidSettings(format!(
                "File must be set on {provider}"
            )));
        }
        Ok(settings)
    }

    pub(crate) fn into_request(self) -> ExecRequest {
        let args = match self.args {
            None => Vec::new(),
            Some(ArgList::One(arg)) => vec![arg],
            Some(ArgList::Many(args)) => args,
        };
        ExecRequest {
            file: self.file,
            args,
        }
    }
}
