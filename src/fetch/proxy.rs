use crate::config::{EnvelopeKind, ProxyConfig};
use serde_json::Value;

/// How a relay proxy wraps the page it fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// The response body is the page itself
    Raw,
    /// The response body is a JSON object; the page is the string in `field`
    Json { field: String },
}

/// A relay proxy that fetches a target URL on the caller's behalf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub name: String,
    template: String,
    envelope: Envelope,
}

impl ProxyEndpoint {
    /// Creates a passthrough proxy
    pub fn raw(name: &str, template: &str) -> Self {
        Self {
            name: name.to_string(),
            template: template.to_string(),
            envelope: Envelope::Raw,
        }
    }

    /// Creates a proxy whose response carries the page in a JSON field
    pub fn json(name: &str, template: &str, field: &str) -> Self {
        Self {
            name: name.to_string(),
            template: template.to_string(),
            envelope: Envelope::Json {
                field: field.to_string(),
            },
        }
    }

    /// Builds the proxy request URL for a target, percent-encoding the target
    pub fn request_url(&self, target: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        self.template.replace("{url}", &encoded)
    }

    /// Extracts the page content from a proxy response body
    ///
    /// Returns an error description when the envelope is malformed or empty,
    /// which the caller treats as this proxy's failure.
    pub fn unwrap_body(&self, body: String) -> Result<String, String> {
        let content = match &self.envelope {
            Envelope::Raw => body,
            Envelope::Json { field } => {
                let value: Value = serde_json::from_str(&body)
                    .map_err(|e| format!("malformed JSON envelope: {}", e))?;
                value
                    .get(field)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| format!("JSON envelope has no string field '{}'", field))?
            }
        };

        if content.trim().is_empty() {
            return Err("empty body".to_string());
        }
        Ok(content)
    }
}

impl From<&ProxyConfig> for ProxyEndpoint {
    fn from(config: &ProxyConfig) -> Self {
        match (config.envelope, config.json_field.as_deref()) {
            (EnvelopeKind::Json, Some(field)) => Self::json(&config.name, &config.template, field),
            // Validation guarantees a field for JSON envelopes; default to the common one
            (EnvelopeKind::Json, None) => Self::json(&config.name, &config.template, "contents"),
            (EnvelopeKind::Raw, _) => Self::raw(&config.name, &config.template),
        }
    }
}
