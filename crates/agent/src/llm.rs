use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use scanquote_core::config::LlmConfig;
use scanquote_core::domain::scoping::{Lod, ScopeMode, TravelMode};

use crate::conversation::ScopeDraft;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Hosted-model client speaking the plain generate API. The model is only
/// ever asked to translate a user message into the scope-field JSON below;
/// pricing never goes near it.
pub struct HostedLlmClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HostedLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .context("llm.base_url is required to build a hosted client")?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("could not build http client")?;

        Ok(Self {
            http,
            base_url,
            model: config.model.clone(),
            api_key: config.api_key.as_ref().map(|key| key.expose_secret().to_string()),
        })
    }
}

#[async_trait]
impl LlmClient for HostedLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let mut request = self.http.post(&url).json(&serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.context("model request failed")?;
        let body: GenerateResponse =
            response.error_for_status().context("model returned an error status")?
                .json()
                .await
                .context("model response was not valid JSON")?;
        Ok(body.response)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Prompt asking the model for scope fields only. The schema deliberately
/// has no slot a price could travel through.
pub fn scope_extraction_prompt(message: &str) -> String {
    format!(
        "Extract scan-to-BIM scoping fields from the message below. Reply with a single \
         JSON object and nothing else. Fields (all optional): square_feet (integer), \
         building_type (string), lod (integer), scope_mode (full|interior_only|exterior_only|mixed), \
         timeline (string), structural (bool), mepf (bool), georeferencing (bool), \
         expedited (bool), one_way_miles (integer), travel_mode (local|overnight|flight).\n\
         Message: {message}"
    )
}

/// Strict parse of the model's scope JSON. `None` means the output was
/// malformed; the caller recovers locally with the deterministic extractor
/// rather than surfacing a user-visible error.
pub fn parse_scope_payload(raw: &str) -> Option<ScopeDraft> {
    let trimmed = raw.trim();
    let json_slice = trimmed
        .find('{')
        .zip(trimmed.rfind('}'))
        .filter(|(start, end)| start < end)
        .map(|(start, end)| &trimmed[start..=end])?;

    let fields: ScopeFields = serde_json::from_str(json_slice).ok()?;

    Some(ScopeDraft {
        square_feet: fields.square_feet,
        building_type: fields.building_type,
        lod: fields.lod.map(Lod),
        scope_mode: fields.scope_mode.as_deref().and_then(parse_scope_mode),
        timeline: fields.timeline,
        structural: fields.structural.unwrap_or(false),
        mepf: fields.mepf.unwrap_or(false),
        georeferencing: fields.georeferencing.unwrap_or(false),
        expedited: fields.expedited.unwrap_or(false),
        one_way_miles: fields.one_way_miles,
        travel_mode: fields.travel_mode.as_deref().and_then(parse_travel_mode),
    })
}

fn parse_scope_mode(value: &str) -> Option<ScopeMode> {
    match value {
        "full" => Some(ScopeMode::Full),
        "interior_only" => Some(ScopeMode::InteriorOnly),
        "exterior_only" => Some(ScopeMode::ExteriorOnly),
        "mixed" => Some(ScopeMode::Mixed),
        _ => None,
    }
}

fn parse_travel_mode(value: &str) -> Option<TravelMode> {
    match value {
        "local" => Some(TravelMode::Local),
        "overnight" => Some(TravelMode::Overnight),
        "flight" => Some(TravelMode::Flight),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct ScopeFields {
    square_feet: Option<u32>,
    building_type: Option<String>,
    lod: Option<u16>,
    scope_mode: Option<String>,
    timeline: Option<String>,
    structural: Option<bool>,
    mepf: Option<bool>,
    georeferencing: Option<bool>,
    expedited: Option<bool>,
    one_way_miles: Option<u32>,
    travel_mode: Option<String>,
}

#[cfg(test)]
mod tests {
    use scanquote_core::domain::scoping::{Lod, ScopeMode};

    use super::parse_scope_payload;

    #[test]
    fn parses_well_formed_scope_json() {
        let draft = parse_scope_payload(
            r#"{"square_feet": 45000, "building_type": "office", "lod": 300,
                "scope_mode": "full", "timeline": "next month", "structural": true,
                "mepf": true, "georeferencing": true, "one_way_miles": 12}"#,
        )
        .expect("well-formed payload parses");

        assert_eq!(draft.square_feet, Some(45_000));
        assert_eq!(draft.lod, Some(Lod(300)));
        assert_eq!(draft.scope_mode, Some(ScopeMode::Full));
        assert!(draft.structural && draft.mepf && draft.georeferencing);
    }

    #[test]
    fn tolerates_prose_around_the_json_object() {
        let draft = parse_scope_payload(
            "Sure! Here are the fields:\n{\"square_feet\": 25000, \"lod\": 200}\nLet me know.",
        )
        .expect("embedded JSON parses");
        assert_eq!(draft.square_feet, Some(25_000));
    }

    #[test]
    fn malformed_output_is_rejected_not_guessed() {
        assert!(parse_scope_payload("the building is big, maybe 45000").is_none());
        assert!(parse_scope_payload("{\"square_feet\": \"lots\"}").is_none());
        assert!(parse_scope_payload("").is_none());
    }
}
