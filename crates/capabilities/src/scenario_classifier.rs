//! `scenario_classifier`: names the kind of restaurant wanted and maps it to
//! an AMap type code.

use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{
    strip_code_fences, Capability, CapabilityError, CapabilityName, CompletionRequest,
    LlmProvider, StepInput, QUERY_PARAM,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::prompts::{
    with_query, SCENARIO_CLASSIFIER_SYSTEM_PROMPT, SCENARIO_CLASSIFIER_USER_PROMPT_TEMPLATE,
};
use crate::{to_output, Taxonomy};

#[derive(Debug, Default, Deserialize)]
struct ScenarioGuess {
    #[serde(default)]
    scenario: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Default, Serialize)]
struct Classification {
    scenario: Option<String>,
    types: Option<String>,
    error_messages: Vec<String>,
}

pub struct ScenarioClassifierCapability {
    oracle: Arc<dyn LlmProvider>,
    taxonomy: Arc<Taxonomy>,
}

impl ScenarioClassifierCapability {
    pub fn new(oracle: Arc<dyn LlmProvider>, taxonomy: Arc<Taxonomy>) -> Self {
        Self { oracle, taxonomy }
    }

    async fn classify(&self, query: &str) -> Classification {
        let mut out = Classification::default();
        if query.is_empty() {
            out.error_messages
                .push("query must not be empty".to_owned());
            return out;
        }

        let request = CompletionRequest::deterministic(
            SCENARIO_CLASSIFIER_SYSTEM_PROMPT,
            with_query(SCENARIO_CLASSIFIER_USER_PROMPT_TEMPLATE, query),
        );
        let guess = match self.oracle.complete(request).await {
            Ok(text) => serde_json::from_str::<ScenarioGuess>(strip_code_fences(&text))
                .map_err(|e| format!("oracle returned invalid JSON: {e}")),
            Err(e) => Err(format!("scenario classification failed: {e}")),
        };
        let guess = match guess {
            Ok(guess) => guess,
            Err(message) => {
                warn!(%message, "scenario classification failed");
                out.error_messages.push(message);
                return out;
            }
        };

        match guess.scenario.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()) {
            Some(scenario) => {
                out.types = self.taxonomy.type_for(&scenario).map(str::to_owned);
                info!(
                    %scenario,
                    types = ?out.types,
                    confidence = ?guess.confidence,
                    "scenario classified"
                );
                out.scenario = Some(scenario);
            }
            None => info!("no scenario recognised"),
        }
        out
    }
}

#[async_trait]
impl Capability for ScenarioClassifierCapability {
    fn name(&self) -> CapabilityName {
        CapabilityName::ScenarioClassifier
    }

    async fn invoke(&self, input: StepInput) -> Result<Value, CapabilityError> {
        let query = input.get_str(QUERY_PARAM).map(str::trim).unwrap_or_default();
        to_output(&self.classify(query).await)
    }
}
