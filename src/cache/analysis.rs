//! Cache layer for analysis artifacts: parsed models, simulation results,
//! and full check responses, each keyed by content hash.

use std::time::Duration;

use crate::domain::{CanonicalResourceModel, CheckResponse};

use super::{content_hash, CacheClient};

const MODEL_TTL: Duration = Duration::from_secs(60 * 60);
const COST_TTL: Duration = Duration::from_secs(30 * 60);
const RESPONSE_TTL: Duration = Duration::from_secs(10 * 60);

/// Content-addressed cache for the analysis pipeline stages.
#[derive(Clone)]
pub struct AnalysisCache {
    cache: CacheClient,
}

impl AnalysisCache {
    pub fn new(cache: CacheClient) -> Self {
        Self { cache }
    }

    /// Hash of a raw IaC payload, the parse-stage cache key.
    pub fn payload_key(iac_type: &str, payload: &str) -> String {
        format!("analysis:model:{}:{}", iac_type, content_hash(payload.as_bytes()))
    }

    /// Hash of a parsed model, the simulate-stage cache key.
    pub fn model_key(model: &CanonicalResourceModel) -> String {
        let serialized = serde_json::to_vec(model).unwrap_or_default();
        format!("analysis:cost:{}", content_hash(&serialized))
    }

    /// Hash of a full analysis request, the response cache key.
    pub fn request_key(iac_type: &str, payload: &str, environment: &str, budget: Option<f64>) -> String {
        let fingerprint = format!("{iac_type}\n{payload}\n{environment}\n{budget:?}");
        format!("analysis:response:{}", content_hash(fingerprint.as_bytes()))
    }

    pub async fn get_model(&self, key: &str) -> Option<CanonicalResourceModel> {
        self.cache.get_json(key).await
    }

    pub async fn put_model(&self, key: &str, model: &CanonicalResourceModel) {
        self.cache.set_json(key, model, MODEL_TTL).await;
    }

    pub async fn get_cost(&self, key: &str) -> Option<CheckResponse> {
        self.cache.get_json(key).await
    }

    pub async fn put_cost(&self, key: &str, response: &CheckResponse) {
        self.cache.set_json(key, response, COST_TTL).await;
    }

    pub async fn get_response(&self, key: &str) -> Option<CheckResponse> {
        self.cache.get_json(key).await
    }

    pub async fn put_response(&self, key: &str, response: &CheckResponse) {
        self.cache.set_json(key, response, RESPONSE_TTL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CanonicalResource;

    #[test]
    fn test_payload_key_varies_by_type_and_content() {
        let a = AnalysisCache::payload_key("terraform", "x");
        let b = AnalysisCache::payload_key("ansible", "x");
        let c = AnalysisCache::payload_key("terraform", "y");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_model_key_stable_for_equal_models() {
        let model = CanonicalResourceModel::new(vec![CanonicalResource::new(
            "web-t3.micro-us-east-1",
            "aws_instance",
            "web",
            "us-east-1",
            "t3.micro",
            1,
        )]);
        assert_eq!(AnalysisCache::model_key(&model), AnalysisCache::model_key(&model.clone()));
    }

    #[test]
    fn test_request_key_includes_budget() {
        let with_budget = AnalysisCache::request_key("terraform", "p", "dev", Some(100.0));
        let without = AnalysisCache::request_key("terraform", "p", "dev", None);
        assert_ne!(with_budget, without);
    }
}
