use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Canonical representation of a cloud resource extracted from IaC.
///
/// The `id` is composed by the parsers as `{name}-{kind-tag}-{region}` and is
/// the join key between the resource model and the cost breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalResource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub region: String,
    pub size: String,
    pub count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl CanonicalResource {
    pub fn new(
        id: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
        region: impl Into<String>,
        size: impl Into<String>,
        count: i64,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            name: name.into(),
            region: region.into(),
            size: size.into(),
            count,
            tags: None,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Numeric metadata lookup, tolerant of missing/null entries.
    pub fn metadata_i64(&self, key: &str) -> Option<i64> {
        self.metadata.as_ref()?.get(key)?.as_i64()
    }
}

/// Ordered collection of canonical resources. Order reflects parse order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalResourceModel {
    pub resources: Vec<CanonicalResource>,
}

impl CanonicalResourceModel {
    pub fn new(resources: Vec<CanonicalResource>) -> Self {
        Self { resources }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }
}

/// Qualitative confidence of a price estimate.
///
/// Ordering is Low < Medium < High so that the minimum across a set of quotes
/// is the weakest link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingConfidence {
    Low,
    Medium,
    High,
}

impl PricingConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for PricingConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a pricing adapter returns for one SKU.
///
/// `monthly_price` is `hourly_price * 730` unless the SKU is inherently
/// monthly (load balancers, control planes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub hourly_price: f64,
    pub monthly_price: f64,
    pub confidence: PricingConfidence,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl PriceQuote {
    pub fn hourly(hourly_price: f64, confidence: PricingConfidence) -> Self {
        Self {
            hourly_price,
            monthly_price: hourly_price * 730.0,
            confidence,
            attributes: HashMap::new(),
        }
    }

    pub fn monthly(monthly_price: f64, confidence: PricingConfidence) -> Self {
        Self {
            hourly_price: monthly_price / 730.0,
            monthly_price,
            confidence,
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Round to two decimal places, the precision of every reported cost.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_ordering() {
        assert!(PricingConfidence::Low < PricingConfidence::Medium);
        assert!(PricingConfidence::Medium < PricingConfidence::High);
        assert_eq!(
            PricingConfidence::High.min(PricingConfidence::Low),
            PricingConfidence::Low
        );
    }

    #[test]
    fn test_confidence_serde() {
        let json = serde_json::to_string(&PricingConfidence::High).unwrap();
        assert_eq!(json, "\"high\"");
        let back: PricingConfidence = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(back, PricingConfidence::Low);
    }

    #[test]
    fn test_quote_hourly_to_monthly() {
        let quote = PriceQuote::hourly(0.0416, PricingConfidence::High);
        assert!((quote.monthly_price - 30.368).abs() < 1e-9);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(30.368), 30.37);
        assert_eq!(round2(6.988_492), 6.99);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_resource_type_field_renamed() {
        let resource = CanonicalResource::new("web-t3.micro-us-east-1", "aws_instance", "web", "us-east-1", "t3.micro", 1);
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["type"], "aws_instance");
        assert!(json.get("resource_type").is_none());
    }
}
