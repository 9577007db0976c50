//! Prediction result types
//!
//! [`ResultPayload`] is the raw body returned by the prediction service.
//! Every field is independently optional and parsed leniently: a field of
//! the wrong shape is treated as absent rather than failing the payload.
//!
//! [`EnrichedResult`] is the chart-ready form produced by
//! [`crate::aggregator::enrich`]. It is serialized with the same camelCase
//! keys the service uses so a rendering layer can consume either.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One chart point, passed through exactly as the service sent it
///
/// Known point shapes:
/// - `tenureChart`: `{tenure, churned, retained}`
/// - `complaintsLineChart`: `{complaints, churned, retained}`
/// - `balanceAreaChart`: `{balance, churned, retained}`
/// - `creditScoreChart`: `{credit_score, churned, retained}`
/// - `incomeBandChart`: `{band, churned, retained}`
/// - `avgCreditScoreByChurn`: `{label, avg_score}`
pub type ChartPoint = Value;

/// A whole chart series
pub type ChartSeries = Vec<ChartPoint>;

/// Payload keys
pub const KEY_PREDICTIONS: &str = "predictions";
pub const KEY_PIE_DATA: &str = "pieData";
pub const KEY_TENURE: &str = "tenureChart";
pub const KEY_COMPLAINTS: &str = "complaintsLineChart";
pub const KEY_BALANCE: &str = "balanceAreaChart";
pub const KEY_CREDIT_SCORE: &str = "creditScoreChart";
pub const KEY_INCOME_BAND: &str = "incomeBandChart";
pub const KEY_AVG_CREDIT_SCORE: &str = "avgCreditScoreByChurn";
pub const KEY_CSV_URL: &str = "csv_url";

/// Keys whose presence makes an object look like a result payload
pub const PAYLOAD_KEYS: [&str; 8] = [
    KEY_PREDICTIONS,
    KEY_PIE_DATA,
    KEY_TENURE,
    KEY_COMPLAINTS,
    KEY_BALANCE,
    KEY_CREDIT_SCORE,
    KEY_INCOME_BAND,
    KEY_AVG_CREDIT_SCORE,
];

/// One per uploaded row, as scored by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Row index (or customer id) assigned by the backend
    pub record_index: Option<i64>,
    /// Churn class, coerced to a number; 1 means churn
    pub churn_prediction: Option<f64>,
    /// Churn probability in [0, 1]
    pub churn_probability: Option<f64>,
}

impl PredictionRecord {
    /// Parse one record, accepting the key spellings the service has used
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        Self {
            record_index: lookup(obj, &["recordIndex", "record_index", "index", "id"])
                .and_then(coerce_number)
                .map(|n| n as i64),
            churn_prediction: lookup(
                obj,
                &["churnPrediction", "churn_prediction", "prediction", "churn"],
            )
            .and_then(coerce_number),
            churn_probability: lookup(
                obj,
                &["churnProbability", "churn_probability", "probability"],
            )
            .and_then(coerce_number),
        }
    }

    pub fn is_churned(&self) -> bool {
        self.churn_prediction == Some(1.0)
    }
}

/// Raw result body as received
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPayload {
    pub predictions: Option<Vec<PredictionRecord>>,
    /// Unvalidated; the aggregator decides whether it is usable
    pub pie_data: Option<ChartSeries>,
    pub tenure_chart: Option<ChartSeries>,
    pub complaints_line_chart: Option<ChartSeries>,
    pub balance_area_chart: Option<ChartSeries>,
    pub credit_score_chart: Option<ChartSeries>,
    pub income_band_chart: Option<ChartSeries>,
    pub avg_credit_score_by_churn: Option<ChartSeries>,
    /// Suggested download file name
    pub csv_url: Option<String>,
}

impl ResultPayload {
    /// Parse leniently; anything that is not an object yields an empty payload
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        Self {
            predictions: obj
                .get(KEY_PREDICTIONS)
                .and_then(Value::as_array)
                .map(|rows| rows.iter().map(PredictionRecord::from_value).collect()),
            pie_data: series(obj, KEY_PIE_DATA),
            tenure_chart: series(obj, KEY_TENURE),
            complaints_line_chart: series(obj, KEY_COMPLAINTS),
            balance_area_chart: series(obj, KEY_BALANCE),
            credit_score_chart: series(obj, KEY_CREDIT_SCORE),
            income_band_chart: series(obj, KEY_INCOME_BAND),
            avg_credit_score_by_churn: series(obj, KEY_AVG_CREDIT_SCORE),
            csv_url: obj
                .get(KEY_CSV_URL)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string),
        }
    }

    /// True when neither predictions nor any series were supplied
    pub fn is_empty(&self) -> bool {
        self.predictions.is_none()
            && self.pie_data.is_none()
            && self.tenure_chart.is_none()
            && self.complaints_line_chart.is_none()
            && self.balance_area_chart.is_none()
            && self.credit_score_chart.is_none()
            && self.income_band_chart.is_none()
            && self.avg_credit_score_by_churn.is_none()
    }
}

/// One pie slice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    pub name: String,
    pub value: Number,
    /// Any extra keys the service attached (colors, labels)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PieSlice {
    pub fn new(name: &str, value: u64) -> Self {
        Self {
            name: name.to_string(),
            value: Number::from(value),
            extra: Map::new(),
        }
    }
}

/// Headline numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: u64,
    pub churned: u64,
    pub retained: u64,
    /// Rounded to one decimal place
    pub churn_rate_percent: f64,
}

/// One row of the preview table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRow {
    pub id: i64,
    pub prediction: Option<f64>,
    pub probability: Option<f64>,
}

/// Chart-ready derived result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedResult {
    pub pie_data: Vec<PieSlice>,
    pub summary: Summary,
    pub preview: Vec<PreviewRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenure_chart: Option<ChartSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complaints_line_chart: Option<ChartSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_area_chart: Option<ChartSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_score_chart: Option<ChartSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_band_chart: Option<ChartSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_credit_score_by_churn: Option<ChartSeries>,
    #[serde(default, rename = "csv_url", skip_serializing_if = "Option::is_none")]
    pub csv_url: Option<String>,
}

/// What the results view shows
#[derive(Debug, Clone, PartialEq)]
pub enum ResultState {
    Loading,
    /// No result exists yet for this identity; not an error
    Empty,
    Ready(EnrichedResult),
    Failed(String),
}

fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

fn series(obj: &Map<String, Value>, key: &str) -> Option<ChartSeries> {
    obj.get(key).and_then(Value::as_array).cloned()
}

/// Numeric coercion for loosely-typed backend fields
///
/// Numbers pass through, booleans map to 0/1, numeric strings are parsed.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_key_spellings() {
        let snake = PredictionRecord::from_value(&json!({
            "record_index": 7,
            "churn_prediction": "1",
            "churn_probability": 0.82
        }));
        assert_eq!(snake.record_index, Some(7));
        assert!(snake.is_churned());
        assert_eq!(snake.churn_probability, Some(0.82));

        let camel = PredictionRecord::from_value(&json!({
            "recordIndex": 3,
            "churnPrediction": 0
        }));
        assert_eq!(camel.record_index, Some(3));
        assert!(!camel.is_churned());
        assert_eq!(camel.churn_probability, None);
    }

    #[test]
    fn test_record_non_object_is_default() {
        let record = PredictionRecord::from_value(&json!("garbage"));
        assert_eq!(record, PredictionRecord::default());
    }

    #[test]
    fn test_payload_ignores_wrong_shapes() {
        let payload = ResultPayload::from_value(&json!({
            "predictions": "not a list",
            "tenureChart": {"oops": true},
            "incomeBandChart": [{"band": "Low", "churned": 1, "retained": 2}]
        }));

        assert!(payload.predictions.is_none());
        assert!(payload.tenure_chart.is_none());
        assert_eq!(payload.income_band_chart.as_ref().map(Vec::len), Some(1));
        assert!(!payload.is_empty());
    }

    #[test]
    fn test_payload_from_non_object() {
        assert!(ResultPayload::from_value(&json!([1, 2, 3])).is_empty());
        assert!(ResultPayload::from_value(&Value::Null).is_empty());
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(true)), Some(1.0));
        assert_eq!(coerce_number(&json!(" 0.5 ")), Some(0.5));
        assert_eq!(coerce_number(&json!("NaN")), None);
        assert_eq!(coerce_number(&json!(null)), None);
    }
}
