//! Result aggregation
//!
//! Derives the complete chart-ready [`EnrichedResult`] from a raw
//! [`ResultPayload`]. Whatever the service precomputed is authoritative and
//! passed through untouched; whatever it omitted is derived from the
//! per-record predictions. Pure and total: every payload, including an
//! empty one, produces a result.

use crate::models::{
    ChartPoint, EnrichedResult, PieSlice, PredictionRecord, PreviewRow, ResultPayload, Summary,
};
use serde_json::Value;

/// Number of records shown in the preview table
pub const PREVIEW_LEN: usize = 10;

/// Display order of income bands
pub const INCOME_BAND_ORDER: [&str; 5] = ["Very Low", "Low", "Medium", "High", "Very High"];

pub const RETAINED_LABEL: &str = "Retained";
pub const CHURNED_LABEL: &str = "Churned";

/// Build the enriched result for a payload
pub fn enrich(payload: &ResultPayload) -> EnrichedResult {
    let predictions: &[PredictionRecord] = payload.predictions.as_deref().unwrap_or(&[]);
    let summary = summarize(predictions);

    let pie_data = payload
        .pie_data
        .as_deref()
        .and_then(precomputed_pie)
        .unwrap_or_else(|| {
            vec![
                PieSlice::new(RETAINED_LABEL, summary.retained),
                PieSlice::new(CHURNED_LABEL, summary.churned),
            ]
        });

    EnrichedResult {
        pie_data,
        preview: preview(predictions),
        summary,
        tenure_chart: payload.tenure_chart.clone(),
        complaints_line_chart: payload.complaints_line_chart.clone(),
        balance_area_chart: payload.balance_area_chart.clone(),
        credit_score_chart: payload.credit_score_chart.clone(),
        income_band_chart: payload.income_band_chart.clone(),
        avg_credit_score_by_churn: payload.avg_credit_score_by_churn.clone(),
        csv_url: payload.csv_url.clone(),
    }
}

/// Counts and churn rate over all predictions
pub fn summarize(predictions: &[PredictionRecord]) -> Summary {
    let total = predictions.len() as u64;
    let churned = predictions.iter().filter(|p| p.is_churned()).count() as u64;

    Summary {
        total,
        churned,
        retained: total - churned,
        churn_rate_percent: churn_rate_percent(churned, total),
    }
}

/// `churned / total * 100`, rounded to one decimal; 0 when there are no records
pub fn churn_rate_percent(churned: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = churned as f64 / total as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}

fn preview(predictions: &[PredictionRecord]) -> Vec<PreviewRow> {
    predictions
        .iter()
        .take(PREVIEW_LEN)
        .map(|p| PreviewRow {
            id: p.record_index.unwrap_or(0),
            prediction: p.churn_prediction,
            probability: p.churn_probability,
        })
        .collect()
}

/// Accept a service-supplied pie series when it has at least two
/// well-formed `{name, value}` slices
fn precomputed_pie(series: &[ChartPoint]) -> Option<Vec<PieSlice>> {
    if series.len() < 2 {
        return None;
    }
    series
        .iter()
        .map(|point| {
            let obj = point.as_object()?;
            if !obj.get("name").is_some_and(Value::is_string)
                || !obj.get("value").is_some_and(Value::is_number)
            {
                return None;
            }
            serde_json::from_value::<PieSlice>(point.clone()).ok()
        })
        .collect()
}

/// Sort income-band points into display order
///
/// Bands outside [`INCOME_BAND_ORDER`] (or points without a band) keep
/// their relative order after all known bands.
pub fn sort_income_bands(points: &[ChartPoint]) -> Vec<ChartPoint> {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(income_band_rank);
    sorted
}

fn income_band_rank(point: &ChartPoint) -> usize {
    point
        .get("band")
        .and_then(Value::as_str)
        .and_then(|band| INCOME_BAND_ORDER.iter().position(|known| *known == band))
        .unwrap_or(INCOME_BAND_ORDER.len())
}

impl EnrichedResult {
    /// Income-band series in display order, if the service supplied one
    pub fn income_bands_ordered(&self) -> Option<Vec<ChartPoint>> {
        self.income_band_chart.as_deref().map(sort_income_bands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(total: usize, churned: usize) -> Vec<Value> {
        (0..total)
            .map(|i| {
                let churn = u8::from(i < churned);
                let probability = if churn == 1 { 0.9 } else { 0.1 };
                json!({
                    "record_index": i,
                    "churn_prediction": churn,
                    "churn_probability": probability
                })
            })
            .collect()
    }

    #[test]
    fn test_empty_predictions() {
        let result = enrich(&ResultPayload::from_value(&json!({"predictions": []})));

        assert_eq!(
            result.summary,
            Summary {
                total: 0,
                churned: 0,
                retained: 0,
                churn_rate_percent: 0.0
            }
        );
        assert_eq!(
            result.pie_data,
            vec![PieSlice::new("Retained", 0), PieSlice::new("Churned", 0)]
        );
        assert!(result.preview.is_empty());
    }

    #[test]
    fn test_empty_payload_is_total() {
        let result = enrich(&ResultPayload::default());
        assert_eq!(result.summary.total, 0);
        assert_eq!(result.pie_data.len(), 2);
        assert!(result.tenure_chart.is_none());
    }

    #[test]
    fn test_churn_rate_rounding() {
        let payload = ResultPayload::from_value(&json!({"predictions": records(37, 12)}));
        let result = enrich(&payload);

        assert_eq!(result.summary.total, 37);
        assert_eq!(result.summary.churned, 12);
        assert_eq!(result.summary.retained, 25);
        assert_eq!(result.summary.churn_rate_percent, 32.4);
        assert_eq!(
            result.pie_data,
            vec![PieSlice::new("Retained", 25), PieSlice::new("Churned", 12)]
        );
    }

    #[test]
    fn test_churn_rate_percent_values() {
        assert_eq!(churn_rate_percent(0, 0), 0.0);
        assert_eq!(churn_rate_percent(1, 3), 33.3);
        assert_eq!(churn_rate_percent(2, 3), 66.7);
        assert_eq!(churn_rate_percent(5, 5), 100.0);
    }

    #[test]
    fn test_totals_always_add_up() {
        for (total, churned) in [(0, 0), (1, 1), (10, 3), (99, 98)] {
            let payload = ResultPayload::from_value(&json!({"predictions": records(total, churned)}));
            let summary = enrich(&payload).summary;
            assert_eq!(summary.retained + summary.churned, summary.total);
        }
    }

    #[test]
    fn test_unparseable_predictions_count_as_retained() {
        let payload = ResultPayload::from_value(&json!({
            "predictions": [{"churn_prediction": "yes"}, "junk", {"churn_prediction": 1}]
        }));
        let summary = enrich(&payload).summary;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.churned, 1);
        assert_eq!(summary.retained, 2);
    }

    #[test]
    fn test_preview_first_ten() {
        let payload = ResultPayload::from_value(&json!({"predictions": records(25, 5)}));
        let preview = enrich(&payload).preview;

        assert_eq!(preview.len(), PREVIEW_LEN);
        assert_eq!(preview[0].id, 0);
        assert_eq!(preview[0].prediction, Some(1.0));
        assert_eq!(preview[0].probability, Some(0.9));
        assert_eq!(preview[9].id, 9);
        assert_eq!(preview[9].prediction, Some(0.0));
    }

    #[test]
    fn test_preview_fallback_id_and_missing_probability() {
        let payload = ResultPayload::from_value(&json!({
            "predictions": [{"churn_prediction": 1}]
        }));
        let preview = enrich(&payload).preview;

        assert_eq!(preview[0].id, 0);
        assert_eq!(preview[0].probability, None);
    }

    #[test]
    fn test_precomputed_pie_is_authoritative() {
        let payload = ResultPayload::from_value(&json!({
            "predictions": records(4, 1),
            "pieData": [
                {"name": "Retained", "value": 700, "fill": "#fda4af"},
                {"name": "Churned", "value": 300}
            ]
        }));
        let result = enrich(&payload);

        assert_eq!(result.pie_data[0].value, serde_json::Number::from(700));
        assert_eq!(result.pie_data[0].extra.get("fill"), Some(&json!("#fda4af")));
        // Summary still reflects the records
        assert_eq!(result.summary.total, 4);
    }

    #[test]
    fn test_malformed_pie_is_replaced() {
        for pie in [
            json!([{"name": "Only", "value": 1}]),
            json!([{"name": "A", "value": "1"}, {"name": "B", "value": 2}]),
            json!([{"label": "A", "value": 1}, {"name": "B", "value": 2}]),
        ] {
            let payload = ResultPayload::from_value(&json!({
                "predictions": records(3, 2),
                "pieData": pie
            }));
            assert_eq!(
                enrich(&payload).pie_data,
                vec![PieSlice::new("Retained", 1), PieSlice::new("Churned", 2)]
            );
        }
    }

    #[test]
    fn test_series_pass_through_and_omission() {
        let tenure = json!([{"tenure": 1, "churned": 3, "retained": 9, "note": "kept"}]);
        let payload = ResultPayload::from_value(&json!({
            "tenureChart": tenure,
            "avgCreditScoreByChurn": [{"label": "Retained", "avg_score": 650.5}]
        }));
        let result = enrich(&payload);

        assert_eq!(result.tenure_chart, tenure.as_array().cloned());
        assert!(result.avg_credit_score_by_churn.is_some());
        assert!(result.complaints_line_chart.is_none());
        assert!(result.income_band_chart.is_none());

        let serialized = serde_json::to_value(&result).unwrap();
        assert!(serialized.get("complaintsLineChart").is_none());
        assert_eq!(serialized["tenureChart"], tenure);
    }

    #[test]
    fn test_enrich_is_deterministic() {
        let raw = json!({
            "predictions": records(12, 4),
            "incomeBandChart": [{"band": "High", "churned": 1, "retained": 2}],
            "csv_url": "run_42.csv"
        });
        let payload = ResultPayload::from_value(&raw);

        let first = serde_json::to_string(&enrich(&payload)).unwrap();
        let second = serde_json::to_string(&enrich(&payload)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reenriching_output_keeps_series() {
        let payload = ResultPayload::from_value(&json!({
            "predictions": records(5, 2),
            "balanceAreaChart": [{"balance": "0-10k", "churned": 1, "retained": 3}]
        }));
        let first = enrich(&payload);

        let reparsed = ResultPayload::from_value(&serde_json::to_value(&first).unwrap());
        let second = enrich(&reparsed);

        assert_eq!(second.pie_data, first.pie_data);
        assert_eq!(second.balance_area_chart, first.balance_area_chart);
    }

    #[test]
    fn test_income_band_order() {
        let points = vec![
            json!({"band": "High", "churned": 1}),
            json!({"band": "Very Low", "churned": 2}),
            json!({"band": "Medium", "churned": 3}),
        ];
        let bands: Vec<_> = sort_income_bands(&points)
            .iter()
            .map(|p| p["band"].as_str().unwrap().to_string())
            .collect();

        assert_eq!(bands, vec!["Very Low", "Medium", "High"]);
    }

    #[test]
    fn test_unknown_bands_sort_last_stably() {
        let points = vec![
            json!({"band": "Ultra"}),
            json!({"band": "Low"}),
            json!({"churned": 1}),
            json!({"band": "Very High"}),
            json!({"band": "Mega"}),
        ];
        let sorted = sort_income_bands(&points);

        assert_eq!(sorted[0]["band"], "Low");
        assert_eq!(sorted[1]["band"], "Very High");
        assert_eq!(sorted[2]["band"], "Ultra");
        assert_eq!(sorted[3], json!({"churned": 1}));
        assert_eq!(sorted[4]["band"], "Mega");
    }

    #[test]
    fn test_income_bands_ordered_leaves_series_untouched() {
        let payload = ResultPayload::from_value(&json!({
            "incomeBandChart": [{"band": "High"}, {"band": "Low"}]
        }));
        let result = enrich(&payload);

        let ordered = result.income_bands_ordered().unwrap();
        assert_eq!(ordered[0]["band"], "Low");
        assert_eq!(result.income_band_chart.unwrap()[0]["band"], "High");
    }
}
