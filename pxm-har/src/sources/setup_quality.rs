// Setup/Quality Mapper
//
// Reads `setup_quality` captures: composite match-quality score, EMQ rating,
// and per-identifier feedback (coverage plus issues or recommendations).

use super::{event_name, is_truthy, Applied, EntryOutcome, SkipReason, SourceKind, SourceMapper};
use crate::accumulator::EventAccumulator;
use crate::capture::RawCapture;
use crate::types::{columns, MetricValue};
use serde_json::Value;

/// Mapper for the setup/quality export
#[derive(Debug, Clone, Copy, Default)]
pub struct SetupQualityMapper;

impl SourceMapper for SetupQualityMapper {
    fn kind(&self) -> SourceKind {
        SourceKind::SetupQuality
    }

    fn apply(&self, acc: &mut EventAccumulator, capture: &RawCapture) -> EntryOutcome {
        let payload = capture
            .payload()
            .map_err(|_| SkipReason::UnparseablePayload)?;
        let data = payload
            .pointer("/payload/data")
            .filter(|data| data.is_object())
            .ok_or(SkipReason::MissingPayloadData)?;

        let name = event_name(data.get("event_name"))
            .map(str::to_string)
            .or_else(|| capture.query_param("event_name"))
            .ok_or(SkipReason::MissingEventName)?;

        let record = acc.record_mut(&name);
        record.composite_score = Some(MetricValue::from_json(data.get("compositeScore")));
        record.emq_rating = Some(MetricValue::from_json(
            data.pointer("/emqRating/rating").filter(|rating| is_truthy(rating)),
        ));

        let mut applied = Applied::single();
        let feedback = data
            .get("matchKeyFeedback")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for entry in feedback {
            let Some(identifier) = entry
                .get("identifier")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
            else {
                applied.skipped_items.push(SkipReason::MalformedItem);
                continue;
            };

            record.set_dynamic(
                format!("{}{}", identifier, columns::COVERAGE_PERCENTAGE_SUFFIX),
                MetricValue::from_json(entry.pointer("/coverage/percentage")),
            );
            record.set_dynamic(
                format!("{}{}", identifier, columns::RECOMMENDATION_OR_ISSUE_SUFFIX),
                MetricValue::Text(recommendation_or_issue(data, entry, identifier)),
            );
        }

        Ok(applied)
    }
}

/// Issue or recommendation text for one identifier
///
/// Issues on the feedback entry win. Otherwise recommendations naming the
/// identifier are listed, plain ones before rule-based ones. An empty string
/// means nothing was flagged.
pub fn recommendation_or_issue(data: &Value, feedback: &Value, identifier: &str) -> String {
    let issues = feedback
        .get("issues")
        .and_then(Value::as_array)
        .filter(|issues| !issues.is_empty());

    if let Some(issues) = issues {
        return issues
            .iter()
            .map(|issue| {
                format!(
                    "{} (score: {})",
                    MetricValue::from_json(issue.get("issueCategory")),
                    MetricValue::from_json(issue.get("potentialScoreIncrease")),
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
    }

    let plain = matching_recommendations(data.get("recommendations"), identifier, "Recommendation");
    let rule_based = matching_recommendations(
        data.pointer("/ruleBasedRecommendations/recommendations"),
        identifier,
        "Rule Recommendation",
    );

    plain.chain(rule_based).collect::<Vec<_>>().join(", ")
}

fn matching_recommendations<'a>(
    list: Option<&'a Value>,
    identifier: &'a str,
    label: &'a str,
) -> impl Iterator<Item = String> + 'a {
    list.and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(move |rec| rec.get("identifier").and_then(Value::as_str) == Some(identifier))
        .map(move |rec| format!("{}: {}", label, MetricValue::from_json(rec.get("category"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn capture(url: Option<&str>, body: Value) -> RawCapture {
        RawCapture::new(url, format!("for (;;);{}", body))
    }

    #[test]
    fn test_score_and_rating() {
        let mut acc = EventAccumulator::new();
        let outcome = SetupQualityMapper.apply(
            &mut acc,
            &capture(
                None,
                json!({"payload": {"data": {
                    "event_name": "Purchase",
                    "compositeScore": 0.755,
                    "emqRating": {"rating": "GREAT"}
                }}}),
            ),
        );

        assert!(outcome.is_ok());
        let record = acc.get("Purchase").unwrap();
        assert_eq!(record.composite_score, Some(MetricValue::from(0.755)));
        assert_eq!(record.emq_rating, Some(MetricValue::from("GREAT")));
    }

    #[test]
    fn test_event_name_from_url() {
        let mut acc = EventAccumulator::new();
        SetupQualityMapper
            .apply(
                &mut acc,
                &capture(
                    Some("https://ads.example.com/quality?event_name=Lead"),
                    json!({"payload": {"data": {"compositeScore": null}}}),
                ),
            )
            .unwrap();

        let record = acc.get("Lead").unwrap();
        assert_eq!(record.composite_score, Some(MetricValue::Missing));
        assert_eq!(record.emq_rating, Some(MetricValue::Missing));
    }

    #[test]
    fn test_skip_reasons() {
        let mut acc = EventAccumulator::new();
        let no_name = SetupQualityMapper.apply(&mut acc, &capture(None, json!({"payload": {"data": {}}})));
        let no_data = SetupQualityMapper.apply(&mut acc, &capture(None, json!({"payload": {}})));
        let garbage = SetupQualityMapper.apply(&mut acc, &RawCapture::new(None, "for (;;);{oops"));

        assert_eq!(no_name, Err(SkipReason::MissingEventName));
        assert_eq!(no_data, Err(SkipReason::MissingPayloadData));
        assert_eq!(garbage, Err(SkipReason::UnparseablePayload));
        assert!(acc.is_empty());
    }

    #[test]
    fn test_issues_take_precedence() {
        let data = json!({
            "recommendations": [{"identifier": "email", "category": "SEND_EMAIL"}]
        });
        let feedback = json!({
            "identifier": "email",
            "issues": [
                {"issueCategory": "HASHING", "potentialScoreIncrease": 0.4},
                {"issueCategory": "FORMAT", "potentialScoreIncrease": 1}
            ]
        });

        assert_eq!(
            recommendation_or_issue(&data, &feedback, "email"),
            "HASHING (score: 0.4), FORMAT (score: 1)"
        );
    }

    #[test]
    fn test_recommendations_then_rule_based() {
        let data = json!({
            "recommendations": [
                {"identifier": "phone", "category": "ADD_PHONE"},
                {"identifier": "email", "category": "OTHER"}
            ],
            "ruleBasedRecommendations": {"recommendations": [
                {"identifier": "phone", "category": "NORMALIZE_PHONE"}
            ]}
        });
        let feedback = json!({"identifier": "phone", "issues": []});

        assert_eq!(
            recommendation_or_issue(&data, &feedback, "phone"),
            "Recommendation: ADD_PHONE, Rule Recommendation: NORMALIZE_PHONE"
        );
        assert_eq!(recommendation_or_issue(&data, &json!({}), "fbc"), "");
    }

    #[test]
    fn test_dynamic_identifier_columns() {
        let mut acc = EventAccumulator::new();
        let outcome = SetupQualityMapper
            .apply(
                &mut acc,
                &capture(
                    None,
                    json!({"payload": {"data": {
                        "event_name": "Purchase",
                        "matchKeyFeedback": [
                            {"identifier": "email", "coverage": {"percentage": 87.5}},
                            {"identifier": "phone"},
                            {"coverage": {"percentage": 12}}
                        ]
                    }}}),
                ),
            )
            .unwrap();

        assert_eq!(outcome.skipped_items, vec![SkipReason::MalformedItem]);
        let record = acc.get("Purchase").unwrap();
        let columns: Vec<_> = record.dynamic.keys().map(String::as_str).collect();
        assert_eq!(
            columns,
            vec![
                "email_coverage_percentage",
                "email_recommendation_or_issue",
                "phone_coverage_percentage",
                "phone_recommendation_or_issue"
            ]
        );
        assert_eq!(record.dynamic["email_coverage_percentage"], MetricValue::from(87.5));
        assert_eq!(record.dynamic["phone_coverage_percentage"], MetricValue::Missing);
        assert_eq!(record.dynamic["phone_recommendation_or_issue"], MetricValue::from(""));
    }
}
