//! Simulated inference.
//!
//! `MockEngine` never loads a model. It checks the input the way a real
//! backend would, waits a random latency and returns a payload shaped like
//! the output of the requested model type.

use async_trait::async_trait;
use folio_common::types::ModelType;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;

use crate::engine::{InferenceEngine, InferenceError, InferenceJob};

const TEXT_CLASSES: &[&str] = &["technology", "business", "sports", "entertainment", "science"];
const IMAGE_CLASSES: &[&str] = &["cat", "dog", "car", "bird", "airplane", "ship", "horse", "truck"];
const DETECTION_LABELS: &[&str] = &["person", "bicycle", "car", "dog", "chair", "bottle"];
const CONTINUATIONS: &[&str] = &[
    "and the results were better than expected.",
    "which opened up a whole new line of questions.",
    "so the team decided to try a different approach.",
    "while the rest of the pipeline kept running smoothly.",
];

#[derive(Debug, Clone)]
pub struct MockEngine {
    min_latency_ms: u64,
    max_latency_ms: u64,
}

impl MockEngine {
    pub fn new(min_latency_ms: u64, max_latency_ms: u64) -> Self {
        Self {
            min_latency_ms: min_latency_ms.min(max_latency_ms),
            max_latency_ms: min_latency_ms.max(max_latency_ms),
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new(100, 800)
    }
}

#[async_trait]
impl InferenceEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn infer(&self, job: InferenceJob) -> Result<Value, InferenceError> {
        let (payload, delay_ms) = {
            let mut rng = rand::thread_rng();
            let payload = mock_payload(&mut rng, &job)?;
            (payload, rng.gen_range(self.min_latency_ms..=self.max_latency_ms))
        };
        tracing::debug!(
            model_type = %job.model_type,
            delay_ms,
            "Simulating inference"
        );
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        Ok(payload)
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// `n` random weights that sum to 1.0 after rounding.
fn distribution<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<f64> {
    let raw: Vec<f64> = (0..n).map(|_| rng.gen_range(0.05..1.0)).collect();
    let total: f64 = raw.iter().sum();
    let mut out: Vec<f64> = raw.iter().map(|w| round4(w / total)).collect();
    let head: f64 = out[..n - 1].iter().sum();
    out[n - 1] = round4(1.0 - head);
    out
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(0, |best, (i, v)| if *v > values[best] { i } else { best })
}

/// Labelled predictions sorted by descending confidence.
fn ranked<R: Rng + ?Sized>(rng: &mut R, labels: &[&str], take: usize) -> Vec<(String, f64)> {
    let mut chosen: Vec<&str> = labels.choose_multiple(rng, take).copied().collect();
    chosen.shuffle(rng);
    let mut probs = distribution(rng, chosen.len());
    probs.sort_by(|a, b| b.total_cmp(a));
    chosen.into_iter().map(str::to_string).zip(probs).collect()
}

fn predictions_json(ranked: &[(String, f64)]) -> Value {
    Value::Array(
        ranked
            .iter()
            .map(|(label, confidence)| json!({"class": label, "confidence": confidence}))
            .collect(),
    )
}

fn entities(text: &str) -> Vec<Value> {
    let mut out = Vec::new();
    let mut offset = 0;
    for word in text.split_inclusive(char::is_whitespace) {
        let token = word.trim_end().trim_end_matches(|c: char| c.is_ascii_punctuation());
        let starts_upper = token.chars().next().is_some_and(char::is_uppercase);
        if starts_upper && offset > 0 {
            let label = if token.len() <= 3 && token.chars().all(char::is_uppercase) {
                "ORG"
            } else if token.ends_with("land") || token.ends_with("ia") {
                "LOC"
            } else {
                "PER"
            };
            out.push(json!({
                "text": token,
                "label": label,
                "start": offset,
                "end": offset + token.len(),
            }));
        }
        offset += word.len();
    }
    out
}

/// Build the result payload for `job` without sleeping.
pub fn mock_payload<R: Rng + ?Sized>(rng: &mut R, job: &InferenceJob) -> Result<Value, InferenceError> {
    let text = job.input_text()?;
    let len = text.chars().count();
    if len > job.max_input_length {
        return Err(InferenceError::InputTooLong {
            len,
            max: job.max_input_length,
        });
    }

    let payload = match job.model_type {
        ModelType::SentimentAnalysis => {
            let scores = distribution(rng, 3);
            let labels = ["positive", "negative", "neutral"];
            let best = argmax(&scores);
            json!({
                "sentiment": labels[best],
                "confidence": scores[best],
                "scores": {
                    "positive": scores[0],
                    "negative": scores[1],
                    "neutral": scores[2],
                },
            })
        }
        ModelType::TextClassification => {
            let all = ranked(rng, TEXT_CLASSES, TEXT_CLASSES.len());
            json!({
                "predicted_class": all[0].0,
                "confidence": all[0].1,
                "all_predictions": predictions_json(&all),
            })
        }
        ModelType::TextGeneration => {
            let continuation = CONTINUATIONS.choose(rng).copied().unwrap_or_default();
            let generated = format!("{} {}", text.trim_end(), continuation);
            json!({
                "generated_text": generated,
                "tokens_generated": continuation.split_whitespace().count(),
            })
        }
        ModelType::ImageClassification => {
            let top = ranked(rng, IMAGE_CLASSES, 3);
            json!({
                "predicted_class": top[0].0,
                "confidence": top[0].1,
                "top_predictions": predictions_json(&top),
            })
        }
        ModelType::ObjectDetection => {
            let count = rng.gen_range(1..=3);
            let objects: Vec<Value> = (0..count)
                .map(|_| {
                    let x = rng.gen_range(0..400);
                    let y = rng.gen_range(0..300);
                    json!({
                        "label": DETECTION_LABELS.choose(rng).copied().unwrap_or("object"),
                        "confidence": round4(rng.gen_range(0.5..0.99)),
                        "bbox": [x, y, x + rng.gen_range(20..200), y + rng.gen_range(20..200)],
                    })
                })
                .collect();
            json!({ "objects": objects })
        }
        ModelType::NamedEntityRecognition => {
            let found = entities(&text);
            let mut types: Vec<&str> = found
                .iter()
                .filter_map(|e| e["label"].as_str())
                .collect();
            types.sort_unstable();
            types.dedup();
            json!({ "entities": found, "entity_types": types })
        }
        ModelType::MachineTranslation => {
            let source = job.parameter("source_language").unwrap_or("en");
            let target = job.parameter("target_language").unwrap_or("es");
            json!({
                "translated_text": format!("[{target}] {text}"),
                "source_language": source,
                "target_language": target,
            })
        }
        ModelType::QuestionAnswering => {
            let context = job
                .input_data
                .get("context")
                .and_then(Value::as_str)
                .unwrap_or(&text);
            let answer = context
                .split_terminator(['.', '?', '!'])
                .map(str::trim)
                .find(|s| !s.is_empty())
                .unwrap_or_default();
            let start = context.find(answer).unwrap_or(0);
            json!({
                "answer": answer,
                "confidence": round4(rng.gen_range(0.6..0.98)),
                "start_position": start,
            })
        }
        ModelType::Summarization => {
            let words: Vec<&str> = text.split_whitespace().collect();
            let keep = words.len().div_ceil(3).max(1).min(words.len());
            let summary = words[..keep].join(" ");
            let ratio = if len == 0 {
                1.0
            } else {
                round4(summary.chars().count() as f64 / len as f64)
            };
            json!({ "summary": summary, "compression_ratio": ratio })
        }
        ModelType::Custom => json!({
            "prediction": "mock_result",
            "confidence": round4(rng.gen_range(0.5..0.99)),
        }),
    };
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn job(model_type: ModelType, input: Value) -> InferenceJob {
        InferenceJob {
            model_type,
            max_input_length: 512,
            input_data: input,
            parameters: json!({}),
        }
    }

    #[test]
    fn sentiment_scores_form_a_distribution() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let out = mock_payload(&mut rng, &job(ModelType::SentimentAnalysis, json!("great stuff"))).unwrap();
            let scores = &out["scores"];
            let values: Vec<f64> = ["positive", "negative", "neutral"]
                .iter()
                .map(|k| scores[*k].as_f64().unwrap())
                .collect();
            let sum: f64 = values.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "scores sum to {sum}");

            let sentiment = out["sentiment"].as_str().unwrap();
            let confidence = out["confidence"].as_f64().unwrap();
            assert_eq!(scores[sentiment].as_f64().unwrap(), confidence);
            assert!(values.iter().all(|v| *v <= confidence));
        }
    }

    #[test]
    fn every_model_type_has_a_payload() {
        let expected: &[(ModelType, &[&str])] = &[
            (ModelType::TextClassification, &["predicted_class", "confidence", "all_predictions"]),
            (ModelType::TextGeneration, &["generated_text", "tokens_generated"]),
            (ModelType::ImageClassification, &["predicted_class", "confidence", "top_predictions"]),
            (ModelType::ObjectDetection, &["objects"]),
            (ModelType::NamedEntityRecognition, &["entities", "entity_types"]),
            (ModelType::MachineTranslation, &["translated_text", "source_language", "target_language"]),
            (ModelType::QuestionAnswering, &["answer", "confidence", "start_position"]),
            (ModelType::Summarization, &["summary", "compression_ratio"]),
            (ModelType::Custom, &["prediction", "confidence"]),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        for (model_type, keys) in expected {
            let out = mock_payload(
                &mut rng,
                &job(*model_type, json!({"text": "Alice met Bob in Finland. It rained."})),
            )
            .unwrap();
            for key in *keys {
                assert!(out.get(*key).is_some(), "{model_type}: missing {key}");
            }
        }
    }

    #[test]
    fn classification_confidence_is_the_top_prediction() {
        let mut rng = StdRng::seed_from_u64(3);
        let out = mock_payload(&mut rng, &job(ModelType::ImageClassification, json!({"image": "x.png"}))).unwrap();
        let top = out["top_predictions"].as_array().unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0]["class"], out["predicted_class"]);
        assert_eq!(top[0]["confidence"], out["confidence"]);
    }

    #[test]
    fn entities_are_capitalised_words() {
        let found = entities("Yesterday Alice flew to Finland with IBM staff.");
        let names: Vec<&str> = found.iter().map(|e| e["text"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Alice", "Finland", "IBM"]);
        assert_eq!(found[1]["label"], "LOC");
        assert_eq!(found[2]["label"], "ORG");
        assert_eq!(found[0]["start"], 10);
    }

    #[test]
    fn translation_uses_parameters() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut j = job(ModelType::MachineTranslation, json!("hello"));
        j.parameters = json!({"target_language": "de"});
        let out = mock_payload(&mut rng, &j).unwrap();
        assert_eq!(out["translated_text"], "[de] hello");
        assert_eq!(out["source_language"], "en");
    }

    #[test]
    fn long_and_unsupported_inputs_fail() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut j = job(ModelType::Custom, json!("x".repeat(20)));
        j.max_input_length = 10;
        assert!(matches!(
            mock_payload(&mut rng, &j),
            Err(InferenceError::InputTooLong { len: 20, max: 10 })
        ));
        assert!(matches!(
            mock_payload(&mut rng, &job(ModelType::Custom, json!(3.5))),
            Err(InferenceError::UnsupportedInput)
        ));
    }

    #[tokio::test]
    async fn engine_returns_payload() {
        let engine = MockEngine::new(0, 0);
        assert_eq!(engine.name(), "mock");
        let out = engine
            .infer(job(ModelType::Summarization, json!("one two three four five six")))
            .await
            .unwrap();
        assert_eq!(out["summary"], "one two");
        engine.health_check().await.unwrap();
    }
}
