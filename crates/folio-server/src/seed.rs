//! Startup account bootstrap and the `init-tags` / `init-models` sample data.

use anyhow::{Context, Result};
use folio_common::forms::{CategoryForm, ModelDraft, TagDraft};
use folio_common::types::{ModelStatus, ModelType, User};
use folio_storage::Store;
use serde_json::json;

use crate::config::{AuthConfig, SeedTag, TagSeedFile};

/// Created and skipped row counts of one seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub created: u32,
    pub skipped: u32,
}

pub fn default_tags() -> Vec<SeedTag> {
    [
        ("Python", "#3776ab"),
        ("Django", "#092e20"),
        ("Machine Learning", "#ff6b35"),
        ("Web Development", "#4ecdc4"),
        ("Tutorial", "#45b7d1"),
        ("AI", "#96ceb4"),
        ("Data Science", "#feca57"),
        ("JavaScript", "#f7b731"),
        ("React", "#61dafb"),
        ("Programming", "#6c5ce7"),
    ]
    .into_iter()
    .map(|(name, color)| SeedTag {
        name: name.to_string(),
        color: Some(color.to_string()),
    })
    .collect()
}

/// Insert tags whose name is not taken yet. `seed` replaces the built-in list.
pub async fn init_tags(store: &Store, seed: Option<TagSeedFile>) -> Result<SeedSummary> {
    let tags = match seed {
        Some(file) => file.tags,
        None => default_tags(),
    };
    let mut summary = SeedSummary::default();
    for tag in &tags {
        let name = tag.name.trim();
        if name.is_empty() {
            tracing::warn!("Skipping seed tag with empty name");
            summary.skipped += 1;
            continue;
        }
        if store.get_tag_by_name(name).await?.is_some() {
            tracing::info!(name = %name, "Tag already exists, skipping");
            summary.skipped += 1;
            continue;
        }
        let color = tag
            .color
            .as_deref()
            .unwrap_or(folio_common::forms::DEFAULT_TAG_COLOR);
        let created = store
            .create_tag(&TagDraft::new(name, color))
            .await
            .with_context(|| format!("Failed to create tag '{name}'"))?;
        tracing::info!(name = %created.name, slug = %created.slug, "Tag created");
        summary.created += 1;
    }
    Ok(summary)
}

/// Create the configured admin (staff) account when no user exists.
pub async fn ensure_default_admin(store: &Store, auth: &AuthConfig) -> Result<Option<User>> {
    let count = store.count_users().await?;
    if count > 0 {
        tracing::info!(count, "Users table already has accounts, skipping default admin creation");
        return Ok(None);
    }
    let hash = folio_storage::auth::hash_password(&auth.default_password)?;
    let user = store
        .create_user(&auth.default_username, &hash, true)
        .await
        .context("Failed to create default admin account")?;
    tracing::info!(username = %user.username, "Created default admin account");
    Ok(Some(user))
}

const SAMPLE_CATEGORIES: [(&str, &str, &str); 4] = [
    ("Natural Language Processing", "Models for text analysis and generation", "#007bff"),
    ("Computer Vision", "Models for image and video analysis", "#28a745"),
    ("Machine Learning", "General purpose ML models", "#ffc107"),
    ("Deep Learning", "Neural network based models", "#dc3545"),
];

struct SampleModel {
    name: &'static str,
    description: &'static str,
    model_type: ModelType,
    category: &'static str,
    version: &'static str,
    framework: &'static str,
    /// accuracy, precision, recall, f1
    metrics: [f64; 4],
    input_format: serde_json::Value,
    output_format: serde_json::Value,
    max_input_length: i32,
}

fn sample_models() -> Vec<SampleModel> {
    vec![
        SampleModel {
            name: "Sentiment Analysis Model",
            description: "A transformer-based model for analyzing sentiment in text. Trained on large-scale social media and review datasets.",
            model_type: ModelType::SentimentAnalysis,
            category: "Natural Language Processing",
            version: "2.1",
            framework: "PyTorch",
            metrics: [0.92, 0.91, 0.93, 0.92],
            input_format: json!({"text": "string", "max_length": 512}),
            output_format: json!({"sentiment": "string", "confidence": "float", "scores": "dict"}),
            max_input_length: 512,
        },
        SampleModel {
            name: "Text Classification Model",
            description: "BERT-based model for multi-class text classification. Supports up to 50 different categories.",
            model_type: ModelType::TextClassification,
            category: "Natural Language Processing",
            version: "1.5",
            framework: "Transformers",
            metrics: [0.89, 0.88, 0.90, 0.89],
            input_format: json!({"text": "string", "categories": "list"}),
            output_format: json!({"predicted_class": "string", "confidence": "float", "all_predictions": "list"}),
            max_input_length: 256,
        },
        SampleModel {
            name: "Image Classification Model",
            description: "ResNet-based model for image classification. Trained on ImageNet dataset with 1000 classes.",
            model_type: ModelType::ImageClassification,
            category: "Computer Vision",
            version: "3.0",
            framework: "PyTorch",
            metrics: [0.95, 0.94, 0.96, 0.95],
            input_format: json!({"image": "file", "format": "RGB"}),
            output_format: json!({"predicted_class": "string", "confidence": "float", "top_predictions": "list"}),
            max_input_length: 224,
        },
        SampleModel {
            name: "Text Generation Model",
            description: "GPT-style model for creative text generation. Fine-tuned for various writing styles.",
            model_type: ModelType::TextGeneration,
            category: "Natural Language Processing",
            version: "1.2",
            framework: "Transformers",
            metrics: [0.85, 0.84, 0.86, 0.85],
            input_format: json!({"prompt": "string", "max_length": 100}),
            output_format: json!({"generated_text": "string", "tokens_generated": "int"}),
            max_input_length: 1024,
        },
        SampleModel {
            name: "Named Entity Recognition Model",
            description: "SpaCy-based NER model for extracting entities from text. Supports person, organization, location, and more.",
            model_type: ModelType::NamedEntityRecognition,
            category: "Natural Language Processing",
            version: "1.0",
            framework: "SpaCy",
            metrics: [0.88, 0.87, 0.89, 0.88],
            input_format: json!({"text": "string"}),
            output_format: json!({"entities": "list", "entity_types": "list"}),
            max_input_length: 512,
        },
        SampleModel {
            name: "Question Answering Model",
            description: "BERT-based QA model for answering questions based on given context. Trained on SQuAD dataset.",
            model_type: ModelType::QuestionAnswering,
            category: "Natural Language Processing",
            version: "2.0",
            framework: "Transformers",
            metrics: [0.87, 0.86, 0.88, 0.87],
            input_format: json!({"question": "string", "context": "string"}),
            output_format: json!({"answer": "string", "confidence": "float", "start_position": "int"}),
            max_input_length: 512,
        },
    ]
}

/// Sample categories plus six public, ready models owned by `owner_username`.
/// Categories are matched by name and models by (name, version).
pub async fn init_sample_models(store: &Store, owner_username: &str) -> Result<SeedSummary> {
    let owner = store
        .get_user_by_username(owner_username)
        .await?
        .with_context(|| format!("Owner account '{owner_username}' does not exist; start the server once or run create-user"))?;

    let mut category_ids = std::collections::HashMap::new();
    for (name, description, color) in SAMPLE_CATEGORIES {
        let category = match store.get_category_by_name(name).await? {
            Some(existing) => existing,
            None => {
                let draft = CategoryForm {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                    color: Some(color.to_string()),
                }
                .validate()
                .map_err(|e| anyhow::anyhow!("Invalid sample category '{name}': {e}"))?;
                let created = store.create_category(&draft).await?;
                tracing::info!(name = %created.name, "Category created");
                created
            }
        };
        category_ids.insert(name, category.id);
    }

    let mut summary = SeedSummary::default();
    for sample in sample_models() {
        if store
            .get_model_by_name_version(sample.name, sample.version)
            .await?
            .is_some()
        {
            tracing::info!(name = sample.name, version = sample.version, "Model already exists, skipping");
            summary.skipped += 1;
            continue;
        }
        let mut draft = ModelDraft::new(sample.name, sample.description, sample.model_type, sample.version);
        draft.category_id = category_ids.get(sample.category).cloned();
        draft.framework = sample.framework.to_string();
        let [accuracy, precision, recall, f1] = sample.metrics;
        draft.accuracy = Some(accuracy);
        draft.precision = Some(precision);
        draft.recall = Some(recall);
        draft.f1_score = Some(f1);
        draft.input_format = sample.input_format;
        draft.output_format = sample.output_format;
        draft.max_input_length = sample.max_input_length;
        draft.is_public = true;

        let model = store
            .create_model_with_status(&owner.id, &draft, ModelStatus::Ready)
            .await
            .with_context(|| format!("Failed to create model '{}'", sample.name))?;
        tracing::info!(slug = %model.slug, version = %model.version, "Model created");
        summary.created += 1;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_storage::ModelFilter;

    async fn store() -> (tempfile::TempDir, Store) {
        folio_common::id::init(1, 1);
        let dir = tempfile::tempdir().unwrap();
        let url = folio_storage::sqlite_url(dir.path(), "seed.db");
        let store = Store::new(&url, dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn default_tags_are_seeded_once() {
        let (_dir, store) = store().await;
        let first = init_tags(&store, None).await.unwrap();
        assert_eq!(first, SeedSummary { created: 10, skipped: 0 });
        let second = init_tags(&store, None).await.unwrap();
        assert_eq!(second, SeedSummary { created: 0, skipped: 10 });

        let python = store.get_tag_by_name("Python").await.unwrap().unwrap();
        assert_eq!(python.color, "#3776ab");
        assert_eq!(python.slug, "python");
    }

    #[tokio::test]
    async fn seed_file_replaces_default_tags() {
        let (_dir, store) = store().await;
        let file: TagSeedFile =
            serde_json::from_str(r#"{"tags": [{"name": "Rust"}, {"name": "Rust"}, {"name": " "}]}"#).unwrap();
        let summary = init_tags(&store, Some(file)).await.unwrap();
        assert_eq!(summary, SeedSummary { created: 1, skipped: 2 });
        let tags = store.list_tags().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].color, "#007bff");
    }

    #[tokio::test]
    async fn admin_is_created_only_for_an_empty_table() {
        let (_dir, store) = store().await;
        let auth = AuthConfig::default();
        let admin = ensure_default_admin(&store, &auth).await.unwrap().unwrap();
        assert!(admin.is_staff);
        assert_eq!(admin.username, "admin");
        assert!(ensure_default_admin(&store, &auth).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sample_models_are_public_and_ready() {
        let (_dir, store) = store().await;
        ensure_default_admin(&store, &AuthConfig::default()).await.unwrap();

        let summary = init_sample_models(&store, "admin").await.unwrap();
        assert_eq!(summary, SeedSummary { created: 6, skipped: 0 });
        assert_eq!(store.list_categories().await.unwrap().len(), 4);
        assert_eq!(store.count_models(&ModelFilter::visible()).await.unwrap(), 6);

        let again = init_sample_models(&store, "admin").await.unwrap();
        assert_eq!(again, SeedSummary { created: 0, skipped: 6 });
        assert_eq!(store.list_categories().await.unwrap().len(), 4);

        let sentiment = store
            .get_model_by_name_version("Sentiment Analysis Model", "2.1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sentiment.slug, "sentiment-analysis-model-21");
        assert_eq!(sentiment.category.unwrap().name, "Natural Language Processing");
    }

    #[tokio::test]
    async fn sample_models_need_an_owner() {
        let (_dir, store) = store().await;
        assert!(init_sample_models(&store, "nobody").await.is_err());
    }
}
