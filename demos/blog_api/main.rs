//! Blog API example
//!
//! This example demonstrates:
//! - Loading expansion schemas from YAML
//! - Cyclic schemas (articles ↔ tags) with an explicit depth cap
//! - Per-relation pagination, sort and filter through `include`
//!
//! Try:
//! ```text
//! curl 'http://127.0.0.1:3000/articles?include=tags:per_page(2):sort(name|desc),category'
//! curl 'http://127.0.0.1:3000/tags?include=articles'
//! ```

use serde_json::Map;
use tracing_subscriber::EnvFilter;
use unfold::prelude::*;

const CONFIG: &str = include_str!("config.yaml");

fn record(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

async fn seed(store: &InMemoryStore) -> Result<()> {
    store.define_relation("articles", "tags", "tags", Cardinality::Many)?;
    store.define_relation("articles", "category", "categories", Cardinality::One)?;
    store.define_relation("tags", "articles", "articles", Cardinality::Many)?;

    let news = store
        .create("categories", record(json!({"name": "News"})))
        .await?;
    let guides = store
        .create("categories", record(json!({"name": "Guides"})))
        .await?;

    let mut tags = Vec::new();
    for name in ["rust", "async", "web", "databases"] {
        tags.push(store.create("tags", record(json!({"name": name}))).await?);
    }

    let articles = [
        ("Announcing the blog", 120, &news, &tags[..1]),
        ("Async in practice", 340, &guides, &tags[..3]),
        ("Serving JSON with axum", 95, &guides, &tags[1..]),
    ];

    for (title, views, category, article_tags) in articles {
        let article = store
            .create("articles", record(json!({"title": title, "views": views})))
            .await?;
        store
            .link("articles", &article.id, "category", &category.id)
            .await?;
        for tag in article_tags {
            store.link("articles", &article.id, "tags", &tag.id).await?;
            store.link("tags", &tag.id, "articles", &article.id).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,unfold=debug")),
        )
        .init();

    let config = UnfoldConfig::from_yaml_str(CONFIG)?;
    tracing::info!(resources = config.resources.len(), "loaded configuration");

    let store = InMemoryStore::new();
    seed(&store).await?;

    ServerBuilder::new()
        .with_config(config)
        .with_store(store)
        .serve("127.0.0.1:3000")
        .await
}
