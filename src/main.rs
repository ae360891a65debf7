use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use cardioserve::adapters::model::ArtifactModel;
use cardioserve::adapters::mongo::MongoStore;
use cardioserve::http::{self, AppState};
use cardioserve::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load();

    let model = ArtifactModel::load_or_train(&config.model_dir)?;

    info!("Connecting to MongoDB at {}", config.mongo_uri);
    let store = MongoStore::connect(&config.mongo_uri, &config.database).await?;

    let state = Arc::new(AppState::new(store, model, config.jwt_secret.clone()));
    http::serve(state, &config).await
}
