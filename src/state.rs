//! Application state: configuration, the objective catalogue cache, the result
//! store, and the optional question writer/marker client.

use tracing::{info, instrument};

use crate::catalogue::CatalogueCache;
use crate::config::{load_app_config_from_env, AppConfig};
use crate::openai::OpenAI;
use crate::store::ResultStore;

pub struct AppState {
    pub config: AppConfig,
    pub catalogue: CatalogueCache,
    pub store: ResultStore,
    pub openai: Option<OpenAI>,
}

impl AppState {
    /// Build state from env: load config, point the catalogue and store at their paths, init OpenAI.
    /// The catalogue itself is loaded lazily on first use (or by `main` at startup).
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_app_config_from_env();

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "skillplan_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "skillplan_backend", "OpenAI disabled (no OPENAI_API_KEY). Using local question fallbacks.");
        }

        Self::with_parts(config, openai)
    }

    pub fn with_parts(config: AppConfig, openai: Option<OpenAI>) -> Self {
        info!(
            target: "skillplan_backend",
            objectives_path = %config.objectives_path,
            data_dir = %config.data_dir,
            "Configured catalogue and result store"
        );
        Self {
            catalogue: CatalogueCache::new(&config.objectives_path),
            store: ResultStore::new(&config.data_dir),
            config,
            openai,
        }
    }

    /// State over a fixture catalogue and an explicit data directory.
    #[cfg(test)]
    pub fn for_tests(catalogue: crate::catalogue::Catalogue, data_dir: &std::path::Path) -> Self {
        Self {
            config: AppConfig::default(),
            catalogue: CatalogueCache::with_catalogue(catalogue),
            store: ResultStore::new(data_dir),
            openai: None,
        }
    }
}
