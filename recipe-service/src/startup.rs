use crate::config::RecipeConfig;
use crate::handlers;
use crate::services::detection::onnx::YoloOnnxDetector;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::GenerationParams;
use crate::services::{FoodClassifier, ObjectDetector, RecipeGenerator};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::future::{Future, IntoFuture};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: RecipeConfig,
    pub classifier: FoodClassifier,
    pub generator: RecipeGenerator,
    pub upload_dir: PathBuf,
}

impl AppState {
    /// Wires the real adapters. Missing models degrade instead of failing.
    pub async fn from_config(config: RecipeConfig) -> Result<Self, AppError> {
        let upload_dir = PathBuf::from(&config.uploads.dir);
        tokio::fs::create_dir_all(&upload_dir).await.map_err(|e| {
            tracing::error!(
                "Failed to create upload directory {}: {}",
                upload_dir.display(),
                e
            );
            AppError::from(e)
        })?;

        let classifier = load_classifier(&config).await;
        let generator = build_generator(&config);

        Ok(Self {
            config,
            classifier,
            generator,
            upload_dir,
        })
    }
}

async fn load_classifier(config: &RecipeConfig) -> FoodClassifier {
    let detection = config.detection.clone();
    let loaded = tokio::task::spawn_blocking(move || YoloOnnxDetector::load(&detection)).await;

    match loaded {
        Ok(Ok(detector)) => {
            tracing::info!(
                detector = detector.name(),
                model_path = %config.detection.model_path,
                "YOLO model loaded successfully"
            );
            FoodClassifier::new(Arc::new(detector))
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Error loading YOLO model; detection unavailable");
            FoodClassifier::unavailable()
        }
        Err(e) => {
            tracing::error!(error = %e, "YOLO model loader task failed; detection unavailable");
            FoodClassifier::unavailable()
        }
    }
}

fn build_generator(config: &RecipeConfig) -> RecipeGenerator {
    let Some(api_key) = config.google.api_key.clone() else {
        tracing::warn!("GOOGLE_API_KEY not found. Recipe generation will be unavailable.");
        return RecipeGenerator::unavailable();
    };

    let gemini_config = GeminiConfig {
        api_key,
        model: config.models.text_model.clone(),
        api_base: config.google.api_base.clone(),
        timeout: Duration::from_secs(config.models.request_timeout_secs),
    };

    match GeminiTextProvider::new(gemini_config) {
        Ok(provider) => {
            tracing::info!(model = %config.models.text_model, "Gemini API configured successfully");
            let params = GenerationParams {
                temperature: config.models.temperature,
                top_p: None,
                max_tokens: config.models.max_output_tokens,
            };
            RecipeGenerator::new(Arc::new(provider), params)
        }
        Err(e) => {
            tracing::error!(error = %e, "Error configuring Gemini API; generation unavailable");
            RecipeGenerator::unavailable()
        }
    }
}

pub fn router(state: AppState) -> Router {
    let max_bytes = state.config.uploads.max_bytes;

    Router::new()
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .layer(DefaultBodyLimit::max(max_bytes))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct Application {
    port: u16,
    server: Box<dyn Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: RecipeConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(config.clone()).await?;
        Self::build_with_state(config, state).await
    }

    /// Serves `state` instead of building adapters from `config`.
    pub async fn build_with_state(config: RecipeConfig, state: AppState) -> Result<Self, AppError> {
        let app = router(state.clone());

        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            detector = state.classifier.is_available(),
            generator = state.generator.is_available(),
            "Listening on {}",
            port
        );

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
