#![allow(dead_code)]

use recipe_service::config::RecipeConfig;
use recipe_service::services::detection::mock::MockDetector;
use recipe_service::services::providers::mock::MockTextProvider;
use recipe_service::services::providers::GenerationParams;
use recipe_service::services::{FoodClassifier, RecipeGenerator};
use recipe_service::startup::{AppState, Application};
use reqwest::multipart;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub upload_dir: PathBuf,
    pub client: reqwest::Client,
    pub detector: Option<Arc<MockDetector>>,
    pub provider: Option<Arc<MockTextProvider>>,
}

/// Config with no environment input, bound to a random local port.
pub fn test_config() -> RecipeConfig {
    let common = service_core::config::Config {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
    };
    let mut config =
        RecipeConfig::from_lookup(common, |_| None).expect("Failed to build test configuration");
    config.uploads.dir = format!("target/test-uploads-{}", Uuid::new_v4());
    config
}

/// Spawns the app with mock adapters. `None` leaves that adapter unavailable.
pub async fn spawn_app(
    detector: Option<MockDetector>,
    provider: Option<MockTextProvider>,
) -> TestApp {
    spawn_app_with_config(test_config(), detector, provider).await
}

pub async fn spawn_app_with_config(
    config: RecipeConfig,
    detector: Option<MockDetector>,
    provider: Option<MockTextProvider>,
) -> TestApp {
    let upload_dir = PathBuf::from(&config.uploads.dir);
    std::fs::create_dir_all(&upload_dir).expect("Failed to create upload dir");

    let detector = detector.map(Arc::new);
    let provider = provider.map(Arc::new);

    let classifier = match &detector {
        Some(detector) => FoodClassifier::new(detector.clone()),
        None => FoodClassifier::unavailable(),
    };
    let generator = match &provider {
        Some(provider) => RecipeGenerator::new(provider.clone(), GenerationParams::default()),
        None => RecipeGenerator::unavailable(),
    };

    let state = AppState {
        config: config.clone(),
        classifier,
        generator,
        upload_dir: upload_dir.clone(),
    };

    let app = Application::build_with_state(config, state)
        .await
        .expect("Failed to build application");
    let address = format!("http://127.0.0.1:{}", app.port());

    tokio::spawn(app.run_until_stopped());

    TestApp {
        address,
        upload_dir,
        client: reqwest::Client::new(),
        detector,
        provider,
    }
}

impl TestApp {
    pub async fn post_file(&self, filename: &str, data: Vec<u8>) -> reqwest::Response {
        let form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(data).file_name(filename.to_string()),
        );
        self.post_form(form).await
    }

    pub async fn post_form(&self, form: multipart::Form) -> reqwest::Response {
        self.client
            .post(format!("{}/predict", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Files left behind in the upload directory.
    pub fn leftover_uploads(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.upload_dir)
            .expect("Failed to read upload dir")
            .map(|entry| entry.expect("Failed to read dir entry").path())
            .collect()
    }

    pub fn generator_calls(&self) -> usize {
        self.provider.as_ref().map_or(0, |p| p.call_count())
    }

    pub fn detector_calls(&self) -> usize {
        self.detector.as_ref().map_or(0, |d| d.call_count())
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}
