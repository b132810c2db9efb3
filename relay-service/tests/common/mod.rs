use relay_service::config::{AnalyticsConfig, Config, ServerConfig};
use relay_service::startup::Application;
use secrecy::Secret;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct TestApp {
    pub address: String,
    pub sink: MockServer,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(Some("test_write_key".to_string())).await
    }

    pub async fn spawn_without_write_key() -> Self {
        Self::spawn_with(None).await
    }

    async fn spawn_with(write_key: Option<String>) -> Self {
        let sink = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/batch"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&sink)
            .await;

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            analytics: AnalyticsConfig {
                write_key: write_key.map(Secret::new),
                api_base_url: sink.uri(),
                flush_interval_ms: 50, // Fast flush so tests can observe delivery
            },
            user_id_field: "user_id".to_string(),
            service_name: "relay-service-test".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections.
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address, sink }
    }

    /// Track events the mock sink has received so far, flattened out of
    /// their batches.
    pub async fn received_track_events(&self) -> Vec<serde_json::Value> {
        let requests = self.sink.received_requests().await.unwrap_or_default();

        requests
            .iter()
            .filter_map(|request| serde_json::from_slice::<serde_json::Value>(&request.body).ok())
            .flat_map(|body| body["batch"].as_array().cloned().unwrap_or_default())
            .collect()
    }

    /// Poll the mock sink until it has seen `count` track events.
    pub async fn wait_for_track_events(&self, count: usize) -> Vec<serde_json::Value> {
        for _ in 0..100 {
            let events = self.received_track_events().await;
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        panic!("Timed out waiting for {} track events", count);
    }
}
