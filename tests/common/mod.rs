#![allow(dead_code)]

use board_server::configuration::{get_configuration, DatabaseSettings, Settings};
use board_server::startup::run;
use board_server::telemetry::try_init_telemetry;
use reqwest::Response;
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::net::TcpListener;

pub const PASSWORD: &str = "SecurePass123";

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub settings: Settings,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Start the server on a random port against a fresh database
pub async fn spawn_app_with(configure: impl FnOnce(&mut Settings)) -> TestApp {
    try_init_telemetry();

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();
    configuration.application.base_url = address.clone();
    configuration.cookie.secure = false;
    // nothing listens here; delivery failures are only logged
    configuration.email_client.base_url = "http://127.0.0.1:1".to_string();
    configuration.email_client.timeout_milliseconds = 200;
    configure(&mut configuration);

    let connection_pool = configure_database(&configuration.database).await;

    let server = run(listener, connection_pool.clone(), configuration.clone())
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool: connection_pool,
        settings: configuration,
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

/// A browser-like client that keeps the token cookies between requests
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to build client")
}

pub fn cookie_value(response: &Response, name: &str) -> Option<String> {
    response
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, client: &reqwest::Client, username: &str) -> Response {
        client
            .post(self.url("/api/v1/accounts/users"))
            .json(&json!({
                "username": username,
                "fullname": "Tester",
                "email": format!("{}@example.com", username),
                "password": PASSWORD,
            }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn login(&self, client: &reqwest::Client, username: &str, password: &str) -> Response {
        client
            .post(self.url("/api/v1/accounts/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Register `username` and return a client logged in as that user
    pub async fn logged_in(&self, username: &str) -> reqwest::Client {
        let client = browser();
        assert_eq!(self.register(&client, username).await.status().as_u16(), 201);
        assert_eq!(self.login(&client, username, PASSWORD).await.status().as_u16(), 200);
        client
    }

    pub async fn create_post(&self, client: &reqwest::Client, title: &str) -> Value {
        let response = client
            .post(self.url("/api/v1/boards/posts"))
            .json(&json!({ "title": title, "contents": "Some contents" }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.expect("Failed to parse response")
    }

    pub async fn create_comment(&self, client: &reqwest::Client, board: i64, contents: &str) -> Value {
        let response = client
            .post(self.url("/api/v1/boards/comments"))
            .json(&json!({ "board": board, "contents": contents }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.expect("Failed to parse response")
    }
}
