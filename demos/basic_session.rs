//! Basic example demonstrating a session against a test-management server.
//!
//! This example shows how to:
//! - Load connection settings from a JSON file
//! - Connect a session (runs the single-sign-on handshake)
//! - Report a test run with steps
//! - Walk a paged query result
//!
//! Run with: `ALM_CONFIG=alm.json cargo run --example basic_session`
//!
//! where `alm.json` looks like
//! `{"server_url": "http://alm:8080/qcbin", "project": "Demo", "user_name": "tester", "password": "secret"}`

use alm_connector::{
    Error, RunStepBuilder, RunStepStatus, Session, SessionConfig, TestRunBuilder,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("alm_connector=debug,basic_session=info")
        .init();

    let path = std::env::var("ALM_CONFIG").unwrap_or_else(|_| "alm.json".to_string());
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| Error::ConfigurationError(format!("Cannot read {}: {}", path, e)))?;
    let config: SessionConfig = serde_json::from_str(&raw)
        .map_err(|e| Error::ConfigurationError(format!("Invalid {}: {}", path, e)))?;
    println!("Using {:?}", config);

    let session = Session::builder().config(config)?.connect().await?;

    println!("=== Server Time ===");
    let zone = session.determine_server_time_zone().await?;
    println!("Server zone: {}", alm_connector::format::format_offset(&zone));
    println!();

    println!("=== Reporting a Run ===");
    let run = TestRunBuilder::new()
        .name("basic_session demo")
        .test_instance_id(1)
        .status("Passed")
        .create();
    let run = session.create_entity(&run).await?;
    println!("Created run {}", run.id()?);

    for (name, status) in [("Open page", RunStepStatus::Passed), ("Log in", RunStepStatus::Passed)] {
        let step = RunStepBuilder::new()
            .test_run_id(run.id()?)
            .name(name)
            .status(status)
            .create();
        let step = session.create_entity(&step).await?;
        println!("  step {} -> {}", step.id()?, status);
    }
    println!();

    println!("=== Paged Query ===");
    let tests = session.query_entities("test", Some("name['*']")).await?;
    println!("{} tests in total", tests.total_count());
    let mut cursor = tests.cursor();
    while let Some(test) = cursor.try_next().await? {
        println!("  {} {}", test.id()?, test.first_value("name").unwrap_or("-"));
    }

    session.logout().await
}
