//! `codeflow serve`: start the HTTP gateway.

use codeflow_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("codeflow gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Default model: {}", config.default_model);
    println!("   Sandbox backend: {:?}", config.sandbox.backend);

    codeflow_gateway::start(config).await?;

    Ok(())
}
