//! Client configuration compiled into the frontend.

use shared::ClientConfig;

const EMBEDDED_CONFIG: &str = include_str!("../client_config.toml");

/// Parse the embedded `client_config.toml`, falling back to defaults.
pub fn load_client_config() -> ClientConfig {
    parse_client_config(EMBEDDED_CONFIG)
}

fn parse_client_config(text: &str) -> ClientConfig {
    match ClientConfig::from_toml_str(text) {
        Ok(config) => {
            zoon::println!(
                "Client config loaded: api='{}', debounce={}ms, initial window={}",
                config.api.base_url,
                config.range_selector.debounce_ms,
                config.range_selector.initial_window
            );
            config
        }
        Err(error) => {
            zoon::eprintln!("Invalid client_config.toml, using defaults: {}", error);
            ClientConfig::default().normalized()
        }
    }
}
