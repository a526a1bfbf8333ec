// Serializer for the loader configuration file

use super::LoaderConfig;
use crate::bundler::error::ConfigError;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Top-level keys that start their own block, separated by a blank line
const BLOCK_KEYS: &[&str] = &["meta", "depCache", "map", "packages", "bundles"];

/// Render the configuration as `System.config(<json>);\n`
///
/// The object is pretty-printed with `tab` as the indentation unit. Top-level
/// keys that are plain identifiers lose their quotes, and the block keys get a
/// blank line in front of them.
pub fn render_config(config: &LoaderConfig, tab: &str) -> Result<String, ConfigError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(tab.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    Value::Object(config.entries().clone())
        .serialize(&mut serializer)
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

    let json = String::from_utf8(buf).map_err(|e| ConfigError::Invalid(e.to_string()))?;

    let indent = regex::escape(tab);
    let blocks = Regex::new(&format!(r#"(?m)^{indent}"({})""#, BLOCK_KEYS.join("|")))
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    let identifiers = Regex::new(&format!(r#"(?m)^{indent}"(\w+)""#))
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

    let replacement_tab = tab.replace('$', "$$");
    let json = blocks.replace_all(&json, format!("\n{replacement_tab}${{1}}"));
    let json = identifiers.replace_all(&json, format!("{replacement_tab}${{1}}"));

    Ok(format!("System.config({json});\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> LoaderConfig {
        let Value::Object(entries) = json!({
            "baseURL": "/",
            "paths": {"npm:*": "jspm_packages/npm/*"},
            "map": {"lodash": "npm:lodash@4.17.4"},
            "bundles": {"bundles/header": ["components/header/index.js"]}
        }) else {
            unreachable!()
        };
        LoaderConfig::from_entries(entries)
    }

    #[test]
    fn renders_config_call_with_blocks() {
        let text = render_config(&sample(), "  ").unwrap();

        assert!(text.starts_with("System.config({\n  baseURL: \"/\",\n  paths: {\n"));
        assert!(text.contains("\n\n  map: {\n    \"lodash\": \"npm:lodash@4.17.4\"\n  },"));
        assert!(text.contains("\n\n  bundles: {\n    \"bundles/header\": [\n"));
        assert!(text.ends_with("});\n"));
        // nested keys stay quoted
        assert!(text.contains("\"npm:*\": \"jspm_packages/npm/*\""));
        assert!(!text.contains("\n\n  paths"));
    }

    #[test]
    fn renders_with_tab_indent() {
        let text = render_config(&sample(), "\t").unwrap();
        assert!(text.contains("\n\tbaseURL: \"/\""));
        assert!(text.contains("\n\n\tmap: {\n\t\t\"lodash\""));
    }

    #[test]
    fn round_trip_through_parser() {
        let config = sample();
        let text = render_config(&config, "  ").unwrap();
        let reparsed = LoaderConfig::parse(&text).unwrap();
        assert_eq!(reparsed, config);
    }
}
