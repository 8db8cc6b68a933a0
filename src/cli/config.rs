use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use sqlgraph_core::gql::SchemaConfig;

/// Loads the schema configuration from a TOML file, or the default
/// configuration when no file is given
pub fn load(path: Option<&Path>) -> Result<SchemaConfig> {
	let Some(path) = path else {
		debug!("No configuration file given, using the default configuration");
		return Ok(SchemaConfig::default());
	};
	let text = fs::read_to_string(path)
		.with_context(|| format!("Failed to read the configuration file {}", path.display()))?;
	let config = parse(&text)
		.with_context(|| format!("Invalid configuration file {}", path.display()))?;
	// Fail early on patterns which would only be rejected once the schema is generated
	config.belongs_to_strip_regex()?;
	Ok(config)
}

pub fn parse(text: &str) -> Result<SchemaConfig> {
	Ok(toml::from_str(text)?)
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	#[test]
	fn loads_a_toml_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
			except_tables = ["migrations"]
			forced_has_many_long_name = false

			[only_columns]
			users = ["id", "name"]

			[[morph_relations]]
			table = "comments"
			id_column = "commentable_id"
			type_column = "commentable_type"
			relation_name = "commentable"
			targets = ["products"]
			"#
		)
		.unwrap();
		let config = load(Some(file.path())).unwrap();
		assert_eq!(config.except_tables, vec!["migrations"]);
		assert!(!config.forced_has_many_long_name);
		assert_eq!(config.only_columns["users"], vec!["id", "name"]);
		assert_eq!(config.morph_relations[0].targets, vec!["products"]);
		assert_eq!(config.belongs_to_strip_pattern, "_[^_]*$");
	}

	#[test]
	fn rejects_unknown_keys_and_bad_patterns() {
		assert!(parse("excluded_tables = []").is_err());
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "belongs_to_strip_pattern = \"(\"").unwrap();
		assert!(load(Some(file.path())).is_err());
	}

	#[test]
	fn defaults_without_a_file() {
		assert_eq!(load(None).unwrap(), SchemaConfig::default());
	}
}
