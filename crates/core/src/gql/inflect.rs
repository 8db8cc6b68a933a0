use inflector::Inflector as _;

/// Derives object type names from table names.
pub trait Inflector: Send + Sync {
	/// Returns the singular candidates of a word, most likely first
	fn singularize(&self, word: &str) -> Vec<String>;
}

/// English singularization rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnglishInflector;

impl Inflector for EnglishInflector {
	fn singularize(&self, word: &str) -> Vec<String> {
		if word.is_empty() {
			return Vec::new();
		}
		vec![word.to_singular()]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn singularizes_table_names() {
		let inflector = EnglishInflector;
		assert_eq!(inflector.singularize("categories"), vec!["category"]);
		assert_eq!(inflector.singularize("products"), vec!["product"]);
		assert!(inflector.singularize("").is_empty());
	}
}
