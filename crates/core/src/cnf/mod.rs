use std::sync::LazyLock;

/// The prefix which marks a condition value as a raw SQL literal.
///
/// Literal values are only accepted when resolvers run in first-party mode.
pub const LITERAL_PREFIX: &str = "LITERAL:";

/// The default pattern which is removed from a foreign key column name
/// to derive the name of its belongs-to field (`category_id` becomes `category`).
pub const DEFAULT_BELONGS_TO_STRIP_PATTERN: &str = "_[^_]*$";

/// The name of the union type over all table object types, used by morph-to fields.
pub const MORPH_UNION_NAME: &str = "_morph_target";

/// The name of the root query object type.
pub const QUERY_TYPE_NAME: &str = "Query";

/// The suffix appended to count field names.
pub const COUNT_SUFFIX: &str = "_count";

/// The separator between a table name and a column name in long has-many field names.
pub const LONG_NAME_SEPARATOR: &str = "__";

/// Specifies how deeply condition trees may be nested before compilation is rejected.
pub static MAX_CONDITION_DEPTH: LazyLock<usize> =
	lazy_env_parse!("SQLGRAPH_MAX_CONDITION_DEPTH", usize, 32);

/// Specifies how long, in milliseconds, the SQLite driver waits on a locked database.
pub static SQLITE_BUSY_TIMEOUT: LazyLock<u64> =
	lazy_env_parse!("SQLGRAPH_SQLITE_BUSY_TIMEOUT", u64, 5000);
