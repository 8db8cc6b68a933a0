use std::collections::HashSet;

use indexmap::IndexMap;
use regex::Regex;

use super::config::{MorphRelation, SchemaConfig};
use super::error::GqlError;
use super::ext::{Named, NamedContainer};
use super::inflect::Inflector;
use super::resolvers::ResolverKind;
use super::types::{ColumnTypeMapper, ScalarKind};
use crate::cnf::{COUNT_SUFFIX, LONG_NAME_SEPARATOR};
use crate::kvs::{Column, Structure, Table};

/// The type of a planned field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
	/// A column value
	Scalar(ScalarKind),
	/// A single row of the named object type
	Object(String),
	/// A list of rows of the named object type
	List(String),
	/// A row count
	Count,
	/// A single row of any object type, resolved at read time
	Morph,
}

/// The arguments a planned field accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldArgs {
	None,
	/// `pagination`, `order` and `conditions`
	List,
	/// `order` and `conditions`
	Count,
}

/// The metadata attached to a field, from which its resolver recovers
/// everything it needs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldSettings {
	pub table_name: Option<String>,
	pub referencing_column: Option<String>,
	pub referencing_type_column: Option<String>,
	pub morph_relation_definition: Option<MorphRelation>,
	pub column_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPlan {
	pub name: String,
	pub ty: FieldType,
	pub nullable: bool,
	pub args: FieldArgs,
	pub resolver: Option<ResolverKind>,
	pub settings: FieldSettings,
	pub description: Option<String>,
}

impl FieldPlan {
	fn column(column: &Column, kind: ScalarKind) -> Self {
		FieldPlan {
			name: column.name.clone(),
			ty: FieldType::Scalar(kind),
			nullable: column.nullable,
			args: FieldArgs::None,
			resolver: None,
			settings: FieldSettings {
				column_name: Some(column.name.clone()),
				..Default::default()
			},
			description: column.comment.clone(),
		}
	}

	fn list(name: String, object: &str, resolver: ResolverKind, settings: FieldSettings) -> Self {
		FieldPlan {
			name,
			ty: FieldType::List(object.to_owned()),
			nullable: false,
			args: FieldArgs::List,
			resolver: Some(resolver),
			settings,
			description: None,
		}
	}

	fn count(name: String, resolver: ResolverKind, settings: FieldSettings) -> Self {
		FieldPlan {
			name,
			ty: FieldType::Count,
			nullable: false,
			args: FieldArgs::Count,
			resolver: Some(resolver),
			settings,
			description: None,
		}
	}
}

impl Named for FieldPlan {
	fn name(&self) -> &str {
		&self.name
	}
}

/// One object type per exposed table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectPlan {
	pub table: String,
	pub name: String,
	pub fields: Vec<FieldPlan>,
}

impl ObjectPlan {
	pub fn field(&self, name: &str) -> Option<&FieldPlan> {
		self.fields.iter().find(|f| f.name == name)
	}

	fn has_field(&self, name: &str) -> bool {
		self.field(name).is_some()
	}
}

/// The object types and root fields generated from a database structure.
///
/// Building a plan is deterministic: tables are visited in enumeration
/// order, columns in declaration order and relations in the order of the
/// structure's relation maps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemaPlan {
	pub query: Vec<FieldPlan>,
	pub objects: Vec<ObjectPlan>,
}

impl SchemaPlan {
	pub fn build(
		structure: &Structure,
		config: &SchemaConfig,
		mapper: &dyn ColumnTypeMapper,
		inflector: &dyn Inflector,
	) -> Result<Self, GqlError> {
		let strip = config.belongs_to_strip_regex()?;
		let visible: Vec<&Table> = structure
			.tables
			.iter()
			.filter(|t| {
				if !config.is_table_visible(&t.name) {
					trace!("Skipping filtered table: {}", t.name);
					return false;
				}
				if !is_valid_name(&t.name) {
					debug!("Skipping table with a name which is not a valid GraphQL name: {}", t.name);
					return false;
				}
				if visible_columns(config, t).next().is_none() {
					debug!("Skipping table without visible columns: {}", t.name);
					return false;
				}
				true
			})
			.collect();

		let mut plan = SchemaPlan::default();
		// Table name to object type name
		let mut names: IndexMap<String, String> = IndexMap::new();
		let mut used: HashSet<String> = HashSet::new();

		for table in visible.iter() {
			trace!("Adding table: {}", table.name);
			let name = object_name(&table.name, inflector, &used);
			used.insert(name.clone());
			names.insert(table.name.clone(), name.clone());

			let mut object = ObjectPlan {
				table: table.name.clone(),
				name: name.clone(),
				fields: Vec::new(),
			};
			for column in visible_columns(config, table) {
				let kind = if column.primary {
					ScalarKind::Id
				} else {
					mapper.handle(column)
				};
				push_field(&mut object.fields, &name, FieldPlan::column(column, kind));
			}
			plan.objects.push(object);

			let settings = FieldSettings {
				table_name: Some(table.name.clone()),
				..Default::default()
			};
			push_field(
				&mut plan.query,
				"query",
				FieldPlan::list(table.name.clone(), &name, ResolverKind::Table, settings.clone()),
			);
			push_field(
				&mut plan.query,
				"query",
				FieldPlan::count(
					format!("{}{COUNT_SUFFIX}", table.name),
					ResolverKind::TableCount,
					settings,
				),
			);
		}

		for (idx, table) in visible.iter().enumerate() {
			let fields = relation_fields(structure, config, &strip, table, &visible, &names);
			let object = &mut plan.objects[idx];
			for field in fields {
				push_field(&mut object.fields, &object.name, field);
			}
		}

		for relation in config.morph_relations.iter() {
			plan.add_morph_has_many(structure, config, relation, &visible);
		}

		Ok(plan)
	}

	pub fn object(&self, table: &str) -> Option<&ObjectPlan> {
		self.objects.iter().find(|o| o.table == table)
	}

	pub fn has_morph_fields(&self) -> bool {
		self.objects.iter().flat_map(|o| o.fields.iter()).any(|f| f.ty == FieldType::Morph)
	}

	/// Adds the inverse has-many fields of a morph relation to its target tables
	fn add_morph_has_many(
		&mut self,
		structure: &Structure,
		config: &SchemaConfig,
		relation: &MorphRelation,
		visible: &[&Table],
	) {
		let Some(owning) = morph_owner(structure, config, relation, visible) else {
			return;
		};
		let Some(owning_name) = self.object(&owning.name).map(|o| o.name.clone()) else {
			return;
		};
		let long = format!("{}{LONG_NAME_SEPARATOR}{}", relation.table, relation.id_column);
		for object in self.objects.iter_mut() {
			if !relation.targets.is_empty() && !relation.targets.contains_name(&object.table) {
				continue;
			}
			let short_taken = object.has_field(&relation.table)
				|| object.has_field(&format!("{}{COUNT_SUFFIX}", relation.table));
			let name = if config.forced_has_many_long_name || short_taken {
				long.clone()
			} else {
				relation.table.clone()
			};
			let settings = FieldSettings {
				table_name: Some(relation.table.clone()),
				referencing_column: Some(relation.id_column.clone()),
				referencing_type_column: Some(relation.type_column.clone()),
				..Default::default()
			};
			let object_name = object.name.clone();
			push_field(
				&mut object.fields,
				&object_name,
				FieldPlan::list(name.clone(), &owning_name, ResolverKind::HasMany, settings.clone()),
			);
			push_field(
				&mut object.fields,
				&object_name,
				FieldPlan::count(
					format!("{name}{COUNT_SUFFIX}"),
					ResolverKind::HasManyCount,
					settings,
				),
			);
		}
	}
}

/// The belongs-to, morph-to and has-many fields of a table
fn relation_fields(
	structure: &Structure,
	config: &SchemaConfig,
	strip: &Regex,
	table: &Table,
	visible: &[&Table],
	names: &IndexMap<String, String>,
) -> Vec<FieldPlan> {
	let mut fields = Vec::new();

	for (column_name, target) in table.belongs_to.iter() {
		let Some(column) = visible_column(config, table, column_name) else {
			trace!("Skipping belongs-to of filtered column: {}.{column_name}", table.name);
			continue;
		};
		let Some(object) = names.get(target) else {
			trace!("Skipping belongs-to of filtered table: {target}");
			continue;
		};
		let mut name = strip.replace(column_name, "").into_owned();
		if !is_valid_name(&name) {
			name = column_name.clone();
		}
		fields.push(FieldPlan {
			name,
			ty: FieldType::Object(object.clone()),
			nullable: column.nullable,
			args: FieldArgs::None,
			resolver: Some(ResolverKind::BelongsTo),
			settings: FieldSettings {
				table_name: Some(target.clone()),
				referencing_column: Some(column_name.clone()),
				..Default::default()
			},
			description: None,
		});
	}

	for relation in config.morph_relations.iter().filter(|r| r.table == table.name) {
		if morph_owner(structure, config, relation, visible).is_none() {
			trace!("Skipping morph-to of filtered columns: {}", relation.relation_name);
			continue;
		}
		let nullable = table.column(&relation.id_column).is_none_or(|c| c.nullable);
		fields.push(FieldPlan {
			name: relation.relation_name.clone(),
			ty: FieldType::Morph,
			nullable,
			args: FieldArgs::None,
			resolver: Some(ResolverKind::MorphTo),
			settings: FieldSettings {
				morph_relation_definition: Some(relation.clone()),
				..Default::default()
			},
			description: None,
		});
	}

	for (related, columns) in table.has_many.iter() {
		let Some(object) = names.get(related) else {
			trace!("Skipping has-many of filtered table: {related}");
			continue;
		};
		let Some(related_table) = structure.table(related) else {
			continue;
		};
		for column in columns {
			if visible_column(config, related_table, column).is_none() {
				trace!("Skipping has-many of filtered column: {related}.{column}");
				continue;
			}
			let name = if config.forced_has_many_long_name || columns.len() > 1 {
				format!("{related}{LONG_NAME_SEPARATOR}{column}")
			} else {
				related.clone()
			};
			let settings = FieldSettings {
				table_name: Some(related.clone()),
				referencing_column: Some(column.clone()),
				..Default::default()
			};
			fields.push(FieldPlan::list(
				name.clone(),
				object,
				ResolverKind::HasMany,
				settings.clone(),
			));
			fields.push(FieldPlan::count(
				format!("{name}{COUNT_SUFFIX}"),
				ResolverKind::HasManyCount,
				settings,
			));
		}
	}

	fields
}

/// The owning table of a morph relation, when it and both of its columns are exposed
fn morph_owner<'a>(
	structure: &'a Structure,
	config: &SchemaConfig,
	relation: &MorphRelation,
	visible: &[&Table],
) -> Option<&'a Table> {
	if !visible.contains_name(&relation.table) {
		return None;
	}
	let table = structure.table(&relation.table)?;
	visible_column(config, table, &relation.id_column)?;
	visible_column(config, table, &relation.type_column)?;
	Some(table)
}

fn visible_columns<'a>(
	config: &'a SchemaConfig,
	table: &'a Table,
) -> impl Iterator<Item = &'a Column> + 'a {
	table.columns.iter().filter(move |c| {
		config.is_column_visible(&table.name, &c.name) && is_valid_name(&c.name)
	})
}

fn visible_column<'a>(config: &SchemaConfig, table: &'a Table, name: &str) -> Option<&'a Column> {
	table.column(name).filter(|c| config.is_column_visible(&table.name, &c.name))
}

/// The object type name of a table, its first singular candidate unless
/// that name is already taken by another table
fn object_name(table: &str, inflector: &dyn Inflector, used: &HashSet<String>) -> String {
	match inflector.singularize(table).into_iter().next() {
		Some(name) if is_valid_name(&name) && !used.contains(&name) => name,
		_ => table.to_owned(),
	}
}

fn push_field(fields: &mut Vec<FieldPlan>, object: &str, field: FieldPlan) {
	if fields.contains_name(&field.name) {
		debug!("Skipping duplicate field {} on {object}", field.name);
		return;
	}
	fields.push(field);
}

/// Whether a name matches `[_A-Za-z][_0-9A-Za-z]*`, the GraphQL name grammar
fn is_valid_name(name: &str) -> bool {
	let mut chars = name.chars();
	match chars.next() {
		Some(c) if c == '_' || c.is_ascii_alphabetic() => {
			chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
		}
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gql::inflect::EnglishInflector;
	use crate::gql::types::NativeTypeMap;

	fn structure() -> Structure {
		Structure::from_tables(vec![
			Table::new("categories")
				.with_column(Column::new("id", "INTEGER").primary())
				.with_column(Column::new("name", "VARCHAR").with_comment("Display name")),
			Table::new("comments")
				.with_column(Column::new("id", "INTEGER").primary())
				.with_column(Column::new("commentable_id", "INTEGER"))
				.with_column(Column::new("commentable_type", "VARCHAR"))
				.with_column(Column::new("body", "TEXT")),
			Table::new("products")
				.with_column(Column::new("id", "INTEGER").primary())
				.with_column(Column::new("category_id", "INTEGER").nullable())
				.with_column(Column::new("name", "VARCHAR"))
				.with_column(Column::new("price", "DECIMAL"))
				.with_belongs_to("category_id", "categories"),
		])
	}

	fn plan(config: &SchemaConfig) -> SchemaPlan {
		SchemaPlan::build(&structure(), config, &NativeTypeMap, &EnglishInflector).unwrap()
	}

	fn field_names(object: &ObjectPlan) -> Vec<&str> {
		object.fields.iter().map(|f| f.name.as_str()).collect()
	}

	#[test]
	fn plans_objects_and_root_fields() {
		let plan = plan(&SchemaConfig::default());
		let names: Vec<_> = plan.objects.iter().map(|o| o.name.as_str()).collect();
		assert_eq!(names, vec!["category", "comment", "product"]);
		let query: Vec<_> = plan.query.iter().map(|f| f.name.as_str()).collect();
		assert_eq!(
			query,
			vec![
				"categories",
				"categories_count",
				"comments",
				"comments_count",
				"products",
				"products_count"
			]
		);
		let product = plan.object("products").unwrap();
		assert_eq!(
			field_names(product),
			vec!["id", "category_id", "name", "price", "category"]
		);
		assert_eq!(product.field("id").unwrap().ty, FieldType::Scalar(ScalarKind::Id));
		assert_eq!(product.field("price").unwrap().ty, FieldType::Scalar(ScalarKind::Float));
		let category = plan.object("categories").unwrap();
		assert_eq!(category.field("name").unwrap().description.as_deref(), Some("Display name"));
	}

	#[test]
	fn names_belongs_to_by_stripping_the_suffix() {
		let plan = plan(&SchemaConfig::default());
		let field = plan.object("products").unwrap().field("category").unwrap();
		assert_eq!(field.ty, FieldType::Object("category".to_owned()));
		assert!(field.nullable);
		assert_eq!(field.resolver, Some(ResolverKind::BelongsTo));
		assert_eq!(field.settings.table_name.as_deref(), Some("categories"));
		assert_eq!(field.settings.referencing_column.as_deref(), Some("category_id"));
	}

	#[test]
	fn names_has_many_long_or_short() {
		let long = plan(&SchemaConfig::default());
		let category = long.object("categories").unwrap();
		assert_eq!(
			field_names(category),
			vec!["id", "name", "products__category_id", "products__category_id_count"]
		);
		let short = plan(&SchemaConfig::default().with_forced_has_many_long_name(false));
		let category = short.object("categories").unwrap();
		assert_eq!(field_names(category), vec!["id", "name", "products", "products_count"]);
		let field = category.field("products_count").unwrap();
		assert_eq!(field.ty, FieldType::Count);
		assert_eq!(field.args, FieldArgs::Count);
		assert_eq!(field.resolver, Some(ResolverKind::HasManyCount));
	}

	#[test]
	fn filtered_edges_are_dropped() {
		let config = SchemaConfig::default().with_except_tables(["categories"]);
		let without_table = plan(&config);
		assert!(without_table.object("categories").is_none());
		assert!(without_table.object("products").unwrap().field("category").is_none());

		let config = SchemaConfig::default().with_only_columns("products", ["id", "name"]);
		let without_column = plan(&config);
		assert_eq!(field_names(without_column.object("products").unwrap()), vec!["id", "name"]);
		assert_eq!(field_names(without_column.object("categories").unwrap()), vec!["id", "name"]);
	}

	#[test]
	fn plans_morph_relations() {
		let config = SchemaConfig::default()
			.with_forced_has_many_long_name(false)
			.with_morph_relation(
				MorphRelation::new("comments", "commentable_id", "commentable_type", "commentable")
					.with_targets(["products"]),
			);
		let plan = plan(&config);
		assert!(plan.has_morph_fields());
		let comment = plan.object("comments").unwrap();
		let field = comment.field("commentable").unwrap();
		assert_eq!(field.ty, FieldType::Morph);
		assert!(!field.nullable);
		assert_eq!(field.resolver, Some(ResolverKind::MorphTo));
		let product = plan.object("products").unwrap();
		let field = product.field("comments").unwrap();
		assert_eq!(field.ty, FieldType::List("comment".to_owned()));
		assert_eq!(field.settings.referencing_type_column.as_deref(), Some("commentable_type"));
		assert!(product.field("comments_count").is_some());
		assert!(plan.object("categories").unwrap().field("comments").is_none());
	}

	#[test]
	fn morph_relations_with_hidden_columns_are_skipped() {
		let config = SchemaConfig::default()
			.with_except_columns("comments", ["commentable_type"])
			.with_morph_relation(MorphRelation::new(
				"comments",
				"commentable_id",
				"commentable_type",
				"commentable",
			));
		let plan = plan(&config);
		assert!(!plan.has_morph_fields());
		assert!(plan.object("products").unwrap().field("comments__commentable_id").is_none());
	}

	#[test]
	fn first_field_wins() {
		let structure = Structure::from_tables(vec![
			Table::new("categories").with_column(Column::new("id", "INTEGER").primary()),
			Table::new("products")
				.with_column(Column::new("id", "INTEGER").primary())
				.with_column(Column::new("category", "INTEGER"))
				.with_belongs_to("category", "categories"),
		]);
		let config = SchemaConfig::default().with_belongs_to_strip_pattern("_id$");
		let plan =
			SchemaPlan::build(&structure, &config, &NativeTypeMap, &EnglishInflector).unwrap();
		let field = plan.object("products").unwrap().field("category").unwrap();
		assert_eq!(field.ty, FieldType::Scalar(ScalarKind::Int));
	}

	#[test]
	fn plan_is_deterministic() {
		let config = SchemaConfig::default().with_morph_relation(MorphRelation::new(
			"comments",
			"commentable_id",
			"commentable_type",
			"commentable",
		));
		assert_eq!(plan(&config), plan(&config));
	}

	#[test]
	fn validates_names() {
		assert!(is_valid_name("order_product"));
		assert!(is_valid_name("_private"));
		assert!(!is_valid_name("2fa"));
		assert!(!is_valid_name("with space"));
		assert!(!is_valid_name(""));
	}
}
