use std::sync::Arc;

use async_graphql::ErrorExtensions;
use async_graphql::dynamic::{
	Field, FieldFuture, FieldValue, Object, ResolverContext, Schema, TypeRef, Union,
};

use super::args::{QueryArgs, count_arguments, input_types, list_arguments};
use super::config::SchemaConfig;
use super::error::{GqlError, internal_error, schema_error};
use super::inflect::{EnglishInflector, Inflector};
use super::resolvers::{Resolved, ResolverFactory, ResolverKind};
use super::tables::{FieldArgs, FieldPlan, FieldType, SchemaPlan};
use super::types::{ColumnTypeMapper, NativeTypeMap, ScalarKind, to_gql_value};
use crate::cnf::{MORPH_UNION_NAME, QUERY_TYPE_NAME};
use crate::kvs::{Datastore, Record, Structure};
use crate::obs::QueryLog;

/// Generates the schema of a datastore with the default type mapping and
/// inflection rules.
pub fn generate_schema(
	datastore: &Arc<dyn Datastore>,
	config: &SchemaConfig,
	first_party: bool,
) -> Result<Schema, GqlError> {
	SchemaGenerator::new(datastore.clone(), config.clone()).with_first_party(first_party).generate()
}

/// Builds a GraphQL schema from the structure of a datastore.
///
/// Generation happens in two steps. The structure is first turned into a
/// [`SchemaPlan`], a plain description of the object types and fields to
/// generate, which is then lowered into an executable schema with the
/// resolvers of every relation field bound to it.
#[derive(Clone)]
pub struct SchemaGenerator {
	datastore: Arc<dyn Datastore>,
	config: SchemaConfig,
	first_party: bool,
	mapper: Arc<dyn ColumnTypeMapper>,
	inflector: Arc<dyn Inflector>,
	log: Option<QueryLog>,
}

impl SchemaGenerator {
	pub fn new(datastore: Arc<dyn Datastore>, config: SchemaConfig) -> Self {
		SchemaGenerator {
			datastore,
			config,
			first_party: false,
			mapper: Arc::new(NativeTypeMap),
			inflector: Arc::new(EnglishInflector),
			log: None,
		}
	}

	/// Trusts the callers of the schema with raw column names and literal values
	pub fn with_first_party(self, first_party: bool) -> Self {
		SchemaGenerator {
			first_party,
			..self
		}
	}

	pub fn with_type_mapper(self, mapper: impl ColumnTypeMapper + 'static) -> Self {
		SchemaGenerator {
			mapper: Arc::new(mapper),
			..self
		}
	}

	pub fn with_inflector(self, inflector: impl Inflector + 'static) -> Self {
		SchemaGenerator {
			inflector: Arc::new(inflector),
			..self
		}
	}

	/// Records every statement executed by the schema in the given log,
	/// unless a log is attached to the request data
	pub fn with_query_log(self, log: QueryLog) -> Self {
		SchemaGenerator {
			log: Some(log),
			..self
		}
	}

	pub fn config(&self) -> &SchemaConfig {
		&self.config
	}

	pub fn datastore(&self) -> &Arc<dyn Datastore> {
		&self.datastore
	}

	/// Introspects the datastore and plans the schema
	pub fn plan(&self) -> Result<SchemaPlan, GqlError> {
		let structure = self.datastore.structure()?;
		self.plan_structure(&structure)
	}

	/// Plans the schema of an already introspected structure
	pub fn plan_structure(&self, structure: &Structure) -> Result<SchemaPlan, GqlError> {
		trace!("Planning schema for {} tables", structure.tables.len());
		SchemaPlan::build(structure, &self.config, self.mapper.as_ref(), self.inflector.as_ref())
	}

	pub fn generate(&self) -> Result<Schema, GqlError> {
		let plan = self.plan()?;
		self.lower(&plan)
	}

	/// Lowers a plan into an executable schema
	pub fn lower(&self, plan: &SchemaPlan) -> Result<Schema, GqlError> {
		if plan.objects.is_empty() {
			return Err(schema_error("no tables found in database"));
		}

		let mut factory = ResolverFactory::new(self.datastore.clone(), self.first_party)
			.with_type_names(plan.objects.iter().map(|o| (o.table.clone(), o.name.clone())));
		if let Some(log) = &self.log {
			factory = factory.with_query_log(log.clone());
		}

		let mut query = Object::new(QUERY_TYPE_NAME);
		for field in plan.query.iter() {
			query = query.field(lower_field(field, &factory));
		}

		let mut schema = Schema::build(QUERY_TYPE_NAME, None, None).register(query);
		for object in plan.objects.iter() {
			trace!("Adding object type {} for table {}", object.name, object.table);
			let mut ty = Object::new(&object.name);
			for field in object.fields.iter() {
				ty = ty.field(lower_field(field, &factory));
			}
			schema = schema.register(ty);
		}

		if plan.has_morph_fields() {
			let union = plan
				.objects
				.iter()
				.fold(Union::new(MORPH_UNION_NAME), |u, o| u.possible_type(&o.name));
			schema = schema.register(union);
		}

		for ty in input_types() {
			schema = schema.register(ty);
		}

		schema
			.finish()
			.map_err(|e| schema_error(format!("there was an error generating schema: {e:?}")))
	}
}

fn type_ref(field: &FieldPlan) -> TypeRef {
	let name = match &field.ty {
		FieldType::Scalar(kind) => kind.type_name().to_owned(),
		FieldType::Object(name) => name.clone(),
		FieldType::List(name) => return TypeRef::named_nn_list_nn(name),
		FieldType::Count => return TypeRef::named_nn(TypeRef::INT),
		FieldType::Morph => MORPH_UNION_NAME.to_owned(),
	};
	if field.nullable {
		TypeRef::named(name)
	} else {
		TypeRef::named_nn(name)
	}
}

fn lower_field(plan: &FieldPlan, factory: &ResolverFactory) -> Field {
	let ty = type_ref(plan);
	let mut field = match (plan.resolver, &plan.ty) {
		(Some(kind), _) => {
			Field::new(&plan.name, ty, make_relation_resolver(kind, plan, factory.clone()))
		}
		(None, FieldType::Scalar(kind)) => {
			let column = plan.settings.column_name.clone().unwrap_or_else(|| plan.name.clone());
			Field::new(&plan.name, ty, make_column_resolver(column, *kind))
		}
		(None, ty) => {
			let msg = format!("field {} of type {ty:?} has no resolver", plan.name);
			Field::new(&plan.name, type_ref(plan), move |_| {
				let msg = msg.clone();
				FieldFuture::new(async move {
					Err::<Option<FieldValue>, _>(internal_error(msg).extend())
				})
			})
		}
	};
	let arguments = match plan.args {
		FieldArgs::None => Vec::new(),
		FieldArgs::List => list_arguments(),
		FieldArgs::Count => count_arguments(),
	};
	for argument in arguments {
		field = field.argument(argument);
	}
	if let Some(description) = &plan.description {
		field = field.description(description);
	}
	field
}

fn make_column_resolver(
	column: String,
	kind: ScalarKind,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
	move |ctx: ResolverContext| {
		let column = column.clone();
		FieldFuture::new(async move {
			let record = ctx
				.parent_value
				.try_downcast_ref::<Record>()
				.map_err(|_| internal_error("failed to downcast").extend())?;
			match record.get(&column) {
				None => Ok(None),
				Some(value) if value.is_null() => Ok(None),
				Some(value) => {
					let out = to_gql_value(value, kind).map_err(|e| e.extend())?;
					Ok(Some(FieldValue::value(out)))
				}
			}
		})
	}
}

fn make_relation_resolver(
	kind: ResolverKind,
	plan: &FieldPlan,
	factory: ResolverFactory,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
	let settings = Arc::new(plan.settings.clone());
	move |ctx: ResolverContext| {
		let settings = settings.clone();
		let factory = factory.clone();
		FieldFuture::new(async move {
			let args = QueryArgs::from_args(ctx.args.as_index_map()).map_err(|e| e.extend())?;
			trace!("Resolving {kind:?} with args: {args:?}");
			let parent = if kind.needs_parent() {
				let record = ctx
					.parent_value
					.try_downcast_ref::<Record>()
					.map_err(|_| internal_error("failed to downcast").extend())?;
				Some(record)
			} else {
				None
			};
			let log = ctx.ctx.data_opt::<QueryLog>();
			let resolved =
				factory.resolve(kind, parent, &args, &settings, log).map_err(|e| e.extend())?;
			Ok(match resolved {
				Resolved::Rows(rows) => {
					Some(FieldValue::list(rows.into_iter().map(FieldValue::owned_any)))
				}
				Resolved::Row(row) => row.map(FieldValue::owned_any),
				Resolved::Tagged(row) => {
					row.map(|(name, row)| FieldValue::owned_any(row).with_type(name))
				}
				Resolved::Count(count) => Some(FieldValue::value(count)),
			})
		})
	}
}
