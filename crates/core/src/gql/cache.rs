use tokio::sync::RwLock;

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use async_graphql::dynamic::Schema;

use super::error::GqlError;
use super::schema::SchemaGenerator;

/// Decides when a cached schema has to be generated again.
#[async_trait::async_trait]
pub trait Invalidator: Debug + Clone + Send + Sync + 'static {
	type MetaData: Debug + Clone + Send + Sync;

	fn is_valid(generator: &SchemaGenerator, meta: &Self::MetaData) -> bool;

	async fn generate(generator: &SchemaGenerator) -> Result<(Schema, Self::MetaData), GqlError>;
}

/// Generates the schema on every request.
#[derive(Debug, Clone, Copy)]
pub struct Pessimistic;

#[async_trait::async_trait]
impl Invalidator for Pessimistic {
	type MetaData = ();

	fn is_valid(_generator: &SchemaGenerator, _meta: &Self::MetaData) -> bool {
		false
	}

	async fn generate(generator: &SchemaGenerator) -> Result<(Schema, Self::MetaData), GqlError> {
		let schema = generator.generate()?;
		Ok((schema, ()))
	}
}

/// Generates the schema once, until the cache is invalidated explicitly.
#[derive(Debug, Clone, Copy)]
pub struct Optimistic;

#[async_trait::async_trait]
impl Invalidator for Optimistic {
	type MetaData = ();

	fn is_valid(_generator: &SchemaGenerator, _meta: &Self::MetaData) -> bool {
		true
	}

	async fn generate(generator: &SchemaGenerator) -> Result<(Schema, Self::MetaData), GqlError> {
		let schema = generator.generate()?;
		Ok((schema, ()))
	}
}

/// Generates the schema again whenever the schema version of the database
/// differs from the one the cached schema was generated at.
#[derive(Debug, Clone, Copy)]
pub struct Fingerprint;

#[async_trait::async_trait]
impl Invalidator for Fingerprint {
	type MetaData = i64;

	fn is_valid(generator: &SchemaGenerator, meta: &Self::MetaData) -> bool {
		match generator.datastore().schema_version() {
			Ok(version) => version == *meta,
			Err(e) => {
				debug!("Failed to read the schema version, invalidating the schema: {e}");
				false
			}
		}
	}

	async fn generate(generator: &SchemaGenerator) -> Result<(Schema, Self::MetaData), GqlError> {
		// Read before introspecting so a concurrent change is never missed
		let version = generator.datastore().schema_version()?;
		let schema = generator.generate()?;
		Ok((schema, version))
	}
}

#[derive(Clone)]
pub struct SchemaCache<I: Invalidator = Pessimistic> {
	inner: Arc<RwLock<Option<(Schema, I::MetaData)>>>,
	pub generator: SchemaGenerator,
	_invalidator: PhantomData<I>,
}

impl<I: Invalidator + Debug> Debug for SchemaCache<I> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SchemaCache")
			.field("config", self.generator.config())
			.field("_invalidator", &self._invalidator)
			.finish()
	}
}

impl<I: Invalidator> SchemaCache<I> {
	pub fn new(generator: SchemaGenerator) -> Self {
		SchemaCache {
			inner: Default::default(),
			generator,
			_invalidator: PhantomData,
		}
	}

	pub async fn get_schema(&self) -> Result<Schema, GqlError> {
		{
			let guard = self.inner.read().await;
			if let Some(cand) = guard.as_ref() {
				if I::is_valid(&self.generator, &cand.1) {
					return Ok(cand.0.clone());
				}
			}
		};

		trace!("Generating schema");
		let (schema, meta) = I::generate(&self.generator).await?;

		{
			let mut guard = self.inner.write().await;
			*guard = Some((schema.clone(), meta));
		}

		Ok(schema)
	}

	/// Drops the cached schema, the next request generates it again
	pub async fn invalidate(&self) {
		self.inner.write().await.take();
	}
}
