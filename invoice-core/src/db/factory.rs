use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::repository::{InvoiceRepository, RepositoryError};

/// Which backend to open, and where.
///
/// For `sqlite` the connection string is a database file such as
/// `invoices.db`, or `:memory:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// Opens invoice repositories for one storage backend.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Returns a repository whose schema is ready for use.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn InvoiceRepository>, RepositoryError>;
}

/// Backends compiled into the binary, looked up by [`DbConfig::backend`].
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A later factory with the same name replaces the earlier one.
    pub fn register(
        &mut self,
        factory: Box<dyn RepositoryFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Sorted backend names, as listed in unknown-backend errors.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens a repository with the factory named by `config.backend`.
    ///
    /// An unregistered name is a [`RepositoryError::Configuration`] error.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn InvoiceRepository>, RepositoryError> {
        let Some(factory) = self.factories.get(config.backend.as_str()) else {
            return Err(RepositoryError::Configuration(format!(
                "unknown backend '{}' (available: {})",
                config.backend,
                self.available_backends().join(", ")
            )));
        };

        debug!(backend = factory.backend_name(), "opening invoice repository");
        factory.create(config).await
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// tests
// ─────────────────────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use crate::models::{Article, Customer, Invoice, NewArticle, NewCustomer, NewInvoice};

    use super::{
        DbConfig, InvoiceRepository, RepositoryError, RepositoryFactory, RepositoryRegistry,
    };

    // ── stub repository ──────────────────────────────────────────────────
    // The registry tests only check routing; no method is ever called.
    struct StubRepository;

    #[async_trait]
    impl InvoiceRepository for StubRepository {
        async fn create_customer(&self, _c: NewCustomer) -> Result<Customer, RepositoryError> {
            unimplemented!()
        }
        async fn get_customer(&self, _id: i64) -> Result<Customer, RepositoryError> {
            unimplemented!()
        }
        async fn list_customers(&self) -> Result<Vec<Customer>, RepositoryError> {
            unimplemented!()
        }
        async fn update_customer(&self, _c: &Customer) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn delete_customer(&self, _id: i64) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn list_articles(&self) -> Result<Vec<Article>, RepositoryError> {
            unimplemented!()
        }
        async fn get_article(&self, _id: i64) -> Result<Article, RepositoryError> {
            unimplemented!()
        }
        async fn get_article_by_ean(&self, _ean: &str) -> Result<Article, RepositoryError> {
            unimplemented!()
        }
        async fn upsert_article(&self, _a: NewArticle) -> Result<Article, RepositoryError> {
            unimplemented!()
        }
        async fn create_invoice(&self, _i: NewInvoice) -> Result<Invoice, RepositoryError> {
            unimplemented!()
        }
        async fn get_invoice(&self, _id: i64) -> Result<Invoice, RepositoryError> {
            unimplemented!()
        }
        async fn list_invoices(&self) -> Result<Vec<Invoice>, RepositoryError> {
            unimplemented!()
        }
        async fn update_invoice(&self, _i: &Invoice) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn publish_invoice(&self, _id: i64) -> Result<(), RepositoryError> {
            unimplemented!()
        }
    }

    // ── stub factory ─────────────────────────────────────────────────────
    struct StubFactory {
        name: &'static str,
        called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl RepositoryFactory for StubFactory {
        fn backend_name(&self) -> &'static str {
            self.name
        }

        async fn create(
            &self,
            _config: &DbConfig,
        ) -> Result<Box<dyn InvoiceRepository>, RepositoryError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(Box::new(StubRepository))
        }
    }

    fn stub(name: &'static str) -> (Box<dyn RepositoryFactory>, Arc<AtomicBool>) {
        let called = Arc::new(AtomicBool::new(false));
        (
            Box::new(StubFactory {
                name,
                called: called.clone(),
            }),
            called,
        )
    }

    #[test]
    fn default_config_is_in_memory_sqlite() {
        let config = DbConfig::default();

        assert_eq!(config.backend, "sqlite");
        assert_eq!(config.connection_string, ":memory:");
    }

    #[test]
    fn available_backends_are_sorted() {
        let mut registry = RepositoryRegistry::new();
        registry.register(stub("sqlite").0);
        registry.register(stub("memory").0);

        assert_eq!(registry.available_backends(), vec!["memory", "sqlite"]);
    }

    #[tokio::test]
    async fn create_routes_to_matching_factory() {
        let mut registry = RepositoryRegistry::new();
        let (sqlite, sqlite_called) = stub("sqlite");
        let (other, other_called) = stub("other");
        registry.register(sqlite);
        registry.register(other);

        let result = registry.create(&DbConfig::default()).await;

        assert!(result.is_ok());
        assert!(sqlite_called.load(Ordering::SeqCst));
        assert!(!other_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unknown_backend_is_a_configuration_error() {
        let mut registry = RepositoryRegistry::default();
        registry.register(stub("sqlite").0);
        let config = DbConfig {
            backend: "postgres".to_string(),
            connection_string: String::new(),
        };

        let result = registry.create(&config).await;

        match result {
            Err(RepositoryError::Configuration(msg)) => {
                assert_eq!(msg, "unknown backend 'postgres' (available: sqlite)");
            }
            Err(other) => panic!("expected Configuration error, got {other:?}"),
            Ok(_) => panic!("expected Configuration error, got a repository"),
        }
    }
}
