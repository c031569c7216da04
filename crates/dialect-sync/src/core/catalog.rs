//! Dialect registry for explicit dependency injection.
//!
//! The [`DialectRegistry`] resolves which dialect speaks to a connection and
//! remembers the answer. It is constructed by the caller and handed to each
//! querier, rather than living in a global.
//!
//! Resolution happens once per connection key: the product name is read,
//! every registered family is scored against it and against the URL scheme,
//! and the identifier-length probe runs. Both results are cached.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::dialect::DialectSettings;
use crate::drivers::{DialectImpl, DialectKind};
use crate::error::{Result, SyncError};

use super::identifier::MaxIdentifierLength;
use super::traits::{Connection, Dialect, ProductInfo};

const SCORE_EXACT_PRODUCT: u32 = 100;
const SCORE_PRODUCT_SUBSTRING: u32 = 50;
const SCORE_URL_SCHEME: u32 = 25;

/// A dialect bound to one connection, with its probed identifier limit.
#[derive(Debug, Clone)]
pub struct ResolvedDialect {
    pub dialect: DialectImpl,
    pub max_identifier_length: MaxIdentifierLength,
    pub product: ProductInfo,
}

/// Registry of dialect families plus per-connection resolution caches.
pub struct DialectRegistry {
    kinds: Vec<DialectKind>,
    settings: DialectSettings,
    override_kind: Option<DialectKind>,
    resolved: RwLock<HashMap<String, Arc<ResolvedDialect>>>,
}

impl DialectRegistry {
    /// Create an empty registry. Unmatched connections get the generic dialect.
    pub fn new(settings: DialectSettings) -> Self {
        Self {
            kinds: Vec::new(),
            settings,
            override_kind: None,
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with every built-in dialect family registered.
    pub fn with_builtins(settings: DialectSettings) -> Self {
        let mut registry = Self::new(settings);
        for kind in DialectKind::ALL {
            registry.register(kind);
        }
        registry
    }

    pub fn register(&mut self, kind: DialectKind) {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
    }

    /// Always use the named dialect instead of matching product names.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` if the name is not registered.
    pub fn override_name(mut self, name: &str) -> Result<Self> {
        let kind = self.find_by_name(name).ok_or_else(|| {
            SyncError::Config(format!(
                "Unknown dialect override '{}'. Registered: {}",
                name,
                self.names().join(", ")
            ))
        })?;
        self.override_kind = Some(kind);
        Ok(self)
    }

    /// Registered family matching a name or alias.
    pub fn find_by_name(&self, name: &str) -> Option<DialectKind> {
        self.kinds
            .iter()
            .copied()
            .find(|k| k.descriptor().answers_to(name))
    }

    /// Registered dialect names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.kinds.iter().map(|k| k.descriptor().name).collect()
    }

    pub fn kinds(&self) -> &[DialectKind] {
        &self.kinds
    }

    pub fn settings(&self) -> &DialectSettings {
        &self.settings
    }

    /// Pick the best family for a product name and connection URL.
    ///
    /// An exact product-name match beats a substring match, and either beats
    /// a URL-scheme match. Descriptor priority breaks ties. No match at all
    /// selects the generic dialect.
    pub fn select_for(&self, product_name: &str, url: &str) -> DialectKind {
        if let Some(kind) = self.override_kind {
            return kind;
        }
        let product = product_name.trim().to_lowercase();
        let scheme = url
            .split_once("://")
            .map(|(s, _)| s.to_lowercase())
            .or_else(|| url.split_once(':').map(|(s, _)| s.to_lowercase()))
            .unwrap_or_default();

        self.kinds
            .iter()
            .filter_map(|&kind| {
                let score = match_score(kind, &product, &scheme);
                (score > 0).then(|| (score + u32::from(kind.descriptor().priority), kind))
            })
            .max_by_key(|(score, _)| *score)
            .map(|(score, kind)| {
                debug!(
                    "Product '{}' matched dialect {} (score {})",
                    product_name,
                    kind.descriptor().name,
                    score
                );
                kind
            })
            .unwrap_or(DialectKind::Generic)
    }

    /// Resolve the dialect for a connection, probing it at most once per
    /// connection key.
    ///
    /// # Errors
    ///
    /// Propagates a failure to read the product name. A failed identifier
    /// probe degrades to [`MaxIdentifierLength::Unbounded`].
    pub async fn resolve<C>(&self, conn: &mut C) -> Result<Arc<ResolvedDialect>>
    where
        C: Connection + ?Sized,
    {
        let key = conn.connection_key().to_string();
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let product = conn.product_info().await?;
        let kind = self.select_for(&product.name, &key);
        let dialect = DialectImpl::new(kind, self.settings.clone());
        let max_identifier_length = dialect.compute_max_identifier_length(conn).await;
        debug!(
            "Resolved {} ({} {}) to dialect {}, max identifier length {:?}",
            key,
            product.name,
            product.version,
            dialect.name(),
            max_identifier_length
        );

        let resolved = Arc::new(ResolvedDialect {
            dialect,
            max_identifier_length,
            product,
        });
        let mut cache = self
            .resolved
            .write()
            .map_err(|_| SyncError::precondition("dialect cache lock poisoned"))?;
        Ok(cache.entry(key).or_insert(resolved).clone())
    }

    fn cached(&self, key: &str) -> Option<Arc<ResolvedDialect>> {
        self.resolved.read().ok()?.get(key).cloned()
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::with_builtins(DialectSettings::default())
    }
}

fn match_score(kind: DialectKind, product: &str, scheme: &str) -> u32 {
    let desc = kind.descriptor();
    let mut score = 0;
    if !product.is_empty() {
        for name in desc.product_names {
            let name = name.to_lowercase();
            if product == name {
                score = score.max(SCORE_EXACT_PRODUCT);
            } else if product.contains(&name) {
                score = score.max(SCORE_PRODUCT_SUBSTRING);
            }
        }
    }
    if !scheme.is_empty() && desc.url_schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
        score = score.max(SCORE_URL_SCHEME);
    }
    score
}
