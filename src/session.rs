//! Session state the resolver reads defaults from.
//!
//! The parser only ever sees a borrowed [`SessionDefaults`]. The owning
//! [`Session`] is mutated by the caller, e.g. when a backend runs `use`.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::{ParseError, ParseResult};

/// Database name → collection names.
pub type Catalog = BTreeMap<String, Vec<String>>;

/// Fallback default database when a profile names none.
pub const FALLBACK_DATABASE: &str = "local";

/// Read-only defaults for one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDefaults<'a> {
    /// Instance stamped onto chain-form descriptors
    pub instance: &'a str,
    /// Database used when a chain names none
    pub current_database: Option<&'a str>,
    /// Known databases, when the session has listed them
    pub catalog: Option<&'a Catalog>,
}

impl<'a> SessionDefaults<'a> {
    pub fn new(instance: &'a str) -> Self {
        Self {
            instance,
            current_database: None,
            catalog: None,
        }
    }

    pub fn with_current_database(mut self, database: &'a str) -> Self {
        self.current_database = Some(database);
        self
    }

    pub fn with_catalog(mut self, catalog: &'a Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// `Some(known)` when the catalog is available, `None` otherwise.
    pub fn knows_database(&self, database: &str) -> Option<bool> {
        self.catalog.map(|catalog| catalog.contains_key(database))
    }
}

/// One instance's session: its name, current database and known catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    instance: String,
    current_database: Option<String>,
    catalog: Catalog,
}

impl Session {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            ..Self::default()
        }
    }

    /// Attach the known databases and their collections.
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Pick the starting database.
    ///
    /// With a catalog, the database must be listed in it; otherwise the
    /// session starts with no current database.
    pub fn with_default_database(mut self, database: Option<&str>) -> Self {
        if self.catalog.is_empty() {
            self.current_database = database.map(String::from);
            return self;
        }

        let wanted = database.unwrap_or(FALLBACK_DATABASE);
        if self.catalog.contains_key(wanted) {
            self.current_database = Some(wanted.to_string());
        } else {
            warn!(database = wanted, "default database not in database list, not setting db");
            self.current_database = None;
        }
        self
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn current_database(&self) -> Option<&str> {
        self.current_database.as_deref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn database_names(&self) -> Vec<String> {
        self.catalog.keys().cloned().collect()
    }

    /// Collections of `database`, or `None` if the database is unknown.
    pub fn collections(&self, database: &str) -> Option<&[String]> {
        self.catalog.get(database).map(Vec::as_slice)
    }

    /// Switch the current database.
    pub fn use_database(&mut self, database: &str) -> ParseResult<()> {
        if !self.catalog.is_empty() && !self.catalog.contains_key(database) {
            return Err(ParseError::UnknownDatabase {
                database: database.to_string(),
            });
        }
        debug!(instance = %self.instance, database, "changed current database");
        self.current_database = Some(database.to_string());
        Ok(())
    }

    /// Borrow this session as resolver defaults.
    pub fn defaults(&self) -> SessionDefaults<'_> {
        SessionDefaults {
            instance: &self.instance,
            current_database: self.current_database.as_deref(),
            catalog: (!self.catalog.is_empty()).then_some(&self.catalog),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.insert("local".to_string(), vec!["startup_log".to_string()]);
        catalog.insert("orders".to_string(), vec!["invoices".to_string()]);
        catalog
    }

    #[test]
    fn test_default_database_falls_back_to_local() {
        let session = Session::new("prod").with_catalog(catalog()).with_default_database(None);
        assert_eq!(session.current_database(), Some("local"));
    }

    #[test]
    fn test_unknown_default_database_is_dropped() {
        let session = Session::new("prod")
            .with_catalog(catalog())
            .with_default_database(Some("missing"));
        assert_eq!(session.current_database(), None);
    }

    #[test]
    fn test_without_catalog_default_is_trusted() {
        let session = Session::new("prod").with_default_database(Some("orders"));
        assert_eq!(session.current_database(), Some("orders"));
        assert_eq!(session.defaults().catalog, None);
    }

    #[test]
    fn test_use_database() {
        let mut session = Session::new("prod").with_catalog(catalog());
        session.use_database("orders").unwrap();
        assert_eq!(session.defaults().current_database, Some("orders"));

        let err = session.use_database("nope").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownDatabase {
                database: "nope".to_string()
            }
        );
        assert_eq!(session.current_database(), Some("orders"));
    }

    #[test]
    fn test_knows_database() {
        let catalog = catalog();
        let defaults = SessionDefaults::new("prod").with_catalog(&catalog);
        assert_eq!(defaults.knows_database("orders"), Some(true));
        assert_eq!(defaults.knows_database("x"), Some(false));
        assert_eq!(SessionDefaults::new("prod").knows_database("x"), None);
    }
}
