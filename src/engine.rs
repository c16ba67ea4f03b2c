//! Command dispatch.
//!
//! The library never talks to a database driver. A driver integration
//! implements [`Backend`], one method per [`Operation`], and [`dispatch`]
//! routes a validated descriptor to the matching method. Because the match
//! over operations is exhaustive, an operation without a handler does not
//! compile.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::ast::{CommandDescriptor, Operation};
use crate::error::DispatchError;
use crate::format::Response;
use crate::session::Session;

/// The collection a data-access command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionRef<'a> {
    pub instance: &'a str,
    pub database: &'a str,
    pub collection: &'a str,
}

impl fmt::Display for CollectionRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.instance, self.database, self.collection)
    }
}

/// Capability table for executing commands.
pub trait Backend {
    type Error: fmt::Display;

    fn show_dbs(&mut self, instance: &str) -> Result<Vec<String>, Self::Error>;

    fn show_collections(&mut self, instance: &str, database: &str)
        -> Result<Vec<String>, Self::Error>;

    /// Switch the current database, returning its name.
    fn use_database(&mut self, database: &str) -> Result<String, Self::Error>;

    fn current_database(&mut self) -> Result<Option<String>, Self::Error>;

    fn list_databases(&mut self) -> Result<Vec<String>, Self::Error>;

    /// `args` is the query followed by an optional filter.
    fn find(
        &mut self,
        target: CollectionRef<'_>,
        args: &[&Value],
    ) -> Result<Vec<Value>, Self::Error>;

    fn find_one(
        &mut self,
        target: CollectionRef<'_>,
        args: &[&Value],
    ) -> Result<Option<Value>, Self::Error>;

    fn count_documents(
        &mut self,
        target: CollectionRef<'_>,
        args: &[&Value],
    ) -> Result<u64, Self::Error>;
}

/// Run a descriptor against a backend.
pub fn dispatch<B: Backend>(
    cmd: &CommandDescriptor,
    backend: &mut B,
) -> Result<Response, DispatchError> {
    debug!(operation = %cmd.operation, instance = %cmd.instance, "dispatching");
    let args = cmd.query_values();

    let response = match cmd.operation {
        Operation::Find => backend
            .find(collection_ref(cmd)?, &args)
            .map(Response::Documents),
        Operation::FindOne => backend
            .find_one(collection_ref(cmd)?, &args)
            .map(Response::Document),
        Operation::CountDocuments => backend
            .count_documents(collection_ref(cmd)?, &args)
            .map(Response::Count),
        Operation::ShowDbs => backend.show_dbs(&cmd.instance).map(Response::Names),
        Operation::ShowCollections => backend
            .show_collections(&cmd.instance, require(cmd, cmd.database.as_deref(), "database")?)
            .map(Response::Names),
        Operation::Use => backend
            .use_database(require(cmd, cmd.database.as_deref(), "database")?)
            .map(|db| Response::Message(format!("Changed current db (db) to {}", db))),
        Operation::Curdb => backend.current_database().map(|db| {
            Response::Message(match db {
                Some(db) => format!("Current db is {}", db),
                None => "No current db is set".to_string(),
            })
        }),
        Operation::Listdbs => backend.list_databases().map(Response::Names),
    };

    response.map_err(|e| DispatchError::Backend(e.to_string()))
}

fn collection_ref(cmd: &CommandDescriptor) -> Result<CollectionRef<'_>, DispatchError> {
    Ok(CollectionRef {
        instance: &cmd.instance,
        database: require(cmd, cmd.database.as_deref(), "database")?,
        collection: require(cmd, cmd.collection.as_deref(), "collection")?,
    })
}

fn require<'a>(
    cmd: &CommandDescriptor,
    field: Option<&'a str>,
    name: &str,
) -> Result<&'a str, DispatchError> {
    field.ok_or_else(|| DispatchError::Contract {
        operation: cmd.operation.to_string(),
        message: format!("descriptor has no {}", name),
    })
}

/// Error from [`CatalogBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    UnknownInstance(String),
    UnknownDatabase(String),
    /// Data operations need a real driver.
    NoDriver(Operation),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::UnknownInstance(name) => {
                write!(f, "Instance {} is not the connected instance", name)
            }
            CatalogError::UnknownDatabase(name) => {
                write!(f, "{} is not in current db list", name)
            }
            CatalogError::NoDriver(op) => {
                write!(f, "{} needs a database driver; no connection is configured", op)
            }
        }
    }
}

/// Offline backend answering administrative commands from a session's
/// configured catalog.
#[derive(Debug)]
pub struct CatalogBackend<'s> {
    session: &'s mut Session,
}

impl<'s> CatalogBackend<'s> {
    pub fn new(session: &'s mut Session) -> Self {
        Self { session }
    }

    fn check_instance(&self, instance: &str) -> Result<(), CatalogError> {
        if instance == self.session.instance() {
            Ok(())
        } else {
            Err(CatalogError::UnknownInstance(instance.to_string()))
        }
    }
}

impl Backend for CatalogBackend<'_> {
    type Error = CatalogError;

    fn show_dbs(&mut self, instance: &str) -> Result<Vec<String>, Self::Error> {
        self.check_instance(instance)?;
        Ok(self.session.database_names())
    }

    fn show_collections(
        &mut self,
        instance: &str,
        database: &str,
    ) -> Result<Vec<String>, Self::Error> {
        self.check_instance(instance)?;
        self.session
            .collections(database)
            .map(<[String]>::to_vec)
            .ok_or_else(|| CatalogError::UnknownDatabase(database.to_string()))
    }

    fn use_database(&mut self, database: &str) -> Result<String, Self::Error> {
        self.session
            .use_database(database)
            .map_err(|_| CatalogError::UnknownDatabase(database.to_string()))?;
        Ok(database.to_string())
    }

    fn current_database(&mut self) -> Result<Option<String>, Self::Error> {
        Ok(self.session.current_database().map(String::from))
    }

    fn list_databases(&mut self) -> Result<Vec<String>, Self::Error> {
        Ok(self.session.database_names())
    }

    fn find(&mut self, _: CollectionRef<'_>, _: &[&Value]) -> Result<Vec<Value>, Self::Error> {
        Err(CatalogError::NoDriver(Operation::Find))
    }

    fn find_one(
        &mut self,
        _: CollectionRef<'_>,
        _: &[&Value],
    ) -> Result<Option<Value>, Self::Error> {
        Err(CatalogError::NoDriver(Operation::FindOne))
    }

    fn count_documents(&mut self, _: CollectionRef<'_>, _: &[&Value]) -> Result<u64, Self::Error> {
        Err(CatalogError::NoDriver(Operation::CountDocuments))
    }
}
