// Copyright 2024 tison <wander4096@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A database connection handle shared by the whole process.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;

use crate::Error;
use crate::singleton::TrySingleton;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Parameters for opening a [`DatabaseConnection`].
///
/// Missing fields take their default values when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Where the database lives.
    pub url: String,
    /// Reported to the database when connecting.
    pub application_name: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: "memory://default".to_string(),
            application_name: None,
        }
    }
}

/// A connection opened once and reused for every query.
///
/// # Examples
///
/// ```
/// use solus::services::database::DatabaseConfig;
/// use solus::services::database::DatabaseConnection;
///
/// let conn1 = DatabaseConnection::get_instance(DatabaseConfig::default()).unwrap();
/// conn1.execute_query("SELECT * FROM users WHERE id = 1");
///
/// // in another file
/// let conn2 = DatabaseConnection::get_instance(DatabaseConfig::default()).unwrap();
/// conn2.execute_query("SELECT * FROM users WHERE id = 2");
///
/// assert_eq!(conn1.connection_id(), conn2.connection_id());
/// assert_eq!(conn2.queries_executed(), 2);
/// ```
#[derive(Debug)]
pub struct DatabaseConnection {
    id: u64,
    config: DatabaseConfig,
    queries: AtomicU64,
}

impl DatabaseConnection {
    fn connect(config: DatabaseConfig) -> Result<Self, Error> {
        if config.url.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "database url must not be empty".to_string(),
            ));
        }

        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        match &config.application_name {
            Some(name) => log::info!("connection {id} to {} opened for {name}", config.url),
            None => log::info!("connection {id} to {} opened", config.url),
        }

        Ok(DatabaseConnection {
            id,
            config,
            queries: AtomicU64::new(0),
        })
    }

    /// Returns the process-wide connection, opening it with `config` on first access.
    ///
    /// If opening fails, no connection is kept and the next call tries again with its own
    /// `config`.
    pub fn get_instance(config: DatabaseConfig) -> Result<&'static DatabaseConnection, Error> {
        static INSTANCE: TrySingleton<DatabaseConnection, DatabaseConfig, Error> =
            DatabaseConnection::holder();
        INSTANCE.get_instance(config)
    }

    /// Returns an empty holder for a connection owned by the caller.
    pub const fn holder() -> TrySingleton<DatabaseConnection, DatabaseConfig, Error> {
        TrySingleton::new(DatabaseConnection::connect)
    }

    /// Runs `sql` on this connection.
    pub fn execute_query(&self, sql: &str) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        log::debug!("connection {} executed: {sql}", self.id);
    }

    /// Identifies the connection within this process.
    pub fn connection_id(&self) -> u64 {
        self.id
    }

    /// Number of queries executed so far.
    pub fn queries_executed(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    /// The configuration the connection was opened with.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::DatabaseConfig;
    use super::DatabaseConnection;
    use crate::Error;
    use crate::init_test_logging;
    use crate::singleton::TrySingleton;

    #[test]
    fn connects_once_for_many_queries() {
        init_test_logging();
        let holder = DatabaseConnection::holder();

        let conn1 = holder.get_instance(DatabaseConfig::default()).unwrap();
        conn1.execute_query("SELECT * FROM users WHERE id = 1");

        let conn2 = holder
            .get_instance(DatabaseConfig {
                url: "memory://other".to_string(),
                application_name: None,
            })
            .unwrap();
        conn2.execute_query("SELECT * FROM users WHERE id = 2");
        conn2.execute_query("SELECT * FROM users WHERE id = 3");

        assert!(std::ptr::eq(conn1, conn2));
        assert_eq!(conn2.config().url, "memory://default");
        assert_eq!(conn1.queries_executed(), 3);
    }

    #[test]
    fn connect_runs_once_for_many_accesses() {
        static CONNECTS: AtomicUsize = AtomicUsize::new(0);

        fn counting_connect(config: DatabaseConfig) -> Result<DatabaseConnection, Error> {
            CONNECTS.fetch_add(1, Ordering::SeqCst);
            DatabaseConnection::connect(config)
        }

        let holder = TrySingleton::new(counting_connect);
        for i in 0..5 {
            let conn = holder.get_instance(DatabaseConfig::default()).unwrap();
            conn.execute_query(&format!("SELECT * FROM users WHERE id = {i}"));
        }

        assert_eq!(CONNECTS.load(Ordering::SeqCst), 1);
        assert_eq!(holder.get().unwrap().queries_executed(), 5);
    }

    #[test]
    fn separate_holders_open_separate_connections() {
        let first = DatabaseConnection::holder();
        let second = DatabaseConnection::holder();

        let a = first.get_instance(DatabaseConfig::default()).unwrap();
        let b = second.get_instance(DatabaseConfig::default()).unwrap();
        assert_ne!(a.connection_id(), b.connection_id());
    }

    #[test]
    fn failed_connect_can_be_retried() {
        let holder = DatabaseConnection::holder();

        let err = holder
            .get_instance(DatabaseConfig {
                url: "  ".to_string(),
                application_name: None,
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(holder.get().is_none());

        let conn = holder.get_instance(DatabaseConfig::default()).unwrap();
        assert_eq!(conn.config(), &DatabaseConfig::default());
    }

    #[test]
    fn config_from_toml() {
        let config: DatabaseConfig = toml::from_str(
            r#"
            url = "postgres://localhost/app"
            application_name = "billing"
            "#,
        )
        .unwrap();
        assert_eq!(config.url, "postgres://localhost/app");
        assert_eq!(config.application_name.as_deref(), Some("billing"));

        let config: DatabaseConfig = toml::from_str("").unwrap();
        assert_eq!(config, DatabaseConfig::default());
    }

    #[test]
    fn process_wide_instance() {
        let conn1 = DatabaseConnection::get_instance(DatabaseConfig::default()).unwrap();
        let conn2 = DatabaseConnection::get_instance(DatabaseConfig {
            url: String::new(),
            application_name: None,
        })
        .unwrap();
        assert_eq!(conn1.connection_id(), conn2.connection_id());
    }
}
