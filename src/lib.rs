//! Layered configuration resolution.
//!
//! `confstack` composes a prioritized stack of configuration sources --
//! runtime overrides, environment variables, a config file, and
//! registered defaults -- into one queryable namespace with dotted
//! key-path addressing and typed accessors. Per key path, the value
//! from the highest-priority source that defines it wins.
//!
//! ```no_run
//! use confstack::Resolver;
//!
//! let mut resolver = Resolver::new();
//! resolver.add_search_path("/etc/myapp");
//! resolver.add_search_path("./conf");
//! resolver.set_config_name("config");
//! resolver.set_env_prefix("MYAPP");
//! resolver.automatic_env(true);
//! resolver.set_default("os", "centos");
//!
//! // A missing config file is recoverable: resolution continues over
//! // environment variables and defaults.
//! if let Err(err) = resolver.read_in_config() {
//!     tracing::warn!("running without a config file: {err}");
//! }
//!
//! let workers = resolver.get_int("workers");
//! let backends = resolver.get_string_slice("backends");
//! ```

pub mod env;
pub mod error;
pub mod resolver;
pub mod value;

pub use env::{EnvKeyMapper, EnvSource, MockEnv, StdEnv};
pub use error::{CoercionError, ConfigError};
pub use resolver::{Resolver, SourceKind};
