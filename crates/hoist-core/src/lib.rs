#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod bundler;
pub mod config;
pub mod error;

pub use bundler::{bundle_file, bundle_source, BundleOptions, BundleResult, Bundler};
pub use config::Config;
pub use error::BundleError;

/// Crate version, reported by `hoist --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
