pub mod config;
pub mod error;
pub mod interpolate;
pub mod route;
pub mod validate;

pub use config::Graph;
pub use error::FirelynxError;
pub use interpolate::{EnvLookup, Interpolate, SystemEnv};
pub use route::{HttpCondition, RouteDef, StaticData};
pub use validate::validate;
