//! Connection profiles: the raw key/value form handed over by a profile
//! reader, and its normalization into one canonical shape.

pub mod dsn;
mod extension;
mod normalizer;
mod raw;
mod table;

pub use extension::{CompiledExtensions, ExtensionProbe, StaticExtensions};
pub use normalizer::{DriverKind, NormalizedProfile, ParameterNormalizer, DEFAULT_CHARSET};
pub use raw::{ConnectionProfile, ProfileValue};
pub use table::{DbType, DriverInfo, DriverTable};
