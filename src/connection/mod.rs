//! Connection domain model, field requirements, persistence and secret
//! boundaries.

pub mod fields;
pub mod secrets;
pub mod store;
pub mod types;

pub use fields::{field_spec, missing_fields, required_fields, FieldSpec};
pub use secrets::{CredentialSet, MemorySecretResolver, SecretResolver};
pub use store::{
    ConnectionFilter, ConnectionPatch, ConnectionStore, MemoryConnectionStore, StoreEvent,
};
pub use types::{
    Connection, ConnectionKind, ConnectionStatus, FieldError, HealthEvent, RegistryFlavor,
    ServiceCheck, ServiceStatus, ValidationResult,
};
