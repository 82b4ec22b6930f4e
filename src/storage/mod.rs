//! Azure Blob Storage credentials and shared access signatures.
//!
//! Nothing in here talks to the storage service. Signatures are computed
//! locally from the account key and handed to the genomics service, which
//! uses them to read inputs and write outputs on the caller's behalf.

pub mod connection_string;
pub mod sas;

pub use connection_string::ConnectionString;
pub use sas::{
    encode_ordered, sign, Permission, SasPermissions, SasSigner, SignedResource,
    StorageCredential, SAS_LIFETIME_HOURS, SIGNED_VERSION,
};
