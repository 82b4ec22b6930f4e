use crate::errors::{MsgenError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of every generated signature
pub const SAS_LIFETIME_HOURS: i64 = 72;

/// Storage service version the signature is computed against
pub const SIGNED_VERSION: &str = "2021-12-02";

const SIGNED_VERSION_KEY: &str = "sv";
const SAS_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Account name plus the decoded shared key.
#[derive(Clone)]
pub struct StorageCredential {
    account_name: String,
    account_key: Vec<u8>,
}

impl StorageCredential {
    /// Build a credential from the base64 account key shown in the Azure portal.
    pub fn new(account_name: impl Into<String>, account_key: &str) -> Result<Self> {
        let account_name = account_name.into();

        let account_key = STANDARD
            .decode(account_key.trim())
            .map_err(|source| MsgenError::InvalidAccountKey {
                account: account_name.clone(),
                source,
            })?;

        Ok(Self {
            account_name,
            account_key,
        })
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }
}

impl fmt::Debug for StorageCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredential")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
    Delete,
}

/// Set of granted permissions.
///
/// Rendering always follows the storage service's canonical letter order
/// (`r`, `w`, `d`), never the order the permissions were added in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SasPermissions {
    read: bool,
    write: bool,
    delete: bool,
}

impl SasPermissions {
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    pub fn read_write_delete() -> Self {
        Self {
            read: true,
            write: true,
            delete: true,
        }
    }

    pub fn with(mut self, permission: Permission) -> Self {
        match permission {
            Permission::Read => self.read = true,
            Permission::Write => self.write = true,
            Permission::Delete => self.delete = true,
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        !(self.read || self.write || self.delete)
    }
}

impl FromIterator<Permission> for SasPermissions {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        iter.into_iter()
            .fold(SasPermissions::default(), |permissions, permission| {
                permissions.with(permission)
            })
    }
}

impl fmt::Display for SasPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (granted, letter) in [(self.read, 'r'), (self.write, 'w'), (self.delete, 'd')] {
            if granted {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

/// A container or blob grant with its validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedResource {
    pub container: String,
    pub blob: Option<String>,
    pub permissions: SasPermissions,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl SignedResource {
    pub fn blob(
        container: impl Into<String>,
        blob: impl Into<String>,
        permissions: SasPermissions,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(container.into(), Some(blob.into()), permissions, now)
    }

    pub fn container(
        container: impl Into<String>,
        permissions: SasPermissions,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(container.into(), None, permissions, now)
    }

    fn new(
        container: String,
        blob: Option<String>,
        permissions: SasPermissions,
        now: DateTime<Utc>,
    ) -> Self {
        // The wire format has second precision; keep the struct in agreement
        let valid_from = now.trunc_subsecs(0);

        Self {
            container,
            blob,
            permissions,
            valid_from,
            valid_until: valid_from + Duration::hours(SAS_LIFETIME_HOURS),
        }
    }

    /// `b` for blob grants, `c` for container grants
    pub fn signed_resource(&self) -> &'static str {
        if self.blob.is_some() {
            "b"
        } else {
            "c"
        }
    }

    fn canonicalized_resource(&self, account_name: &str) -> String {
        match &self.blob {
            Some(blob) => format!("/blob/{}/{}/{}", account_name, self.container, blob),
            None => format!("/blob/{}/{}", account_name, self.container),
        }
    }
}

/// Sign `resource` with `credential` and return the SAS query string.
///
/// A grant without any permission is refused.
pub fn sign(credential: &StorageCredential, resource: &SignedResource) -> Result<String> {
    if resource.permissions.is_empty() {
        return Err(MsgenError::Signing(format!(
            "no permissions requested for container {}",
            resource.container
        )));
    }

    let permissions = resource.permissions.to_string();
    let start = resource.valid_from.format(SAS_TIME_FORMAT).to_string();
    let expiry = resource.valid_until.format(SAS_TIME_FORMAT).to_string();
    let signed_resource = resource.signed_resource();

    let string_to_sign = [
        permissions.as_str(),
        start.as_str(),
        expiry.as_str(),
        &resource.canonicalized_resource(credential.account_name()),
        "", // signed identifier
        "", // signed IP
        "", // signed protocol
        SIGNED_VERSION,
        signed_resource,
        "", // snapshot time
        "", // encryption scope
        "", // rscc
        "", // rscd
        "", // rsce
        "", // rscl
        "", // rsct
    ]
    .join("\n");

    let mut mac = HmacSha256::new_from_slice(&credential.account_key)
        .map_err(|e| MsgenError::Signing(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    debug!(
        account = credential.account_name(),
        container = %resource.container,
        blob = ?resource.blob,
        permissions = %permissions,
        expiry = %expiry,
        "Signed shared access signature"
    );

    encode_ordered([
        ("sv", SIGNED_VERSION.to_string()),
        ("st", start),
        ("se", expiry),
        ("sr", signed_resource.to_string()),
        ("sp", permissions),
        ("sig", signature),
    ])
}

/// Encode SAS query parameters with `sv` first and the rest sorted by key.
///
/// Microsoft Genomics rejects a SAS whose first parameter is not the signed
/// version with an unexplained HTTP 500, even though the storage service
/// itself accepts any order.
pub fn encode_ordered<I, K, V>(params: I) -> Result<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut rest: BTreeMap<String, String> = params
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect();

    let signed_version = rest.remove(SIGNED_VERSION_KEY).ok_or_else(|| {
        MsgenError::Signing(format!(
            "missing signedversion ({SIGNED_VERSION_KEY}) field"
        ))
    })?;

    let mut ordered = Vec::with_capacity(rest.len() + 1);
    ordered.push((SIGNED_VERSION_KEY.to_string(), signed_version));
    ordered.extend(rest);

    serde_urlencoded::to_string(&ordered).map_err(|e| MsgenError::Signing(e.to_string()))
}

/// Issues signatures for a single storage account.
#[derive(Debug, Clone)]
pub struct SasSigner {
    credential: StorageCredential,
}

impl SasSigner {
    pub fn new(credential: StorageCredential) -> Self {
        Self { credential }
    }

    pub fn blob_sas(
        &self,
        container: &str,
        blob: &str,
        permissions: SasPermissions,
        now: DateTime<Utc>,
    ) -> Result<String> {
        sign(
            &self.credential,
            &SignedResource::blob(container, blob, permissions, now),
        )
    }

    pub fn container_sas(
        &self,
        container: &str,
        permissions: SasPermissions,
        now: DateTime<Utc>,
    ) -> Result<String> {
        sign(
            &self.credential,
            &SignedResource::container(container, permissions, now),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ACCOUNT_NAME: &str = "msgenctl";
    // base64("msgenctl")
    const ACCOUNT_KEY: &str = "bXNnZW5jdGw=";

    fn parse(sas: &str) -> Vec<(String, String)> {
        serde_urlencoded::from_str(sas).unwrap()
    }

    fn value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn signer() -> SasSigner {
        SasSigner::new(StorageCredential::new(ACCOUNT_NAME, ACCOUNT_KEY).unwrap())
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 15).unwrap()
    }

    #[test]
    fn test_invalid_account_key_is_rejected() {
        let err = StorageCredential::new("input", "not base64!").unwrap_err();
        assert!(matches!(err, MsgenError::InvalidAccountKey { ref account, .. } if account == "input"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_credential_debug_redacts_key() {
        let credential = StorageCredential::new(ACCOUNT_NAME, ACCOUNT_KEY).unwrap();
        let debug = format!("{credential:?}");
        assert!(debug.contains(ACCOUNT_NAME));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_permissions_render_in_canonical_order() {
        let permissions: SasPermissions =
            [Permission::Delete, Permission::Read, Permission::Write].into_iter().collect();
        assert_eq!(permissions.to_string(), "rwd");
        assert_eq!(SasPermissions::read_only().to_string(), "r");
        assert_eq!(
            SasPermissions::default().with(Permission::Delete).with(Permission::Read).to_string(),
            "rd"
        );
        assert!(SasPermissions::default().is_empty());
    }

    #[test]
    fn test_blob_sas_has_blob_resource() {
        let sas = signer()
            .blob_sas("test", "in.bam", SasPermissions::read_only(), fixed_now())
            .unwrap();
        let params = parse(&sas);

        assert_eq!(value(&params, "sr"), Some("b"));
        assert_eq!(value(&params, "sp"), Some("r"));
    }

    #[test]
    fn test_empty_permissions_are_refused() {
        let err = signer()
            .container_sas("results", SasPermissions::default(), fixed_now())
            .unwrap_err();

        assert!(matches!(err, MsgenError::Signing(ref reason) if reason.contains("results")));
    }

    #[test]
    fn test_container_sas_has_container_resource() {
        let sas = signer()
            .container_sas("test", SasPermissions::read_write_delete(), fixed_now())
            .unwrap();
        let params = parse(&sas);

        assert_eq!(value(&params, "sr"), Some("c"));
        assert_eq!(value(&params, "sp"), Some("rwd"));
    }

    #[test]
    fn test_validity_window_is_72_hours() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 15).unwrap()
            + Duration::milliseconds(750);
        let resource = SignedResource::container("test", SasPermissions::read_only(), now);

        assert_eq!(resource.valid_until - resource.valid_from, Duration::hours(72));

        let sas = sign(
            &StorageCredential::new(ACCOUNT_NAME, ACCOUNT_KEY).unwrap(),
            &resource,
        )
        .unwrap();
        let params = parse(&sas);
        assert_eq!(value(&params, "st"), Some("2024-03-01T12:30:15Z"));
        assert_eq!(value(&params, "se"), Some("2024-03-04T12:30:15Z"));
    }

    #[test]
    fn test_signed_version_comes_first() {
        let sas = signer()
            .blob_sas("test", "in.bam", SasPermissions::read_only(), fixed_now())
            .unwrap();

        assert!(sas.starts_with("sv="), "query missing starting `sv` key: {sas}");

        let params = parse(&sas);
        assert_eq!(params[0], ("sv".to_string(), SIGNED_VERSION.to_string()));

        let keys: Vec<&str> = params[1..].iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["se", "sig", "sp", "sr", "st"]);
    }

    #[test]
    fn test_signing_is_deterministic_for_same_instant() {
        let now = fixed_now();
        let first = signer()
            .container_sas("results", SasPermissions::read_write_delete(), now)
            .unwrap();
        let second = signer()
            .container_sas("results", SasPermissions::read_write_delete(), now)
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_signature_depends_on_key_and_resource() {
        let now = fixed_now();
        let other = SasSigner::new(StorageCredential::new(ACCOUNT_NAME, "b3RoZXI=").unwrap());

        let a = parse(&signer().blob_sas("test", "in.bam", SasPermissions::read_only(), now).unwrap());
        let b = parse(&other.blob_sas("test", "in.bam", SasPermissions::read_only(), now).unwrap());
        let c = parse(&signer().blob_sas("test", "other.bam", SasPermissions::read_only(), now).unwrap());

        assert_ne!(value(&a, "sig"), value(&b, "sig"));
        assert_ne!(value(&a, "sig"), value(&c, "sig"));
    }

    #[test]
    fn test_signature_round_trips_through_query_encoding() {
        let sas = signer()
            .blob_sas("test", "in.bam", SasPermissions::read_only(), fixed_now())
            .unwrap();
        let params = parse(&sas);
        let sig = value(&params, "sig").unwrap();

        // HMAC-SHA256 digests are 32 bytes
        assert_eq!(STANDARD.decode(sig).unwrap().len(), 32);
        assert!(!sas.contains(':'), "timestamps must be percent-encoded: {sas}");
    }

    #[test]
    fn test_encode_ordered_moves_sv_to_front() {
        let encoded = encode_ordered([("sp", "r"), ("se", "x"), ("sv", "2021-12-02")]).unwrap();
        assert_eq!(encoded, "sv=2021-12-02&se=x&sp=r");
    }

    #[test]
    fn test_encode_ordered_requires_sv() {
        let err = encode_ordered([("sp", "r")]).unwrap_err();
        assert!(matches!(err, MsgenError::Signing(_)));
    }
}
