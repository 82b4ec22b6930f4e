use crate::errors::{MsgenError, Result};
use crate::storage::StorageCredential;
use std::str::FromStr;

const DELIMITER: char = ';';
const COMPONENT_SEPARATOR: char = '=';

/// The parts of an Azure Storage connection string msgenctl cares about.
///
/// Keys other than `AccountName` and `AccountKey` (`DefaultEndpointsProtocol`,
/// `EndpointSuffix`, ...) are accepted and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub account_name: String,
    pub account_key: String,
}

impl FromStr for ConnectionString {
    type Err = MsgenError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(MsgenError::InvalidConnectionString(
                "empty input".to_string(),
            ));
        }

        let mut account_name = None;
        let mut account_key = None;

        for raw_field in s.trim_end_matches(DELIMITER).split(DELIMITER) {
            if raw_field.is_empty() {
                return Err(MsgenError::InvalidConnectionString(
                    "contains an empty field".to_string(),
                ));
            }

            let (key, value) = raw_field.split_once(COMPONENT_SEPARATOR).ok_or_else(|| {
                MsgenError::InvalidConnectionString(format!("{raw_field} is missing a value"))
            })?;

            match key {
                "AccountName" => account_name = Some(value.to_string()),
                "AccountKey" => account_key = Some(value.to_string()),
                _ => continue,
            }
        }

        let account_name = account_name.ok_or_else(|| {
            MsgenError::InvalidConnectionString("missing AccountName".to_string())
        })?;
        let account_key = account_key.ok_or_else(|| {
            MsgenError::InvalidConnectionString("missing AccountKey".to_string())
        })?;

        Ok(Self {
            account_name,
            account_key,
        })
    }
}

impl TryFrom<&ConnectionString> for StorageCredential {
    type Error = MsgenError;

    fn try_from(connection_string: &ConnectionString) -> Result<Self> {
        StorageCredential::new(
            connection_string.account_name.clone(),
            &connection_string.account_key,
        )
    }
}
