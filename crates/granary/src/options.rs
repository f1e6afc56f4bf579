// Configuration consumed once at startup: table names, capacity hints, and
// the device-flow tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use granary_core::options::{Throughput, WaitOptions};

/// Resolved backing-table names, one per entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNames {
    #[serde(default = "default_applications_table")]
    pub applications: String,
    #[serde(default = "default_authorizations_table")]
    pub authorizations: String,
    #[serde(default = "default_tokens_table")]
    pub tokens: String,
    #[serde(default = "default_device_codes_table")]
    pub device_codes: String,
}

fn default_applications_table() -> String {
    "applications".to_string()
}

fn default_authorizations_table() -> String {
    "authorizations".to_string()
}

fn default_tokens_table() -> String {
    "tokens".to_string()
}

fn default_device_codes_table() -> String {
    "deviceCodes".to_string()
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            applications: default_applications_table(),
            authorizations: default_authorizations_table(),
            tokens: default_tokens_table(),
            device_codes: default_device_codes_table(),
        }
    }
}

impl TableNames {
    /// The default names with a common prefix, for sharing one store
    /// between deployments.
    pub fn with_prefix(prefix: &str) -> Self {
        let defaults = Self::default();
        Self {
            applications: format!("{prefix}{}", defaults.applications),
            authorizations: format!("{prefix}{}", defaults.authorizations),
            tokens: format!("{prefix}{}", defaults.tokens),
            device_codes: format!("{prefix}{}", defaults.device_codes),
        }
    }
}

/// Tunables of the device-authorization grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFlowOptions {
    /// How long an issued code pair stays redeemable.
    pub code_lifetime: Duration,
    /// Minimum cadence advertised to polling clients.
    pub poll_interval: Duration,
    /// Characters in the user code, hyphen not counted.
    pub user_code_length: usize,
    /// Characters in the device code.
    pub device_code_length: usize,
}

impl Default for DeviceFlowOptions {
    fn default() -> Self {
        Self {
            code_lifetime: Duration::from_secs(300),
            poll_interval: Duration::from_secs(5),
            user_code_length: 8,
            device_code_length: 40,
        }
    }
}

/// Everything the [`Provider`](crate::Provider) needs besides a storage
/// client.
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    pub tables: TableNames,
    pub throughput: Throughput,
    pub wait: WaitOptions,
    pub device_flow: DeviceFlowOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_names() {
        let tables = TableNames::default();
        assert_eq!(tables.applications, "applications");
        assert_eq!(tables.device_codes, "deviceCodes");
    }

    #[test]
    fn test_prefixed_table_names() {
        let tables = TableNames::with_prefix("idp_");
        assert_eq!(tables.applications, "idp_applications");
        assert_eq!(tables.tokens, "idp_tokens");
    }

    #[test]
    fn test_device_flow_defaults() {
        let options = DeviceFlowOptions::default();
        assert_eq!(options.code_lifetime, Duration::from_secs(300));
        assert_eq!(options.poll_interval, Duration::from_secs(5));
        assert_eq!(options.user_code_length, 8);
        assert_eq!(options.device_code_length, 40);
    }
}
