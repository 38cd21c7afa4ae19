//! Device and application metadata appended to read-style query strings.

use std::collections::BTreeMap;

use sysinfo::System;
use uuid::Uuid;

pub const DEVICE_OS: &str = "device.so";
pub const DEVICE_OS_VERSION: &str = "device.so_version";
pub const DEVICE_WIDTH: &str = "device.width";
pub const DEVICE_HEIGHT: &str = "device.height";
pub const DEVICE_ID: &str = "device.imei";
pub const DEVICE_NAME: &str = "device.name";
pub const APP_VERSION: &str = "app.version";
/// Older servers read the app version from this key.
pub const APP_VERSION_LEGACY: &str = "app_version";
pub const APP_VERSION_CODE: &str = "app.version_code";
pub const OS_VERSION: &str = "so.version";

/// Every key [`diagnostic_params`] emits.
pub const DIAGNOSTIC_KEYS: [&str; 10] = [
    DEVICE_OS,
    DEVICE_OS_VERSION,
    DEVICE_WIDTH,
    DEVICE_HEIGHT,
    DEVICE_ID,
    DEVICE_NAME,
    APP_VERSION,
    APP_VERSION_LEGACY,
    APP_VERSION_CODE,
    OS_VERSION,
];

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub os_name: String,
    pub os_version: String,
    /// Logical screen size; multiplied by `screen_scale` when reported.
    pub screen_width: f64,
    pub screen_height: f64,
    pub screen_scale: f64,
    pub device_id: String,
    pub device_name: String,
    pub app_version: String,
}

/// Supplies the values reported as diagnostic parameters.
pub trait DeviceInfoProvider: Send + Sync {
    fn device_info(&self) -> DeviceInfo;
}

/// Describes the machine the process runs on.
///
/// The device identifier is generated once per provider and stays stable
/// across calls. Headless hosts report a zero-sized screen.
#[derive(Debug, Clone)]
pub struct HostDeviceInfo {
    device_id: String,
    app_version: String,
}

impl HostDeviceInfo {
    pub fn new(app_version: &str) -> Self {
        Self {
            device_id: Uuid::new_v4().to_string(),
            app_version: app_version.to_string(),
        }
    }
}

impl Default for HostDeviceInfo {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

impl DeviceInfoProvider for HostDeviceInfo {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            os_name: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            os_version: System::os_version().unwrap_or_default(),
            screen_width: 0.0,
            screen_height: 0.0,
            screen_scale: 1.0,
            device_id: self.device_id.clone(),
            device_name: System::host_name().unwrap_or_default(),
            app_version: self.app_version.clone(),
        }
    }
}

/// Flattens `info` into the query parameters servers expect.
pub fn diagnostic_params(info: &DeviceInfo) -> BTreeMap<String, String> {
    // Float text, e.g. "640.0".
    let width = format!("{:?}", info.screen_width * info.screen_scale);
    let height = format!("{:?}", info.screen_height * info.screen_scale);

    [
        (DEVICE_OS, info.os_name.clone()),
        (DEVICE_OS_VERSION, info.os_version.clone()),
        (DEVICE_WIDTH, width),
        (DEVICE_HEIGHT, height),
        (DEVICE_ID, info.device_id.clone()),
        (DEVICE_NAME, info.device_name.clone()),
        (APP_VERSION, info.app_version.clone()),
        (APP_VERSION_LEGACY, info.app_version.clone()),
        (APP_VERSION_CODE, String::new()),
        (OS_VERSION, info.os_version.clone()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

/// Merges diagnostic values into `explicit`; a diagnostic value replaces an
/// explicit one under the same key.
pub fn merge_params(
    explicit: &BTreeMap<String, String>,
    diagnostics: Option<BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut merged = explicit.clone();
    if let Some(diagnostics) = diagnostics {
        merged.extend(diagnostics);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> DeviceInfo {
        DeviceInfo {
            os_name: "iOS".to_string(),
            os_version: "17.2".to_string(),
            screen_width: 375.0,
            screen_height: 812.0,
            screen_scale: 3.0,
            device_id: "A1B2".to_string(),
            device_name: "Test Phone".to_string(),
            app_version: "2.4.1".to_string(),
        }
    }

    #[test]
    fn test_params_contain_all_keys() {
        let params = diagnostic_params(&phone());
        for key in DIAGNOSTIC_KEYS {
            assert!(params.contains_key(key), "missing {key}");
        }
        assert_eq!(params.len(), DIAGNOSTIC_KEYS.len());
    }

    #[test]
    fn test_screen_is_scaled() {
        let params = diagnostic_params(&phone());
        assert_eq!(params[DEVICE_WIDTH], "1125.0");
        assert_eq!(params[DEVICE_HEIGHT], "2436.0");
    }

    #[test]
    fn test_fractional_screen_size_is_kept() {
        let mut info = phone();
        info.screen_width = 187.25;
        info.screen_scale = 2.0;
        assert_eq!(diagnostic_params(&info)[DEVICE_WIDTH], "374.5");
    }

    #[test]
    fn test_versions_are_duplicated() {
        let params = diagnostic_params(&phone());
        assert_eq!(params[APP_VERSION], params[APP_VERSION_LEGACY]);
        assert_eq!(params[DEVICE_OS_VERSION], params[OS_VERSION]);
        assert_eq!(params[APP_VERSION_CODE], "");
    }

    #[test]
    fn test_merge_keeps_explicit_keys() {
        let explicit: BTreeMap<String, String> =
            [("page".to_string(), "2".to_string())].into_iter().collect();
        let merged = merge_params(&explicit, Some(diagnostic_params(&phone())));
        assert_eq!(merged["page"], "2");
        assert_eq!(merged[DEVICE_OS], "iOS");
        assert_eq!(merged.len(), DIAGNOSTIC_KEYS.len() + 1);
    }

    #[test]
    fn test_merge_collision_prefers_diagnostics() {
        let explicit: BTreeMap<String, String> =
            [(DEVICE_OS.to_string(), "custom".to_string())].into_iter().collect();
        let merged = merge_params(&explicit, Some(diagnostic_params(&phone())));
        assert_eq!(merged[DEVICE_OS], "iOS");
    }

    #[test]
    fn test_merge_without_diagnostics_is_identity() {
        let explicit: BTreeMap<String, String> =
            [("q".to_string(), "rust".to_string())].into_iter().collect();
        assert_eq!(merge_params(&explicit, None), explicit);
    }

    #[test]
    fn test_host_device_id_is_stable() {
        let host = HostDeviceInfo::new("1.0.0");
        assert_eq!(host.device_info().device_id, host.device_info().device_id);
        assert_eq!(host.device_info().app_version, "1.0.0");
    }
}
