//! Device and environment facts consumed by both trackers.
//!
//! The host supplies these once at construction; the engine treats them as an
//! opaque data source and never refreshes them mid-signal. Every field is
//! optional except the screen dimensions — a host that cannot attest to a
//! fact simply leaves it out, and the corresponding payload fields are
//! omitted rather than fabricated.

use serde::{Deserialize, Serialize};

/// Static device, application and environment facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Marketing name of the application.
    pub application_name: Option<String>,
    /// Application identifier (package/bundle id).
    pub application_identifier: Option<String>,
    /// Primary application version string, e.g. `"1.1"`.
    pub application_version: Option<String>,
    /// Build/version code, e.g. `"12345"`.
    pub application_version_code: Option<String>,
    /// Device model name.
    pub device_name: Option<String>,
    /// Device manufacturer.
    pub device_manufacturer: Option<String>,
    /// Device build identifier, surfaced as the model number.
    pub device_build_id: Option<String>,
    /// Device form factor, e.g. `"mobile"`.
    pub device_type: Option<String>,
    /// Operating system name.
    pub operating_system_name: Option<String>,
    /// Operating system version.
    pub operating_system_version: Option<String>,
    /// Mobile carrier name.
    pub carrier_name: Option<String>,
    /// Active locale language, e.g. `"en"`.
    pub locale_language: Option<String>,
    /// Active locale country, e.g. `"US"`.
    pub locale_country: Option<String>,
    /// Screen width in pixels.
    pub screen_width: u32,
    /// Screen height in pixels.
    pub screen_height: u32,
    /// Run mode, e.g. `"APPLICATION"`.
    pub run_mode: Option<String>,
}

impl DeviceInfo {
    /// Formats the application version as `"<version> (<versionCode>)"`.
    ///
    /// Falls back to whichever of the two parts is present; `None` when both
    /// are absent.
    #[must_use]
    pub fn formatted_application_version(&self) -> Option<String> {
        match (
            self.application_version.as_deref(),
            self.application_version_code.as_deref(),
        ) {
            (Some(version), Some(code)) => Some(format!("{version} ({code})")),
            (Some(version), None) => Some(version.to_string()),
            (None, Some(code)) => Some(format!("({code})")),
            (None, None) => None,
        }
    }

    /// Formats the legacy application id as `"<name> <version> (<code>)"`.
    #[must_use]
    pub fn formatted_application_id(&self) -> Option<String> {
        let name = self.application_name.as_deref()?;
        match self.formatted_application_version() {
            Some(version) => Some(format!("{name} {version}")),
            None => Some(name.to_string()),
        }
    }

    /// Formats the locale as `xx-YY`, or just `xx` when no country is set.
    #[must_use]
    pub fn formatted_locale(&self) -> Option<String> {
        let language = self.locale_language.as_deref()?;
        match self.locale_country.as_deref() {
            Some(country) if !country.is_empty() => Some(format!("{language}-{country}")),
            _ => Some(language.to_string()),
        }
    }

    /// Formats the screen resolution as `"<width>x<height>"`.
    #[must_use]
    pub fn formatted_resolution(&self) -> String {
        format!("{}x{}", self.screen_width, self.screen_height)
    }

    /// Formats the operating system as `"<name> <version>"`.
    #[must_use]
    pub fn formatted_operating_system(&self) -> Option<String> {
        match (
            self.operating_system_name.as_deref(),
            self.operating_system_version.as_deref(),
        ) {
            (Some(name), Some(version)) => Some(format!("{name} {version}")),
            (Some(name), None) => Some(name.to_string()),
            (None, Some(version)) => Some(version.to_string()),
            (None, None) => None,
        }
    }
}
