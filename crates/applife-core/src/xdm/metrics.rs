//! Typed XDM event payloads.
//!
//! Internal arithmetic stays on these records; they are serialized to the
//! wire map shape only at the dispatch boundary. Absent facts are omitted
//! from the serialized payload, never fabricated.

use serde::Serialize;

use crate::bus::CloseKind;
use crate::device::DeviceInfo;

/// Fixed environment type for application events.
const ENVIRONMENT_TYPE_APPLICATION: &str = "application";

/// `application` sub-object of launch and close events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct XdmApplication {
    /// Application identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Application name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Version formatted as `"<version> (<versionCode>)"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Set when this launch is the first ever against the store.
    #[serde(rename = "isInstall", skip_serializing_if = "is_false")]
    pub is_install: bool,
    /// Set when the version string changed since the last launch.
    #[serde(rename = "isUpgrade", skip_serializing_if = "is_false")]
    pub is_upgrade: bool,
    /// Set on every launch event.
    #[serde(rename = "isLaunch", skip_serializing_if = "is_false")]
    pub is_launch: bool,
    /// Set on close events.
    #[serde(rename = "isClose", skip_serializing_if = "is_false")]
    pub is_close: bool,
    /// Close classification; close events only.
    #[serde(rename = "closeType", skip_serializing_if = "Option::is_none")]
    pub close_type: Option<CloseKind>,
    /// Session length in whole seconds, floored at zero; close events only.
    #[serde(rename = "sessionLength", skip_serializing_if = "Option::is_none")]
    pub session_length: Option<u64>,
}

impl XdmApplication {
    /// Builds the launch-event application object.
    ///
    /// Every launch event carries `isLaunch`; install and upgrade are
    /// mutually exclusive, install winning when both apply.
    #[must_use]
    pub fn launch(device_info: &DeviceInfo, is_install: bool, is_upgrade: bool) -> Self {
        Self {
            id: device_info.application_identifier.clone(),
            name: device_info.application_name.clone(),
            version: device_info.formatted_application_version(),
            is_install,
            is_upgrade: !is_install && is_upgrade,
            is_launch: true,
            ..Self::default()
        }
    }

    /// Builds the close-event application object.
    #[must_use]
    pub fn close(close_type: CloseKind, session_length_secs: u64) -> Self {
        Self {
            is_close: true,
            close_type: Some(close_type),
            session_length: Some(session_length_secs),
            ..Self::default()
        }
    }
}

/// `device` sub-object of launch events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct XdmDevice {
    /// Device manufacturer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Device model name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Device model number (build id).
    #[serde(rename = "modelNumber", skip_serializing_if = "Option::is_none")]
    pub model_number: Option<String>,
    /// Device form factor.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    /// Screen width in pixels.
    #[serde(rename = "screenWidth", skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,
    /// Screen height in pixels.
    #[serde(rename = "screenHeight", skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,
}

impl XdmDevice {
    /// Builds the device object from static device facts.
    #[must_use]
    pub fn from_device_info(device_info: &DeviceInfo) -> Self {
        Self {
            manufacturer: device_info.device_manufacturer.clone(),
            model: device_info.device_name.clone(),
            model_number: device_info.device_build_id.clone(),
            device_type: device_info.device_type.clone(),
            screen_width: (device_info.screen_width > 0).then_some(device_info.screen_width),
            screen_height: (device_info.screen_height > 0).then_some(device_info.screen_height),
        }
    }
}

/// Nested locale object under `environment`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct XdmLocale {
    /// Locale formatted as `xx-YY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// `environment` sub-object of launch events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XdmEnvironment {
    /// Mobile carrier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    /// Operating system name.
    #[serde(rename = "operatingSystem", skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<String>,
    /// Operating system version.
    #[serde(
        rename = "operatingSystemVersion",
        skip_serializing_if = "Option::is_none"
    )]
    pub operating_system_version: Option<String>,
    /// Fixed environment type.
    #[serde(rename = "type")]
    pub environment_type: &'static str,
    /// Nested locale object.
    #[serde(rename = "_dc", skip_serializing_if = "Option::is_none")]
    pub locale: Option<XdmLocale>,
}

impl XdmEnvironment {
    /// Builds the environment object from static device facts.
    #[must_use]
    pub fn from_device_info(device_info: &DeviceInfo) -> Self {
        Self {
            carrier: device_info.carrier_name.clone(),
            operating_system: device_info.operating_system_name.clone(),
            operating_system_version: device_info.operating_system_version.clone(),
            environment_type: ENVIRONMENT_TYPE_APPLICATION,
            locale: device_info.formatted_locale().map(|language| XdmLocale {
                language: Some(language),
            }),
        }
    }
}

/// Full `xdm` object of an application-launch event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchXdm {
    /// Event type identifier.
    #[serde(rename = "eventType")]
    pub event_type: &'static str,
    /// ISO-8601 timestamp at millisecond precision.
    pub timestamp: String,
    /// Environment facts.
    pub environment: XdmEnvironment,
    /// Device facts.
    pub device: XdmDevice,
    /// Application facts and launch classification.
    pub application: XdmApplication,
}

/// Full `xdm` object of an application-close event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloseXdm {
    /// Event type identifier.
    #[serde(rename = "eventType")]
    pub event_type: &'static str,
    /// ISO-8601 timestamp at millisecond precision.
    pub timestamp: String,
    /// Close classification and session length.
    pub application: XdmApplication,
}

/// Event type identifier for launch events.
pub const EVENT_TYPE_APPLICATION_LAUNCH: &str = "application.launch";
/// Event type identifier for close events.
pub const EVENT_TYPE_APPLICATION_CLOSE: &str = "application.close";

fn is_false(value: &bool) -> bool {
    !*value
}
