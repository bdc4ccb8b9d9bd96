//! Legacy context data computation.
//!
//! Context data is derived, never stored verbatim: it is recomputed on every
//! start from the freshly loaded session record plus device facts, then
//! flattened to a string map at the boundary. Caller-supplied free-form data
//! is merged last and wins on key collisions.

use std::collections::HashMap;

use crate::device::DeviceInfo;

/// Context data map keys.
pub mod keys {
    /// Install flag key.
    pub const INSTALL_EVENT: &str = "installevent";
    /// Launch flag key.
    pub const LAUNCH_EVENT: &str = "launchevent";
    /// Upgrade flag key.
    pub const UPGRADE_EVENT: &str = "upgradeevent";
    /// Crash flag key.
    pub const CRASH_EVENT: &str = "crashevent";
    /// Daily engaged user flag key.
    pub const DAILY_ENGAGED_EVENT: &str = "dailyenguserevent";
    /// Monthly engaged user flag key.
    pub const MONTHLY_ENGAGED_EVENT: &str = "monthlyenguserevent";
    /// Install date key.
    pub const INSTALL_DATE: &str = "installdate";
    /// Launch counter key.
    pub const LAUNCHES: &str = "launches";
    /// Days since first launch key.
    pub const DAYS_SINCE_FIRST_LAUNCH: &str = "dayssincefirstuse";
    /// Days since last launch key.
    pub const DAYS_SINCE_LAST_LAUNCH: &str = "dayssincelastuse";
    /// Hour of day key.
    pub const HOUR_OF_DAY: &str = "hourofday";
    /// Day of week key.
    pub const DAY_OF_WEEK: &str = "dayofweek";
    /// Operating system key.
    pub const OPERATING_SYSTEM: &str = "osversion";
    /// Locale key.
    pub const LOCALE: &str = "locale";
    /// Device name key.
    pub const DEVICE_NAME: &str = "devicename";
    /// Device resolution key.
    pub const DEVICE_RESOLUTION: &str = "resolution";
    /// Carrier name key.
    pub const CARRIER_NAME: &str = "carriername";
    /// Application id key.
    pub const APP_ID: &str = "appid";
    /// Run mode key.
    pub const RUN_MODE: &str = "runmode";
    /// Previous session length key.
    pub const PREVIOUS_SESSION_LENGTH: &str = "prevsessionlength";
    /// Ignored session length key.
    pub const IGNORED_SESSION_LENGTH: &str = "ignoredsessionlength";
    /// Advertising identifier key.
    pub const ADVERTISING_IDENTIFIER: &str = "advertisingidentifier";
    /// Previous operating system key.
    pub const PREVIOUS_OS_VERSION: &str = "previousosversion";
    /// Previous application id key.
    pub const PREVIOUS_APP_ID: &str = "previousappid";
}

/// Context data flag values.
pub mod values {
    /// Install flag value.
    pub const INSTALL_EVENT: &str = "InstallEvent";
    /// Launch flag value.
    pub const LAUNCH_EVENT: &str = "LaunchEvent";
    /// Upgrade flag value.
    pub const UPGRADE_EVENT: &str = "UpgradeEvent";
    /// Crash flag value.
    pub const CRASH_EVENT: &str = "CrashEvent";
    /// Daily engaged user flag value.
    pub const DAILY_ENGAGED_EVENT: &str = "DailyEngUserEvent";
    /// Monthly engaged user flag value.
    pub const MONTHLY_ENGAGED_EVENT: &str = "MonthlyEngUserEvent";
}

/// Typed context data computed for one launch.
///
/// Internal arithmetic stays on these fields; [`ContextData::into_map`]
/// produces the string map published as shared state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextData {
    /// Set on the first-ever launch against this store.
    pub install_event: bool,
    /// Set on every new session.
    pub launch_event: bool,
    /// Set when the version string changed since the last launch.
    pub upgrade_event: bool,
    /// Set when the previous session never recorded a pause.
    pub crash_event: bool,
    /// Set on the first launch of a UTC day.
    pub daily_engaged_event: bool,
    /// Set on the first launch of a UTC month.
    pub monthly_engaged_event: bool,
    /// Formatted install date.
    pub install_date: Option<String>,
    /// Launch counter.
    pub launches: Option<u64>,
    /// Calendar days since the install date.
    pub days_since_first_use: Option<u64>,
    /// Calendar days since the previous launch.
    pub days_since_last_use: Option<u64>,
    /// Hour of day of this launch.
    pub hour_of_day: Option<u32>,
    /// Day of week of this launch (1 = Sunday).
    pub day_of_week: Option<u32>,
    /// Length in seconds of the previous, cleanly closed session.
    pub previous_session_length: Option<u64>,
    /// Length in seconds of a previous session discarded for exceeding the
    /// maximum session bound.
    pub ignored_session_length: Option<u64>,
    /// Operating system string.
    pub operating_system: Option<String>,
    /// Locale as `xx-YY`.
    pub locale: Option<String>,
    /// Device name.
    pub device_name: Option<String>,
    /// Screen resolution as `WxH`.
    pub device_resolution: Option<String>,
    /// Carrier name.
    pub carrier_name: Option<String>,
    /// Application id as `Name Version (code)`.
    pub app_id: Option<String>,
    /// Run mode.
    pub run_mode: Option<String>,
    /// Previous operating system string, included for crashed sessions.
    pub previous_os_version: Option<String>,
    /// Previous application id, included for crashed sessions.
    pub previous_app_id: Option<String>,
    /// Advertising identifier.
    pub advertising_identifier: Option<String>,
    /// Caller-supplied free-form data, merged last.
    pub additional: HashMap<String, String>,
}

impl ContextData {
    /// Creates context data seeded with device facts only.
    #[must_use]
    pub fn with_device_info(device_info: &DeviceInfo) -> Self {
        Self {
            operating_system: device_info.formatted_operating_system(),
            locale: device_info.formatted_locale(),
            device_name: device_info.device_name.clone(),
            device_resolution: Some(device_info.formatted_resolution()),
            carrier_name: device_info.carrier_name.clone(),
            app_id: device_info.formatted_application_id(),
            run_mode: device_info.run_mode.clone(),
            ..Self::default()
        }
    }

    /// Flattens to the boundary string map.
    ///
    /// Free-form caller data is inserted last, overwriting computed keys on
    /// collision with no further resolution.
    #[must_use]
    pub fn into_map(self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        if self.install_event {
            map.insert(keys::INSTALL_EVENT.to_string(), values::INSTALL_EVENT.to_string());
        }
        if self.launch_event {
            map.insert(keys::LAUNCH_EVENT.to_string(), values::LAUNCH_EVENT.to_string());
        }
        if self.upgrade_event {
            map.insert(keys::UPGRADE_EVENT.to_string(), values::UPGRADE_EVENT.to_string());
        }
        if self.crash_event {
            map.insert(keys::CRASH_EVENT.to_string(), values::CRASH_EVENT.to_string());
        }
        if self.daily_engaged_event {
            map.insert(
                keys::DAILY_ENGAGED_EVENT.to_string(),
                values::DAILY_ENGAGED_EVENT.to_string(),
            );
        }
        if self.monthly_engaged_event {
            map.insert(
                keys::MONTHLY_ENGAGED_EVENT.to_string(),
                values::MONTHLY_ENGAGED_EVENT.to_string(),
            );
        }

        insert_opt(&mut map, keys::INSTALL_DATE, self.install_date);
        insert_opt(&mut map, keys::LAUNCHES, self.launches.map(|v| v.to_string()));
        insert_opt(
            &mut map,
            keys::DAYS_SINCE_FIRST_LAUNCH,
            self.days_since_first_use.map(|v| v.to_string()),
        );
        insert_opt(
            &mut map,
            keys::DAYS_SINCE_LAST_LAUNCH,
            self.days_since_last_use.map(|v| v.to_string()),
        );
        insert_opt(&mut map, keys::HOUR_OF_DAY, self.hour_of_day.map(|v| v.to_string()));
        insert_opt(&mut map, keys::DAY_OF_WEEK, self.day_of_week.map(|v| v.to_string()));
        insert_opt(
            &mut map,
            keys::PREVIOUS_SESSION_LENGTH,
            self.previous_session_length.map(|v| v.to_string()),
        );
        insert_opt(
            &mut map,
            keys::IGNORED_SESSION_LENGTH,
            self.ignored_session_length.map(|v| v.to_string()),
        );
        insert_opt(&mut map, keys::OPERATING_SYSTEM, self.operating_system);
        insert_opt(&mut map, keys::LOCALE, self.locale);
        insert_opt(&mut map, keys::DEVICE_NAME, self.device_name);
        insert_opt(&mut map, keys::DEVICE_RESOLUTION, self.device_resolution);
        insert_opt(&mut map, keys::CARRIER_NAME, self.carrier_name);
        insert_opt(&mut map, keys::APP_ID, self.app_id);
        insert_opt(&mut map, keys::RUN_MODE, self.run_mode);
        insert_opt(&mut map, keys::PREVIOUS_OS_VERSION, self.previous_os_version);
        insert_opt(&mut map, keys::PREVIOUS_APP_ID, self.previous_app_id);
        insert_opt(&mut map, keys::ADVERTISING_IDENTIFIER, self.advertising_identifier);

        map.extend(self.additional);
        map
    }
}

fn insert_opt(map: &mut HashMap<String, String>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_device_info() -> DeviceInfo {
        DeviceInfo {
            application_name: Some("TEST_APPLICATION_NAME".to_string()),
            application_version: Some("1.1".to_string()),
            application_version_code: Some("12345".to_string()),
            device_name: Some("deviceName".to_string()),
            operating_system_name: Some("TEST_OS".to_string()),
            operating_system_version: Some("5.55".to_string()),
            carrier_name: Some("TEST_CARRIER".to_string()),
            locale_language: Some("en".to_string()),
            locale_country: Some("US".to_string()),
            screen_width: 100,
            screen_height: 100,
            run_mode: Some("APPLICATION".to_string()),
            ..DeviceInfo::default()
        }
    }

    #[test]
    fn test_device_seeded_context() {
        let ctx = ContextData::with_device_info(&test_device_info());
        let map = ctx.into_map();
        assert_eq!(map.get(keys::OPERATING_SYSTEM).unwrap(), "TEST_OS 5.55");
        assert_eq!(map.get(keys::LOCALE).unwrap(), "en-US");
        assert_eq!(map.get(keys::DEVICE_RESOLUTION).unwrap(), "100x100");
        assert_eq!(map.get(keys::CARRIER_NAME).unwrap(), "TEST_CARRIER");
        assert_eq!(map.get(keys::APP_ID).unwrap(), "TEST_APPLICATION_NAME 1.1 (12345)");
        assert!(!map.contains_key(keys::LAUNCH_EVENT));
    }

    #[test]
    fn test_flags_emit_fixed_values() {
        let ctx = ContextData {
            install_event: true,
            launch_event: true,
            daily_engaged_event: true,
            monthly_engaged_event: true,
            ..ContextData::default()
        };
        let map = ctx.into_map();
        assert_eq!(map.get(keys::INSTALL_EVENT).unwrap(), values::INSTALL_EVENT);
        assert_eq!(map.get(keys::LAUNCH_EVENT).unwrap(), values::LAUNCH_EVENT);
        assert_eq!(map.get(keys::DAILY_ENGAGED_EVENT).unwrap(), values::DAILY_ENGAGED_EVENT);
        assert_eq!(
            map.get(keys::MONTHLY_ENGAGED_EVENT).unwrap(),
            values::MONTHLY_ENGAGED_EVENT
        );
        assert!(!map.contains_key(keys::UPGRADE_EVENT));
        assert!(!map.contains_key(keys::CRASH_EVENT));
    }

    #[test]
    fn test_additional_data_wins_on_collision() {
        let ctx = ContextData {
            launches: Some(3),
            additional: HashMap::from([
                (keys::LAUNCHES.to_string(), "overridden".to_string()),
                ("custom".to_string(), "value".to_string()),
            ]),
            ..ContextData::default()
        };
        let map = ctx.into_map();
        assert_eq!(map.get(keys::LAUNCHES).unwrap(), "overridden");
        assert_eq!(map.get("custom").unwrap(), "value");
    }

    #[test]
    fn test_counters_stringified() {
        let ctx = ContextData {
            launches: Some(7),
            days_since_first_use: Some(2),
            days_since_last_use: Some(1),
            hour_of_day: Some(10),
            day_of_week: Some(7),
            previous_session_length: Some(42),
            ..ContextData::default()
        };
        let map = ctx.into_map();
        assert_eq!(map.get(keys::LAUNCHES).unwrap(), "7");
        assert_eq!(map.get(keys::DAYS_SINCE_FIRST_LAUNCH).unwrap(), "2");
        assert_eq!(map.get(keys::DAYS_SINCE_LAST_LAUNCH).unwrap(), "1");
        assert_eq!(map.get(keys::HOUR_OF_DAY).unwrap(), "10");
        assert_eq!(map.get(keys::DAY_OF_WEEK).unwrap(), "7");
        assert_eq!(map.get(keys::PREVIOUS_SESSION_LENGTH).unwrap(), "42");
        assert!(!map.contains_key(keys::IGNORED_SESSION_LENGTH));
    }
}
