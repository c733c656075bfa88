//! Simulator device model.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Device lifecycle state as reported by `simctl`.
///
/// Unrecognized strings map to [`DeviceState::Unknown`] so a new Xcode
/// release can't break parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceState {
    Shutdown,
    Booted,
    Booting,
    ShuttingDown,
    Unknown,
}

impl DeviceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Shutdown => "Shutdown",
            DeviceState::Booted => "Booted",
            DeviceState::Booting => "Booting",
            DeviceState::ShuttingDown => "Shutting Down",
            DeviceState::Unknown => "Unknown",
        }
    }

    pub fn is_booted(&self) -> bool {
        *self == DeviceState::Booted
    }
}

impl From<&str> for DeviceState {
    fn from(value: &str) -> Self {
        match value {
            "Shutdown" => DeviceState::Shutdown,
            "Booted" => DeviceState::Booted,
            "Booting" => DeviceState::Booting,
            "Shutting Down" => DeviceState::ShuttingDown,
            _ => DeviceState::Unknown,
        }
    }
}

impl From<String> for DeviceState {
    fn from(value: String) -> Self {
        DeviceState::from(value.as_str())
    }
}

impl From<DeviceState> for String {
    fn from(state: DeviceState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse device family used by auto-selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Phone,
    Tablet,
    Other,
}

/// Major/minor runtime version, ordered major first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
}

impl RuntimeVersion {
    /// Parses `com.apple.CoreSimulator.SimRuntime.iOS-17-2` or `iOS-17-2`.
    ///
    /// The platform token before the first `-` is skipped. Components that
    /// are missing or not numeric count as 0.
    pub fn parse(identifier: &str) -> Self {
        let last = identifier.rsplit('.').next().unwrap_or(identifier);
        let mut numbers = last.split('-').skip(1).map(|p| p.parse::<u32>().unwrap_or(0));
        RuntimeVersion {
            major: numbers.next().unwrap_or(0),
            minor: numbers.next().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub udid: String,
    pub name: String,
    pub device_type_identifier: String,
    pub state: DeviceState,
    pub is_available: bool,
    pub runtime_identifier: String,
}

impl Device {
    /// `com.apple.CoreSimulator.SimRuntime.iOS-17-2` → `iOS 17.2`
    pub fn runtime_version(&self) -> String {
        let last = self
            .runtime_identifier
            .rsplit('.')
            .next()
            .unwrap_or(&self.runtime_identifier);
        match last.split_once('-') {
            Some((platform, version)) => format!("{} {}", platform, version.replace('-', ".")),
            None => last.to_string(),
        }
    }

    /// `com.apple.CoreSimulator.SimDeviceType.iPhone-15-Pro` → `iPhone 15 Pro`
    pub fn device_type_name(&self) -> String {
        self.device_type_identifier
            .rsplit('.')
            .next()
            .unwrap_or(&self.device_type_identifier)
            .replace('-', " ")
    }

    pub fn runtime(&self) -> RuntimeVersion {
        RuntimeVersion::parse(&self.runtime_identifier)
    }

    pub fn class(&self) -> DeviceClass {
        if !self.runtime_identifier.contains("iOS") {
            return DeviceClass::Other;
        }
        let matches = |needle: &str| {
            self.name.contains(needle) || self.device_type_identifier.contains(needle)
        };
        if matches("iPhone") {
            DeviceClass::Phone
        } else if matches("iPad") {
            DeviceClass::Tablet
        } else {
            DeviceClass::Other
        }
    }

    pub fn is_pro(&self) -> bool {
        self.name.contains("Pro")
    }

    /// One-line form for the picker: `● iPhone 15 Pro (iOS 17.2)`.
    pub fn display_string(&self) -> String {
        let marker = if self.state.is_booted() { "●" } else { "○" };
        format!("{} {} ({})", marker, self.name, self.runtime_version())
    }
}

/// Booted first, then by name. Display ordering only.
pub fn display_order(lhs: &Device, rhs: &Device) -> Ordering {
    rhs.state
        .is_booted()
        .cmp(&lhs.state.is_booted())
        .then_with(|| lhs.name.cmp(&rhs.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, runtime: &str, state: DeviceState) -> Device {
        Device {
            udid: format!("UDID-{}", name),
            name: name.to_string(),
            device_type_identifier: format!(
                "com.apple.CoreSimulator.SimDeviceType.{}",
                name.replace(' ', "-")
            ),
            state,
            is_available: true,
            runtime_identifier: format!("com.apple.CoreSimulator.SimRuntime.{}", runtime),
        }
    }

    #[test]
    fn state_parses_known_values_and_falls_back_to_unknown() {
        let parsed: DeviceState = serde_json::from_str("\"Shutting Down\"").unwrap();
        assert_eq!(parsed, DeviceState::ShuttingDown);
        let parsed: DeviceState = serde_json::from_str("\"Creating\"").unwrap();
        assert_eq!(parsed, DeviceState::Unknown);
        assert_eq!(serde_json::to_string(&DeviceState::Booted).unwrap(), "\"Booted\"");
    }

    #[test]
    fn runtime_version_parses_major_and_minor() {
        assert_eq!(
            RuntimeVersion::parse("com.apple.CoreSimulator.SimRuntime.iOS-17-2"),
            RuntimeVersion { major: 17, minor: 2 }
        );
        assert_eq!(
            RuntimeVersion::parse("iOS-26-0"),
            RuntimeVersion { major: 26, minor: 0 }
        );
        assert_eq!(
            RuntimeVersion::parse("iOS-x-3"),
            RuntimeVersion { major: 0, minor: 3 }
        );
        assert_eq!(RuntimeVersion::parse("garbage"), RuntimeVersion::default());
    }

    #[test]
    fn runtime_versions_compare_major_then_minor() {
        assert!(RuntimeVersion::parse("iOS-18-0") > RuntimeVersion::parse("iOS-17-5"));
        assert!(RuntimeVersion::parse("iOS-17-2") > RuntimeVersion::parse("iOS-17-0"));
    }

    #[test]
    fn human_readable_names() {
        let d = device("iPhone 15 Pro", "iOS-17-2", DeviceState::Booted);
        assert_eq!(d.runtime_version(), "iOS 17.2");
        assert_eq!(d.device_type_name(), "iPhone 15 Pro");
        assert_eq!(d.display_string(), "● iPhone 15 Pro (iOS 17.2)");
    }

    #[test]
    fn classifies_phones_tablets_and_others() {
        assert_eq!(
            device("iPhone 15", "iOS-17-0", DeviceState::Shutdown).class(),
            DeviceClass::Phone
        );
        assert_eq!(
            device("iPad Air", "iOS-17-0", DeviceState::Shutdown).class(),
            DeviceClass::Tablet
        );
        assert_eq!(
            device("Apple Watch Ultra", "watchOS-10-0", DeviceState::Shutdown).class(),
            DeviceClass::Other
        );
    }

    #[test]
    fn display_order_puts_booted_first() {
        let mut devices = vec![
            device("iPhone 15", "iOS-17-0", DeviceState::Shutdown),
            device("iPhone SE", "iOS-17-0", DeviceState::Booted),
            device("iPad Air", "iOS-17-0", DeviceState::Shutdown),
        ];
        devices.sort_by(display_order);
        let names: Vec<_> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["iPhone SE", "iPad Air", "iPhone 15"]);
    }
}
