//! `xcrun simctl` adapter: device enumeration and control.
//!
//! Each call shells out and returns; nothing is cached, so every listing
//! reflects the live simulator state.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use super::types::{display_order, Device, DeviceState};
use crate::command;
use crate::error::{Result, TapError};

/// Source of simulator listings.
pub trait DeviceDirectory {
    /// Available simulators, booted first then by name.
    fn list_devices(&self) -> Result<Vec<Device>>;

    fn find_device(&self, udid: &str) -> Result<Option<Device>> {
        Ok(self.list_devices()?.into_iter().find(|d| d.udid == udid))
    }
}

#[derive(Debug, Deserialize)]
struct SimctlDevices {
    devices: HashMap<String, Vec<SimctlDevice>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimctlDevice {
    udid: String,
    name: String,
    #[serde(default)]
    device_type_identifier: String,
    state: DeviceState,
    #[serde(default)]
    is_available: bool,
}

/// Parses `simctl list devices --json`, dropping unavailable devices.
pub fn parse_device_list(json: &str) -> Result<Vec<Device>> {
    let decoded: SimctlDevices = serde_json::from_str(json).map_err(|e| TapError::Json {
        context: "parsing simctl device list".to_string(),
        source: e,
    })?;

    let mut devices: Vec<Device> = decoded
        .devices
        .into_iter()
        .flat_map(|(runtime, devices)| {
            devices
                .into_iter()
                .filter(|d| d.is_available)
                .map(move |d| Device {
                    udid: d.udid,
                    name: d.name,
                    device_type_identifier: d.device_type_identifier,
                    state: d.state,
                    is_available: d.is_available,
                    runtime_identifier: runtime.clone(),
                })
        })
        .collect();

    devices.sort_by(|a, b| display_order(a, b).then_with(|| a.udid.cmp(&b.udid)));
    Ok(devices)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Simctl;

impl DeviceDirectory for Simctl {
    fn list_devices(&self) -> Result<Vec<Device>> {
        let output = simctl(&["list", "devices", "--json"])?;
        parse_device_list(&output)
    }
}

impl Simctl {
    pub fn boot(&self, udid: &str) -> Result<()> {
        simctl(&["boot", udid]).map(drop)
    }

    pub fn shutdown(&self, udid: &str) -> Result<()> {
        simctl(&["shutdown", udid]).map(drop)
    }

    /// Boots the device unless it is already booted. Returns true if it booted it.
    pub fn ensure_booted(&self, udid: &str) -> Result<bool> {
        let device = self
            .find_device(udid)?
            .ok_or_else(|| TapError::ResourceNotFound(udid.to_string()))?;
        if device.state.is_booted() {
            return Ok(false);
        }
        self.boot(udid)?;
        Ok(true)
    }

    pub fn install(&self, udid: &str, app_path: &Path) -> Result<()> {
        let app = app_path.to_string_lossy();
        simctl(&["install", udid, &app])
            .map(drop)
            .map_err(|e| TapError::InstallFailed(e.to_string()))
    }

    pub fn launch(&self, udid: &str, bundle_id: &str) -> Result<()> {
        simctl(&["launch", udid, bundle_id])
            .map(drop)
            .map_err(|e| TapError::LaunchFailed(e.to_string()))
    }

    /// Terminates a running app. Failure is logged and ignored: the app is
    /// usually just not running.
    pub fn terminate(&self, udid: &str, bundle_id: &str) {
        if let Err(e) = simctl(&["terminate", udid, bundle_id]) {
            tracing::warn!(udid, bundle_id, error = %e, "Terminate failed (ignored)");
        }
    }

    pub fn screenshot(&self, udid: &str, output_path: &Path) -> Result<()> {
        let output = output_path.to_string_lossy();
        simctl(&["io", udid, "screenshot", &output]).map(drop)
    }

    /// Boots if needed, then brings Simulator.app to the front on this device.
    pub fn open_simulator_app(&self, udid: &str) -> Result<()> {
        self.ensure_booted(udid)?;
        command::run("open", &["-a", "Simulator", "--args", "-CurrentDeviceUDID", udid]).map(drop)
    }

    /// Command for a continuous compact log stream, optionally filtered to one app.
    pub fn log_stream_command(&self, udid: &str, bundle_id: Option<&str>) -> Command {
        let mut cmd = Command::new("xcrun");
        cmd.args(["simctl", "spawn", udid, "log", "stream", "--style", "compact"]);
        if let Some(bundle_id) = bundle_id {
            cmd.arg("--predicate")
                .arg(format!("subsystem == '{}'", bundle_id));
        }
        cmd
    }
}

fn simctl(args: &[&str]) -> Result<String> {
    let mut full = Vec::with_capacity(args.len() + 1);
    full.push("simctl");
    full.extend_from_slice(args);
    command::run("xcrun", &full)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
      "devices": {
        "com.apple.CoreSimulator.SimRuntime.iOS-17-0": [
          {
            "udid": "AAA",
            "name": "iPhone 15",
            "deviceTypeIdentifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-15",
            "state": "Shutdown",
            "isAvailable": true
          },
          {
            "udid": "BBB",
            "name": "iPhone 15 Pro",
            "deviceTypeIdentifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-15-Pro",
            "state": "Booted",
            "isAvailable": true
          },
          {
            "udid": "CCC",
            "name": "iPhone 8",
            "deviceTypeIdentifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-8",
            "state": "Shutdown",
            "isAvailable": false
          }
        ],
        "com.apple.CoreSimulator.SimRuntime.iOS-16-4": [
          {
            "udid": "DDD",
            "name": "iPad Air",
            "state": "Creating",
            "isAvailable": true
          }
        ]
      }
    }"#;

    #[test]
    fn parses_available_devices_with_runtime() {
        let devices = parse_device_list(SAMPLE).unwrap();
        assert_eq!(devices.len(), 3);
        assert!(devices.iter().all(|d| d.udid != "CCC"));

        let ipad = devices.iter().find(|d| d.udid == "DDD").unwrap();
        assert_eq!(
            ipad.runtime_identifier,
            "com.apple.CoreSimulator.SimRuntime.iOS-16-4"
        );
        assert_eq!(ipad.state, DeviceState::Unknown);
        assert_eq!(ipad.device_type_identifier, "");
    }

    #[test]
    fn listing_is_booted_first_then_by_name() {
        let devices = parse_device_list(SAMPLE).unwrap();
        let names: Vec<_> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["iPhone 15 Pro", "iPad Air", "iPhone 15"]);
    }

    #[test]
    fn malformed_listing_is_json_error() {
        assert!(matches!(
            parse_device_list("{\"devices\": 3}"),
            Err(TapError::Json { .. })
        ));
    }

    #[test]
    fn log_stream_command_adds_predicate_for_bundle() {
        let cmd = Simctl.log_stream_command("AAA", Some("com.example.app"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args[0], "simctl");
        assert!(args.contains(&"--predicate".to_string()));
        assert_eq!(args.last().unwrap(), "subsystem == 'com.example.app'");

        let cmd = Simctl.log_stream_command("AAA", None);
        assert!(cmd.get_args().all(|a| a != "--predicate"));
    }
}
