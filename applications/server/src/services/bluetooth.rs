/// Bluetooth speaker management - bluetoothctl wrapper
///
/// All adapter interaction goes through the `bluetoothctl` binary; there is
/// no BlueZ D-Bus client here. Two small JSON files persist the MACs to try
/// at startup (`auto_connect.json`) and the device manual playback should
/// route to (`current_bluetooth_device.json`).
use crate::error::{Result, ServerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const AUTO_CONNECT_FILE: &str = "auto_connect.json";
const CURRENT_DEVICE_FILE: &str = "current_bluetooth_device.json";

/// How long a scan discovers before the device list is read.
const SCAN_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtDevice {
    pub mac: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BtStatus {
    Connected,
    Paired,
    NotConnected,
}

#[derive(Debug, Serialize, Deserialize)]
struct CurrentDevice {
    mac: String,
}

pub struct BluetoothService {
    enabled: bool,
    bluetoothctl_path: PathBuf,
    auto_connect_path: PathBuf,
    current_device_path: PathBuf,
}

impl BluetoothService {
    pub fn new(enabled: bool, bluetoothctl_path: PathBuf, data_dir: &Path) -> Self {
        Self {
            enabled,
            bluetoothctl_path,
            auto_connect_path: data_dir.join(AUTO_CONNECT_FILE),
            current_device_path: data_dir.join(CURRENT_DEVICE_FILE),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Discover nearby devices: scan for a few seconds, then list.
    pub async fn scan(&self) -> Result<Vec<BtDevice>> {
        // bluetoothctl keeps discovering for the given timeout, then exits.
        self.run(&[
            "--timeout",
            &SCAN_DURATION.as_secs().to_string(),
            "scan",
            "on",
        ])
        .await?;
        self.devices().await
    }

    /// All devices the adapter knows about.
    pub async fn devices(&self) -> Result<Vec<BtDevice>> {
        let stdout = self.run(&["devices"]).await?;
        Ok(parse_devices(&stdout))
    }

    /// Devices currently connected.
    pub async fn connected(&self) -> Result<Vec<BtDevice>> {
        let stdout = self.run(&["devices", "Connected"]).await?;
        Ok(parse_devices(&stdout))
    }

    /// Raw `bluetoothctl info` output for one device.
    pub async fn info(&self, mac: &str) -> Result<String> {
        self.run(&["info", mac]).await
    }

    /// Connection status of one device.
    pub async fn status(&self, mac: &str) -> Result<BtStatus> {
        let info = self.info(mac).await?;
        if info.contains("Connected: yes") {
            Ok(BtStatus::Connected)
        } else if info.contains("Paired: yes") {
            Ok(BtStatus::Paired)
        } else {
            Ok(BtStatus::NotConnected)
        }
    }

    /// Pair (if needed) and connect to a device.
    pub async fn connect(&self, mac: &str) -> Result<()> {
        let info = self.info(mac).await?;
        if !info.contains("Paired: yes") {
            self.run(&["pair", mac]).await?;
        }
        self.run(&["connect", mac]).await?;
        tracing::info!("Connected Bluetooth device {}", mac);
        Ok(())
    }

    pub async fn disconnect(&self, mac: &str) -> Result<()> {
        self.run(&["disconnect", mac]).await?;
        Ok(())
    }

    pub async fn pair(&self, mac: &str) -> Result<()> {
        self.run(&["pair", mac]).await?;
        Ok(())
    }

    pub async fn trust(&self, mac: &str) -> Result<()> {
        self.run(&["trust", mac]).await?;
        Ok(())
    }

    pub async fn remove(&self, mac: &str) -> Result<()> {
        self.run(&["remove", mac]).await?;
        Ok(())
    }

    // --- persisted state ---

    pub fn auto_connect_devices(&self) -> Vec<String> {
        read_json(&self.auto_connect_path).unwrap_or_default()
    }

    pub fn add_auto_connect(&self, mac: &str) -> Result<()> {
        let mut devices = self.auto_connect_devices();
        if !devices.iter().any(|m| m == mac) {
            devices.push(mac.to_string());
            write_json(&self.auto_connect_path, &devices)?;
        }
        Ok(())
    }

    pub fn remove_auto_connect(&self, mac: &str) -> Result<()> {
        let mut devices = self.auto_connect_devices();
        devices.retain(|m| m != mac);
        write_json(&self.auto_connect_path, &devices)?;
        Ok(())
    }

    pub fn current_device(&self) -> Option<String> {
        read_json::<CurrentDevice>(&self.current_device_path).map(|d| d.mac)
    }

    pub fn save_current_device(&self, mac: &str) -> Result<()> {
        write_json(
            &self.current_device_path,
            &CurrentDevice {
                mac: mac.to_string(),
            },
        )
    }

    /// Try the auto-connect list in order, stopping at the first device
    /// that connects. Called once at startup; failures are logged, never
    /// fatal.
    pub async fn auto_connect_all(&self) {
        if !self.enabled {
            return;
        }
        for mac in self.auto_connect_devices() {
            match self.connect(&mac).await {
                Ok(()) => {
                    if let Err(e) = self.save_current_device(&mac) {
                        tracing::warn!("Could not persist current device: {}", e);
                    }
                    return;
                }
                Err(e) => tracing::warn!("Auto-connect to {} failed: {}", mac, e),
            }
        }
    }

    /// Make sure the chosen speaker is connected before playback starts.
    /// Best-effort: playback proceeds through the default sink otherwise.
    pub async fn ensure_connected(&self) {
        if !self.enabled {
            return;
        }
        let Some(mac) = self.current_device() else {
            return;
        };
        match self.status(&mac).await {
            Ok(BtStatus::Connected) => {}
            Ok(_) => {
                if let Err(e) = self.connect(&mac).await {
                    tracing::warn!("Could not connect speaker {}: {}", mac, e);
                }
            }
            Err(e) => tracing::warn!("Could not query speaker {}: {}", mac, e),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.bluetoothctl_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ServerError::Bluetooth(format!("bluetoothctl failed to start: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stdout.trim().is_empty() {
                stderr.into_owned()
            } else {
                stdout
            };
            return Err(ServerError::Bluetooth(format!(
                "bluetoothctl {} failed: {}",
                args.join(" "),
                detail.trim()
            )));
        }
        Ok(stdout)
    }
}

/// Parse `bluetoothctl devices` output lines: `Device <MAC> <Name>`.
fn parse_devices(stdout: &str) -> Vec<BtDevice> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, ' ');
            match (parts.next(), parts.next(), parts.next()) {
                (Some("Device"), Some(mac), Some(name)) => Some(BtDevice {
                    mac: mac.to_string(),
                    name: name.to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).map_err(|e| ServerError::Internal(e.to_string()))?;
    std::fs::write(path, raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devices() {
        let out = "Device AA:BB:CC:DD:EE:FF JBL Flip 5\nDevice 11:22:33:44:55:66 Soundbar\nController 00:00:00:00:00:00 hci0\n";
        let devices = parse_devices(out);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].mac, "AA:BB:CC:DD:EE:FF");
        assert_eq!(devices[0].name, "JBL Flip 5");
        assert_eq!(devices[1].name, "Soundbar");
    }

    #[test]
    fn test_parse_devices_ignores_garbage() {
        assert!(parse_devices("").is_empty());
        assert!(parse_devices("Device AA:BB\nnot a device line\n").is_empty());
    }

    #[test]
    fn test_auto_connect_list_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let service =
            BluetoothService::new(true, PathBuf::from("/usr/bin/bluetoothctl"), dir.path());

        assert!(service.auto_connect_devices().is_empty());
        service.add_auto_connect("AA:BB:CC:DD:EE:FF").unwrap();
        service.add_auto_connect("AA:BB:CC:DD:EE:FF").unwrap();
        service.add_auto_connect("11:22:33:44:55:66").unwrap();
        assert_eq!(
            service.auto_connect_devices(),
            vec!["AA:BB:CC:DD:EE:FF", "11:22:33:44:55:66"]
        );

        service.remove_auto_connect("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(service.auto_connect_devices(), vec!["11:22:33:44:55:66"]);
    }

    #[test]
    fn test_current_device_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let service =
            BluetoothService::new(true, PathBuf::from("/usr/bin/bluetoothctl"), dir.path());

        assert!(service.current_device().is_none());
        service.save_current_device("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(
            service.current_device().as_deref(),
            Some("AA:BB:CC:DD:EE:FF")
        );
    }
}
