use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Light,
    Aircon,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 2] = [DeviceKind::Light, DeviceKind::Aircon];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Aircon => "aircon",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    pub fn initial_state(&self) -> DeviceState {
        match self {
            Self::Light => DeviceState::Light { status: PowerStatus::Off, brightness: 0.0 },
            Self::Aircon => DeviceState::Aircon { status: PowerStatus::Off, temperature: 25.0 },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerStatus {
    On,
    Off,
}

impl PowerStatus {
    pub fn from_command(command: &str) -> Option<Self> {
        match command {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            _ => None,
        }
    }
}

/// Simulated state of one device. The numeric attribute is stored exactly as
/// received; nothing clamps it to the documented range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceState {
    Light { status: PowerStatus, brightness: f64 },
    Aircon { status: PowerStatus, temperature: f64 },
}

impl DeviceState {
    pub fn status(&self) -> PowerStatus {
        match self {
            Self::Light { status, .. } | Self::Aircon { status, .. } => *status,
        }
    }

    pub fn attribute(&self) -> f64 {
        match self {
            Self::Light { brightness, .. } => *brightness,
            Self::Aircon { temperature, .. } => *temperature,
        }
    }

    pub fn set_status(&mut self, next: PowerStatus) {
        match self {
            Self::Light { status, .. } | Self::Aircon { status, .. } => *status = next,
        }
    }

    pub fn set_attribute(&mut self, value: f64) {
        match self {
            Self::Light { brightness, .. } => *brightness = value,
            Self::Aircon { temperature, .. } => *temperature = value,
        }
    }
}
