/// Connection state of a sub-device as understood by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceStatus {
    Connected,
    Offline,
    Sleep,
    Service,
}

impl DeviceStatus {
    /// Numeric code used on the wire.
    pub fn wire_code(self) -> u8 {
        match self {
            DeviceStatus::Connected => 0,
            DeviceStatus::Offline => 1,
            DeviceStatus::Sleep => 2,
            DeviceStatus::Service => 3,
        }
    }

    pub fn from_wire_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DeviceStatus::Connected),
            1 => Some(DeviceStatus::Offline),
            2 => Some(DeviceStatus::Sleep),
            3 => Some(DeviceStatus::Service),
            _ => None,
        }
    }
}

/// Reason reported with a failed firmware installation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FirmwareUpdateErrorCode {
    UnspecifiedError,
    FileNotPresent,
    FileSystemError,
    InstallationFailed,
    DeviceNotPresent,
}

impl FirmwareUpdateErrorCode {
    pub fn wire_code(self) -> u8 {
        match self {
            FirmwareUpdateErrorCode::UnspecifiedError => 0,
            FirmwareUpdateErrorCode::FileNotPresent => 1,
            FirmwareUpdateErrorCode::FileSystemError => 2,
            FirmwareUpdateErrorCode::InstallationFailed => 3,
            FirmwareUpdateErrorCode::DeviceNotPresent => 4,
        }
    }
}

/// Progress of a firmware installation. The error code exists only on the
/// `Error` variant, so a status can never carry a code without being an
/// error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FirmwareUpdateStatus {
    Installation,
    Completed,
    Aborted,
    Error(FirmwareUpdateErrorCode),
}

impl FirmwareUpdateStatus {
    pub fn state_str(self) -> &'static str {
        match self {
            FirmwareUpdateStatus::Installation => "INSTALLATION",
            FirmwareUpdateStatus::Completed => "COMPLETED",
            FirmwareUpdateStatus::Aborted => "ABORTED",
            FirmwareUpdateStatus::Error(_) => "ERROR",
        }
    }

    pub fn error_code(self) -> Option<FirmwareUpdateErrorCode> {
        match self {
            FirmwareUpdateStatus::Error(code) => Some(code),
            _ => None,
        }
    }
}
