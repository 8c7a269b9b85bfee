//! Which remote this build is.

use remote_proto::{Button, DeviceRole, RemoteConfig};

/// Role of this remote on the link, fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RemoteRole {
    /// Left-hand remote.
    Primary,
    /// Right-hand remote.
    Secondary,
}

impl RemoteRole {
    #[must_use]
    pub const fn device_role(self) -> DeviceRole {
        match self {
            Self::Primary => DeviceRole::PrimaryRemote,
            Self::Secondary => DeviceRole::SecondaryRemote,
        }
    }

    /// Role of the other remote.
    #[must_use]
    pub const fn peer_role(self) -> DeviceRole {
        match self {
            Self::Primary => DeviceRole::SecondaryRemote,
            Self::Secondary => DeviceRole::PrimaryRemote,
        }
    }

    /// Whether this remote currently holds authority over the droid.
    ///
    /// Exactly one of the two remotes does for any value of `left_is_primary`.
    #[must_use]
    pub const fn holds_authority(self, left_is_primary: bool) -> bool {
        left_is_primary == matches!(self, Self::Primary)
    }

    /// This side's incremental-rotation binding.
    #[must_use]
    pub const fn rotation_button(self, config: &RemoteConfig) -> Option<Button> {
        match self {
            Self::Primary => config.left_incr_rotation,
            Self::Secondary => config.right_incr_rotation,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Primary => "left",
            Self::Secondary => "right",
        }
    }
}
