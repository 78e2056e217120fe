//! Configuration types.

use std::time::Duration;

/// Portal configuration.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Default device ID shown when no app seed is present.
    pub device_id: String,
    /// Default device model name.
    pub device_name: String,
    /// Maximum player identities that can be associated with one device.
    pub max_players: usize,
    /// Simulated delay before a verification email is "delivered".
    pub verification_send_delay: Duration,
    /// Simulated delay between delivery and the verified callback.
    pub verification_confirm_delay: Duration,
    /// External scheme the completion step hands control back to.
    pub return_scheme: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            device_id: "DV-2024-0001".to_string(),
            device_name: "MLMDS".to_string(),
            max_players: 3,
            verification_send_delay: Duration::from_secs(2),
            verification_confirm_delay: Duration::from_millis(1500),
            return_scheme: "rapsodo://".to_string(),
        }
    }
}
