use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dashboard status indicators. Display only; nothing in the store reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    pub is_online: bool,
    pub satellite_link: bool,
    pub analysis_link: bool,
    pub last_update: DateTime<Utc>,
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self { is_online: true, satellite_link: true, analysis_link: true, last_update: Utc::now() }
    }
}

/// Partial update for [`SystemStatus`]; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemStatusPatch {
    pub is_online: Option<bool>,
    pub satellite_link: Option<bool>,
    pub analysis_link: Option<bool>,
    pub last_update: Option<DateTime<Utc>>,
}

impl SystemStatus {
    pub fn merge(&mut self, patch: SystemStatusPatch) {
        if let Some(v) = patch.is_online {
            self.is_online = v;
        }
        if let Some(v) = patch.satellite_link {
            self.satellite_link = v;
        }
        if let Some(v) = patch.analysis_link {
            self.analysis_link = v;
        }
        if let Some(v) = patch.last_update {
            self.last_update = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_only_touches_given_fields() {
        let mut status = SystemStatus::default();
        let before = status.last_update;

        status.merge(SystemStatusPatch { satellite_link: Some(false), ..Default::default() });

        assert!(!status.satellite_link);
        assert!(status.is_online);
        assert!(status.analysis_link);
        assert_eq!(status.last_update, before);
    }
}
