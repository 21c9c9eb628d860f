/// Bridge settings, read from the environment with sane defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Prefix of generated correlation ids (`{prefix}-{n}`)
    pub id_prefix: String,
    /// Pending-query count above which every new query logs a warning
    pub pending_warn_threshold: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            id_prefix: "q".to_string(),
            pending_warn_threshold: 64,
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            id_prefix: std::env::var("FRAMEBRIDGE_ID_PREFIX")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(default.id_prefix),
            pending_warn_threshold: std::env::var("FRAMEBRIDGE_PENDING_WARN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.pending_warn_threshold),
        }
    }

    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }
}
