use serde::{Deserialize, Serialize};

/// Deepest heading level markdown supports
pub const MAX_SUPPORTED_HEADING_DEPTH: usize = 6;

/// Configuration for markdown splitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Hard upper bound on chunk length, in characters
    pub max_chars: usize,

    /// Characters shared by consecutive windows of one section
    pub overlap_chars: usize,

    /// Headings deeper than this level do not start a new section
    pub max_heading_depth: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_chars: 1200,
            overlap_chars: 200,
            max_heading_depth: 3,
        }
    }
}

impl SplitterConfig {
    /// Create config optimized for embeddings (smaller, focused chunks)
    pub fn for_embeddings() -> Self {
        Self {
            max_chars: 800,
            overlap_chars: 120,
            ..Default::default()
        }
    }

    /// Create config optimized for LLM context (larger, comprehensive chunks)
    pub fn for_llm_context() -> Self {
        Self {
            max_chars: 4000,
            overlap_chars: 400,
            max_heading_depth: 4,
        }
    }

    /// Window advance per iteration. Always at least one character once validated.
    #[must_use]
    pub const fn step(&self) -> usize {
        self.max_chars.saturating_sub(self.overlap_chars)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chars == 0 {
            return Err("max_chars must be > 0".to_string());
        }

        if self.overlap_chars >= self.max_chars {
            return Err(format!(
                "overlap_chars ({}) must be less than max_chars ({})",
                self.overlap_chars, self.max_chars
            ));
        }

        if self.max_heading_depth == 0 || self.max_heading_depth > MAX_SUPPORTED_HEADING_DEPTH {
            return Err(format!(
                "max_heading_depth ({}) must be between 1 and {MAX_SUPPORTED_HEADING_DEPTH}",
                self.max_heading_depth
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = SplitterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.step(), 1000);
    }

    #[test]
    fn test_preset_configs_valid() {
        assert!(SplitterConfig::for_embeddings().validate().is_ok());
        assert!(SplitterConfig::for_llm_context().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SplitterConfig {
            max_chars: 50,
            overlap_chars: 50,
            max_heading_depth: 3,
        };
        // Invalid: no forward progress
        assert!(config.validate().is_err());

        config.overlap_chars = 49;
        assert!(config.validate().is_ok());
        assert_eq!(config.step(), 1);

        // Invalid: max = 0
        config.max_chars = 0;
        config.overlap_chars = 0;
        assert!(config.validate().is_err());

        config.max_chars = 10;
        config.max_heading_depth = 7;
        assert!(config.validate().is_err());

        config.max_heading_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_input_uses_defaults() {
        let config: SplitterConfig = serde_json::from_str(r#"{"max_chars": 300}"#).unwrap();
        assert_eq!(config.max_chars, 300);
        assert_eq!(config.overlap_chars, 200);
        assert_eq!(config.max_heading_depth, 3);
    }
}
