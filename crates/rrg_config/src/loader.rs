//! Options file loading and validation.

use crate::error::ConfigError;
use crate::types::GraphOptions;
use std::path::Path;

/// File name looked up by [`load_options`].
pub const OPTIONS_FILE_NAME: &str = "rrgraph.toml";

/// Loads and validates `rrgraph.toml` from a directory.
pub fn load_options(dir: &Path) -> Result<GraphOptions, ConfigError> {
    let content = std::fs::read_to_string(dir.join(OPTIONS_FILE_NAME))?;
    load_options_from_str(&content)
}

/// Parses and validates options from a string.
pub fn load_options_from_str(content: &str) -> Result<GraphOptions, ConfigError> {
    let mut options: GraphOptions =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_options(&mut options)?;
    Ok(options)
}

/// Checks option consistency and normalizes the cut list to ascending order.
fn validate_options(options: &mut GraphOptions) -> Result<(), ConfigError> {
    let interposer = &mut options.interposer;
    if !interposer.delay_multiplier.is_finite() || interposer.delay_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(format!(
            "interposer.delay_multiplier must be a finite value >= 1.0 (got {})",
            interposer.delay_multiplier
        )));
    }
    if !interposer.cuts.is_empty() && interposer.num_cuts > 0 {
        return Err(ConfigError::ValidationError(
            "interposer.cuts and interposer.num_cuts are mutually exclusive".to_string(),
        ));
    }
    interposer.cuts.sort_unstable();
    if let Some(pair) = interposer.cuts.windows(2).find(|w| w[0] == w[1]) {
        return Err(ConfigError::ValidationError(format!(
            "duplicate interposer cut at row {}",
            pair[0]
        )));
    }
    Ok(())
}
