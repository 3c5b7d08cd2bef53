use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const PERMITTED_SCRIPT_EXEC_TIME_DEFAULT: f64 = 0.05;
pub const PERMITTED_SCRIPT_EXEC_TIME_MIN: f64 = 0.001;
pub const PERMITTED_SCRIPT_EXEC_TIME_MAX: f64 = 0.5;

/// Settings consumed by the script engine. Owned by the host's general settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    pub permitted_per_script_exec_time: f64,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            permitted_per_script_exec_time: PERMITTED_SCRIPT_EXEC_TIME_DEFAULT,
        }
    }
}

impl ScriptSettings {
    pub fn with_exec_time(seconds: f64) -> Self {
        let mut settings = Self {
            permitted_per_script_exec_time: seconds,
        };
        settings.validate();
        settings
    }

    /// Resets an out-of-range execution time to the default.
    pub fn validate(&mut self) {
        let seconds = self.permitted_per_script_exec_time;
        if !seconds.is_finite()
            || !(PERMITTED_SCRIPT_EXEC_TIME_MIN..=PERMITTED_SCRIPT_EXEC_TIME_MAX).contains(&seconds)
        {
            self.permitted_per_script_exec_time = PERMITTED_SCRIPT_EXEC_TIME_DEFAULT;
        }
    }

    pub fn timeout(&self) -> Duration {
        if self.permitted_per_script_exec_time <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.permitted_per_script_exec_time)
    }
}

/// Ceilings applied to every script engine. Native string and array operations cannot be
/// interrupted mid-call, so these bound what a single step can allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptLimits {
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
    pub max_expr_depth: usize,
    pub max_function_expr_depth: usize,
    pub max_call_levels: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_string_size: 65_536,
            max_array_size: 10_000,
            max_map_size: 1_000,
            max_expr_depth: 64,
            max_function_expr_depth: 64,
            max_call_levels: 64,
        }
    }
}

#[cfg(test)]
mod settings_tests {
    use super::*;

    #[test]
    fn validate_resets_out_of_range_values() {
        assert_eq!(
            ScriptSettings::with_exec_time(0.2).permitted_per_script_exec_time,
            0.2
        );
        assert_eq!(
            ScriptSettings::with_exec_time(5.0).permitted_per_script_exec_time,
            PERMITTED_SCRIPT_EXEC_TIME_DEFAULT
        );
        assert_eq!(
            ScriptSettings::with_exec_time(0.0).permitted_per_script_exec_time,
            PERMITTED_SCRIPT_EXEC_TIME_DEFAULT
        );
        assert_eq!(
            ScriptSettings::with_exec_time(f64::NAN).permitted_per_script_exec_time,
            PERMITTED_SCRIPT_EXEC_TIME_DEFAULT
        );
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: ScriptSettings = serde_json::from_str("{}").expect("empty settings");
        assert_eq!(settings.timeout(), Duration::from_millis(50));
        let settings: ScriptSettings =
            serde_json::from_str(r#"{"permitted_per_script_exec_time":0.25}"#)
                .expect("explicit settings");
        assert_eq!(settings.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn limits_fill_missing_fields_from_defaults() {
        let limits: ScriptLimits =
            serde_json::from_str(r#"{"max_string_size":128}"#).expect("partial limits");
        assert_eq!(limits.max_string_size, 128);
        assert_eq!(limits.max_call_levels, ScriptLimits::default().max_call_levels);
    }
}
