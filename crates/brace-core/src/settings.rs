//! Reinforcement settings
//!
//! A flat set of named numeric and boolean options. Settings are supplied to the
//! manager once at construction and can be swapped at runtime; they are stored
//! on disk as RON.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Options controlling every reinforcement pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReinforcementSettings {
    /// Strengthen primary joints from their estimated cross-section
    pub reinforce_attach_nodes: bool,
    /// Add long-range joints past light intermediate bodies
    pub multi_part_attach_node_reinforcement: bool,
    /// Link leaves to each other and to the root
    pub tree_completion: bool,
    /// Stiffen the bodies around decouplers
    pub reinforce_decouplers_further: bool,
    /// Scale strength with volume (area^1.5) instead of area
    pub use_volume_not_area: bool,

    /// Multiplier applied to a joint's existing break force
    pub break_force_multiplier: f32,
    /// Multiplier applied to a joint's existing break torque
    pub break_torque_multiplier: f32,
    /// Break force per unit of cross-section area
    pub break_strength_per_area: f32,
    /// Break torque per unit of cross-section moment of inertia
    pub break_torque_per_moi: f32,
    /// Angular drive spring per unit of moment of inertia
    pub angular_drive_spring: f32,
    /// Angular drive damper per unit of moment of inertia
    pub angular_drive_damper: f32,
    /// Break force and torque for lattice and decoupler joints (<= 0 is unbreakable)
    pub auxiliary_joint_strength: f32,

    /// Bodies lighter than this (including resources) are never adjusted
    pub mass_for_adjustment: f32,
    /// Mass ratio above which reinforcement skips past the lighter body
    pub stiffening_extension_mass_ratio_threshold: f32,

    /// Module names that exempt a body from any adjustment
    pub exempt_module_types: Vec<String>,
    /// Module names that let decoupler stiffening extend past a body
    pub decoupler_stiffening_extension_types: Vec<String>,

    /// Steps a deferred pass may wait before it is abandoned
    pub max_deferred_steps: u32,
}

impl Default for ReinforcementSettings {
    fn default() -> Self {
        Self {
            reinforce_attach_nodes: true,
            multi_part_attach_node_reinforcement: true,
            tree_completion: true,
            reinforce_decouplers_further: true,
            use_volume_not_area: true,
            break_force_multiplier: 1.0,
            break_torque_multiplier: 1.0,
            break_strength_per_area: 1500.0,
            break_torque_per_moi: 6000.0,
            angular_drive_spring: 5e12,
            angular_drive_damper: 25.0,
            auxiliary_joint_strength: -1.0,
            mass_for_adjustment: 0.001,
            stiffening_extension_mass_ratio_threshold: 5.0,
            exempt_module_types: vec!["MuMechToggle".to_string()],
            decoupler_stiffening_extension_types: vec![
                "ModuleEngines".to_string(),
                "ModuleEnginesFX".to_string(),
                "ProceduralFairingBase".to_string(),
                "ModuleProceduralFairing".to_string(),
            ],
            max_deferred_steps: 600,
        }
    }
}

impl ReinforcementSettings {
    /// Break force/torque for auxiliary joints, resolving the "unbreakable" sentinel
    pub fn auxiliary_strength(&self) -> f32 {
        if self.auxiliary_joint_strength <= 0.0 {
            f32::INFINITY
        } else {
            self.auxiliary_joint_strength
        }
    }

    /// Whether a module name exempts its body from adjustment
    pub fn is_exempt_module(&self, module: &str) -> bool {
        self.exempt_module_types.iter().any(|m| m == module)
    }

    /// Whether a module name extends decoupler stiffening past its body
    pub fn is_stiffening_extension(&self, module: &str) -> bool {
        self.decoupler_stiffening_extension_types
            .iter()
            .any(|m| m == module)
    }

    /// Check that the numeric options are usable
    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = [
            ("break_force_multiplier", self.break_force_multiplier),
            ("break_torque_multiplier", self.break_torque_multiplier),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(SettingsError::Invalid(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("break_strength_per_area", self.break_strength_per_area),
            ("break_torque_per_moi", self.break_torque_per_moi),
            ("angular_drive_spring", self.angular_drive_spring),
            ("angular_drive_damper", self.angular_drive_damper),
            ("mass_for_adjustment", self.mass_for_adjustment),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(SettingsError::Invalid(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }

        if !(self.stiffening_extension_mass_ratio_threshold >= 1.0) {
            return Err(SettingsError::Invalid(format!(
                "stiffening_extension_mass_ratio_threshold must be at least 1, got {}",
                self.stiffening_extension_mass_ratio_threshold
            )));
        }

        Ok(())
    }

    /// Save settings to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let content = self.to_bytes()?;
        std::fs::write(path.as_ref(), content).map_err(|e| SettingsError::Io(e.to_string()))?;
        Ok(())
    }

    /// Serialize settings to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, SettingsError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SettingsError::Serialize(e.to_string()))?;
        Ok(content.into_bytes())
    }

    /// Load and validate settings from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| SettingsError::Io(e.to_string()))?;
        Self::load_from_bytes(content.as_bytes())
    }

    /// Load and validate settings from bytes
    pub fn load_from_bytes(data: &[u8]) -> Result<Self, SettingsError> {
        let content =
            std::str::from_utf8(data).map_err(|e| SettingsError::Deserialize(e.to_string()))?;
        let settings: ReinforcementSettings =
            ron::from_str(content).map_err(|e| SettingsError::Deserialize(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Settings-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ReinforcementSettings::default().validate().is_ok());
    }

    #[test]
    fn test_auxiliary_strength_sentinel() {
        let mut settings = ReinforcementSettings::default();
        assert!(settings.auxiliary_strength().is_infinite());

        settings.auxiliary_joint_strength = 250.0;
        assert_eq!(settings.auxiliary_strength(), 250.0);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings =
            ReinforcementSettings::load_from_bytes(b"(break_strength_per_area: 3000.0)").unwrap();
        assert_eq!(settings.break_strength_per_area, 3000.0);
        assert_eq!(settings.break_torque_per_moi, 6000.0);
        assert!(settings.reinforce_attach_nodes);
    }

    #[test]
    fn test_rejects_low_ratio_threshold() {
        let result = ReinforcementSettings::load_from_bytes(
            b"(stiffening_extension_mass_ratio_threshold: 0.5)",
        );
        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.ron");

        let mut settings = ReinforcementSettings::default();
        settings.tree_completion = false;
        settings.exempt_module_types.push("ModuleRoboticServoHinge".to_string());
        settings.save(&path).unwrap();

        let loaded = ReinforcementSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_module_lookups() {
        let settings = ReinforcementSettings::default();
        assert!(settings.is_exempt_module("MuMechToggle"));
        assert!(!settings.is_exempt_module("ModuleEngines"));
        assert!(settings.is_stiffening_extension("ModuleEngines"));
    }
}
