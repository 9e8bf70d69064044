//! Force parameters for the layout step.

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

/// Configuration for the forces applied by [`step`](super::step).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    /// Rest length of every link (default: 100.0).
    pub link_distance: f32,
    /// Fixed link stiffness. `None` uses `1 / min(degree(source), degree(target))`
    /// so hubs are not yanked around by their many links (default: None).
    pub link_strength: Option<f32>,
    /// Pairwise charge; negative repels (default: -1000.0).
    pub charge_strength: f32,
    /// Barnes-Hut opening angle; 0 disables approximation (default: 0.9).
    pub theta: f32,
    /// Distance floor for charge, avoids blow-ups on near-coincident nodes (default: 1.0).
    pub distance_min: f32,
    /// Charge cutoff distance; `None` means unbounded (default: None).
    pub distance_max: Option<f32>,
    /// Node count above which charge switches to Barnes-Hut (default: 256).
    pub barnes_hut_threshold: usize,
    /// Point every node is pulled toward (default: 480.0, 300.0).
    pub center_x: f32,
    pub center_y: f32,
    /// Pull toward the center, per axis (default: 0.1).
    pub center_strength: f32,
    /// Fraction of an overlap resolved per step (default: 0.7).
    pub collision_strength: f32,
    /// Extra gap added to every collision radius (default: 0.0).
    pub collision_padding: f32,
    /// Fraction of velocity lost per step (default: 0.4).
    pub velocity_decay: f32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            link_distance: 100.0,
            link_strength: None,
            charge_strength: -1000.0,
            theta: 0.9,
            distance_min: 1.0,
            distance_max: None,
            barnes_hut_threshold: 256,
            center_x: 480.0,
            center_y: 300.0,
            center_strength: 0.1,
            collision_strength: 0.7,
            collision_padding: 0.0,
            velocity_decay: 0.4,
        }
    }
}

impl ForceConfig {
    /// Check every parameter is in range.
    pub fn validate(&self) -> GraphResult<()> {
        let checks = [
            (self.link_distance >= 0.0, "link_distance must be non-negative"),
            (
                self.link_strength.is_none_or(|s| s >= 0.0),
                "link_strength must be non-negative",
            ),
            (self.charge_strength.is_finite(), "charge_strength must be finite"),
            (self.theta >= 0.0, "theta must be non-negative"),
            (self.distance_min > 0.0, "distance_min must be positive"),
            (
                self.distance_max.is_none_or(|d| d > self.distance_min),
                "distance_max must exceed distance_min",
            ),
            (
                self.center_x.is_finite() && self.center_y.is_finite(),
                "center must be finite",
            ),
            (self.center_strength >= 0.0, "center_strength must be non-negative"),
            (
                (0.0..=1.0).contains(&self.collision_strength),
                "collision_strength must be in [0, 1]",
            ),
            (
                self.collision_padding >= 0.0,
                "collision_padding must be non-negative",
            ),
            (
                (0.0..=1.0).contains(&self.velocity_decay),
                "velocity_decay must be in [0, 1]",
            ),
        ];

        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, message)) => Err(GraphError::InvalidConfig((*message).to_owned())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ForceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        let config = ForceConfig {
            velocity_decay: 1.5,
            ..ForceConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(GraphError::InvalidConfig(
                "velocity_decay must be in [0, 1]".to_owned()
            ))
        );

        let config = ForceConfig {
            distance_min: 0.0,
            ..ForceConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: ForceConfig =
            serde_json::from_str(r#"{"charge_strength": -400, "center_x": 0, "center_y": 0}"#)
                .unwrap();
        assert_eq!(config.charge_strength, -400.0);
        assert_eq!(config.center_x, 0.0);
        assert_eq!(config.link_distance, 100.0);
        assert_eq!(config.link_strength, None);
    }
}
