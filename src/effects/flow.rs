//! Configs of the feedback stage: the per-pixel motion field, luminance
//! gradient flow and the procedural domain warp.

use super::{ROTATION_SPEED_MAX, param_table};
use serde::{Deserialize, Serialize};

/// Spatial motion applied to the previous frame before it is blended back.
///
/// Each component has a base term, a radial term scaled by distance from
/// the center and an angular term `sin(angle * freq)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowFieldConfig {
    /// Below 1 pulls the image inward.
    pub zoom_base: f32,
    pub zoom_radial: f32,
    /// Radians per second.
    pub rotation_speed: f32,
    pub rotation_speed_radial: f32,
    pub dx_base: f32,
    pub dx_radial: f32,
    pub dy_base: f32,
    pub dy_radial: f32,
    pub cx: f32,
    pub cy: f32,
    pub sx: f32,
    pub sy: f32,
    pub zoom_angular: f32,
    pub zoom_angular_freq: i32,
    pub rot_angular: f32,
    pub rot_angular_freq: i32,
    pub dx_angular: f32,
    pub dx_angular_freq: i32,
    pub dy_angular: f32,
    pub dy_angular_freq: i32,
}

impl Default for FlowFieldConfig {
    fn default() -> Self {
        Self {
            zoom_base: 0.995,
            zoom_radial: 0.0,
            rotation_speed: 0.0,
            rotation_speed_radial: 0.0,
            dx_base: 0.0,
            dx_radial: 0.0,
            dy_base: 0.0,
            dy_radial: 0.0,
            cx: 0.5,
            cy: 0.5,
            sx: 1.0,
            sy: 1.0,
            zoom_angular: 0.0,
            zoom_angular_freq: 2,
            rot_angular: 0.0,
            rot_angular_freq: 2,
            dx_angular: 0.0,
            dx_angular_freq: 2,
            dy_angular: 0.0,
            dy_angular_freq: 2,
        }
    }
}

param_table!(FlowFieldConfig {
    zoom_base: "zoomBase" => 0.98, 1.02;
    zoom_radial: "zoomRadial" => -0.02, 0.02;
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    rotation_speed_radial: "rotationSpeedRadial" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    dx_base: "dxBase" => -0.02, 0.02;
    dx_radial: "dxRadial" => -0.02, 0.02;
    dy_base: "dyBase" => -0.02, 0.02;
    dy_radial: "dyRadial" => -0.02, 0.02;
    cx: "cx" => 0.0, 1.0;
    cy: "cy" => 0.0, 1.0;
    sx: "sx" => 0.9, 1.1;
    sy: "sy" => 0.9, 1.1;
    zoom_angular: "zoomAngular" => -0.05, 0.05;
    rot_angular: "rotAngular" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    dx_angular: "dxAngular" => -0.02, 0.02;
    dy_angular: "dyAngular" => -0.02, 0.02;
});

impl FlowFieldConfig {
    pub fn is_identity(&self) -> bool {
        *self
            == Self {
                zoom_base: 1.0,
                ..Self::default()
            }
    }
}

/// Displacement along (or across) the luminance gradient of the previous frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedbackFlowConfig {
    pub strength: f32,
    /// Degrees; 0 follows the gradient, 90 circulates along isolines.
    pub flow_angle: f32,
    pub scale: f32,
    /// Gradients weaker than this are ignored.
    pub threshold: f32,
}

impl Default for FeedbackFlowConfig {
    fn default() -> Self {
        Self {
            strength: 0.0,
            flow_angle: 0.0,
            scale: 1.0,
            threshold: 0.001,
        }
    }
}

param_table!(FeedbackFlowConfig {
    strength: "strength" => 0.0, 20.0;
    flow_angle: "flowAngle" => 0.0, 360.0;
    scale: "scale" => 1.0, 5.0;
    threshold: "threshold" => 0.0, 0.1;
});

/// Animated noise displacement inside the feedback pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProceduralWarpConfig {
    pub warp: f32,
    pub warp_speed: f32,
    /// Feature size in normalized units; the kernel receives its inverse.
    pub warp_scale: f32,
}

impl Default for ProceduralWarpConfig {
    fn default() -> Self {
        Self {
            warp: 0.0,
            warp_speed: 1.0,
            warp_scale: 1.0,
        }
    }
}

param_table!(ProceduralWarpConfig {
    warp: "warp" => 0.0, 2.0;
    warp_speed: "warpSpeed" => 0.1, 2.0;
    warp_scale: "warpScale" => 0.1, 100.0;
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::ParamTable;

    #[test]
    fn flow_params_resolve_by_id() {
        let mut f = FlowFieldConfig::default();
        assert_eq!(f.param("zoomBase"), Some(0.995));
        *f.param_mut("cx").expect("cx is a param") = 0.25;
        assert_eq!(f.cx, 0.25);
        assert_eq!(f.param("zoomAngularFreq"), None);
    }

    #[test]
    fn unit_zoom_is_identity() {
        let f = FlowFieldConfig {
            zoom_base: 1.0,
            ..FlowFieldConfig::default()
        };
        assert!(f.is_identity());
        assert!(!FlowFieldConfig::default().is_identity());
    }
}
