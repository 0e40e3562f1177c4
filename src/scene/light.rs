use glam::Vec3;

/// The six fixed light categories.
///
/// Declaration order is the bucket order used by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    Ambient,
    Directional,
    Omni,
    Spot,
    Ies,
    Probe,
}

impl LightType {
    pub const COUNT: usize = 6;

    pub const ALL: [LightType; Self::COUNT] = [
        Self::Ambient,
        Self::Directional,
        Self::Omni,
        Self::Spot,
        Self::Ies,
        Self::Probe,
    ];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Cone parameters of a spot light, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotCone {
    pub inner_angle: f32,
    pub outer_angle: f32,
}

impl Default for SpotCone {
    fn default() -> Self {
        Self {
            inner_angle: 0.0,
            outer_angle: std::f32::consts::FRAC_PI_4,
        }
    }
}

/// A light attached to a scene node.
///
/// Position and direction come from the owning node's world transform:
/// lights shine down their local -Z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub light_type: LightType,
    pub color: Vec3,
    pub intensity: f32,
    /// Only read for [`LightType::Spot`].
    pub cone: SpotCone,
}

impl Light {
    #[must_use]
    pub fn new(light_type: LightType, color: Vec3) -> Self {
        Self {
            light_type,
            color,
            intensity: 1.0,
            cone: SpotCone::default(),
        }
    }

    #[must_use]
    pub fn ambient(color: Vec3) -> Self {
        Self::new(LightType::Ambient, color)
    }

    #[must_use]
    pub fn directional(color: Vec3) -> Self {
        Self::new(LightType::Directional, color)
    }

    #[must_use]
    pub fn omni(color: Vec3) -> Self {
        Self::new(LightType::Omni, color)
    }

    #[must_use]
    pub fn spot(color: Vec3, inner_angle: f32, outer_angle: f32) -> Self {
        Self {
            cone: SpotCone {
                inner_angle,
                outer_angle,
            },
            ..Self::new(LightType::Spot, color)
        }
    }

    #[must_use]
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    /// Color premultiplied by intensity, alpha 1.
    #[inline]
    #[must_use]
    pub fn radiance(&self) -> glam::Vec4 {
        (self.color * self.intensity).extend(1.0)
    }
}
