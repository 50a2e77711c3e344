use super::{IdOrIndex, ModulationError};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Shaping applied to a source before it is mapped into a param range.
///
/// Curves act on the magnitude and keep the sign, so bipolar LFOs bend
/// symmetrically. Spring, elastic and bounce may overshoot 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "IdOrIndex", into = "String")]
pub enum ModCurve {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    Spring,
    Elastic,
    Bounce,
}

impl ModCurve {
    pub const ALL: [Self; 7] = [
        Self::Linear,
        Self::EaseIn,
        Self::EaseOut,
        Self::EaseInOut,
        Self::Spring,
        Self::Elastic,
        Self::Bounce,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "linear" => Some(Self::Linear),
            "easeIn" => Some(Self::EaseIn),
            "easeOut" => Some(Self::EaseOut),
            "easeInOut" => Some(Self::EaseInOut),
            "spring" => Some(Self::Spring),
            "elastic" => Some(Self::Elastic),
            "bounce" => Some(Self::Bounce),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::EaseIn => "easeIn",
            Self::EaseOut => "easeOut",
            Self::EaseInOut => "easeInOut",
            Self::Spring => "spring",
            Self::Elastic => "elastic",
            Self::Bounce => "bounce",
        }
    }

    pub fn from_index(i: i64) -> Option<Self> {
        usize::try_from(i).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn apply(self, x: f32) -> f32 {
        let ease: fn(f32) -> f32 = match self {
            Self::Linear => return x,
            Self::EaseIn => ease_in_cubic,
            Self::EaseOut => ease_out_cubic,
            Self::EaseInOut => ease_in_out_cubic,
            Self::Spring => spring,
            Self::Elastic => elastic,
            Self::Bounce => bounce,
        };
        ease(x.abs()).copysign(x)
    }
}

impl TryFrom<IdOrIndex> for ModCurve {
    type Error = ModulationError;

    fn try_from(v: IdOrIndex) -> Result<Self, Self::Error> {
        match v {
            IdOrIndex::Id(s) => Self::parse(&s).ok_or(ModulationError::UnknownCurve(s)),
            IdOrIndex::Index(i) => {
                Self::from_index(i).ok_or_else(|| ModulationError::UnknownCurve(i.to_string()))
            }
        }
    }
}

impl From<ModCurve> for String {
    fn from(c: ModCurve) -> String {
        c.as_str().to_string()
    }
}

fn ease_in_cubic(t: f32) -> f32 {
    t * t * t
}

fn ease_out_cubic(t: f32) -> f32 {
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}

fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let inv = 2.0 - 2.0 * t;
        1.0 - inv * inv * inv / 2.0
    }
}

fn spring(t: f32) -> f32 {
    1.0 - (t * PI * 2.5).cos() * (-6.0 * t).exp()
}

fn elastic(t: f32) -> f32 {
    if t <= 0.0 {
        0.0
    } else if t >= 1.0 {
        1.0
    } else {
        1.0 - (t * PI * 2.0).cos() * (-4.0 * t).exp()
    }
}

fn bounce(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    let (t, lift) = if t < 1.0 / D1 {
        (t, 0.0)
    } else if t < 2.0 / D1 {
        (t - 1.5 / D1, 0.75)
    } else if t < 2.5 / D1 {
        (t - 2.25 / D1, 0.9375)
    } else {
        (t - 2.625 / D1, 0.984_375)
    };
    N1 * t * t + lift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_fixed() {
        for c in ModCurve::ALL {
            assert!(c.apply(0.0).abs() < 1e-6, "{} at 0", c.as_str());
            assert!((c.apply(1.0) - 1.0).abs() < 0.01, "{} at 1", c.as_str());
        }
    }

    #[test]
    fn curves_keep_sign() {
        assert!((ModCurve::EaseIn.apply(-0.5) + 0.125).abs() < 1e-6);
        assert!(ModCurve::Bounce.apply(-0.7) < 0.0);
    }
}
