use glam::{Vec2, Vec3};

use crate::error::{Error, Result};

/// Upper bound on uniforms per pass; the GPU uniform buffer holds exactly
/// this many `vec4<f32>` slots.
pub const MAX_UNIFORM_SLOTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
}

impl UniformValue {
    pub fn kind(&self) -> &'static str {
        match self {
            UniformValue::Float(_) => "float",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
        }
    }

    /// One std140 slot: the value in the leading lanes, zero elsewhere.
    pub fn to_slot(&self) -> [f32; 4] {
        match *self {
            UniformValue::Float(x) => [x, 0.0, 0.0, 0.0],
            UniformValue::Vec2(v) => [v.x, v.y, 0.0, 0.0],
            UniformValue::Vec3(v) => [v.x, v.y, v.z, 0.0],
        }
    }

    fn clamped(self, (lo, hi): (f32, f32)) -> Self {
        match self {
            UniformValue::Float(x) => UniformValue::Float(x.clamp(lo, hi)),
            UniformValue::Vec2(v) => UniformValue::Vec2(v.clamp(Vec2::splat(lo), Vec2::splat(hi))),
            UniformValue::Vec3(v) => UniformValue::Vec3(v.clamp(Vec3::splat(lo), Vec3::splat(hi))),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

// Unsuffixed float literals fall back to f64.
impl From<f64> for UniformValue {
    fn from(v: f64) -> Self {
        UniformValue::Float(v as f32)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        UniformValue::Vec2(Vec2::from(v))
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vec3(Vec3::from(v))
    }
}

/// A named pass parameter. `range` is the inclusive slider range; writes are
/// clamped to it component-wise.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    pub name: &'static str,
    pub value: UniformValue,
    pub range: Option<(f32, f32)>,
}

/// The parameter record owned by one pass, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uniforms {
    entries: Vec<Uniform>,
}

impl Uniforms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter with a slider range.
    pub fn with(mut self, name: &'static str, value: impl Into<UniformValue>, lo: f32, hi: f32) -> Self {
        let value = value.into().clamped((lo, hi));
        self.entries.push(Uniform {
            name,
            value,
            range: Some((lo, hi)),
        });
        self
    }

    /// Declare a parameter that is driven by code, not by the panel.
    pub fn with_fixed(mut self, name: &'static str, value: impl Into<UniformValue>) -> Self {
        self.entries.push(Uniform {
            name,
            value: value.into(),
            range: None,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Uniform> {
        self.entries.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|u| u.name == name)
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.entries.iter().find(|u| u.name == name).map(|u| u.value)
    }

    /// Scalar lookup for fragment code. Missing or non-scalar names read as 0.
    pub fn float(&self, name: &str) -> f32 {
        match self.get(name) {
            Some(UniformValue::Float(x)) => x,
            _ => 0.0,
        }
    }

    pub fn vec2(&self, name: &str) -> Vec2 {
        match self.get(name) {
            Some(UniformValue::Vec2(v)) => v,
            _ => Vec2::ZERO,
        }
    }

    pub fn vec3(&self, name: &str) -> Vec3 {
        match self.get(name) {
            Some(UniformValue::Vec3(v)) => v,
            _ => Vec3::ZERO,
        }
    }

    /// Write a parameter. The value must have the declared shape; ranged
    /// parameters are clamped. `pass` only labels the error.
    pub fn set(&mut self, pass: &str, name: &str, value: UniformValue) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|u| u.name == name)
            .ok_or_else(|| Error::UnknownParameter {
                pass: pass.to_string(),
                name: name.to_string(),
            })?;

        if std::mem::discriminant(&entry.value) != std::mem::discriminant(&value) {
            return Err(Error::ParameterType {
                name: name.to_string(),
                expected: entry.value.kind(),
                got: value.kind(),
            });
        }

        entry.value = match entry.range {
            Some(range) => value.clamped(range),
            None => value,
        };
        Ok(())
    }

    /// Pack into GPU slots, one `vec4<f32>` per uniform in declaration order.
    pub fn to_slots(&self) -> [[f32; 4]; MAX_UNIFORM_SLOTS] {
        let mut slots = [[0.0; 4]; MAX_UNIFORM_SLOTS];
        for (slot, uniform) in slots.iter_mut().zip(&self.entries) {
            *slot = uniform.value.to_slot();
        }
        slots
    }
}
