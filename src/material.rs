//! Backend-agnostic material parameters
//!
//! Water synchronization writes named values through [`MaterialParameterSet`]
//! instead of poking shader uniforms directly, so the same logic drives any
//! renderer's uniform or material system.

use std::collections::BTreeMap;

/// A single material/uniform value
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Vec2([f32; 2]),
    Color([f32; 3]),
}

impl ParamValue {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<[f32; 2]> {
        match self {
            ParamValue::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<[f32; 3]> {
        match self {
            ParamValue::Color(v) => Some(*v),
            _ => None,
        }
    }
}

/// Slot names accepted by [`StandardMaterial`]
pub mod slots {
    pub const COLOR: &str = "color";
    pub const ROUGHNESS: &str = "roughness";
    pub const METALNESS: &str = "metalness";
}

/// Named parameter access for a material or uniform block
pub trait MaterialParameterSet {
    /// Write a value. Returns false when the name or type is not accepted.
    fn set(&mut self, name: &str, value: ParamValue) -> bool;
    fn get(&self, name: &str) -> Option<ParamValue>;

    fn get_float(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(|v| v.as_float())
    }

    fn get_color(&self, name: &str) -> Option<[f32; 3]> {
        self.get(name).and_then(|v| v.as_color())
    }

    fn get_vec2(&self, name: &str) -> Option<[f32; 2]> {
        self.get(name).and_then(|v| v.as_vec2())
    }
}

/// Free-form uniform block, as used by animated shader materials
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformMaterial {
    values: BTreeMap<String, ParamValue>,
    /// Bumped on every accepted write
    revision: u64,
}

impl UniformMaterial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl MaterialParameterSet for UniformMaterial {
    fn set(&mut self, name: &str, value: ParamValue) -> bool {
        // A uniform keeps the type it was declared with
        if let Some(existing) = self.values.get(name) {
            if std::mem::discriminant(existing) != std::mem::discriminant(&value) {
                return false;
            }
        }
        self.values.insert(name.to_string(), value);
        self.revision += 1;
        true
    }

    fn get(&self, name: &str) -> Option<ParamValue> {
        self.values.get(name).copied()
    }
}

/// Plain lit material with fixed color/roughness/metalness slots
#[derive(Clone, Debug, PartialEq)]
pub struct StandardMaterial {
    pub color: [f32; 3],
    pub roughness: f32,
    pub metalness: f32,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            roughness: 0.5,
            metalness: 0.0,
        }
    }
}

impl MaterialParameterSet for StandardMaterial {
    fn set(&mut self, name: &str, value: ParamValue) -> bool {
        match (name, value) {
            (slots::COLOR, ParamValue::Color(c)) => self.color = c,
            (slots::ROUGHNESS, ParamValue::Float(v)) => self.roughness = v.clamp(0.0, 1.0),
            (slots::METALNESS, ParamValue::Float(v)) => self.metalness = v.clamp(0.0, 1.0),
            _ => return false,
        }
        true
    }

    fn get(&self, name: &str) -> Option<ParamValue> {
        match name {
            slots::COLOR => Some(ParamValue::Color(self.color)),
            slots::ROUGHNESS => Some(ParamValue::Float(self.roughness)),
            slots::METALNESS => Some(ParamValue::Float(self.metalness)),
            _ => None,
        }
    }
}
