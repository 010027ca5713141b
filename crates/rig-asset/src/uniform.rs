//! CPU side of the bone storage buffer.

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use bytemuck::{cast_slice, Pod, Zeroable};

use crate::{pose::SkinPose, skin::Skin};

pub const MAX_BONES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoneBufferError {
    TooManyBones(usize),
    PoseMismatch { bones: usize, pose: usize },
}

impl Display for BoneBufferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BoneBufferError::TooManyBones(count) => write!(
                f,
                "Skin has {} bones, at most {} are supported",
                count, MAX_BONES
            ),
            BoneBufferError::PoseMismatch { bones, pose } => {
                write!(f, "Pose has {} bones, expected {}", pose, bones)
            }
        }
    }
}

impl Error for BoneBufferError {}

/// One bone as read by the skinning shader. Matrices are column-major.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BoneUniform {
    pub inverse_bind: [[f32; 4]; 4],
    pub global: [[f32; 4]; 4],
}

#[derive(Debug, Clone)]
pub struct BoneBuffer {
    items: Vec<BoneUniform>,
}

impl BoneBuffer {
    pub fn new(skin: &Skin, pose: &SkinPose) -> Result<Self, BoneBufferError> {
        if skin.len() > MAX_BONES {
            return Err(BoneBufferError::TooManyBones(skin.len()));
        }
        let items = skin
            .bones()
            .iter()
            .map(|bone| BoneUniform {
                inverse_bind: bone.inverse_bind.to_cols_array_2d(),
                global: [[0.0; 4]; 4],
            })
            .collect();
        let mut buffer = Self { items };
        buffer.update(pose)?;
        Ok(buffer)
    }

    /// Copy the current globals of `pose`.
    pub fn update(&mut self, pose: &SkinPose) -> Result<(), BoneBufferError> {
        if pose.len() != self.items.len() {
            return Err(BoneBufferError::PoseMismatch {
                bones: self.items.len(),
                pose: pose.len(),
            });
        }
        for (item, global) in self.items.iter_mut().zip(pose.globals()) {
            item.global = global.to_cols_array_2d();
        }
        Ok(())
    }

    pub fn items(&self) -> &[BoneUniform] {
        &self.items
    }

    pub fn as_bytes(&self) -> &[u8] {
        cast_slice(&self.items)
    }
}
