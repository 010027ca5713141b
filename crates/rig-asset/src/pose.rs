//! Per-frame bone transforms, kept apart from the immutable [`Skin`].

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use glam::{Mat4, Vec3};
use log::warn;

use crate::skin::Skin;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoseError {
    BoneCountMismatch { bones: usize, transforms: usize },
}

impl Display for PoseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PoseError::BoneCountMismatch { bones, transforms } => write!(
                f,
                "Pose has {} transforms, but skin has {} bones",
                transforms, bones
            ),
        }
    }
}

impl Error for PoseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Pending,
    Active,
    Done,
}

/// Global matrix of every bone, indexed like [`Skin::bones`].
#[derive(Debug, Clone, PartialEq)]
pub struct SkinPose {
    globals: Vec<Mat4>,
}

impl SkinPose {
    /// Zeroed pose, to be filled by an animation step.
    pub fn new(skin: &Skin) -> Self {
        Self {
            globals: vec![Mat4::ZERO; skin.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.globals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }

    pub fn globals(&self) -> &[Mat4] {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut [Mat4] {
        &mut self.globals
    }

    fn check_len(&self, skin: &Skin, transforms: usize) -> Result<(), PoseError> {
        for transforms in [self.globals.len(), transforms] {
            if transforms != skin.len() {
                return Err(PoseError::BoneCountMismatch {
                    bones: skin.len(),
                    transforms,
                });
            }
        }
        Ok(())
    }

    /// Compose bone-local transforms into globals, parents before children.
    ///
    /// A bone whose parent chain loops back onto itself, or whose parent is
    /// not a bone of `skin`, is posed as a root.
    pub fn set_local_pose(&mut self, skin: &Skin, locals: &[Mat4]) -> Result<(), PoseError> {
        self.check_len(skin, locals.len())?;

        let bones = skin.bones();
        let mut visit = vec![Visit::Pending; bones.len()];
        let mut chain = Vec::new();
        for start in 0..bones.len() {
            let mut current = Some(start);
            while let Some(index) = current {
                if visit.get(index) != Some(&Visit::Pending) {
                    break;
                }
                visit[index] = Visit::Active;
                chain.push(index);
                current = bones[index].parent;
            }

            while let Some(index) = chain.pop() {
                let global = match bones[index].parent {
                    None => locals[index],
                    Some(parent) if visit.get(parent) == Some(&Visit::Done) => {
                        self.globals[parent] * locals[index]
                    }
                    Some(parent) => {
                        warn!(
                            "Bone {} ({}) has unresolvable parent {}, posing it as a root",
                            index, bones[index].name, parent
                        );
                        locals[index]
                    }
                };
                self.globals[index] = global;
                visit[index] = Visit::Done;
            }
        }
        Ok(())
    }

    /// Skinning matrices: global transform times inverse bind matrix.
    pub fn skin_matrices(&self, skin: &Skin) -> Result<Vec<Mat4>, PoseError> {
        self.check_len(skin, skin.len())?;
        Ok(self
            .globals
            .iter()
            .zip(skin.bones())
            .map(|(global, bone)| *global * bone.inverse_bind)
            .collect())
    }
}

/// Demonstration swing: every non-root bone hangs 0.25 below its parent and
/// rotates around X.
pub fn swing_locals(skin: &Skin, time: f32) -> Vec<Mat4> {
    let angle = 0.5 * (1.5 * time).sin();
    let swing = Mat4::from_translation(Vec3::new(0.0, -0.25, 0.0)) * Mat4::from_rotation_x(angle);
    skin.bones()
        .iter()
        .map(|bone| match bone.parent {
            None => Mat4::IDENTITY,
            Some(_) => swing,
        })
        .collect()
}
