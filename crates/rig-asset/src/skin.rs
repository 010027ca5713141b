//! Skin resolution: joint list -> ordered bones with parents and inverse bind
//! matrices.
//!
//! GLTF only stores `parent -> children` edges, so every bone's parent is
//! recovered by indexing the child lists of the skin's own joints. Bone `i`
//! always corresponds to joint `i` of the source skin.

use std::{
    collections::HashMap,
    error::Error,
    fmt::{self, Display, Formatter},
};

use glam::Mat4;
use log::{debug, warn};

use crate::{
    document::SceneDocument,
    params::{ParentConflictPolicy, RigParams},
    view::{ElementView, ViewError},
};

#[derive(Debug)]
pub enum SkinResolveError {
    SkinNotFound(usize),
    InverseBindCountMismatch { joints: usize, matrices: usize },
    View(ViewError),
    AmbiguousParent { bone: usize, candidates: Vec<usize> },
}

impl Display for SkinResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SkinResolveError::SkinNotFound(index) => write!(f, "Skin #{} not found", index),
            SkinResolveError::InverseBindCountMismatch { joints, matrices } => write!(
                f,
                "Inverse bind matrix count mismatch: {} joints, but {} matrices",
                joints, matrices
            ),
            SkinResolveError::View(error) => {
                write!(f, "Bad inverse bind matrices: {}", error)
            }
            SkinResolveError::AmbiguousParent { bone, candidates } => write!(
                f,
                "Bone {} is a child of multiple joints: {:?}",
                bone, candidates
            ),
        }
    }
}

impl Error for SkinResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SkinResolveError::View(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ViewError> for SkinResolveError {
    fn from(value: ViewError) -> Self {
        Self::View(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    /// Source node index in the document.
    pub node: usize,
    /// Parent bone index, `None` for a root bone of this skin.
    pub parent: Option<usize>,
    pub name: String,
    pub inverse_bind: Mat4,
}

impl Bone {
    /// Parent index with `-1` for root bones, as uploaded to shaders.
    pub fn parent_index(&self) -> i32 {
        self.parent.map(|parent| parent as i32).unwrap_or(-1)
    }
}

#[derive(Debug, Clone)]
pub struct Skin {
    pub index: usize,
    pub name: Option<String>,
    bones: Vec<Bone>,
    /// Skeleton root hint from the document, informational only.
    pub skeleton_root: Option<usize>,
}

impl Skin {
    /// Build a skin from bones resolved elsewhere. A parent outside `bones`
    /// is posed as a root.
    pub fn new(index: usize, bones: Vec<Bone>) -> Self {
        Self {
            index,
            name: None,
            bones,
            skeleton_root: None,
        }
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Bones without a parent among this skin's joints.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, bone)| bone.parent.is_none())
            .map(|(index, _)| index)
    }

    pub fn children(&self, bone: usize) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(move |(_, item)| item.parent == Some(bone))
            .map(|(index, _)| index)
    }

    pub fn bone_for_node(&self, node: usize) -> Option<usize> {
        self.bones.iter().position(|bone| bone.node == node)
    }

    pub fn parent_indices(&self) -> Vec<i32> {
        self.bones.iter().map(Bone::parent_index).collect()
    }

    pub fn inverse_bind_matrices(&self) -> Vec<Mat4> {
        self.bones.iter().map(|bone| bone.inverse_bind).collect()
    }
}

fn load_inverse_bind_matrices(
    document: &SceneDocument,
    skin: &gltf::Skin,
    joint_count: usize,
) -> Result<Vec<Mat4>, SkinResolveError> {
    let Some(accessor) = skin.inverse_bind_matrices() else {
        debug!(
            "Skin #{} has no inverse bind matrices, using identity",
            skin.index()
        );
        return Ok(vec![Mat4::IDENTITY; joint_count]);
    };

    let view = ElementView::from_accessor(&accessor, document.buffers())?;
    if view.count() != joint_count {
        return Err(SkinResolveError::InverseBindCountMismatch {
            joints: joint_count,
            matrices: view.count(),
        });
    }
    (0..view.count())
        .map(|index| view.read_mat4(index).map_err(SkinResolveError::from))
        .collect()
}

/// Find the parent bone of every joint.
///
/// One pass over the joints' child lists records, for every child node, the
/// joints listing it in bone order. The first candidate is therefore the
/// same one a scan of every joint pair would find first.
fn resolve_parents(
    joints: &[gltf::Node],
    params: &RigParams,
) -> Result<Vec<Option<usize>>, SkinResolveError> {
    let mut candidates: HashMap<usize, Vec<usize>> = HashMap::new();
    for (bone, joint) in joints.iter().enumerate() {
        for child in joint.children() {
            candidates.entry(child.index()).or_default().push(bone);
        }
    }

    joints
        .iter()
        .enumerate()
        .map(|(bone, joint)| {
            let Some(parents) = candidates.get(&joint.index()) else {
                return Ok(None);
            };
            if parents.len() > 1 {
                match params.parent_conflict {
                    ParentConflictPolicy::FirstMatch => warn!(
                        "Bone {} ({:?}) is a child of joints {:?}, using bone {}",
                        bone,
                        joint.name(),
                        parents,
                        parents[0]
                    ),
                    ParentConflictPolicy::Reject => {
                        return Err(SkinResolveError::AmbiguousParent {
                            bone,
                            candidates: parents.clone(),
                        })
                    }
                }
            }
            Ok(Some(parents[0]))
        })
        .collect()
}

/// Resolve skin `skin_index` of the document into bones.
pub fn build_skin(
    document: &SceneDocument,
    skin_index: usize,
    params: &RigParams,
) -> Result<Skin, SkinResolveError> {
    let skin = document
        .skin(skin_index)
        .ok_or(SkinResolveError::SkinNotFound(skin_index))?;
    let joints: Vec<gltf::Node> = skin.joints().collect();

    let inverse_bind_matrices = load_inverse_bind_matrices(document, &skin, joints.len())?;
    let parents = resolve_parents(&joints, params)?;

    let bones: Vec<Bone> = joints
        .iter()
        .zip(parents)
        .zip(inverse_bind_matrices)
        .map(|((joint, parent), inverse_bind)| Bone {
            node: joint.index(),
            parent,
            name: joint.name().unwrap_or_default().to_string(),
            inverse_bind,
        })
        .collect();

    let skin = Skin {
        index: skin_index,
        name: skin.name().map(str::to_string),
        bones,
        skeleton_root: skin.skeleton().map(|node| node.index()),
    };
    debug!(
        "Resolved skin #{} ({:?}): {} bones, {} roots",
        skin.index,
        skin.name,
        skin.len(),
        skin.roots().count()
    );
    Ok(skin)
}

/// Resolve every skin of the document, in document order.
pub fn build_skins(
    document: &SceneDocument,
    params: &RigParams,
) -> Result<Vec<Skin>, SkinResolveError> {
    (0..document.skin_count())
        .map(|index| build_skin(document, index, params))
        .collect()
}
