//! Per-vertex joint and weight streams of skinned primitives.

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use gltf::{Primitive, Semantic};
use log::{debug, warn};

use crate::{
    document::SceneDocument,
    params::{RigParams, WeightDriftPolicy},
    skin::Skin,
    view::{ElementView, ViewError},
};

#[derive(Debug)]
pub enum SkinValidationError {
    MissingSkinStreams,
    DegenerateWeights {
        vertex: usize,
        sum: f32,
    },
    NegativeWeight {
        vertex: usize,
        component: usize,
        weight: f32,
    },
    JointOutOfRange {
        vertex: usize,
        component: usize,
        joint: u16,
        bones: usize,
    },
    WeightDrift {
        vertex: usize,
        sum: f32,
    },
    View(ViewError),
}

impl Display for SkinValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SkinValidationError::MissingSkinStreams => {
                write!(f, "Primitive has no JOINTS_0 / WEIGHTS_0 pair")
            }
            SkinValidationError::DegenerateWeights { vertex, sum } => {
                write!(f, "Vertex {} has non-positive weight sum {}", vertex, sum)
            }
            SkinValidationError::NegativeWeight {
                vertex,
                component,
                weight,
            } => write!(
                f,
                "Vertex {} has negative weight {} at component {}",
                vertex, weight, component
            ),
            SkinValidationError::JointOutOfRange {
                vertex,
                component,
                joint,
                bones,
            } => write!(
                f,
                "Vertex {} references joint {} at component {}, but skin has {} bones",
                vertex, joint, component, bones
            ),
            SkinValidationError::WeightDrift { vertex, sum } => {
                write!(f, "Vertex {} weights sum to {}, expected 1", vertex, sum)
            }
            SkinValidationError::View(error) => write!(f, "Bad skin stream: {}", error),
        }
    }
}

impl Error for SkinValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SkinValidationError::View(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ViewError> for SkinValidationError {
    fn from(value: ViewError) -> Self {
        Self::View(value)
    }
}

/// Borrowed joint and weight streams of one primitive.
///
/// Valid only when both streams are present. The vertex count follows the
/// weights stream.
#[derive(Debug, Clone)]
pub struct VertexSkinView<'a> {
    streams: Option<(ElementView<'a>, ElementView<'a>)>,
    error: Option<ViewError>,
}

impl<'a> VertexSkinView<'a> {
    pub fn is_valid(&self) -> bool {
        self.streams.is_some()
    }

    /// Why a stream that is present could not be viewed.
    pub fn error(&self) -> Option<&ViewError> {
        self.error.as_ref()
    }

    pub fn count(&self) -> usize {
        self.streams
            .map(|(_, weights)| weights.count())
            .unwrap_or(0)
    }

    pub fn joint_stride(&self) -> usize {
        self.streams
            .map(|(joints, _)| joints.stride())
            .unwrap_or(0)
    }

    pub fn weight_stride(&self) -> usize {
        self.streams
            .map(|(_, weights)| weights.stride())
            .unwrap_or(0)
    }

    pub fn joints(&self, vertex: usize) -> Result<[u16; 4], ViewError> {
        match &self.streams {
            Some((joints, _)) => joints.read_u16x4(vertex),
            None => Err(ViewError::ElementOutOfRange {
                index: vertex,
                count: 0,
            }),
        }
    }

    pub fn weights(&self, vertex: usize) -> Result<[f32; 4], ViewError> {
        match &self.streams {
            Some((_, weights)) => weights.read_weights(vertex),
            None => Err(ViewError::ElementOutOfRange {
                index: vertex,
                count: 0,
            }),
        }
    }
}

/// Accessors without data (no buffer view, sparse) count as absent.
fn find_stream<'a>(
    document: &'a SceneDocument,
    primitive: &Primitive<'_>,
    semantic: Semantic,
) -> Result<Option<ElementView<'a>>, ViewError> {
    let Some(accessor) = primitive.get(&semantic) else {
        return Ok(None);
    };
    match ElementView::from_accessor(&accessor, document.buffers()) {
        Ok(view) => Ok(Some(view)),
        Err(error @ (ViewError::MissingBufferView(_) | ViewError::SparseUnsupported(_))) => {
            debug!(
                "Ignoring {:?} of primitive #{}: {}",
                semantic,
                primitive.index(),
                error
            );
            Ok(None)
        }
        Err(error) => Err(error),
    }
}

/// Look up `JOINTS_0` and `WEIGHTS_0` of a primitive. Never fails, absence is
/// reported through [`VertexSkinView::is_valid`] and broken streams through
/// [`VertexSkinView::error`].
pub fn get_skin_streams<'a>(
    document: &'a SceneDocument,
    primitive: &Primitive<'_>,
) -> VertexSkinView<'a> {
    let streams = find_stream(document, primitive, Semantic::Joints(0)).and_then(|joints| {
        let weights = find_stream(document, primitive, Semantic::Weights(0))?;
        Ok(joints.zip(weights))
    });
    match streams {
        Ok(streams) => VertexSkinView {
            streams,
            error: None,
        },
        Err(error) => VertexSkinView {
            streams: None,
            error: Some(error),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValidationReport {
    pub vertices: usize,
    /// Vertices whose weight sum is off by more than the tolerance.
    pub drifted: usize,
    pub max_drift: f32,
}

/// Check every vertex of a primitive against `skin`, stopping at the first
/// violation in vertex order.
pub fn validate_primitive_skin(
    document: &SceneDocument,
    skin: &Skin,
    primitive: &Primitive<'_>,
    params: &RigParams,
) -> Result<ValidationReport, SkinValidationError> {
    let view = get_skin_streams(document, primitive);
    if let Some(error) = view.error() {
        return Err(SkinValidationError::View(error.clone()));
    }
    if !view.is_valid() {
        return Err(SkinValidationError::MissingSkinStreams);
    }

    let bones = skin.len();
    let mut report = ValidationReport {
        vertices: view.count(),
        ..Default::default()
    };
    for vertex in 0..view.count() {
        let weights = view.weights(vertex)?;
        let joints = view.joints(vertex)?;

        let sum: f32 = weights.iter().sum();
        if !(sum > 0.0) {
            return Err(SkinValidationError::DegenerateWeights { vertex, sum });
        }

        let drift = (sum - 1.0).abs();
        if drift > params.weight_tolerance {
            if params.weight_drift == WeightDriftPolicy::Reject {
                return Err(SkinValidationError::WeightDrift { vertex, sum });
            }
            report.drifted += 1;
            report.max_drift = report.max_drift.max(drift);
        }

        for (component, (weight, joint)) in weights.into_iter().zip(joints).enumerate() {
            if weight < 0.0 {
                return Err(SkinValidationError::NegativeWeight {
                    vertex,
                    component,
                    weight,
                });
            }
            if joint as usize >= bones {
                return Err(SkinValidationError::JointOutOfRange {
                    vertex,
                    component,
                    joint,
                    bones,
                });
            }
        }
    }

    if report.drifted > 0 {
        warn!(
            "Primitive #{}: {} of {} vertices have weight sums off by up to {}",
            primitive.index(),
            report.drifted,
            report.vertices,
            report.max_drift
        );
    }
    Ok(report)
}

/// A primitive drawn with a skin, found through a node carrying both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinnedPrimitive {
    pub node: usize,
    pub skin: usize,
    pub mesh: usize,
    pub primitive: usize,
}

pub fn skinned_primitives(document: &SceneDocument) -> Vec<SkinnedPrimitive> {
    let mut result = Vec::new();
    for node in document.document().nodes() {
        let (Some(mesh), Some(skin)) = (node.mesh(), node.skin()) else {
            continue;
        };
        for primitive in mesh.primitives() {
            result.push(SkinnedPrimitive {
                node: node.index(),
                skin: skin.index(),
                mesh: mesh.index(),
                primitive: primitive.index(),
            });
        }
    }
    result
}
