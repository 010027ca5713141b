//! Skeletal rig handling for the mesh shading renderer.
//!
//! This library loads GLTF documents (JSON or GLB) into a read-only
//! [`document::SceneDocument`], resolves skins into ordered bone lists with
//! parent links and inverse bind matrices, and validates the per-vertex
//! joint/weight streams of skinned primitives before anything is uploaded.
//! The per-frame pose lives apart from the bones in [`pose::SkinPose`], and
//! [`uniform::BoneBuffer`] packs both into the layout read by the shaders.
pub mod document;
/// Document loaders
pub mod loader;
pub mod params;
pub mod pose;
pub mod primitive;
pub mod skin;
pub mod uniform;
pub mod view;

#[cfg(test)]
pub(crate) mod fixture;
