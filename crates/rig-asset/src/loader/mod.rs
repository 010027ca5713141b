use std::path::Path;

/// GLTF and GLB loader with `gltf` crate.
pub mod gltf;

pub use self::gltf::{load_from_path, load_from_slice, GltfLoaderError};

/// Container form of a GLTF document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// JSON document, buffers as side-car files or data URIs.
    Text,
    /// Self-contained GLB container.
    Binary,
}

impl ContainerKind {
    /// Select the container from the file extension only. Mismatched content
    /// is reported by the decoder, not here.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let binary = path
            .as_ref()
            .extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| {
                extension.eq_ignore_ascii_case("glb") || extension.eq_ignore_ascii_case("vrm")
            })
            .unwrap_or(false);
        if binary {
            ContainerKind::Binary
        } else {
            ContainerKind::Text
        }
    }
}
