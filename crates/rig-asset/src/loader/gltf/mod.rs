use std::{
    borrow::Cow,
    error::Error,
    fmt::{self, Display, Formatter},
    fs, io,
    path::{Path, PathBuf},
};

use gltf::{
    binary::Glb,
    buffer::{self, Source},
    json, Document,
};
use log::{debug, warn};
use scheme::{Scheme, SchemeError};

use crate::document::{LoadWarning, SceneDocument};

use super::ContainerKind;

pub mod scheme;

/// Required extensions that change how buffer data must be decoded.
const UNDECODABLE_EXTENSIONS: &[&str] = &["KHR_draco_mesh_compression", "EXT_meshopt_compression"];

#[derive(Debug)]
pub enum GltfLoaderError {
    Io(PathBuf, io::Error),
    Gltf(gltf::Error),
    InvalidScheme(SchemeError),
    MissingBinaryChunk(usize),
    ExternalReference(String),
    BufferTooShort {
        index: usize,
        expected: usize,
        actual: usize,
    },
    UnsupportedRequiredExtension(String),
}

impl Display for GltfLoaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GltfLoaderError::Io(path, error) => {
                write!(f, "Failed to read {}: {}", path.display(), error)
            }
            GltfLoaderError::Gltf(error) => Display::fmt(error, f),
            GltfLoaderError::InvalidScheme(error) => Display::fmt(error, f),
            GltfLoaderError::MissingBinaryChunk(index) => {
                write!(f, "Buffer #{} refers to a missing GLB binary chunk", index)
            }
            GltfLoaderError::ExternalReference(uri) => {
                write!(f, "External resource {} without a base directory", uri)
            }
            GltfLoaderError::BufferTooShort {
                index,
                expected,
                actual,
            } => write!(
                f,
                "Buffer #{} too short: expected {} bytes, but got {}",
                index, expected, actual
            ),
            GltfLoaderError::UnsupportedRequiredExtension(name) => {
                write!(f, "Unsupported required extension: {}", name)
            }
        }
    }
}

impl Error for GltfLoaderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GltfLoaderError::Io(_, error) => Some(error),
            GltfLoaderError::Gltf(error) => Some(error),
            GltfLoaderError::InvalidScheme(error) => Some(error),
            _ => None,
        }
    }
}

impl From<gltf::Error> for GltfLoaderError {
    fn from(value: gltf::Error) -> Self {
        Self::Gltf(value)
    }
}

impl From<SchemeError> for GltfLoaderError {
    fn from(value: SchemeError) -> Self {
        Self::InvalidScheme(value)
    }
}

fn parse_document(
    data: &[u8],
    kind: ContainerKind,
) -> Result<(Document, Option<Vec<u8>>), GltfLoaderError> {
    let (root, blob) = match kind {
        ContainerKind::Binary => {
            let glb = Glb::from_slice(data)?;
            let root = json::Root::from_slice(&glb.json).map_err(gltf::Error::Deserialize)?;
            (root, glb.bin.map(Cow::into_owned))
        }
        ContainerKind::Text => {
            let root = json::Root::from_slice(data).map_err(gltf::Error::Deserialize)?;
            (root, None)
        }
    };
    let document = Document::from_json(root)?;
    Ok((document, blob))
}

fn check_extensions(
    document: &Document,
    warnings: &mut Vec<LoadWarning>,
) -> Result<(), GltfLoaderError> {
    if let Some(name) = document
        .extensions_required()
        .find(|name| UNDECODABLE_EXTENSIONS.contains(name))
    {
        return Err(GltfLoaderError::UnsupportedRequiredExtension(
            name.to_string(),
        ));
    }
    for name in document.extensions_used() {
        warnings.push(LoadWarning::IgnoredExtension(name.to_string()));
    }
    Ok(())
}

fn load_buffers(
    document: &Document,
    mut blob: Option<Vec<u8>>,
    base: Option<&Path>,
    warnings: &mut Vec<LoadWarning>,
) -> Result<Vec<buffer::Data>, GltfLoaderError> {
    let mut buffers = Vec::new();
    for buffer in document.buffers() {
        let index = buffer.index();
        let mut data = match buffer.source() {
            Source::Bin => blob
                .take()
                .ok_or(GltfLoaderError::MissingBinaryChunk(index))?,
            Source::Uri(uri) => Scheme::try_from(uri)?.load(uri, base)?,
        };

        let declared = buffer.length();
        if data.len() < declared {
            return Err(GltfLoaderError::BufferTooShort {
                index,
                expected: declared,
                actual: data.len(),
            });
        }
        // GLB chunks are padded to 4 bytes, so only flag data beyond that.
        if data.len() > declared.next_multiple_of(4) {
            warnings.push(LoadWarning::OversizedBuffer {
                index,
                declared,
                actual: data.len(),
            });
        }

        // Pad the data to 4 bytes with zeroes
        while data.len() % 4 != 0 {
            data.push(0);
        }

        debug!("Loaded buffer #{}: {} bytes", index, data.len());
        buffers.push(buffer::Data(data));
    }
    Ok(buffers)
}

/// Load a GLTF document from a slice.
///
/// Relative buffer URIs are resolved against `base`; without a base only GLB
/// binary chunks and data URIs can be used.
pub fn load_from_slice(
    data: &[u8],
    kind: ContainerKind,
    base: Option<&Path>,
) -> Result<SceneDocument, GltfLoaderError> {
    let (document, blob) = parse_document(data, kind)?;

    let mut warnings = Vec::new();
    check_extensions(&document, &mut warnings)?;
    if document.scenes().len() == 0 {
        warnings.push(LoadWarning::NoScenes);
    }
    let buffers = load_buffers(&document, blob, base, &mut warnings)?;

    for warning in &warnings {
        warn!("GLTF warning: {}", warning);
    }
    debug!(
        "Loaded document: {} nodes, {} skins, {} meshes, {} buffers",
        document.nodes().len(),
        document.skins().len(),
        document.meshes().len(),
        buffers.len()
    );
    Ok(SceneDocument::new(document, buffers, warnings))
}

/// Load a GLTF document from a file.
///
/// The container form is chosen from the file extension, see
/// [`ContainerKind::from_path`]. Buffers are resolved relative to the
/// directory of the file.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<SceneDocument, GltfLoaderError> {
    let path = path.as_ref();
    let kind = ContainerKind::from_path(path);
    let data = fs::read(path).map_err(|error| GltfLoaderError::Io(path.to_path_buf(), error))?;
    debug!("Loading {} as {:?} container", path.display(), kind);
    load_from_slice(&data, kind, path.parent())
}
