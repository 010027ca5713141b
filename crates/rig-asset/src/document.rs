use std::fmt::{self, Display, Formatter};

use gltf::{buffer, Document, Mesh, Primitive, Skin};

/// Non-fatal issue found while loading. Never changes control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    IgnoredExtension(String),
    NoScenes,
    OversizedBuffer {
        index: usize,
        declared: usize,
        actual: usize,
    },
}

impl Display for LoadWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::IgnoredExtension(name) => {
                write!(f, "Extension {} is used but ignored", name)
            }
            LoadWarning::NoScenes => write!(f, "Document declares no scene"),
            LoadWarning::OversizedBuffer {
                index,
                declared,
                actual,
            } => write!(
                f,
                "Buffer #{} has {} bytes, but only {} are declared",
                index, actual, declared
            ),
        }
    }
}

/// A decoded GLTF document with every buffer resident in memory.
///
/// The document is immutable after loading; skins and vertex views borrow
/// from it.
#[derive(Debug)]
pub struct SceneDocument {
    document: Document,
    buffers: Vec<buffer::Data>,
    warnings: Vec<LoadWarning>,
}

impl SceneDocument {
    pub(crate) fn new(
        document: Document,
        buffers: Vec<buffer::Data>,
        warnings: Vec<LoadWarning>,
    ) -> Self {
        Self {
            document,
            buffers,
            warnings,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn buffers(&self) -> &[buffer::Data] {
        &self.buffers
    }

    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    pub fn node_count(&self) -> usize {
        self.document.nodes().len()
    }

    pub fn skin(&self, index: usize) -> Option<Skin<'_>> {
        self.document.skins().nth(index)
    }

    pub fn skin_count(&self) -> usize {
        self.document.skins().len()
    }

    pub fn mesh(&self, index: usize) -> Option<Mesh<'_>> {
        self.document.meshes().nth(index)
    }

    pub fn primitive(&self, mesh: usize, primitive: usize) -> Option<Primitive<'_>> {
        self.mesh(mesh)?.primitives().nth(primitive)
    }
}
