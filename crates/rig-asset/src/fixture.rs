//! In-memory GLTF documents for tests.

use base64::{engine::general_purpose::STANDARD, Engine};
use bytemuck::cast_slice;
use glam::Mat4;
use serde_json::{json, Value};

use crate::{
    document::SceneDocument,
    loader::{load_from_slice, ContainerKind},
};

pub const UNSIGNED_BYTE: u32 = 5121;
pub const UNSIGNED_SHORT: u32 = 5123;
pub const FLOAT: u32 = 5126;

#[derive(Debug, Default)]
pub struct GltfBuilder {
    nodes: Vec<Value>,
    skins: Vec<Value>,
    meshes: Vec<Value>,
    accessors: Vec<Value>,
    buffer_views: Vec<Value>,
    extensions_used: Vec<String>,
    data: Vec<u8>,
    no_scene: bool,
}

impl GltfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_scene(mut self) -> Self {
        self.no_scene = true;
        self
    }

    pub fn extension_used(&mut self, name: &str) {
        self.extensions_used.push(name.to_string());
    }

    pub fn node(&mut self, name: &str, children: &[usize]) -> usize {
        let mut node = json!({ "name": name });
        if !children.is_empty() {
            node["children"] = json!(children);
        }
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn unnamed_node(&mut self, children: &[usize]) -> usize {
        let mut node = json!({});
        if !children.is_empty() {
            node["children"] = json!(children);
        }
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn skinned_mesh_node(&mut self, name: &str, mesh: usize, skin: usize) -> usize {
        self.nodes
            .push(json!({ "name": name, "mesh": mesh, "skin": skin }));
        self.nodes.len() - 1
    }

    pub fn skin(
        &mut self,
        joints: &[usize],
        inverse_bind_matrices: Option<usize>,
        skeleton: Option<usize>,
    ) -> usize {
        let mut skin = json!({ "joints": joints });
        if let Some(accessor) = inverse_bind_matrices {
            skin["inverseBindMatrices"] = json!(accessor);
        }
        if let Some(skeleton) = skeleton {
            skin["skeleton"] = json!(skeleton);
        }
        self.skins.push(skin);
        self.skins.len() - 1
    }

    /// A single-primitive mesh. `POSITION` is added with the vertex count of
    /// the first attribute, since every primitive must have one.
    pub fn mesh(&mut self, attributes: &[(&str, usize)]) -> usize {
        let count = attributes
            .first()
            .and_then(|(_, accessor)| self.accessors[*accessor]["count"].as_u64())
            .unwrap_or(1) as usize;
        let position = self.positions(count);
        let mut attributes: serde_json::Map<String, Value> = attributes
            .iter()
            .map(|(semantic, accessor)| (semantic.to_string(), json!(accessor)))
            .collect();
        attributes.insert(String::from("POSITION"), json!(position));
        self.meshes
            .push(json!({ "primitives": [{ "attributes": attributes }] }));
        self.meshes.len() - 1
    }

    pub fn view(&mut self, bytes: &[u8], stride: Option<usize>) -> usize {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
        let mut view = json!({
            "buffer": 0,
            "byteOffset": self.data.len(),
            "byteLength": bytes.len(),
        });
        if let Some(stride) = stride {
            view["byteStride"] = json!(stride);
        }
        self.data.extend_from_slice(bytes);
        self.buffer_views.push(view);
        self.buffer_views.len() - 1
    }

    pub fn accessor(
        &mut self,
        view: usize,
        byte_offset: usize,
        component_type: u32,
        count: usize,
        kind: &str,
    ) -> usize {
        self.accessors.push(json!({
            "bufferView": view,
            "byteOffset": byte_offset,
            "componentType": component_type,
            "count": count,
            "type": kind,
        }));
        self.accessors.len() - 1
    }

    pub fn mat4_accessor(&mut self, matrices: &[Mat4]) -> usize {
        let floats: Vec<f32> = matrices
            .iter()
            .flat_map(|matrix| matrix.to_cols_array())
            .collect();
        let view = self.view(cast_slice(&floats), None);
        self.accessor(view, 0, FLOAT, matrices.len(), "MAT4")
    }

    pub fn joints_u16(&mut self, joints: &[[u16; 4]]) -> usize {
        let view = self.view(cast_slice(joints), None);
        self.accessor(view, 0, UNSIGNED_SHORT, joints.len(), "VEC4")
    }

    pub fn joints_u8(&mut self, joints: &[[u8; 4]]) -> usize {
        let view = self.view(cast_slice(joints), None);
        self.accessor(view, 0, UNSIGNED_BYTE, joints.len(), "VEC4")
    }

    fn positions(&mut self, count: usize) -> usize {
        let floats = vec![0.0f32; count * 3];
        let view = self.view(cast_slice(&floats), None);
        let accessor = self.accessor(view, 0, FLOAT, count, "VEC3");
        self.accessors[accessor]["min"] = json!([0.0, 0.0, 0.0]);
        self.accessors[accessor]["max"] = json!([0.0, 0.0, 0.0]);
        accessor
    }

    pub fn weights_u8(&mut self, weights: &[[u8; 4]], normalized: bool) -> usize {
        let view = self.view(cast_slice(weights), None);
        let accessor = self.accessor(view, 0, UNSIGNED_BYTE, weights.len(), "VEC4");
        if normalized {
            self.accessors[accessor]["normalized"] = json!(true);
        }
        accessor
    }

    pub fn weights(&mut self, weights: &[[f32; 4]]) -> usize {
        let view = self.view(cast_slice(weights), None);
        self.accessor(view, 0, FLOAT, weights.len(), "VEC4")
    }

    fn root_nodes(&self) -> Vec<usize> {
        let mut is_child = vec![false; self.nodes.len()];
        for node in &self.nodes {
            if let Some(children) = node["children"].as_array() {
                for child in children {
                    if let Some(child) = child.as_u64() {
                        is_child[child as usize] = true;
                    }
                }
            }
        }
        (0..self.nodes.len())
            .filter(|index| !is_child[*index])
            .collect()
    }

    fn json(&self, embed_buffer: bool) -> Value {
        let mut root = json!({
            "asset": { "version": "2.0" },
            "nodes": self.nodes,
        });
        if !self.no_scene {
            root["scenes"] = json!([{ "nodes": self.root_nodes() }]);
            root["scene"] = json!(0);
        }
        if !self.skins.is_empty() {
            root["skins"] = json!(self.skins);
        }
        if !self.meshes.is_empty() {
            root["meshes"] = json!(self.meshes);
        }
        if !self.accessors.is_empty() {
            root["accessors"] = json!(self.accessors);
        }
        if !self.buffer_views.is_empty() {
            root["bufferViews"] = json!(self.buffer_views);
        }
        if !self.extensions_used.is_empty() {
            root["extensionsUsed"] = json!(self.extensions_used);
        }
        if !self.data.is_empty() {
            root["buffers"] = if embed_buffer {
                json!([{
                    "byteLength": self.data.len(),
                    "uri": format!(
                        "data:application/octet-stream;base64,{}",
                        STANDARD.encode(&self.data)
                    ),
                }])
            } else {
                json!([{ "byteLength": self.data.len() }])
            };
        }
        root
    }

    pub fn to_text(&self) -> Vec<u8> {
        serde_json::to_vec(&self.json(true)).unwrap()
    }

    pub fn to_text_unembedded(&self) -> Vec<u8> {
        serde_json::to_vec(&self.json(false)).unwrap()
    }

    pub fn to_glb(&self) -> Vec<u8> {
        let mut json = serde_json::to_vec(&self.json(false)).unwrap();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = self.data.clone();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let mut length = 12 + 8 + json.len();
        if !bin.is_empty() {
            length += 8 + bin.len();
        }
        let mut glb = Vec::with_capacity(length);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(length as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        if !bin.is_empty() {
            glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
            glb.extend_from_slice(b"BIN\0");
            glb.extend_from_slice(&bin);
        }
        glb
    }

    pub fn load(&self) -> SceneDocument {
        load_from_slice(&self.to_text(), ContainerKind::Text, None).unwrap()
    }
}

/// Two joints, `root` holding `tip` as child, plus a skinned quad mesh.
pub struct QuadRig {
    pub builder: GltfBuilder,
    pub skin: usize,
    pub mesh: usize,
}

impl QuadRig {
    pub fn new(joints: &[[u16; 4]], weights: &[[f32; 4]]) -> Self {
        let mut builder = GltfBuilder::new();
        let tip = builder.node("tip", &[]);
        let root = builder.node("root", &[tip]);
        let inverse_bind = builder.mat4_accessor(&[
            Mat4::IDENTITY,
            Mat4::from_translation(glam::Vec3::new(0.0, 0.25, 0.0)),
        ]);
        let skin = builder.skin(&[root, tip], Some(inverse_bind), Some(root));
        let joints = builder.joints_u16(joints);
        let weights = builder.weights(weights);
        let mesh = builder.mesh(&[("JOINTS_0", joints), ("WEIGHTS_0", weights)]);
        builder.skinned_mesh_node("quad", mesh, skin);
        Self {
            builder,
            skin,
            mesh,
        }
    }
}
