//! Bounds-checked typed views over accessor data.
//!
//! An [`ElementView`] keeps the buffer borrowed and computes element
//! addresses from `offset + stride * index`, refusing any element past the
//! accessor count or any byte past the end of the buffer.

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use glam::Mat4;
use gltf::{
    accessor::{DataType, Dimensions},
    buffer, Accessor,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    MissingBufferView(usize),
    SparseUnsupported(usize),
    MissingBuffer(usize),
    ElementOutOfRange {
        index: usize,
        count: usize,
    },
    OutOfBounds {
        start: usize,
        end: usize,
        length: usize,
    },
    StrideTooSmall {
        stride: usize,
        element: usize,
    },
    BadDataType {
        expected: DataType,
        actual: DataType,
    },
    BadDimensions {
        expected: Dimensions,
        actual: Dimensions,
    },
    NotNormalized(DataType),
}

impl Display for ViewError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::MissingBufferView(accessor) => {
                write!(f, "Accessor #{} has no buffer view", accessor)
            }
            ViewError::SparseUnsupported(accessor) => {
                write!(f, "Accessor #{} is sparse, which is not supported", accessor)
            }
            ViewError::MissingBuffer(buffer) => write!(f, "Buffer #{} is not loaded", buffer),
            ViewError::ElementOutOfRange { index, count } => {
                write!(f, "Element {} out of range of {} elements", index, count)
            }
            ViewError::OutOfBounds { start, end, length } => write!(
                f,
                "Bytes {}..{} out of bounds of buffer with {} bytes",
                start, end, length
            ),
            ViewError::StrideTooSmall { stride, element } => write!(
                f,
                "Stride {} is smaller than the element size {}",
                stride, element
            ),
            ViewError::BadDataType { expected, actual } => write!(
                f,
                "Bad accessor data type: expected {:?}, but got {:?}",
                expected, actual
            ),
            ViewError::BadDimensions { expected, actual } => write!(
                f,
                "Bad accessor dimensions: expected {:?}, but got {:?}",
                expected, actual
            ),
            ViewError::NotNormalized(data_type) => {
                write!(f, "Integer weights of type {:?} must be normalized", data_type)
            }
        }
    }
}

impl Error for ViewError {}

#[inline]
fn data_type_size(data_type: DataType) -> usize {
    match data_type {
        DataType::I8 => 1,
        DataType::U8 => 1,
        DataType::I16 => 2,
        DataType::U16 => 2,
        DataType::U32 => 4,
        DataType::F32 => 4,
    }
}

#[inline]
fn dimensions_size(dimensions: Dimensions) -> usize {
    match dimensions {
        Dimensions::Scalar => 1,
        Dimensions::Vec2 => 2,
        Dimensions::Vec3 => 3,
        Dimensions::Vec4 => 4,
        Dimensions::Mat2 => 4,
        Dimensions::Mat3 => 9,
        Dimensions::Mat4 => 16,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ElementView<'a> {
    data: &'a [u8],
    offset: usize,
    stride: usize,
    element_size: usize,
    count: usize,
    data_type: DataType,
    dimensions: Dimensions,
    normalized: bool,
}

impl<'a> ElementView<'a> {
    /// Build a view from raw parts. `stride` of `None` means tightly packed.
    pub fn new(
        data: &'a [u8],
        offset: usize,
        stride: Option<usize>,
        count: usize,
        data_type: DataType,
        dimensions: Dimensions,
    ) -> Result<Self, ViewError> {
        let element_size = data_type_size(data_type) * dimensions_size(dimensions);
        let stride = stride.unwrap_or(element_size);
        if stride < element_size {
            return Err(ViewError::StrideTooSmall {
                stride,
                element: element_size,
            });
        }
        Ok(Self {
            data,
            offset,
            stride,
            element_size,
            count,
            data_type,
            dimensions,
            normalized: false,
        })
    }

    /// Mark integer components as normalized to `0.0..=1.0`.
    pub fn normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    /// Resolve accessor -> buffer view -> buffer. The stride is the buffer
    /// view's declared stride, or the tight element size when absent.
    pub fn from_accessor(
        accessor: &Accessor<'_>,
        buffers: &'a [buffer::Data],
    ) -> Result<Self, ViewError> {
        if accessor.sparse().is_some() {
            return Err(ViewError::SparseUnsupported(accessor.index()));
        }
        let view = accessor
            .view()
            .ok_or(ViewError::MissingBufferView(accessor.index()))?;
        let buffer_index = view.buffer().index();
        let data = buffers
            .get(buffer_index)
            .ok_or(ViewError::MissingBuffer(buffer_index))?;
        Self::new(
            &data.0,
            view.offset() + accessor.offset(),
            view.stride(),
            accessor.count(),
            accessor.data_type(),
            accessor.dimensions(),
        )
        .map(|view| view.normalized(accessor.normalized()))
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn expect_data_type(&self, expected: DataType) -> Result<(), ViewError> {
        if self.data_type != expected {
            return Err(ViewError::BadDataType {
                expected,
                actual: self.data_type,
            });
        }
        Ok(())
    }

    pub fn expect_dimensions(&self, expected: Dimensions) -> Result<(), ViewError> {
        if self.dimensions != expected {
            return Err(ViewError::BadDimensions {
                expected,
                actual: self.dimensions,
            });
        }
        Ok(())
    }

    /// Raw bytes of element `index`.
    pub fn element(&self, index: usize) -> Result<&'a [u8], ViewError> {
        if index >= self.count {
            return Err(ViewError::ElementOutOfRange {
                index,
                count: self.count,
            });
        }
        let out_of_bounds = || ViewError::OutOfBounds {
            start: usize::MAX,
            end: usize::MAX,
            length: self.data.len(),
        };
        let start = self
            .stride
            .checked_mul(index)
            .and_then(|position| position.checked_add(self.offset))
            .ok_or_else(out_of_bounds)?;
        let end = start
            .checked_add(self.element_size)
            .ok_or_else(out_of_bounds)?;
        self.data.get(start..end).ok_or(ViewError::OutOfBounds {
            start,
            end,
            length: self.data.len(),
        })
    }

    fn read_f32_components<const N: usize>(&self, index: usize) -> Result<[f32; N], ViewError> {
        let bytes = self.element(index)?;
        let mut result = [0.0; N];
        for (value, chunk) in result.iter_mut().zip(bytes.chunks_exact(4)) {
            *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(result)
    }

    pub fn read_f32x4(&self, index: usize) -> Result<[f32; 4], ViewError> {
        self.expect_data_type(DataType::F32)?;
        self.expect_dimensions(Dimensions::Vec4)?;
        self.read_f32_components(index)
    }

    /// Four unsigned integers, from `u8` or `u16` components.
    pub fn read_u16x4(&self, index: usize) -> Result<[u16; 4], ViewError> {
        self.expect_dimensions(Dimensions::Vec4)?;
        let bytes = self.element(index)?;
        match self.data_type {
            DataType::U8 => Ok([
                bytes[0] as u16,
                bytes[1] as u16,
                bytes[2] as u16,
                bytes[3] as u16,
            ]),
            DataType::U16 => Ok([
                u16::from_le_bytes([bytes[0], bytes[1]]),
                u16::from_le_bytes([bytes[2], bytes[3]]),
                u16::from_le_bytes([bytes[4], bytes[5]]),
                u16::from_le_bytes([bytes[6], bytes[7]]),
            ]),
            actual => Err(ViewError::BadDataType {
                expected: DataType::U16,
                actual,
            }),
        }
    }

    /// Four weights, from `f32` or normalized `u8` / `u16` components.
    pub fn read_weights(&self, index: usize) -> Result<[f32; 4], ViewError> {
        self.expect_dimensions(Dimensions::Vec4)?;
        match self.data_type {
            DataType::F32 => self.read_f32_components(index),
            DataType::U8 | DataType::U16 if !self.normalized => {
                Err(ViewError::NotNormalized(self.data_type))
            }
            DataType::U8 => {
                let bytes = self.element(index)?;
                Ok([0, 1, 2, 3].map(|component| bytes[component] as f32 / u8::MAX as f32))
            }
            DataType::U16 => {
                let bytes = self.element(index)?;
                Ok([0, 1, 2, 3].map(|component| {
                    let value =
                        u16::from_le_bytes([bytes[component * 2], bytes[component * 2 + 1]]);
                    value as f32 / u16::MAX as f32
                }))
            }
            actual => Err(ViewError::BadDataType {
                expected: DataType::F32,
                actual,
            }),
        }
    }

    /// A 4x4 matrix stored in GLTF column order.
    pub fn read_mat4(&self, index: usize) -> Result<Mat4, ViewError> {
        self.expect_data_type(DataType::F32)?;
        self.expect_dimensions(Dimensions::Mat4)?;
        let array: [f32; 16] = self.read_f32_components(index)?;
        Ok(Mat4::from_cols_array(&array))
    }
}
