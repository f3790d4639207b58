//! Element types and shape arithmetic for engine I/O tensors.
//!
//! Region sizing is `DataType::size_of() * volume(extents)`. The element
//! enumeration is closed and the byte-width mapping exhaustive, so adding a
//! type is a compile-checked, single-point change.

/// Element type tag as reported by the engine runtime.
///
/// Mirrors the runtime's C enum numbering. Tags outside the supported set are
/// rejected by [`DataType::from_tag`]; buffer construction turns that into a
/// fatal error rather than guessing a size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataTypeTag(pub i32);

/// Supported element types for I/O tensor bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    F32,
    F16,
    I8,
    I32,
    Bool,
}

impl DataType {
    /// Resolve an engine-reported tag, or `None` for anything unsupported.
    pub fn from_tag(tag: DataTypeTag) -> Option<Self> {
        match tag.0 {
            0 => Some(DataType::F32),
            1 => Some(DataType::F16),
            2 => Some(DataType::I8),
            3 => Some(DataType::I32),
            4 => Some(DataType::Bool),
            _ => None,
        }
    }

    /// The runtime tag for this type.
    pub const fn tag(self) -> DataTypeTag {
        match self {
            DataType::F32 => DataTypeTag(0),
            DataType::F16 => DataTypeTag(1),
            DataType::I8 => DataTypeTag(2),
            DataType::I32 => DataTypeTag(3),
            DataType::Bool => DataTypeTag(4),
        }
    }

    /// Byte width of one element.
    pub const fn size_of(self) -> usize {
        match self {
            DataType::F32 | DataType::I32 => 4,
            DataType::F16 => 2,
            DataType::I8 | DataType::Bool => 1,
        }
    }
}

/// Rust element types that correspond to a [`DataType`].
///
/// Used by the checked output views to verify that the requested element type
/// matches what the engine declared for the tensor.
pub trait Element: Copy + 'static {
    const DATA_TYPE: DataType;
}

impl Element for f32 {
    const DATA_TYPE: DataType = DataType::F32;
}

impl Element for half::f16 {
    const DATA_TYPE: DataType = DataType::F16;
}

impl Element for i8 {
    const DATA_TYPE: DataType = DataType::I8;
}

impl Element for i32 {
    const DATA_TYPE: DataType = DataType::I32;
}

impl Element for bool {
    const DATA_TYPE: DataType = DataType::Bool;
}

/// Marker extent for a dimension left unresolved by the engine.
pub const DYNAMIC_DIM: i64 = -1;

/// Ordered dimension extents of one tensor.
///
/// Extents are non-negative except that the leading extent may be
/// [`DYNAMIC_DIM`] until resolved against a batch size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dims(Vec<i64>);

impl Dims {
    pub fn new(extents: impl Into<Vec<i64>>) -> Self {
        Dims(extents.into())
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    /// Whether the leading extent is still unresolved.
    pub fn leading_is_dynamic(&self) -> bool {
        self.0.first() == Some(&DYNAMIC_DIM)
    }

    /// Replace an unresolved leading extent with `batch_size`.
    pub fn resolve_leading(&mut self, batch_size: usize) {
        if let Some(first) = self.0.first_mut() {
            if *first == DYNAMIC_DIM {
                *first = batch_size as i64;
            }
        }
    }

    pub fn volume(&self) -> usize {
        volume(&self.0)
    }
}

/// Product of all extents; the empty shape has volume 1.
///
/// Extents must be non-negative; unresolved dimensions are substituted
/// before sizing, never inside it.
pub fn volume(extents: &[i64]) -> usize {
    extents.iter().fold(1usize, |acc, &extent| {
        debug_assert!(extent >= 0, "volume of unresolved extent {}", extent);
        acc.saturating_mul(extent as usize)
    })
}
