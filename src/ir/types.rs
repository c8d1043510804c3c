//! Value types recognised by the IR.
//!
//! The pipeline only needs to distinguish integer width, floating-point
//! width, pointers and `void`; it never needs aggregate or vector types
//! since the passes operate purely on scalar SSA values and stack slots.

/// A value's static type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ty {
    I1,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// An opaque pointer, used for `alloca` results and global addresses.
    Ptr,
    /// The type of a `ret void` / a call with no result.
    Void,
}

impl Ty {
    pub fn is_integer(self) -> bool {
        matches!(self, Ty::I1 | Ty::I8 | Ty::I16 | Ty::I32 | Ty::I64)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Ty::F32 | Ty::F64)
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Ty::I1 => "i1",
            Ty::I8 => "i8",
            Ty::I16 => "i16",
            Ty::I32 => "i32",
            Ty::I64 => "i64",
            Ty::F32 => "f32",
            Ty::F64 => "f64",
            Ty::Ptr => "ptr",
            Ty::Void => "void",
        };
        f.write_str(s)
    }
}
