use serde::Serialize;

/// A decoded property or game event value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Variant {
    Bool(bool),
    I32(i32),
    I64(i64),
    U64(u64),
    F32(f32),
    String(String),
    VecXY([f32; 2]),
    VecXYZ([f32; 3]),
    Array(Vec<Variant>),
}

impl Variant {
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Variant::I32(i) => Some(*i),
            Variant::Bool(b) => Some(*b as i32),
            _ => None,
        }
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Variant::I32(i) => Some(*i as i64),
            Variant::I64(i) => Some(*i),
            _ => None,
        }
    }
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Variant::F32(f) => Some(*f),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            Variant::I32(i) => Some(*i != 0),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_vec_xy(&self) -> Option<[f32; 2]> {
        match self {
            Variant::VecXY(v) => Some(*v),
            Variant::VecXYZ([x, y, _]) => Some([*x, *y]),
            _ => None,
        }
    }
    pub fn as_vec_xyz(&self) -> Option<[f32; 3]> {
        match self {
            Variant::VecXYZ(v) => Some(*v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(Variant::I32(87).as_i32(), Some(87));
        assert_eq!(Variant::I32(1).as_bool(), Some(true));
        assert_eq!(Variant::I32(87).as_f32(), None);
        assert_eq!(Variant::VecXYZ([1.0, 2.0, 3.0]).as_vec_xy(), Some([1.0, 2.0]));
        assert_eq!(Variant::String("CT".to_string()).as_str(), Some("CT"));
    }
}
