//! Scalar type system shared between expression lowering and DDL column
//! definitions.
//!
//! This is intentionally small: the planner only needs enough of a type
//! system to assign a `SqlType` to every expression and column, check
//! arithmetic/comparison compatibility, and render types in `debug_string()`
//! output. It does not model a columnar execution format.

pub mod charset;
pub mod value;

use std::fmt;

pub use charset::{Charset, Collation};
pub use value::Value;

/// Spatial reference identifier attached to geometry columns.
///
/// Only the planar SRID (0) and the common WGS84 geographic SRID (4326) are
/// accepted; anything else is rejected at DDL-build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Srid(pub u32);

impl Srid {
    pub const PLANAR: Srid = Srid(0);
    pub const WGS84: Srid = Srid(4326);

    pub fn validate(self) -> Result<Self, plan_error::PlanError> {
        match self.0 {
            0 | 4326 => Ok(self),
            other => Err(plan_error::PlanError::type_error(format!(
                "SRID {other} is not supported; only planar (0) and geographic (4326) are",
            ))),
        }
    }
}

/// A resolved scalar SQL type.
///
/// Variants mirror the MySQL type families the expression and DDL builders
/// need to distinguish: exact-width integers (smallest-fitting decode of
/// integer literals walks this list in order), approximate and exact
/// fixed-point numerics, temporal types, and the common string/binary/JSON/
/// spatial families.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlType {
    Null,
    Boolean,
    TinyInt,
    UnsignedTinyInt,
    SmallInt,
    UnsignedSmallInt,
    Int,
    UnsignedInt,
    BigInt,
    UnsignedBigInt,
    Float,
    Double,
    Decimal { precision: u8, scale: u8 },
    Date,
    Time,
    Datetime,
    Timestamp,
    Year,
    Char(u32),
    VarChar(u32),
    Text,
    Binary(u32),
    VarBinary(u32),
    Blob,
    Bit(u32),
    Json,
    Enum(Vec<String>),
    Set(Vec<String>),
    Geometry(Option<Srid>),
}

impl SqlType {
    /// The ordered sequence integer literal decoding walks, per the expression
    /// builder's "smallest fitting width" rule.
    pub const INTEGER_WIDTH_ORDER: [SqlType; 8] = [
        SqlType::TinyInt,
        SqlType::UnsignedTinyInt,
        SqlType::SmallInt,
        SqlType::UnsignedSmallInt,
        SqlType::Int,
        SqlType::UnsignedInt,
        SqlType::BigInt,
        SqlType::UnsignedBigInt,
    ];

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SqlType::TinyInt
                | SqlType::UnsignedTinyInt
                | SqlType::SmallInt
                | SqlType::UnsignedSmallInt
                | SqlType::Int
                | SqlType::UnsignedInt
                | SqlType::BigInt
                | SqlType::UnsignedBigInt
                | SqlType::Float
                | SqlType::Double
                | SqlType::Decimal { .. }
        )
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            SqlType::Char(_) | SqlType::VarChar(_) | SqlType::Text
        )
    }

    pub fn is_nullable_by_default(&self) -> bool {
        !matches!(self, SqlType::Null)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Null => write!(f, "null"),
            SqlType::Boolean => write!(f, "boolean"),
            SqlType::TinyInt => write!(f, "i8"),
            SqlType::UnsignedTinyInt => write!(f, "u8"),
            SqlType::SmallInt => write!(f, "i16"),
            SqlType::UnsignedSmallInt => write!(f, "u16"),
            SqlType::Int => write!(f, "i32"),
            SqlType::UnsignedInt => write!(f, "u32"),
            SqlType::BigInt => write!(f, "i64"),
            SqlType::UnsignedBigInt => write!(f, "u64"),
            SqlType::Float => write!(f, "f32"),
            SqlType::Double => write!(f, "f64"),
            SqlType::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            SqlType::Date => write!(f, "date"),
            SqlType::Time => write!(f, "time"),
            SqlType::Datetime => write!(f, "datetime"),
            SqlType::Timestamp => write!(f, "timestamp"),
            SqlType::Year => write!(f, "year"),
            SqlType::Char(n) => write!(f, "char({n})"),
            SqlType::VarChar(n) => write!(f, "varchar({n})"),
            SqlType::Text => write!(f, "text"),
            SqlType::Binary(n) => write!(f, "binary({n})"),
            SqlType::VarBinary(n) => write!(f, "varbinary({n})"),
            SqlType::Blob => write!(f, "blob"),
            SqlType::Bit(n) => write!(f, "bit({n})"),
            SqlType::Json => write!(f, "json"),
            SqlType::Enum(_) => write!(f, "enum"),
            SqlType::Set(_) => write!(f, "set"),
            SqlType::Geometry(srid) => match srid {
                Some(srid) => write!(f, "geometry(srid={})", srid.0),
                None => write!(f, "geometry"),
            },
        }
    }
}
