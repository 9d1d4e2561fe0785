//! Filter operator registry
//!
//! Maps DSL tokens (`eq`, `cs`, `st_dwithin`, `vec_l2`, ...) to a closed set
//! of operators. Rendering matches exhaustively on [`FilterOperator`].

use serde::Serialize;

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    // Comparison
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    // Pattern
    Like,
    Ilike,
    Match,
    Imatch,
    // Null / boolean
    Is,
    // Membership
    In,
    // Range / adjacency
    Sl,
    Sr,
    Nxl,
    Nxr,
    Adj,
    Ov,
    // Containment
    Cs,
    Cd,
    // Full text
    Fts,
    Plfts,
    Phfts,
    Wfts,
    // Spatial
    StIntersects,
    StContains,
    StWithin,
    StTouches,
    StCrosses,
    StOverlaps,
    StDistance,
    StDwithin,
    // Vector similarity
    VecL2,
    VecCos,
    VecIp,
    // Negation of the remainder expression
    Not,
}

/// Behavior family of an operator, used to pick the rendering shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    /// `lhs <op> $n`
    Binary,
    /// `lhs IS NULL` / `lhs IS $n`
    Is,
    /// `lhs = ANY($n)`
    Membership,
    /// `lhs @@ fn($n)`
    FullText,
    /// `ST_Fn(lhs, ST_GeomFromGeoJSON($n))`
    Spatial,
    /// distance-bounded spatial predicate with two parameters
    SpatialDistance,
    /// `(lhs <dist> $n::vector) <= $m`
    Vector,
    /// `NOT (<inner>)`
    Negation,
}

const OPERATORS: &[(&str, FilterOperator)] = &[
    ("eq", FilterOperator::Eq),
    ("neq", FilterOperator::Neq),
    ("gt", FilterOperator::Gt),
    ("gte", FilterOperator::Gte),
    ("lt", FilterOperator::Lt),
    ("lte", FilterOperator::Lte),
    ("like", FilterOperator::Like),
    ("ilike", FilterOperator::Ilike),
    ("match", FilterOperator::Match),
    ("imatch", FilterOperator::Imatch),
    ("is", FilterOperator::Is),
    ("in", FilterOperator::In),
    ("sl", FilterOperator::Sl),
    ("sr", FilterOperator::Sr),
    ("nxl", FilterOperator::Nxl),
    ("nxr", FilterOperator::Nxr),
    ("adj", FilterOperator::Adj),
    ("ov", FilterOperator::Ov),
    ("cs", FilterOperator::Cs),
    ("cd", FilterOperator::Cd),
    ("fts", FilterOperator::Fts),
    ("ts", FilterOperator::Fts),
    ("plfts", FilterOperator::Plfts),
    ("phfts", FilterOperator::Phfts),
    ("phs", FilterOperator::Phfts),
    ("wfts", FilterOperator::Wfts),
    ("wsb", FilterOperator::Wfts),
    ("st_intersects", FilterOperator::StIntersects),
    ("st_contains", FilterOperator::StContains),
    ("st_within", FilterOperator::StWithin),
    ("st_touches", FilterOperator::StTouches),
    ("st_crosses", FilterOperator::StCrosses),
    ("st_overlaps", FilterOperator::StOverlaps),
    ("st_distance", FilterOperator::StDistance),
    ("st_dwithin", FilterOperator::StDwithin),
    ("vec_l2", FilterOperator::VecL2),
    ("vec_cos", FilterOperator::VecCos),
    ("vec_ip", FilterOperator::VecIp),
    ("not", FilterOperator::Not),
];

impl FilterOperator {
    /// Look up an operator by its DSL token
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        OPERATORS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, op)| *op)
    }

    /// Canonical DSL token
    #[must_use]
    pub fn token(self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, op)| *op == self)
            .map_or("eq", |(name, _)| *name)
    }

    #[must_use]
    pub fn kind(self) -> OperatorKind {
        match self {
            Self::Is => OperatorKind::Is,
            Self::In => OperatorKind::Membership,
            Self::Fts | Self::Plfts | Self::Phfts | Self::Wfts => OperatorKind::FullText,
            Self::StIntersects
            | Self::StContains
            | Self::StWithin
            | Self::StTouches
            | Self::StCrosses
            | Self::StOverlaps => OperatorKind::Spatial,
            Self::StDistance | Self::StDwithin => OperatorKind::SpatialDistance,
            Self::VecL2 | Self::VecCos | Self::VecIp => OperatorKind::Vector,
            Self::Not => OperatorKind::Negation,
            _ => OperatorKind::Binary,
        }
    }

    /// SQL fragment for the operator.
    ///
    /// Binary operators yield the infix symbol, full-text operators the
    /// tsquery constructor, spatial operators the PostGIS function and vector
    /// operators the pgvector distance symbol.
    #[must_use]
    pub fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::Ilike => "ILIKE",
            Self::Match => "~",
            Self::Imatch => "~*",
            Self::Is => "IS",
            Self::In => "= ANY",
            Self::Sl => "<<",
            Self::Sr => ">>",
            Self::Nxl => "&<",
            Self::Nxr => "&>",
            Self::Adj => "-|-",
            Self::Ov => "&&",
            Self::Cs => "@>",
            Self::Cd => "<@",
            Self::Fts => "to_tsquery",
            Self::Plfts => "plainto_tsquery",
            Self::Phfts => "phraseto_tsquery",
            Self::Wfts => "websearch_to_tsquery",
            Self::StIntersects => "ST_Intersects",
            Self::StContains => "ST_Contains",
            Self::StWithin => "ST_Within",
            Self::StTouches => "ST_Touches",
            Self::StCrosses => "ST_Crosses",
            Self::StOverlaps => "ST_Overlaps",
            Self::StDistance => "ST_Distance",
            Self::StDwithin => "ST_DWithin",
            Self::VecL2 => "<->",
            Self::VecCos => "<=>",
            Self::VecIp => "<#>",
            Self::Not => "NOT",
        }
    }

    /// Whether the operator is a plain ordering comparison (`gt`, `lte`, ...)
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Neq | Self::Gt | Self::Gte | Self::Lt | Self::Lte
        )
    }
}

/// Vector distance operators shared by the filter and order grammars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorOp {
    L2,
    Cosine,
    InnerProduct,
}

impl VectorOp {
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "vec_l2" => Some(Self::L2),
            "vec_cos" => Some(Self::Cosine),
            "vec_ip" => Some(Self::InnerProduct),
            _ => None,
        }
    }

    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::L2 => "vec_l2",
            Self::Cosine => "vec_cos",
            Self::InnerProduct => "vec_ip",
        }
    }

    /// pgvector distance operator
    #[must_use]
    pub fn sql(self) -> &'static str {
        match self {
            Self::L2 => "<->",
            Self::Cosine => "<=>",
            Self::InnerProduct => "<#>",
        }
    }
}

impl From<VectorOp> for FilterOperator {
    fn from(op: VectorOp) -> Self {
        match op {
            VectorOp::L2 => Self::VecL2,
            VectorOp::Cosine => Self::VecCos,
            VectorOp::InnerProduct => Self::VecIp,
        }
    }
}
