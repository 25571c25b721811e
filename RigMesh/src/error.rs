//! Error types for `RigMesh`

use std::fmt;

use thiserror::Error;

/// Where in a text document an error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// A 1-based line number.
    Line(usize),
    /// The document ended before the grammar was satisfied.
    EndOfInput,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Line(line) => write!(f, "line {line}"),
            Location::EndOfInput => f.write_str("end of input"),
        }
    }
}

/// The kind of index that was found out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Parent,
    Joint,
    Vertex,
    Weight,
    Channel,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexKind::Parent => "parent",
            IndexKind::Joint => "joint",
            IndexKind::Vertex => "vertex",
            IndexKind::Weight => "weight",
            IndexKind::Channel => "channel",
        };
        f.write_str(name)
    }
}

/// The error type for `RigMesh` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ==================== Text Format Errors ====================
    /// A required block is missing, a record has the wrong number of fields,
    /// or a token could not be interpreted.
    #[error("malformed input at {at}: {message}")]
    MalformedFormat {
        /// Where the problem was detected.
        at: Location,
        /// Description of what was expected.
        message: String,
    },

    /// A parent, joint, vertex, weight or channel index lies outside its
    /// valid range.
    #[error("{kind} index {index} out of range at {at} (valid: 0..{len})")]
    IndexOutOfRange {
        /// Where the reference was read.
        at: Location,
        /// What the index refers to.
        kind: IndexKind,
        /// The offending index as written in the file.
        index: i64,
        /// Number of valid targets.
        len: usize,
    },

    /// The weight biases of a vertex do not sum to one (strict parsing only).
    #[error("vertex {vertex} at {at} has weight bias sum {sum}, expected 1.0")]
    BiasSumMismatch {
        /// Location of the vertex record.
        at: Location,
        /// Vertex index within its mesh.
        vertex: usize,
        /// The actual sum of biases.
        sum: f32,
    },

    // ==================== Packing Errors ====================
    /// The model has more vertices than 16-bit indices can address.
    #[error("model has {vertex_count} vertices, 16-bit index buffer holds at most 65536")]
    IndexBufferOverflow {
        /// Total vertex count across all meshes.
        vertex_count: usize,
    },

    /// A byte arena failed header or record validation.
    #[error("invalid arena: {message}")]
    InvalidArena {
        /// What failed to validate.
        message: String,
    },

    // ==================== Skinning Errors ====================
    /// A joint pose does not have one entry per arena joint.
    #[error("pose has {found} joints, arena expects {expected}")]
    PoseMismatch {
        /// Joint count of the arena.
        expected: usize,
        /// Joint count of the supplied pose.
        found: usize,
    },

    /// The destination vertex buffer has the wrong length.
    #[error("vertex buffer holds {found} floats, arena needs {expected}")]
    VertexBufferMismatch {
        /// Required number of floats.
        expected: usize,
        /// Actual number of floats.
        found: usize,
    },

    /// An animation clip's hierarchy does not match the model's skeleton.
    #[error("animation does not fit skeleton: {message}")]
    ClipMismatch {
        /// Description of the first difference found.
        message: String,
    },
}

impl Error {
    pub(crate) fn malformed(at: Location, message: impl Into<String>) -> Self {
        Error::MalformedFormat {
            at,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_arena(message: impl Into<String>) -> Self {
        Error::InvalidArena {
            message: message.into(),
        }
    }
}

/// Result type alias for `RigMesh` operations.
pub type Result<T> = std::result::Result<T, Error>;
