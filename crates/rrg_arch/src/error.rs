//! Error types for architecture-derived computations.

/// Errors produced while interpreting an architecture description.
#[derive(Debug, thiserror::Error)]
pub enum ArchError {
    /// A grid dimension was zero.
    #[error("device grid must be non-empty (got {width}x{height}, {layers} layers)")]
    EmptyGrid {
        /// Requested width.
        width: u16,
        /// Requested height.
        height: u16,
        /// Requested layer count.
        layers: u8,
    },

    /// The least common multiple of tile heights does not fit in a `u32`.
    #[error("least common multiple of block heights overflows")]
    LcmOverflow,

    /// Too many cuts were requested for the grid height and tile alignment.
    #[error("cannot place {num_cuts} cuts in a grid of height {height} aligned to {alignment} rows")]
    CutsTooDense {
        /// Requested number of cuts.
        num_cuts: u16,
        /// Grid height.
        height: u16,
        /// Row alignment (LCM of block heights).
        alignment: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_empty_grid() {
        let err = ArchError::EmptyGrid {
            width: 0,
            height: 4,
            layers: 1,
        };
        assert_eq!(
            err.to_string(),
            "device grid must be non-empty (got 0x4, 1 layers)"
        );
    }

    #[test]
    fn display_cuts_too_dense() {
        let err = ArchError::CutsTooDense {
            num_cuts: 5,
            height: 6,
            alignment: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("5 cuts"));
        assert!(msg.contains("aligned to 3 rows"));
    }
}
