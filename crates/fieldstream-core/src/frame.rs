//! Field snapshots: [`Grid`], [`FrameData`], and [`Frame`].

use std::fmt;

use crate::error::FrameError;

/// A dense row-major 2D array of scalars.
///
/// Rows map to the solver's first axis (`x`, sized by `width`) and
/// columns to its second axis (`y`, sized by `height`).
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Grid {
    /// Build a grid from flat row-major values.
    ///
    /// Returns `Err` if either dimension is zero or `values.len()`
    /// does not equal `rows * cols`.
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, FrameError> {
        if rows == 0 || cols == 0 {
            return Err(FrameError::EmptyGrid);
        }
        if values.len() != rows * cols {
            return Err(FrameError::LengthMismatch {
                expected: rows * cols,
                found: values.len(),
            });
        }
        Ok(Self { rows, cols, values })
    }

    /// Build a grid from nested rows, rejecting ragged input.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, FrameError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() || cols == 0 {
            return Err(FrameError::EmptyGrid);
        }
        let n_rows = rows.len();
        let mut values = Vec::with_capacity(n_rows * cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(FrameError::RaggedGrid {
                    row: i,
                    expected: cols,
                    found: row.len(),
                });
            }
            values.extend(row);
        }
        Ok(Self {
            rows: n_rows,
            cols,
            values,
        })
    }

    /// A grid of the given shape filled with `value`.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Result<Self, FrameError> {
        Self::new(rows, cols, vec![value; rows * cols])
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Flat row-major values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value at `(row, col)`, or `None` out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.values.get(row * self.cols + col).copied()
    }

    /// Nested-row rendering, as the solver service expects it.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values.chunks(self.cols).map(<[f64]>::to_vec).collect()
    }
}

/// The shape shared by every frame in one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameShape {
    /// A 1D field of `len` samples.
    Line {
        /// Number of grid points.
        len: usize,
    },
    /// A pair of `rows x cols` species grids.
    Species {
        /// Grid rows.
        rows: usize,
        /// Grid columns.
        cols: usize,
    },
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line { len } => write!(f, "line[{len}]"),
            Self::Species { rows, cols } => write!(f, "species[{rows}x{cols}]"),
        }
    }
}

/// The field values of one time slice.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameData {
    /// A scalar 1D field.
    Line(Vec<f64>),
    /// A two-species 2D field (`u` feeds, `v` consumes).
    Species {
        /// First species concentration.
        u: Grid,
        /// Second species concentration.
        v: Grid,
    },
}

impl FrameData {
    /// Build a two-species frame, checking both grids share a shape.
    pub fn species(u: Grid, v: Grid) -> Result<Self, FrameError> {
        if u.rows() != v.rows() || u.cols() != v.cols() {
            return Err(FrameError::SpeciesShapeMismatch {
                u: (u.rows(), u.cols()),
                v: (v.rows(), v.cols()),
            });
        }
        Ok(Self::Species { u, v })
    }

    /// Shape of this frame.
    pub fn shape(&self) -> FrameShape {
        match self {
            Self::Line(values) => FrameShape::Line { len: values.len() },
            Self::Species { u, .. } => FrameShape::Species {
                rows: u.rows(),
                cols: u.cols(),
            },
        }
    }

    /// Largest absolute element-wise difference to `other`.
    ///
    /// Returns `None` if the shapes differ. NaN elements compare as
    /// infinitely far apart.
    pub fn max_deviation(&self, other: &FrameData) -> Option<f64> {
        if self.shape() != other.shape() {
            return None;
        }
        let dev = |a: &[f64], b: &[f64]| {
            a.iter().zip(b).fold(0.0_f64, |acc, (x, y)| {
                let d = (x - y).abs();
                if d.is_nan() {
                    f64::INFINITY
                } else {
                    acc.max(d)
                }
            })
        };
        match (self, other) {
            (Self::Line(a), Self::Line(b)) => Some(dev(a, b)),
            (Self::Species { u: ua, v: va }, Self::Species { u: ub, v: vb }) => {
                Some(dev(ua.values(), ub.values()).max(dev(va.values(), vb.values())))
            }
            _ => None,
        }
    }
}

/// One time slice of a simulated field.
///
/// Inside a [`Batch`](crate::Batch), `time` is relative to the seed
/// instant. Once appended to a session buffer it is absolute session
/// time.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Simulation time of this slice.
    pub time: f64,
    /// Field values.
    pub data: FrameData,
}

impl Frame {
    /// Create a frame.
    pub fn new(time: f64, data: FrameData) -> Self {
        Self { time, data }
    }

    /// Shape of the frame's data.
    pub fn shape(&self) -> FrameShape {
        self.data.shape()
    }

    /// Copy of this frame shifted by `offset` in time.
    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            time: self.time + offset,
            data: self.data.clone(),
        }
    }
}
