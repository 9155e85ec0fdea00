//! Numeric payload types: poses and matrices
//!
//! [`Pose`] is the 4x4 homogeneous transform carried by pose arguments and
//! results (128 bytes, column-major, no header). [`Mat`] is the size-prefixed
//! N×M payload used for point clouds, triangle soups, joint sequences and
//! instruction lists.

use std::ops::Mul;

use crate::error::{Result, RobolinkError};

/// 4x4 homogeneous transformation
///
/// The matrix is indexed `matrix[row][col]`:
/// - Upper-left 3x3: rotation
/// - Upper-right 3x1: translation (mm)
/// - Bottom row: `[0, 0, 0, 1]` for a valid homogeneous pose
///
/// Non-homogeneous poses are representable; they are sent with a warning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Row-indexed matrix elements
    pub matrix: [[f64; 4]; 4],
}

impl Pose {
    /// Identity transformation
    pub fn identity() -> Self {
        Pose {
            matrix: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Pure translation
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Pose {
            matrix: [
                [1.0, 0.0, 0.0, x],
                [0.0, 1.0, 0.0, y],
                [0.0, 0.0, 1.0, z],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Rotation around the X axis (radians)
    pub fn rot_x(rx: f64) -> Self {
        let (s, c) = rx.sin_cos();
        Pose {
            matrix: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, -s, 0.0],
                [0.0, s, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Rotation around the Y axis (radians)
    pub fn rot_y(ry: f64) -> Self {
        let (s, c) = ry.sin_cos();
        Pose {
            matrix: [
                [c, 0.0, s, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [-s, 0.0, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Rotation around the Z axis (radians)
    pub fn rot_z(rz: f64) -> Self {
        let (s, c) = rz.sin_cos();
        Pose {
            matrix: [
                [c, -s, 0.0, 0.0],
                [s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Element at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix[row][col]
    }

    /// Set the element at `(row, col)`
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.matrix[row][col] = value;
    }

    /// Translation part `[x, y, z]`
    pub fn position(&self) -> [f64; 3] {
        [self.matrix[0][3], self.matrix[1][3], self.matrix[2][3]]
    }

    /// True when the last row is exactly `[0, 0, 0, 1]`
    pub fn is_homogeneous(&self) -> bool {
        self.matrix[3] == [0.0, 0.0, 0.0, 1.0]
    }

    /// Flatten in wire order: all rows of column 0, then column 1, ...
    pub fn to_column_major(&self) -> [f64; 16] {
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = self.matrix[row][col];
            }
        }
        out
    }

    /// Rebuild from the wire order produced by [`Pose::to_column_major`]
    pub fn from_column_major(values: &[f64; 16]) -> Self {
        let mut matrix = [[0.0; 4]; 4];
        for col in 0..4 {
            for (row, line) in matrix.iter_mut().enumerate() {
                line[col] = values[col * 4 + row];
            }
        }
        Pose { matrix }
    }

    /// Apply the transform to a point
    pub fn transform_point(&self, p: [f64; 3]) -> [f64; 3] {
        let m = &self.matrix;
        let mut out = [0.0; 3];
        for (row, v) in out.iter_mut().enumerate() {
            *v = m[row][0] * p[0] + m[row][1] * p[1] + m[row][2] * p[2] + m[row][3];
        }
        out
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::identity()
    }
}

impl Mul for Pose {
    type Output = Pose;

    /// Transform composition `self * rhs`
    fn mul(self, rhs: Pose) -> Pose {
        let mut matrix = [[0.0; 4]; 4];
        for (i, row) in matrix.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (0..4).map(|k| self.matrix[i][k] * rhs.matrix[k][j]).sum();
            }
        }
        Pose { matrix }
    }
}

/// Rectangular matrix of doubles, stored column-major
///
/// Each column is one record: a point (`3xN` or `6xN` with normals), a
/// triangle vertex, a joint configuration or a program instruction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mat {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Mat {
    /// Zero-filled `rows x cols` matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Mat {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Empty matrix (encodes as `0 x 0`, no payload)
    pub fn empty() -> Self {
        Mat::default()
    }

    /// Build from column-major data
    ///
    /// # Errors
    ///
    /// [`RobolinkError::InvalidArgument`] if `data.len() != rows * cols`.
    pub fn from_column_major(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(RobolinkError::InvalidArgument(format!(
                "matrix {}x{} needs {} values, got {}",
                rows,
                cols,
                rows * cols,
                data.len()
            )));
        }
        Ok(Mat { rows, cols, data })
    }

    /// Build from columns of equal length
    ///
    /// ```
    /// use robolink_rust::protocol::Mat;
    ///
    /// let points = Mat::from_columns(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]])?;
    /// assert_eq!((points.rows(), points.cols()), (3, 2));
    /// # Ok::<(), robolink_rust::RobolinkError>(())
    /// ```
    pub fn from_columns<C: AsRef<[f64]>>(columns: &[C]) -> Result<Self> {
        let rows = columns.first().map_or(0, |c| c.as_ref().len());
        let mut data = Vec::with_capacity(rows * columns.len());
        for (i, column) in columns.iter().enumerate() {
            let column = column.as_ref();
            if column.len() != rows {
                return Err(RobolinkError::InvalidArgument(format!(
                    "column {} has {} values, expected {}",
                    i,
                    column.len(),
                    rows
                )));
            }
            data.extend_from_slice(column);
        }
        Ok(Mat {
            rows,
            cols: columns.len(),
            data,
        })
    }

    /// Build from rows of equal length
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        Ok(Mat::from_columns(rows)?.transpose())
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Element at `(row, col)`
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        self.data[col * self.rows + row]
    }

    /// Set the element at `(row, col)`
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        self.data[col * self.rows + row] = value;
    }

    /// One column as a slice
    pub fn column(&self, col: usize) -> &[f64] {
        &self.data[col * self.rows..(col + 1) * self.rows]
    }

    /// Iterate over columns
    pub fn columns(&self) -> impl Iterator<Item = &[f64]> {
        // chunks(0) panics; an empty matrix has no columns anyway
        self.data.chunks(self.rows.max(1)).take(self.cols)
    }

    /// Column-major storage
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Transposed copy
    pub fn transpose(&self) -> Mat {
        let mut out = Mat::zeros(self.cols, self.rows);
        for col in 0..self.cols {
            for row in 0..self.rows {
                out.set(col, row, self.get(row, col));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_homogeneous() {
        assert!(Pose::identity().is_homogeneous());
        let mut p = Pose::identity();
        p.set(3, 0, 0.5);
        assert!(!p.is_homogeneous());
    }

    #[test]
    fn test_column_major_order() {
        let mut p = Pose::translation(10.0, 20.0, 30.0);
        p.set(1, 0, 7.0);
        let flat = p.to_column_major();
        // column 0 first
        assert_eq!(&flat[0..4], &[1.0, 7.0, 0.0, 0.0]);
        // translation is column 3
        assert_eq!(&flat[12..16], &[10.0, 20.0, 30.0, 1.0]);
        assert_eq!(Pose::from_column_major(&flat), p);
    }

    #[test]
    fn test_composition() {
        let a = Pose::translation(1.0, 2.0, 3.0);
        let b = Pose::translation(10.0, 0.0, 0.0);
        assert_eq!((a * b).position(), [11.0, 2.0, 3.0]);

        let r = Pose::rot_z(std::f64::consts::FRAC_PI_2);
        let p = (r * Pose::translation(100.0, 0.0, 0.0)).position();
        assert!(p[0].abs() < 1e-9);
        assert!((p[1] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_transform_point() {
        let p = Pose::translation(0.0, 0.0, 5.0) * Pose::rot_x(std::f64::consts::PI);
        let q = p.transform_point([0.0, 1.0, 0.0]);
        assert!((q[1] + 1.0).abs() < 1e-9);
        assert!((q[2] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_mat_layout() {
        let m = Mat::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        assert_eq!((m.rows(), m.cols()), (2, 3));
        assert_eq!(m.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(m.column(1), &[2.0, 5.0]);
        assert_eq!(m.get(1, 2), 6.0);
        assert_eq!(m.columns().count(), 3);
    }

    #[test]
    fn test_mat_ragged_columns_rejected() {
        let cols: Vec<Vec<f64>> = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            Mat::from_columns(&cols),
            Err(RobolinkError::InvalidArgument(_))
        ));
        assert!(Mat::from_column_major(2, 2, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_empty_mat() {
        let m = Mat::empty();
        assert!(m.is_empty());
        assert_eq!(m.columns().count(), 0);
        assert!(Mat::zeros(0, 5).is_empty());
    }
}
