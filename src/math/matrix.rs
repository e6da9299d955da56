use std::fmt;
use std::io::{Read, Write};
use std::ops::{
    Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Sub, SubAssign,
};

use log::trace;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::math::element::{read_len, write_len, Element};
use crate::math::init::{fan_in_bounds, InitSampling, Sampler};
use crate::math::vector::Vector;

/// An `R × C` matrix stored as `R` row vectors of length `C`.
///
/// Both dimensions are part of the type, so jagged rows cannot exist.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T, const R: usize, const C: usize> {
    rows: Vec<Vector<T, C>>,
}

impl<T: Element, const R: usize, const C: usize> Matrix<T, R, C> {
    pub fn filled(value: T) -> Self {
        Matrix {
            rows: (0..R).map(|_| Vector::filled(value)).collect(),
        }
    }

    pub fn zeros() -> Self {
        Self::filled(T::ZERO)
    }

    /// Builds a matrix from nested rows; fails unless there are exactly `R`
    /// rows of exactly `C` values each.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        if rows.len() != R {
            return Err(Error::dimension(
                format!("{R} rows"),
                format!("{} rows", rows.len()),
            ));
        }
        let rows = rows
            .into_iter()
            .map(Vector::from_vec)
            .collect::<Result<Vec<_>>>()?;
        Ok(Matrix { rows })
    }

    /// Builds a matrix from `R·C` values in row-major order.
    pub fn from_row_major(values: Vec<T>) -> Result<Self> {
        if values.len() != R * C {
            return Err(Error::dimension(
                format!("{} elements ({R}x{C})", R * C),
                format!("{} elements", values.len()),
            ));
        }
        let rows = if C == 0 {
            (0..R).map(|_| Vector::zeros()).collect()
        } else {
            values
                .chunks_exact(C)
                .map(Vector::from_slice)
                .collect::<Result<Vec<_>>>()?
        };
        Ok(Matrix { rows })
    }

    pub(crate) fn from_row_vectors(rows: Vec<Vector<T, C>>) -> Self {
        debug_assert_eq!(rows.len(), R);
        Matrix { rows }
    }

    /// A matrix with every element drawn from `[-1/√fan_in, 1/√fan_in]`.
    pub fn random<G: Rng + ?Sized>(
        fan_in: usize,
        rng: &mut G,
        sampling: InitSampling,
    ) -> Result<Self> {
        let mut out = Self::zeros();
        out.randomize(fan_in, rng, sampling)?;
        Ok(out)
    }

    /// Overwrites every element with a draw from `[-1/√fan_in, 1/√fan_in]`,
    /// keeping early activations in a reasonable range.
    pub fn randomize<G: Rng + ?Sized>(
        &mut self,
        fan_in: usize,
        rng: &mut G,
        sampling: InitSampling,
    ) -> Result<()> {
        let (low, high) = fan_in_bounds(fan_in)?;
        let sampler = Sampler::<T>::new(low, high, sampling)?;
        for row in self.rows.iter_mut() {
            for col in 0..C {
                row[col] = sampler.sample(rng);
            }
        }
        Ok(())
    }

    /// Reads a matrix written by [`Matrix::write_binary`].
    ///
    /// Both stored dimensions are checked before any element is read.
    pub fn read_binary<Rd: Read>(input: &mut Rd) -> Result<Self> {
        let rows = read_len(input)?;
        let cols = read_len(input)?;
        trace!("matrix header: {rows}x{cols}");
        if rows != R as u64 || cols != C as u64 {
            return Err(Error::dimension(
                format!("{R}x{C} matrix"),
                format!("stored {rows}x{cols} matrix"),
            ));
        }
        let rows = (0..R)
            .map(|_| Vector::read_elements(input))
            .collect::<Result<Vec<_>>>()?;
        Ok(Matrix { rows })
    }

    /// Writes `[rows: u64 LE][cols: u64 LE][R·C elements LE, row-major]`.
    pub fn write_binary<W: Write>(&self, out: &mut W) -> Result<()> {
        write_len(out, R)?;
        write_len(out, C)?;
        for row in &self.rows {
            row.write_elements(out)?;
        }
        Ok(())
    }

    pub fn apply<F>(&self, func: F) -> Self
    where
        F: Fn(T) -> T,
    {
        Matrix {
            rows: self.rows.iter().map(|row| row.apply(&func)).collect(),
        }
    }

    /// Matrix product. Fails when this matrix's column count differs from
    /// the right operand's row count.
    pub fn dot<const RR: usize, const K: usize>(
        &self,
        rhs: &Matrix<T, RR, K>,
    ) -> Result<Matrix<T, R, K>> {
        if C != RR {
            return Err(Error::dimension(
                format!("right operand with {C} rows"),
                format!("right operand with {RR} rows"),
            ));
        }
        let mut out = Matrix::<T, R, K>::zeros();
        for (i, row) in self.rows.iter().enumerate() {
            for j in 0..K {
                let mut sum = T::ZERO;
                for (k, &a) in row.iter().enumerate() {
                    sum += a * rhs.rows[k][j];
                }
                out.rows[i][j] = sum;
            }
        }
        Ok(out)
    }

    /// Matrix–vector product: `out[i] = Σ_k self[i][k] * v[k]`.
    pub fn dot_vector(&self, v: &Vector<T, C>) -> Vector<T, R> {
        let mut out = Vector::<T, R>::zeros();
        for (i, row) in self.rows.iter().enumerate() {
            let mut sum = T::ZERO;
            for (&a, &b) in row.iter().zip(v.iter()) {
                sum += a * b;
            }
            out[i] = sum;
        }
        out
    }

    pub fn transpose(&self) -> Matrix<T, C, R> {
        let mut out = Matrix::<T, C, R>::zeros();
        for (i, row) in self.rows.iter().enumerate() {
            for (j, &x) in row.iter().enumerate() {
                out.rows[j][i] = x;
            }
        }
        out
    }

    /// Reshapes into a single column of `RC = R·C` elements, row-major.
    pub fn flatten_vertical<const RC: usize>(&self) -> Result<Matrix<T, RC, 1>> {
        self.check_flat_len::<RC>()?;
        let mut out = Matrix::<T, RC, 1>::zeros();
        for (index, &x) in self.elements().enumerate() {
            out.rows[index][0] = x;
        }
        Ok(out)
    }

    /// Reshapes into a single row of `RC = R·C` elements, row-major.
    pub fn flatten_horizontal<const RC: usize>(&self) -> Result<Matrix<T, 1, RC>> {
        self.check_flat_len::<RC>()?;
        let flat = Vector::from_vec(self.elements().copied().collect())?;
        Ok(Matrix { rows: vec![flat] })
    }

    fn check_flat_len<const RC: usize>(&self) -> Result<()> {
        if RC != R * C {
            return Err(Error::dimension(
                format!("{} elements ({R}x{C})", R * C),
                format!("{RC} elements"),
            ));
        }
        Ok(())
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.row(row)?.get(col).copied()
    }

    pub fn sum(&self) -> T {
        self.elements().copied().sum()
    }
}

impl<T, const R: usize, const C: usize> Matrix<T, R, C> {
    pub const fn n_rows(&self) -> usize {
        R
    }

    pub const fn n_cols(&self) -> usize {
        C
    }

    pub fn row(&self, index: usize) -> Result<&Vector<T, C>> {
        self.rows
            .get(index)
            .ok_or(Error::IndexOutOfRange { index, len: R })
    }

    pub fn row_mut(&mut self, index: usize) -> Result<&mut Vector<T, C>> {
        self.rows
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len: R })
    }

    pub fn iter_rows(&self) -> std::slice::Iter<'_, Vector<T, C>> {
        self.rows.iter()
    }

    /// All elements in row-major order.
    pub fn elements(&self) -> impl Iterator<Item = &T> {
        self.rows.iter().flat_map(|row| row.iter())
    }
}

impl<T: Element, const R: usize, const C: usize> Default for Matrix<T, R, C> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<T, const R: usize, const C: usize> Index<usize> for Matrix<T, R, C> {
    type Output = Vector<T, C>;

    fn index(&self, index: usize) -> &Vector<T, C> {
        match self.rows.get(index) {
            Some(row) => row,
            None => panic!("tried to access row {index} but the matrix has {R} rows"),
        }
    }
}

impl<T, const R: usize, const C: usize> IndexMut<usize> for Matrix<T, R, C> {
    fn index_mut(&mut self, index: usize) -> &mut Vector<T, C> {
        match self.rows.get_mut(index) {
            Some(row) => row,
            None => panic!("tried to access row {index} but the matrix has {R} rows"),
        }
    }
}

impl<T, const R: usize, const C: usize> Index<(usize, usize)> for Matrix<T, R, C> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        &self[row][col]
    }
}

impl<T, const R: usize, const C: usize> IndexMut<(usize, usize)> for Matrix<T, R, C> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        &mut self[row][col]
    }
}

impl<T: fmt::Display, const R: usize, const C: usize> fmt::Display for Matrix<T, R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for (i, row) in self.rows.iter().enumerate() {
            let sep = if i + 1 < R { "," } else { "" };
            writeln!(f, "\t{row}{sep}")?;
        }
        write!(f, "]")
    }
}

impl<T: Serialize, const R: usize, const C: usize> Serialize for Matrix<T, R, C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>, const R: usize, const C: usize> Deserialize<'de>
    for Matrix<T, R, C>
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let rows = Vec::<Vector<T, C>>::deserialize(deserializer)?;
        if rows.len() != R {
            return Err(serde::de::Error::custom(Error::dimension(
                format!("{R} rows"),
                format!("{} rows", rows.len()),
            )));
        }
        Ok(Matrix { rows })
    }
}

// Row-wise delegation to the vector operators.
macro_rules! matrix_elementwise_op {
    ($op_trait:ident, $op_method:ident, $assign_trait:ident, $assign_method:ident) => {
        impl<T: Element, const R: usize, const C: usize> $assign_trait<&Matrix<T, R, C>>
            for Matrix<T, R, C>
        {
            fn $assign_method(&mut self, rhs: &Matrix<T, R, C>) {
                for (lhs, rhs) in self.rows.iter_mut().zip(rhs.rows.iter()) {
                    lhs.$assign_method(rhs);
                }
            }
        }

        impl<T: Element, const R: usize, const C: usize> $assign_trait<Matrix<T, R, C>>
            for Matrix<T, R, C>
        {
            fn $assign_method(&mut self, rhs: Matrix<T, R, C>) {
                self.$assign_method(&rhs);
            }
        }

        impl<T: Element, const R: usize, const C: usize> $assign_trait<T> for Matrix<T, R, C> {
            fn $assign_method(&mut self, rhs: T) {
                for lhs in self.rows.iter_mut() {
                    lhs.$assign_method(rhs);
                }
            }
        }

        impl<T: Element, const R: usize, const C: usize> $op_trait<&Matrix<T, R, C>>
            for &Matrix<T, R, C>
        {
            type Output = Matrix<T, R, C>;

            fn $op_method(self, rhs: &Matrix<T, R, C>) -> Matrix<T, R, C> {
                let mut out = self.clone();
                out.$assign_method(rhs);
                out
            }
        }

        impl<T: Element, const R: usize, const C: usize> $op_trait<&Matrix<T, R, C>>
            for Matrix<T, R, C>
        {
            type Output = Matrix<T, R, C>;

            fn $op_method(mut self, rhs: &Matrix<T, R, C>) -> Matrix<T, R, C> {
                self.$assign_method(rhs);
                self
            }
        }

        impl<T: Element, const R: usize, const C: usize> $op_trait<Matrix<T, R, C>>
            for Matrix<T, R, C>
        {
            type Output = Matrix<T, R, C>;

            fn $op_method(mut self, rhs: Matrix<T, R, C>) -> Matrix<T, R, C> {
                self.$assign_method(&rhs);
                self
            }
        }

        impl<T: Element, const R: usize, const C: usize> $op_trait<T> for &Matrix<T, R, C> {
            type Output = Matrix<T, R, C>;

            fn $op_method(self, rhs: T) -> Matrix<T, R, C> {
                let mut out = self.clone();
                out.$assign_method(rhs);
                out
            }
        }

        impl<T: Element, const R: usize, const C: usize> $op_trait<T> for Matrix<T, R, C> {
            type Output = Matrix<T, R, C>;

            fn $op_method(mut self, rhs: T) -> Matrix<T, R, C> {
                self.$assign_method(rhs);
                self
            }
        }
    };
}

matrix_elementwise_op!(Add, add, AddAssign, add_assign);
matrix_elementwise_op!(Sub, sub, SubAssign, sub_assign);
matrix_elementwise_op!(Mul, mul, MulAssign, mul_assign);
matrix_elementwise_op!(Div, div, DivAssign, div_assign);

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Cursor;

    #[test]
    fn from_rows_rejects_jagged_input() {
        let err = Matrix::<f32, 2, 2>::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
        assert!(Matrix::<f32, 2, 2>::from_rows(vec![vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn flatten_uses_row_major_order() {
        let m = Matrix::<f64, 2, 3>::from_row_major(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let v = m.flatten_vertical::<6>().unwrap();
        let h = m.flatten_horizontal::<6>().unwrap();
        for i in 0..6 {
            assert_eq!(v[(i, 0)], (i + 1) as f64);
            assert_eq!(h[(0, i)], (i + 1) as f64);
        }
        assert!(m.flatten_vertical::<5>().is_err());
        assert!(m.flatten_horizontal::<7>().is_err());
    }

    #[test]
    fn randomize_stays_within_fan_in_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        for sampling in [InitSampling::Continuous, InitSampling::Quantized { scale: 10_000 }] {
            let m = Matrix::<f32, 8, 16>::random(16, &mut rng, sampling).unwrap();
            assert!(m.elements().all(|&x| (-0.25..=0.25).contains(&x)));
            assert!(m.elements().any(|&x| x < 0.0));
        }
    }

    #[test]
    fn header_mismatch_is_reported_before_elements() {
        let mut buf = Vec::new();
        write_len(&mut buf, 3).unwrap();
        write_len(&mut buf, 2).unwrap();
        let err = Matrix::<f32, 2, 3>::read_binary(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn display_puts_one_row_per_line() {
        let m = Matrix::<f64, 2, 2>::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.to_string(), "[\n\t[1, 2],\n\t[3, 4]\n]");
    }

    #[test]
    fn get_checks_both_dimensions() {
        let m = Matrix::<f32, 2, 3>::filled(1.5);
        assert_eq!(m.get(1, 2).unwrap(), 1.5);
        assert!(matches!(m.get(2, 0), Err(Error::IndexOutOfRange { index: 2, len: 2 })));
        assert!(matches!(m.get(0, 3), Err(Error::IndexOutOfRange { index: 3, len: 3 })));
    }
}
