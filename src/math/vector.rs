use std::fmt;
use std::io::{Read, Write};
use std::ops::{
    Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Sub, SubAssign,
};

use log::trace;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::math::element::{read_len, write_len, Element};
use crate::math::matrix::Matrix;

/// A column of exactly `N` values.
///
/// The length is part of the type. Elements live on the heap so that layer
/// sized vectors (hundreds of entries) are cheap to move, but the buffer is
/// never resized: every constructor checks that it holds exactly `N` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector<T, const N: usize> {
    data: Vec<T>,
}

impl<T: Element, const N: usize> Vector<T, N> {
    /// Every element set to `value`.
    pub fn filled(value: T) -> Self {
        Vector { data: vec![value; N] }
    }

    pub fn zeros() -> Self {
        Self::filled(T::ZERO)
    }

    /// Copies exactly `N` values out of `values`.
    pub fn from_slice(values: &[T]) -> Result<Self> {
        Self::from_vec(values.to_vec())
    }

    /// Reads a vector written by [`Vector::write_binary`].
    ///
    /// The stored length is checked against `N` before any element is read.
    pub fn read_binary<R: Read>(input: &mut R) -> Result<Self> {
        let len = read_len(input)?;
        trace!("vector header: {len} elements");
        if len != N as u64 {
            return Err(Error::dimension(
                format!("vector of {N} elements"),
                format!("stored vector of {len} elements"),
            ));
        }
        Self::read_elements(input)
    }

    pub(crate) fn read_elements<R: Read>(input: &mut R) -> Result<Self> {
        let mut data = Vec::with_capacity(N);
        for _ in 0..N {
            data.push(T::read_le(input)?);
        }
        Ok(Vector { data })
    }

    /// Writes `[len: u64 LE][N elements LE]`.
    pub fn write_binary<W: Write>(&self, out: &mut W) -> Result<()> {
        write_len(out, N)?;
        self.write_elements(out)
    }

    pub(crate) fn write_elements<W: Write>(&self, out: &mut W) -> Result<()> {
        for &x in &self.data {
            x.write_le(out)?;
        }
        Ok(())
    }

    /// Returns a new vector with `func` applied to every element.
    pub fn apply<F>(&self, func: F) -> Self
    where
        F: Fn(T) -> T,
    {
        Vector {
            data: self.data.iter().map(|&x| func(x)).collect(),
        }
    }

    /// Outer product: `out[i][j] = self[i] * other[j]`.
    ///
    /// Backpropagation uses this to turn a layer's error signal and its input
    /// into a weight-shaped gradient. It is not a reduction.
    #[doc(alias = "dot")]
    pub fn outer<const M: usize>(&self, other: &Vector<T, M>) -> Matrix<T, N, M> {
        let rows = self
            .data
            .iter()
            .map(|&left| other.apply(|right| left * right))
            .collect();
        Matrix::from_row_vectors(rows)
    }

    /// `exp(x[i]) / Σ exp(x[j])`, computed after subtracting the largest
    /// element so that large activations cannot overflow.
    pub fn softmax(&self) -> Self {
        let max = match self.max_element() {
            Some(max) => max,
            None => return self.clone(),
        };
        let exps: Vec<T> = self.data.iter().map(|&x| (x - max).exp()).collect();
        let total: T = exps.iter().copied().sum();
        Vector {
            data: exps.into_iter().map(|e| e / total).collect(),
        }
    }

    /// Index of the first largest element.
    pub fn argmax(&self) -> Result<usize> {
        let (first, rest) = self
            .data
            .split_first()
            .ok_or(Error::EmptyContainer("argmax"))?;
        let mut max_index = 0;
        let mut max_elem = *first;
        for (i, &x) in rest.iter().enumerate() {
            if x > max_elem {
                max_elem = x;
                max_index = i + 1;
            }
        }
        Ok(max_index)
    }

    fn max_element(&self) -> Option<T> {
        let (&first, rest) = self.data.split_first()?;
        Some(rest.iter().fold(first, |m, &x| if x > m { x } else { m }))
    }

    pub fn sum(&self) -> T {
        self.data.iter().copied().sum()
    }
}

impl<T, const N: usize> Vector<T, N> {
    /// Takes ownership of exactly `N` values.
    pub fn from_vec(data: Vec<T>) -> Result<Self> {
        if data.len() != N {
            return Err(Error::dimension(
                format!("{N} elements"),
                format!("{} elements", data.len()),
            ));
        }
        Ok(Vector { data })
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn get(&self, index: usize) -> Result<&T> {
        self.data
            .get(index)
            .ok_or(Error::IndexOutOfRange { index, len: N })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T> {
        self.data
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len: N })
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T: Element, const N: usize> Default for Vector<T, N> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<T, const N: usize> TryFrom<Vec<T>> for Vector<T, N> {
    type Error = Error;

    fn try_from(data: Vec<T>) -> Result<Self> {
        Self::from_vec(data)
    }
}

impl<T, const N: usize> Index<usize> for Vector<T, N> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.data.get(index) {
            Some(x) => x,
            None => panic!("tried to access index {index} but the vector has {N} elements"),
        }
    }
}

impl<T, const N: usize> IndexMut<usize> for Vector<T, N> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        match self.data.get_mut(index) {
            Some(x) => x,
            None => panic!("tried to access index {index} but the vector has {N} elements"),
        }
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a Vector<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<T: fmt::Display, const N: usize> fmt::Display for Vector<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, x) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{x}")?;
        }
        write!(f, "]")
    }
}

impl<T: Serialize, const N: usize> Serialize for Vector<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.data.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>, const N: usize> Deserialize<'de> for Vector<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let data = Vec::<T>::deserialize(deserializer)?;
        Self::from_vec(data).map_err(serde::de::Error::custom)
    }
}

// Element-wise arithmetic against another vector or a scalar. The compound
// form does the work; the binary forms reuse the left operand's buffer when
// it is owned and clone it otherwise.
macro_rules! vector_elementwise_op {
    ($op_trait:ident, $op_method:ident, $assign_trait:ident, $assign_method:ident, $op:tt) => {
        impl<T: Element, const N: usize> $assign_trait<&Vector<T, N>> for Vector<T, N> {
            fn $assign_method(&mut self, rhs: &Vector<T, N>) {
                for (lhs, &rhs) in self.data.iter_mut().zip(rhs.data.iter()) {
                    *lhs = *lhs $op rhs;
                }
            }
        }

        impl<T: Element, const N: usize> $assign_trait<Vector<T, N>> for Vector<T, N> {
            fn $assign_method(&mut self, rhs: Vector<T, N>) {
                self.$assign_method(&rhs);
            }
        }

        impl<T: Element, const N: usize> $assign_trait<T> for Vector<T, N> {
            fn $assign_method(&mut self, rhs: T) {
                for lhs in self.data.iter_mut() {
                    *lhs = *lhs $op rhs;
                }
            }
        }

        impl<T: Element, const N: usize> $op_trait<&Vector<T, N>> for &Vector<T, N> {
            type Output = Vector<T, N>;

            fn $op_method(self, rhs: &Vector<T, N>) -> Vector<T, N> {
                let mut out = self.clone();
                out.$assign_method(rhs);
                out
            }
        }

        impl<T: Element, const N: usize> $op_trait<&Vector<T, N>> for Vector<T, N> {
            type Output = Vector<T, N>;

            fn $op_method(mut self, rhs: &Vector<T, N>) -> Vector<T, N> {
                self.$assign_method(rhs);
                self
            }
        }

        impl<T: Element, const N: usize> $op_trait<Vector<T, N>> for Vector<T, N> {
            type Output = Vector<T, N>;

            fn $op_method(mut self, rhs: Vector<T, N>) -> Vector<T, N> {
                self.$assign_method(&rhs);
                self
            }
        }

        impl<T: Element, const N: usize> $op_trait<T> for &Vector<T, N> {
            type Output = Vector<T, N>;

            fn $op_method(self, rhs: T) -> Vector<T, N> {
                let mut out = self.clone();
                out.$assign_method(rhs);
                out
            }
        }

        impl<T: Element, const N: usize> $op_trait<T> for Vector<T, N> {
            type Output = Vector<T, N>;

            fn $op_method(mut self, rhs: T) -> Vector<T, N> {
                self.$assign_method(rhs);
                self
            }
        }
    };
}

vector_elementwise_op!(Add, add, AddAssign, add_assign, +);
vector_elementwise_op!(Sub, sub, SubAssign, sub_assign, -);
vector_elementwise_op!(Mul, mul, MulAssign, mul_assign, *);
vector_elementwise_op!(Div, div, DivAssign, div_assign, /);
