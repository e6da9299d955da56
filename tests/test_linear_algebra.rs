// Hand-computed checks for the matrix and vector operations the network is
// built on.

use approx::assert_relative_eq;
use ferrum_mlp::{Error, Matrix, Vector};

#[test]
fn dot_two_by_three_times_three_by_two() {
    let a = Matrix::<f64, 2, 3>::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
    let b = Matrix::<f64, 3, 2>::from_rows(vec![vec![7.0, 8.0], vec![9.0, 10.0], vec![11.0, 12.0]])
        .unwrap();
    let c = a.dot(&b).unwrap();
    assert_eq!(c[0].as_slice(), &[58.0, 64.0]);
    assert_eq!(c[1].as_slice(), &[139.0, 154.0]);
}

#[test]
fn dot_rejects_mismatched_inner_dimension() {
    let a = Matrix::<f64, 2, 3>::filled(1.0);
    let b = Matrix::<f64, 2, 2>::filled(1.0);
    assert!(matches!(a.dot(&b), Err(Error::DimensionMismatch { .. })));
}

#[test]
fn dot_vector_matches_dot_with_a_column() {
    let m = Matrix::<f32, 2, 3>::from_row_major(vec![0.5, -1.0, 2.0, 3.0, 0.0, -0.25]).unwrap();
    let v = Vector::<f32, 3>::from_slice(&[2.0, 1.0, 4.0]).unwrap();
    let column = Matrix::<f32, 3, 1>::from_row_major(v.clone().into_vec()).unwrap();

    let by_vector = m.dot_vector(&v);
    let by_matrix = m.dot(&column).unwrap();
    for i in 0..2 {
        assert_relative_eq!(by_vector[i], by_matrix[(i, 0)]);
    }
    assert_relative_eq!(by_vector[0], 8.0);
    assert_relative_eq!(by_vector[1], 5.0);
}

#[test]
fn scalar_and_elementwise_operators() {
    let a = Vector::<f64, 3>::from_slice(&[1.0, 2.0, 3.0]).unwrap();
    let b = Vector::<f64, 3>::from_slice(&[4.0, 5.0, 6.0]).unwrap();
    assert_eq!((&a * &b).as_slice(), &[4.0, 10.0, 18.0]);
    assert_eq!((&b / &a).as_slice(), &[4.0, 2.5, 2.0]);
    assert_eq!((&a + 1.0).as_slice(), &[2.0, 3.0, 4.0]);
    assert_eq!((a.clone() * 2.0).as_slice(), &[2.0, 4.0, 6.0]);

    let mut m = Matrix::<f64, 2, 2>::filled(1.0);
    m -= 0.5;
    m *= Matrix::filled(4.0);
    assert_eq!(m, Matrix::filled(2.0));
}

#[test]
fn softmax_is_shift_invariant_and_handles_large_inputs() {
    let v = Vector::<f64, 3>::from_slice(&[1.0, 2.0, 3.0]).unwrap();
    let shifted = &v + 1000.0;
    let p = v.softmax();
    let q = shifted.softmax();
    for (a, b) in p.iter().zip(q.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-12);
    }
    assert_relative_eq!(p[2], 0.665_240_955_774_821_6, epsilon = 1e-12);
}

#[test]
fn argmax_returns_first_maximum() {
    let v = Vector::<f64, 3>::from_slice(&[0.1, 0.9, 0.3]).unwrap();
    assert_eq!(v.argmax().unwrap(), 1);
    let v = Vector::<f64, 3>::from_slice(&[5.0, 5.0, 2.0]).unwrap();
    assert_eq!(v.argmax().unwrap(), 0);
    let v = Vector::<f64, 4>::from_slice(&[0.1, 0.7, 0.7, 0.2]).unwrap();
    assert_eq!(v.argmax().unwrap(), 1);
    let v = Vector::<f64, 3>::from_slice(&[-3.0, -1.0, -2.0]).unwrap();
    assert_eq!(v.argmax().unwrap(), 1);
    assert!(matches!(Vector::<f64, 0>::zeros().argmax(), Err(Error::EmptyContainer(_))));
}

#[test]
fn flatten_rejects_wrong_length() {
    let m = Matrix::<f64, 2, 3>::zeros();
    assert!(m.flatten_vertical::<5>().is_err());
    assert!(m.flatten_horizontal::<7>().is_err());
}

#[test]
fn display_formats() {
    let v = Vector::<f64, 3>::from_slice(&[1.0, 2.5, -3.0]).unwrap();
    assert_eq!(v.to_string(), "[1, 2.5, -3]");
    let m = Matrix::<f64, 2, 2>::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    assert_eq!(m.to_string(), "[\n\t[1, 2],\n\t[3, 4]\n]");
}
