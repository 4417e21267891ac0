//! Camera rotation matrices in the row-vector convention.
//!
//! Each rotation is written the way it acts on row vectors (`v' = v x M`),
//! which makes it the transpose of glam's column-vector rotation by the same
//! angle. Products are ordinary matrix products, so `a * b` is `A x B`. The
//! composition order in [`compose`] is load-bearing for the raymarch program:
//! changing it flips or swaps the camera axes on screen.

use std::f64::consts::FRAC_PI_2;

use glam::DMat4;

/// Rotation about the x axis. Rows `[1,0,0]`, `[0,c,s]`, `[0,-s,c]`.
pub fn rx(theta: f64) -> DMat4 {
    DMat4::from_rotation_x(-theta)
}

/// Rotation about the y axis. Rows `[c,0,-s]`, `[0,1,0]`, `[s,0,c]`.
pub fn ry(theta: f64) -> DMat4 {
    DMat4::from_rotation_y(-theta)
}

/// Rotation about the z axis. Rows `[c,s,0]`, `[-s,c,0]`, `[0,0,1]`.
pub fn rz(theta: f64) -> DMat4 {
    DMat4::from_rotation_z(-theta)
}

/// `A x B`.
pub fn multiply(a: &DMat4, b: &DMat4) -> DMat4 {
    *a * *b
}

/// Fixed re-orientation mapping camera-forward onto the world axes:
/// `Mz(0) x My(-pi/2) x Mx(pi/2)`.
pub fn base_orientation() -> DMat4 {
    rz(0.0) * ry(-FRAC_PI_2) * rx(FRAC_PI_2)
}

/// `Mx(pitch) x base x Mz(yaw)`.
pub fn compose_with_base(base: &DMat4, pitch: f64, yaw: f64) -> DMat4 {
    rx(pitch) * *base * rz(yaw)
}

/// Camera rotation for the given angles using [`base_orientation`].
pub fn compose(pitch: f64, yaw: f64) -> DMat4 {
    compose_with_base(&base_orientation(), pitch, yaw)
}

/// Flatten for upload as a WGSL `mat4x4<f32>`.
///
/// Rows are laid out contiguously, so each row of `m` becomes one column of
/// the shader matrix.
pub fn to_gpu(m: &DMat4) -> [[f32; 4]; 4] {
    m.transpose().as_mat4().to_cols_array_2d()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_rows(rows: [[f64; 4]; 4]) -> DMat4 {
        DMat4::from_cols_array_2d(&rows).transpose()
    }

    fn assert_close(a: &DMat4, b: &DMat4) {
        assert!(a.abs_diff_eq(*b, 1e-12), "{a} != {b}");
    }

    #[test]
    fn zero_angles_are_identity() {
        assert_close(&rx(0.0), &DMat4::IDENTITY);
        assert_close(&ry(0.0), &DMat4::IDENTITY);
        assert_close(&rz(0.0), &DMat4::IDENTITY);
    }

    #[test]
    fn elementary_rotations_have_row_layout() {
        let (s, c) = 0.3f64.sin_cos();
        assert_close(
            &rx(0.3),
            &from_rows([
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, s, 0.0],
                [0.0, -s, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ]),
        );
        assert_close(
            &ry(0.3),
            &from_rows([
                [c, 0.0, -s, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [s, 0.0, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ]),
        );
        assert_close(
            &rz(0.3),
            &from_rows([
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ]),
        );
    }

    #[test]
    fn compose_with_identity_base_at_zero_is_identity() {
        assert_close(
            &compose_with_base(&DMat4::IDENTITY, 0.0, 0.0),
            &DMat4::IDENTITY,
        );
    }

    #[test]
    fn compose_at_zero_is_base() {
        assert_close(&compose(0.0, 0.0), &base_orientation());
    }

    #[test]
    fn base_orientation_remaps_axes() {
        let expected = from_rows([
            [0.0, -1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [-1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert_close(&base_orientation(), &expected);
    }

    #[test]
    fn multiply_by_identity() {
        let m = rx(0.7);
        assert_close(&multiply(&m, &DMat4::IDENTITY), &m);
        assert_close(&multiply(&DMat4::IDENTITY, &m), &m);
    }

    #[test]
    fn multiply_is_not_commutative() {
        let a = rx(0.5);
        let b = rz(0.5);
        let ab = multiply(&a, &b);
        let ba = multiply(&b, &a);
        assert!((ab.row(0)[1] - ba.row(0)[1]).abs() > 1e-3);
    }

    #[test]
    fn opposite_rotations_cancel() {
        assert_close(&multiply(&rz(1.1), &rz(-1.1)), &DMat4::IDENTITY);
        assert_close(&multiply(&ry(0.3), &ry(-0.3)), &DMat4::IDENTITY);
    }

    #[test]
    fn composed_rotation_is_orthonormal() {
        let r = compose(0.4, 2.2);
        assert_close(&multiply(&r, &r.transpose()), &DMat4::IDENTITY);
    }

    #[test]
    fn composition_order_is_pitch_base_yaw() {
        let r = compose(0.4, 2.2);
        let expected = rx(0.4) * base_orientation() * rz(2.2);
        assert_close(&r, &expected);
        let swapped = rz(2.2) * base_orientation() * rx(0.4);
        assert!(!r.abs_diff_eq(swapped, 1e-6));
    }

    #[test]
    fn gpu_layout_keeps_rows_contiguous() {
        let m = rz(FRAC_PI_2);
        let gpu = to_gpu(&m);
        assert!((gpu[0][1] - 1.0).abs() < 1e-6);
        assert!((gpu[1][0] + 1.0).abs() < 1e-6);
    }
}
