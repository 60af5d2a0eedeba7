use glam::{Quat, Vec3};

/// Concatenates the transforms of two quaternions together such that the resulting quaternion,
/// applied as an orientation to a vector v, is equivalent to transformed = (v * a) * b.
#[inline(always)]
pub fn concatenate(a: Quat, b: Quat) -> Quat {
    b * a
}

/// Computes the conjugate of the quaternion.
#[inline(always)]
pub fn conjugate(q: Quat) -> Quat {
    Quat::from_xyzw(-q.x, -q.y, -q.z, q.w)
}

/// Computes the rotation from the start orientation to the end orientation such that
/// `end = concatenate(start, relative)`.
#[inline(always)]
pub fn relative_rotation(start: Quat, end: Quat) -> Quat {
    concatenate(conjugate(start), end)
}

/// Orientation of `b` expressed in the local frame of `a`: `a^-1 * b`.
#[inline(always)]
pub fn relative_rotation_local(a: Quat, b: Quat) -> Quat {
    a.conjugate() * b
}

/// Creates the quaternion that rotates by `angular_velocity * dt`.
///
/// A near-zero angular velocity yields the identity rather than a NaN axis.
#[inline]
pub fn delta_from_angular_velocity(angular_velocity: Vec3, dt: f32) -> Quat {
    let rotation = angular_velocity * dt;
    let angle = rotation.length();
    if angle < 1e-7 {
        return Quat::IDENTITY;
    }
    Quat::from_axis_angle(rotation / angle, angle)
}

/// Computes the axis angle representation of a normalized quaternion. The angle is in `[0, pi]`.
#[inline(always)]
pub fn axis_angle_from_quaternion(q: Quat) -> (Vec3, f32) {
    let (mut axis, mut qw) = (Vec3::new(q.x, q.y, q.z), q.w);
    if qw < 0.0 {
        axis = -axis;
        qw = -qw;
    }

    let length_squared = axis.length_squared();
    if length_squared > 1e-14 {
        (axis / length_squared.sqrt(), 2.0 * qw.clamp(-1.0, 1.0).acos())
    } else {
        (Vec3::Y, 0.0)
    }
}

/// Computes the quaternion rotation between two normalized vectors.
#[inline(always)]
pub fn quaternion_between_normalized_vectors(v1: Vec3, v2: Vec3) -> Quat {
    let dot = v1.dot(v2);
    if dot < -0.9999 {
        // Opposing vectors; any perpendicular axis is a valid half turn.
        let abs_x = v1.x.abs();
        let abs_y = v1.y.abs();
        let abs_z = v1.z.abs();
        let q = if abs_x < abs_y && abs_x < abs_z {
            Quat::from_xyzw(0.0, -v1.z, v1.y, 0.0)
        } else if abs_y < abs_z {
            Quat::from_xyzw(v1.z, 0.0, -v1.x, 0.0)
        } else {
            Quat::from_xyzw(-v1.y, v1.x, 0.0, 0.0)
        };
        q.normalize()
    } else {
        let axis = v1.cross(v2);
        Quat::from_xyzw(axis.x, axis.y, axis.z, dot + 1.0).normalize()
    }
}

/// Splits a rotation into a swing (which moves `twist_axis`) followed by a twist about
/// `twist_axis`, such that `q = swing * twist`.
#[inline]
pub fn swing_twist(q: Quat, twist_axis: Vec3) -> (Quat, Quat) {
    let rotated = q * twist_axis;
    let swing = quaternion_between_normalized_vectors(twist_axis, rotated);
    let twist = (swing.conjugate() * q).normalize();
    (swing, twist)
}

/// Signed twist angle of a rotation around the given axis, in `(-pi, pi]`.
#[inline]
pub fn twist_angle(q: Quat, twist_axis: Vec3) -> f32 {
    let (_, twist) = swing_twist(q, twist_axis);
    let projected = Vec3::new(twist.x, twist.y, twist.z).dot(twist_axis);
    2.0 * projected.atan2(twist.w)
}

/// Returns the shorter of the two equivalent quaternions (non-negative `w`).
#[inline(always)]
pub fn shortest(q: Quat) -> Quat {
    if q.w < 0.0 {
        -q
    } else {
        q
    }
}
