//! Conversion of poses between parent space and skeleton space.

use glam::Affine3A;

use super::{BoneHierarchy, SkeletonPose};
use crate::error::SkeletonError;

/// Compose a parent-space pose down the hierarchy into skeleton space.
///
/// `skeleton[i] = skeleton[parent(i)] * parent_space[i]`, roots compose with
/// identity.
pub fn to_skeleton_space(
    pose_in_parent_space: &SkeletonPose,
    hierarchy: &BoneHierarchy,
) -> Result<SkeletonPose, SkeletonError> {
    check_len(pose_in_parent_space, hierarchy)?;

    let mut out: Vec<Affine3A> = Vec::with_capacity(pose_in_parent_space.len());
    for (bone, local) in hierarchy.bones().iter().zip(pose_in_parent_space.iter()) {
        let parent = parent_transform(&out, bone.parent_index)?;
        out.push(parent * *local);
    }
    Ok(SkeletonPose::from_transforms(out))
}

/// Inverse of [`to_skeleton_space`].
///
/// `parent_space[i] = skeleton[parent(i)]⁻¹ * skeleton[i]`.
pub fn to_parent_space(
    pose_in_skeleton_space: &SkeletonPose,
    hierarchy: &BoneHierarchy,
) -> Result<SkeletonPose, SkeletonError> {
    check_len(pose_in_skeleton_space, hierarchy)?;

    let skeleton = pose_in_skeleton_space.transforms();
    let out = hierarchy
        .bones()
        .iter()
        .zip(skeleton)
        .map(|(bone, absolute)| {
            let parent = parent_transform(skeleton, bone.parent_index)?;
            Ok(parent.inverse() * *absolute)
        })
        .collect::<Result<Vec<_>, SkeletonError>>()?;
    Ok(SkeletonPose::from_transforms(out))
}

fn check_len(pose: &SkeletonPose, hierarchy: &BoneHierarchy) -> Result<(), SkeletonError> {
    if pose.len() != hierarchy.len() {
        return Err(SkeletonError::DimensionMismatch {
            what: "pose length vs bone count",
            expected: hierarchy.len(),
            actual: pose.len(),
        });
    }
    Ok(())
}

fn parent_transform(resolved: &[Affine3A], parent_index: u8) -> Result<Affine3A, SkeletonError> {
    match parent_index {
        0 => Ok(Affine3A::IDENTITY),
        p => resolved
            .get(p as usize - 1)
            .copied()
            .ok_or(SkeletonError::InvalidState("bone parent does not precede its child")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3, Vec3A};

    fn chain(len: u8) -> BoneHierarchy {
        let mut h = BoneHierarchy::new(true);
        for i in 1..=len {
            h.add_or_modify_bone(i, format!("bone{i}"), i - 1, Affine3A::IDENTITY, None)
                .unwrap();
        }
        h
    }

    #[test]
    fn test_translation_chain() {
        let h = chain(3);
        let pose = SkeletonPose::from_transforms(vec![
            Affine3A::from_translation(Vec3::X);
            3
        ]);

        let skel = to_skeleton_space(&pose, &h).unwrap();

        for (i, t) in skel.iter().enumerate() {
            assert!(
                t.translation
                    .abs_diff_eq(Vec3A::new((i + 1) as f32, 0.0, 0.0), 1e-6)
            );
        }
    }

    #[test]
    fn test_round_trip_branching_hierarchy() {
        let mut h = BoneHierarchy::new(false);
        h.add_or_modify_bone(1, "pelvis", 0, Affine3A::IDENTITY, None).unwrap();
        h.add_or_modify_bone(2, "spine", 1, Affine3A::IDENTITY, None).unwrap();
        h.add_or_modify_bone(3, "thigh_l", 1, Affine3A::IDENTITY, None).unwrap();
        h.add_or_modify_bone(4, "head", 2, Affine3A::IDENTITY, None).unwrap();
        h.add_or_modify_bone(5, "prop", 0, Affine3A::IDENTITY, None).unwrap();

        let pose = SkeletonPose::from_transforms(
            (0..5)
                .map(|i| {
                    let f = i as f32;
                    Affine3A::from_scale_rotation_translation(
                        Vec3::new(1.0 + 0.1 * f, 1.0, 0.9),
                        Quat::from_euler(glam::EulerRot::YXZ, 0.2 * f, -0.3, 0.1 * f),
                        Vec3::new(f, -f * 0.5, 2.0),
                    )
                })
                .collect(),
        );

        let back = to_parent_space(&to_skeleton_space(&pose, &h).unwrap(), &h).unwrap();
        for (a, b) in pose.iter().zip(back.iter()) {
            assert!(a.abs_diff_eq(*b, 1e-4), "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_rotation_propagates_to_children() {
        let h = chain(2);
        let pose = SkeletonPose::from_transforms(vec![
            Affine3A::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Affine3A::from_translation(Vec3::X),
        ]);
        let skel = to_skeleton_space(&pose, &h).unwrap();
        assert!(skel.transforms()[1].translation.abs_diff_eq(Vec3A::Y, 1e-6));
    }

    #[test]
    fn test_length_mismatch() {
        let h = chain(3);
        let pose = SkeletonPose::identity(2);
        assert!(matches!(
            to_skeleton_space(&pose, &h),
            Err(SkeletonError::DimensionMismatch { expected: 3, actual: 2, .. })
        ));
        assert!(matches!(
            to_parent_space(&pose, &h),
            Err(SkeletonError::DimensionMismatch { .. })
        ));
    }
}
