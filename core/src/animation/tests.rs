use std::sync::Arc;

use glam::{Affine3A, Quat, Vec3};
use tempfile::tempdir;
use tessera_shared::KeyframeFileError;

use super::*;
use crate::error::{AnimationLoadError, SkeletonError};
use crate::mesh::{MeshFormat, SkeletonMesh, SkeletonMeshFileInfo};
use crate::skeleton::{BonesPerVertex, SkeletonPose};

fn translation(x: f32) -> Affine3A {
    Affine3A::from_translation(Vec3::new(x, 0.0, 0.0))
}

fn single_bone_animation(xs: &[f32]) -> SkeletonAnimation {
    SkeletonAnimation::from_keyframes(
        xs.iter()
            .map(|&x| SkeletonPose::from_transforms(vec![translation(x)]))
            .collect(),
    )
}

/// Two-bone chain: `root` at the origin, `arm` one unit up the Y axis.
fn chain_mesh() -> SkeletonMesh {
    let mut mesh = SkeletonMesh::new(BonesPerVertex::Four, true);
    mesh.set_file_info(SkeletonMeshFileInfo::new("chain.dae", MeshFormat::Dae));
    mesh.add_or_modify_bone(1, "root", 0, Affine3A::IDENTITY, None)
        .unwrap();
    mesh.add_or_modify_bone(
        2,
        "arm",
        1,
        Affine3A::from_translation(Vec3::Y),
        None,
    )
    .unwrap();
    mesh
}

fn x_of(pose: &SkeletonPose, bone: u8) -> f32 {
    pose.bone_pose(bone).unwrap().translation.x
}

// ============================================================================
// Interpolation
// ============================================================================

#[test]
fn test_interpolated_pose_endpoints_are_exact_keyframes() {
    let animation = single_bone_animation(&[0.0, 2.0, 4.0]);

    assert_eq!(animation.interpolated_pose(0.0).unwrap(), animation.keyframes()[0]);
    assert_eq!(animation.interpolated_pose(1.0).unwrap(), animation.keyframes()[2]);
    assert_eq!(animation.interpolated_pose(0.5).unwrap(), animation.keyframes()[1]);
}

#[test]
fn test_interpolated_pose_blends_neighbours() {
    let animation = single_bone_animation(&[0.0, 2.0, 4.0]);

    assert!((x_of(&animation.interpolated_pose(0.25).unwrap(), 1) - 1.0).abs() < 1e-5);
    assert!((x_of(&animation.interpolated_pose(0.875).unwrap(), 1) - 3.5).abs() < 1e-5);
}

#[test]
fn test_interpolated_pose_clamps_progress() {
    let animation = single_bone_animation(&[0.0, 2.0]);

    assert_eq!(animation.interpolated_pose(-3.0).unwrap(), animation.keyframes()[0]);
    assert_eq!(animation.interpolated_pose(7.5).unwrap(), animation.keyframes()[1]);
}

#[test]
fn test_interpolated_pose_single_keyframe() {
    let animation = single_bone_animation(&[5.0]);

    for progress in [0.0, 0.3, 1.0] {
        assert_eq!(
            animation.interpolated_pose(progress).unwrap(),
            animation.keyframes()[0]
        );
    }
}

#[test]
fn test_interpolated_pose_rejects_empty_and_nan() {
    assert_eq!(
        SkeletonAnimation::new().interpolated_pose(0.5).unwrap_err(),
        SkeletonError::InvalidState("animation has no keyframes")
    );
    assert!(matches!(
        single_bone_animation(&[0.0, 1.0]).interpolated_pose(f32::NAN),
        Err(SkeletonError::InvalidArgument(_))
    ));
}

#[test]
fn test_interpolated_pose_rotation_uses_slerp() {
    let a = SkeletonPose::from_transforms(vec![Affine3A::IDENTITY]);
    let b = SkeletonPose::from_transforms(vec![Affine3A::from_quat(Quat::from_rotation_z(
        std::f32::consts::FRAC_PI_2,
    ))]);
    let animation = SkeletonAnimation::from_keyframes(vec![a, b]);

    let mid = animation.interpolated_pose(0.5).unwrap();
    let expected = Affine3A::from_quat(Quat::from_rotation_z(std::f32::consts::FRAC_PI_4));
    assert!(mid.bone_pose(1).unwrap().abs_diff_eq(expected, 1e-5));
}

// ============================================================================
// Keyframe access
// ============================================================================

#[test]
fn test_get_or_add_pose_grows_keyframes() {
    let mut animation = SkeletonAnimation::new();
    animation
        .get_or_add_pose(2)
        .set_bone_pose(1, translation(3.0))
        .unwrap();

    assert_eq!(animation.keyframe_count(), 3);
    assert!(animation.keyframe(0).unwrap().is_empty());
    assert_eq!(x_of(animation.keyframe(2).unwrap(), 1), 3.0);
    assert_eq!(
        animation.keyframe(3).unwrap_err(),
        SkeletonError::OutOfRange {
            what: "keyframe",
            index: 3,
            len: 3
        }
    );
}

#[test]
fn test_space_conversion_round_trip() {
    let mesh = chain_mesh();
    let local = SkeletonPose::from_transforms(vec![
        Affine3A::from_rotation_translation(Quat::from_rotation_z(0.5), Vec3::new(1.0, 0.0, 0.0)),
        Affine3A::from_translation(Vec3::new(0.0, 2.0, 0.0)),
    ]);
    let animation = SkeletonAnimation::from_keyframes(vec![local.clone(), local]);

    let skeleton = animation.to_skeleton_space(mesh.hierarchy()).unwrap();
    let expected_arm = skeleton.keyframes()[0].transforms()[0]
        * Affine3A::from_translation(Vec3::new(0.0, 2.0, 0.0));
    assert!(skeleton.keyframes()[1].transforms()[1].abs_diff_eq(expected_arm, 1e-5));

    let back = skeleton.to_parent_space(mesh.hierarchy()).unwrap();
    for (a, b) in back.keyframes().iter().zip(animation.keyframes()) {
        for (x, y) in a.iter().zip(b.iter()) {
            assert!(x.abs_diff_eq(*y, 1e-5));
        }
    }
}

#[test]
fn test_space_conversion_length_mismatch() {
    let mesh = chain_mesh();
    let animation = single_bone_animation(&[0.0]);
    assert!(matches!(
        animation.to_skeleton_space(mesh.hierarchy()),
        Err(SkeletonError::DimensionMismatch { expected: 2, actual: 1, .. })
    ));
}

// ============================================================================
// Loading and saving
// ============================================================================

fn two_bone_animation() -> SkeletonAnimation {
    SkeletonAnimation::from_keyframes(vec![
        SkeletonPose::from_transforms(vec![translation(0.0), Affine3A::IDENTITY]),
        SkeletonPose::from_transforms(vec![
            translation(1.0),
            Affine3A::from_translation(Vec3::new(0.0, 0.0, 2.0)),
        ]),
    ])
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("walk.tskanim");
    let mesh = chain_mesh();
    let original = two_bone_animation();
    original.save(&path).unwrap();

    let info = SkeletonAnimationFileInfo::new(&path, AnimationFormat::Keyframes);
    let loaded = SkeletonAnimation::load(&info, &mesh).unwrap();

    assert_eq!(loaded.keyframe_count(), 2);
    for (a, b) in loaded.keyframes().iter().zip(original.keyframes()) {
        for (x, y) in a.iter().zip(b.iter()) {
            assert!(x.abs_diff_eq(*y, 1e-6));
        }
    }
    assert_eq!(loaded.file_info().path, path);
    assert_eq!(loaded.file_info().mesh_file_info, *mesh.file_info());
}

#[test]
fn test_save_refuses_unloadable_animation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.tskanim");

    assert!(matches!(
        SkeletonAnimation::new().save(&path),
        Err(AnimationLoadError::Format(KeyframeFileError::InvalidHeader {
            frame_count: 0,
            ..
        }))
    ));
    assert!(!path.exists());

    let boneless = SkeletonAnimation::from_keyframes(vec![SkeletonPose::from_transforms(vec![])]);
    assert!(matches!(
        boneless.to_bytes(),
        Err(AnimationLoadError::Format(KeyframeFileError::InvalidHeader {
            bone_count: 0,
            ..
        }))
    ));
}

#[test]
fn test_load_with_invert_z_mirrors_keyframes() {
    let mesh = chain_mesh();
    let bytes = two_bone_animation().to_bytes().unwrap();

    let loaded =
        SkeletonAnimation::from_bytes(&bytes, AnimationFormat::Keyframes, &mesh, true).unwrap();
    let arm = loaded.keyframes()[1].bone_pose(2).unwrap();
    assert!(arm.abs_diff_eq(Affine3A::from_translation(Vec3::new(0.0, 0.0, -2.0)), 1e-6));
}

#[test]
fn test_load_rejects_bone_count_mismatch() {
    let mesh = chain_mesh();
    let bytes = single_bone_animation(&[0.0, 1.0]).to_bytes().unwrap();

    let err = SkeletonAnimation::from_bytes(&bytes, AnimationFormat::Keyframes, &mesh, false)
        .unwrap_err();
    assert!(matches!(
        err,
        AnimationLoadError::Skeleton(SkeletonError::DimensionMismatch {
            expected: 2,
            actual: 1,
            ..
        })
    ));
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let info = SkeletonAnimationFileInfo::new(dir.path().join("missing.tskanim"), AnimationFormat::Keyframes);
    assert!(matches!(
        SkeletonAnimation::load(&info, &chain_mesh()),
        Err(AnimationLoadError::Io(_))
    ));
}

#[test]
fn test_load_truncated_file_is_format_error() {
    let mesh = chain_mesh();
    let mut bytes = two_bone_animation().to_bytes().unwrap();
    bytes.truncate(bytes.len() - 1);
    assert!(matches!(
        SkeletonAnimation::from_bytes(&bytes, AnimationFormat::Keyframes, &mesh, false),
        Err(AnimationLoadError::Format(_))
    ));
}

// ============================================================================
// Actor playback
// ============================================================================

#[test]
fn test_actor_starts_in_rest_pose() {
    let actor = SkeletonActor::new(Arc::new(chain_mesh()), Affine3A::IDENTITY);
    assert_eq!(*actor.skeleton_pose(), SkeletonPose::identity(2));
    assert!(actor.animation().is_none());
}

#[test]
fn test_actor_update_wraps_progress() {
    let mut actor = SkeletonActor::new(Arc::new(chain_mesh()), Affine3A::IDENTITY);
    let animation = Arc::new(SkeletonAnimation::from_keyframes(vec![
        SkeletonPose::from_transforms(vec![translation(0.0), Affine3A::IDENTITY]),
        SkeletonPose::from_transforms(vec![translation(4.0), Affine3A::IDENTITY]),
    ]));
    actor.start_animation(animation).unwrap();
    actor.set_animation_speed(0.5);

    actor.update_animation(0.5).unwrap();
    assert!((actor.progress() - 0.25).abs() < 1e-6);
    assert!((x_of(actor.skeleton_pose(), 1) - 1.0).abs() < 1e-5);

    actor.update_animation(2.0).unwrap();
    assert!((actor.progress() - 0.25).abs() < 1e-6);

    actor.update_animation(1.0).unwrap();
    assert!((actor.progress() - 0.75).abs() < 1e-6);
    assert!((x_of(actor.skeleton_pose(), 1) - 3.0).abs() < 1e-5);
}

#[test]
fn test_actor_update_without_animation_is_noop() {
    let mut actor = SkeletonActor::new(Arc::new(chain_mesh()), Affine3A::IDENTITY);
    actor.update_animation(1.0).unwrap();
    assert_eq!(actor.progress(), 0.0);
}

#[test]
fn test_actor_pose_length_checked() {
    let mut actor = SkeletonActor::new(Arc::new(chain_mesh()), Affine3A::IDENTITY);
    assert!(matches!(
        actor.set_skeleton_pose(SkeletonPose::identity(3)),
        Err(SkeletonError::DimensionMismatch { expected: 2, actual: 3, .. })
    ));

    actor
        .set_skeleton_pose(SkeletonPose::from_transforms(vec![translation(1.0); 2]))
        .unwrap();
    actor.reset_skeleton_pose();
    assert_eq!(*actor.skeleton_pose(), SkeletonPose::identity(2));
}
