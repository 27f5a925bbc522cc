//! `tessera gen-wave` - procedural test animation.
//!
//! Each bone sways around Z with a phase offset, stacked 1.5 units apart
//! along Y.

use std::f32::consts::TAU;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::Args;
use glam::{Affine3A, Quat, Vec3};
use tessera_core::{SkeletonAnimation, SkeletonPose};

#[derive(Args)]
pub struct GenWaveArgs {
    /// Output file (.tskanim)
    pub out: PathBuf,

    /// Number of bones
    #[arg(long, default_value_t = 3)]
    pub bones: u8,

    /// Number of keyframes
    #[arg(long, default_value_t = 30)]
    pub frames: u16,
}

pub fn execute(args: GenWaveArgs) -> Result<()> {
    write_wave_animation(&args.out, args.bones, args.frames)?;
    println!(
        "Generated {} ({} bones, {} frames)",
        args.out.display(),
        args.bones,
        args.frames
    );
    Ok(())
}

fn write_wave_animation(path: &Path, bone_count: u8, frame_count: u16) -> Result<()> {
    ensure!(bone_count > 0 && frame_count > 0, "bones and frames must be non-zero");

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    wave_animation(bone_count, frame_count)
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn wave_animation(bone_count: u8, frame_count: u16) -> SkeletonAnimation {
    let keyframes = (0..frame_count)
        .map(|frame| {
            let t = (frame as f32 / frame_count as f32) * TAU;
            let transforms = (0..bone_count)
                .map(|bone| {
                    let angle = (t + bone as f32 * 0.5).sin() * 0.3;
                    Affine3A::from_rotation_translation(
                        Quat::from_rotation_z(angle),
                        Vec3::new(0.0, bone as f32 * 1.5, 0.0),
                    )
                })
                .collect();
            SkeletonPose::from_transforms(transforms)
        })
        .collect();
    SkeletonAnimation::from_keyframes(keyframes)
}
