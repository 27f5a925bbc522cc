//! `tessera inspect` - dump an animation file.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use glam::Affine3A;
use tessera_shared::{KeyframesHeader, decode_keyframes};

#[derive(Args)]
pub struct InspectArgs {
    /// Animation file (.tskanim)
    pub file: PathBuf,
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    print!("{}", describe(&bytes)?);
    Ok(())
}

/// Header summary followed by the root bone's translation for every frame.
fn describe(bytes: &[u8]) -> Result<String> {
    let header = KeyframesHeader::from_bytes(bytes).context("file is too short for a header")?;
    let data = decode_keyframes(bytes).context("invalid keyframe data")?;

    let mut out = String::new();
    writeln!(
        out,
        "bones: {}  frames: {}  size: {} bytes",
        header.bone_count,
        header.frame_count,
        header.file_size()
    )?;
    for (i, frame) in data.frames.iter().enumerate() {
        match frame.first() {
            Some(&root) => {
                let t = Affine3A::from(root).translation;
                writeln!(out, "frame {i:4}: root ({:8.3}, {:8.3}, {:8.3})", t.x, t.y, t.z)?;
            }
            None => writeln!(out, "frame {i:4}: no bones")?,
        }
    }
    Ok(out)
}
