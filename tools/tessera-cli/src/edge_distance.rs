//! `tessera edge-distance` - run the distance flood fill on the CPU backend.

use std::fmt::Write as _;

use anyhow::{Context, Result, ensure};
use clap::Args;
use tessera_core::compute::renderers::NO_EDGE;
use tessera_core::{CpuBackend, EngineConfig, PipelineContext, RenderDevice};

/// Grids up to this width are printed in full.
const MAX_PRINTED_WIDTH: u32 = 48;

#[derive(Args)]
pub struct EdgeDistanceArgs {
    #[arg(long, default_value_t = 32)]
    pub width: u32,

    #[arg(long, default_value_t = 32)]
    pub height: u32,

    /// Seeded edge pixel as `X,Y`
    #[arg(long, value_parser = parse_pixel)]
    pub edge: (u32, u32),

    /// Flood-fill passes (defaults to the configured value)
    #[arg(long)]
    pub passes: Option<u32>,
}

fn parse_pixel(s: &str) -> Result<(u32, u32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{s}'"))?;
    let parse = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("'{v}': {e}"));
    Ok((parse(x)?, parse(y)?))
}

pub fn execute(args: EdgeDistanceArgs) -> Result<()> {
    let config = EngineConfig::load_or_default().with_env_overrides();
    let distances = propagate(&args, config)?;
    print!("{}", summarize(&distances, args.width));
    Ok(())
}

fn propagate(args: &EdgeDistanceArgs, mut config: EngineConfig) -> Result<Vec<f32>> {
    ensure!(args.width > 0 && args.height > 0, "grid must not be empty");
    let pixel_count = args
        .width
        .checked_mul(args.height)
        .with_context(|| format!("{}x{} grid is too large", args.width, args.height))?;
    ensure!(
        args.edge.0 < args.width && args.edge.1 < args.height,
        "edge pixel {:?} is outside the {}x{} grid",
        args.edge,
        args.width,
        args.height
    );

    if let Some(passes) = args.passes {
        config.post_process.edge_distance_passes = passes;
        config = config.sanitized();
    }

    let mut backend = CpuBackend::new();
    let mut ctx = PipelineContext::new();
    let mut renderer = config.post_process.edge_detection_renderer();
    renderer
        .initialize(&mut ctx, &mut backend, args.width, args.height)
        .context("failed to initialize edge detection")?;

    let target = renderer.value_texture()?;
    let mut texels = vec![[NO_EDGE, 0.0, 0.0, 0.0]; pixel_count as usize];
    texels[(args.edge.1 * args.width + args.edge.0) as usize] = [0.0; 4];
    backend.write_texture(target, 0, &texels)?;

    renderer
        .propagate_edge_distance(&mut ctx, &mut backend)
        .context("edge distance propagation failed")?;
    tracing::info!(
        passes = renderer.passes(),
        dispatches = ctx.dispatch_count(),
        "propagation finished"
    );

    Ok(backend.read_values(renderer.value_texture()?, 0)?)
}

fn summarize(distances: &[f32], width: u32) -> String {
    let reached: Vec<f32> = distances.iter().copied().filter(|&d| d < NO_EDGE).collect();
    let max = reached.iter().copied().fold(0.0f32, f32::max);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "reached {}/{} pixels, max distance {}",
        reached.len(),
        distances.len(),
        max
    );
    if width <= MAX_PRINTED_WIDTH {
        for row in distances.chunks(width as usize) {
            let line: Vec<String> = row
                .iter()
                .map(|&d| if d >= NO_EDGE { "  .".to_string() } else { format!("{d:3}") })
                .collect();
            let _ = writeln!(out, "{}", line.join(""));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pixel_accepts_pairs() {
        assert_eq!(parse_pixel("3,4"), Ok((3, 4)));
        assert_eq!(parse_pixel(" 10 , 0"), Ok((10, 0)));
        assert!(parse_pixel("3").is_err());
        assert!(parse_pixel("a,1").is_err());
    }

    #[test]
    fn propagate_limited_passes() {
        let args = EdgeDistanceArgs {
            width: 8,
            height: 4,
            edge: (0, 0),
            passes: Some(3),
        };
        let distances = propagate(&args, EngineConfig::default()).unwrap();

        assert_eq!(distances[0], 0.0);
        assert_eq!(distances[3], 3.0);
        assert_eq!(distances[4], NO_EDGE);
        assert_eq!(distances[(3 * 8 + 3) as usize], 3.0);
    }

    #[test]
    fn propagate_rejects_edge_outside_grid() {
        let args = EdgeDistanceArgs {
            width: 4,
            height: 4,
            edge: (4, 0),
            passes: None,
        };
        assert!(propagate(&args, EngineConfig::default()).is_err());
    }

    #[test]
    fn propagate_rejects_oversized_grid() {
        let args = EdgeDistanceArgs {
            width: 1 << 16,
            height: 1 << 16,
            edge: (0, 0),
            passes: Some(1),
        };
        let err = propagate(&args, EngineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn propagate_uses_configured_passes() {
        let args = EdgeDistanceArgs {
            width: 8,
            height: 1,
            edge: (0, 0),
            passes: None,
        };
        let mut config = EngineConfig::default();
        config.post_process.edge_distance_passes = 2;
        let distances = propagate(&args, config).unwrap();
        assert_eq!(&distances[..4], &[0.0, 1.0, 2.0, NO_EDGE]);
    }

    #[test]
    fn summarize_counts_reached_pixels() {
        let text = summarize(&[0.0, 1.0, NO_EDGE, 2.0], 2);
        assert!(text.starts_with("reached 3/4 pixels, max distance 2"));
        assert_eq!(text.lines().count(), 3);
    }
}
