//! Dispatch grid sizing.

/// Workgroup count covering a `width x height` output with `tile x tile` groups.
pub fn dispatch_grid(width: u32, height: u32, tile: u32) -> [u32; 3] {
    let tile = tile.max(1);
    [width.div_ceil(tile), height.div_ceil(tile), 1]
}

/// Workgroup count for sparse passes where each thread covers a
/// `spread x spread` block of pixels.
pub fn sparse_dispatch_grid(width: u32, height: u32, spread: u32, tile: u32) -> [u32; 3] {
    let spread = spread.max(1);
    dispatch_grid(width.div_ceil(spread), height.div_ceil(spread), tile)
}
