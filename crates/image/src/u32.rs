use {crate::*, base::Vec2};

fn pack_u32(r: u8, g: u8, b: u8) -> u32 {
    0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

pub fn rgb_to_u32(size: Vec2<usize>, data: &[u8]) -> Vec<u32> {
    let mut buf = Vec::with_capacity(size.area());
    for chunk in data.chunks_exact(3) {
        buf.push(pack_u32(chunk[0], chunk[1], chunk[2]));
    }
    buf
}

/// Packed `0xAARRGGBB` pixels for framebuffer-style display surfaces.
pub fn image_to_u32(image: &Image) -> Result<Vec<u32>, ImageError> {
    let rgb = to_rgb(image)?;
    Ok(rgb_to_u32(rgb.size, &rgb.data))
}
