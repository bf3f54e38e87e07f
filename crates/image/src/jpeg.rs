use {crate::*, base::Vec2, crates_image::ImageEncoder};

pub fn rgb_to_jpeg(size: Vec2<usize>, data: &[u8], quality: u8) -> Result<Vec<u8>, ImageError> {
    let too_large = |_| ImageError::Encode(format!("image too large: {}", size));
    let width = u32::try_from(size.x).map_err(too_large)?;
    let height = u32::try_from(size.y).map_err(too_large)?;
    let expected = size.area() * 3;
    if data.len() != expected {
        return Err(ImageError::Encode(format!(
            "RGB buffer for {} should be {} bytes, got {}",
            size,
            expected,
            data.len()
        )));
    }
    let mut buffer = Vec::new();
    let encoder = crates_image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .write_image(data, width, height, crates_image::ExtendedColorType::Rgb8)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// Compress an image to JPEG at `quality` (1-100).
///
/// JPEG input is passed through untouched. Other formats are converted to
/// RGB first. Fails with `ImageError::Encode` on a degenerate size or a
/// buffer that does not match the size.
pub fn encode_jpeg(image: &Image, quality: u8) -> Result<Vec<u8>, ImageError> {
    image.validate()?;
    match image.format {
        PixelFormat::Jpeg => Ok(image.data.clone()),
        PixelFormat::Rgb8 => rgb_to_jpeg(image.size, &image.data, quality),
        PixelFormat::Argb8 => rgb_to_jpeg(image.size, &argb_to_rgb(image.size, &image.data), quality),
        PixelFormat::Yuyv => rgb_to_jpeg(image.size, &yuyv_to_rgb(image.size, &image.data), quality),
    }
}

/// Decode a compressed image (JPEG, PNG, BMP or WebP) into an `Rgb8` image.
pub fn decode_image(data: &[u8]) -> Result<Image, ImageError> {
    let decoded = crates_image::load_from_memory(data)?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    let size = Vec2::new(width as usize, height as usize);
    if size.is_degenerate() {
        return Err(ImageError::Decode(format!("degenerate image size {}", size)));
    }
    Ok(Image::new(size, rgb.into_raw(), PixelFormat::Rgb8))
}
