use base::Vec2;
use crates_image::ImageEncoder;
use image::{Image, ImageError, PixelFormat, decode_image};

#[test]
fn test_decode_jpeg() {
    let size = Vec2::new(8, 6);
    let data = vec![200u8; size.area() * 3];
    let jpeg = image::rgb_to_jpeg(size, &data, 95).unwrap();

    let decoded = decode_image(&jpeg).unwrap();

    assert_eq!(decoded.size, size);
    assert_eq!(decoded.format, PixelFormat::Rgb8);
    assert_eq!(decoded.data.len(), size.area() * 3);
    assert!(decoded.data.iter().all(|&v| (190..=210).contains(&v)));
}

#[test]
fn test_decode_png_rgba_drops_alpha() {
    let mut buffer = Vec::new();
    let img = crates_image::RgbaImage::from_fn(2, 2, |x, y| {
        let val = (x + y) as u8 * 64;
        crates_image::Rgba([val, val + 16, val + 32, 128])
    });
    crates_image::codecs::png::PngEncoder::new(&mut buffer)
        .write_image(img.as_raw(), 2, 2, crates_image::ExtendedColorType::Rgba8)
        .unwrap();

    let decoded = decode_image(&buffer).unwrap();

    assert_eq!(decoded.size, Vec2::new(2, 2));
    assert_eq!(decoded.data, vec![0, 16, 32, 64, 80, 96, 64, 80, 96, 128, 144, 160]);
}

#[test]
fn test_decode_garbage_fails() {
    let result = decode_image(&[0x00, 0x01, 0x02, 0x03]);
    assert!(matches!(result, Err(ImageError::Decode(_))));
}

#[test]
fn test_decode_truncated_jpeg_fails() {
    let size = Vec2::new(16, 16);
    let jpeg = image::rgb_to_jpeg(size, &vec![10u8; size.area() * 3], 80).unwrap();
    assert!(decode_image(&jpeg[..jpeg.len() / 2]).is_err());
}

#[test]
fn test_to_rgb_from_jpeg_image() {
    let size = Vec2::new(4, 4);
    let jpeg = image::rgb_to_jpeg(size, &vec![0u8; 48], 90).unwrap();
    let rgb = image::to_rgb(&Image::new(size, jpeg, PixelFormat::Jpeg)).unwrap();
    assert_eq!(rgb.format, PixelFormat::Rgb8);
    assert_eq!(rgb.data.len(), 48);
}

#[test]
fn test_yuyv_to_rgb_gray() {
    let rgb = image::yuyv_to_rgb(Vec2::new(2, 1), &[128, 128, 128, 128]);
    assert_eq!(rgb.len(), 6);
    assert!(rgb.iter().all(|v| (126..=130).contains(v)));
}
