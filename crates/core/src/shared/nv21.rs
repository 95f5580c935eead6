//! Conversions between NV21 camera buffers and RGB images.
//!
//! Full-range BT.601 coefficients. Chroma is subsampled 2x2; the encoder
//! averages each block.

use image::{imageops, Rgb, RgbImage};

use crate::shared::frame::{Frame, FrameMetadata};

/// Encode an RGB image into an NV21 buffer. Width and height must be even.
pub fn from_rgb(img: &RgbImage) -> Vec<u8> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let mut out = vec![0u8; w * h + w * h / 2];

    for (x, y, px) in img.enumerate_pixels() {
        let [r, g, b] = px.0.map(f32::from);
        out[y as usize * w + x as usize] = clamp_u8(0.299 * r + 0.587 * g + 0.114 * b);
    }

    let chroma = &mut out[w * h..];
    for by in 0..h / 2 {
        for bx in 0..w / 2 {
            let (mut r, mut g, mut b) = (0.0f32, 0.0f32, 0.0f32);
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let px = img.get_pixel((bx * 2 + dx) as u32, (by * 2 + dy) as u32);
                r += px[0] as f32;
                g += px[1] as f32;
                b += px[2] as f32;
            }
            let (r, g, b) = (r / 4.0, g / 4.0, b / 4.0);
            let u = -0.169 * r - 0.331 * g + 0.5 * b + 128.0;
            let v = 0.5 * r - 0.419 * g - 0.081 * b + 128.0;
            let offset = by * w + bx * 2;
            chroma[offset] = clamp_u8(v);
            chroma[offset + 1] = clamp_u8(u);
        }
    }
    out
}

/// Build a frame from an upright image, turning it into sensor orientation
/// so that [`to_upright_rgb`] restores it.
pub fn frame_from_upright_rgb(img: &RgbImage, metadata: FrameMetadata, index: usize) -> Frame {
    let quarter_turn = metadata.rotation % 180 == 90;
    let (w, h) = if quarter_turn {
        (metadata.height, metadata.width)
    } else {
        (metadata.width, metadata.height)
    };
    let upright = if img.dimensions() == (w, h) {
        img.clone()
    } else {
        imageops::resize(img, w, h, imageops::FilterType::Triangle)
    };
    let sensor = match metadata.rotation % 360 {
        90 => imageops::rotate270(&upright),
        180 => imageops::rotate180(&upright),
        270 => imageops::rotate90(&upright),
        _ => upright,
    };
    Frame::new(from_rgb(&sensor), metadata, index)
}

/// Decode a frame into RGB without applying its rotation.
pub fn to_rgb(frame: &Frame) -> RgbImage {
    let (w, h) = (frame.width(), frame.height());
    let luma = frame.luma();
    let chroma = frame.chroma();
    let row_stride = w as usize;

    RgbImage::from_fn(w, h, |x, y| {
        let yv = luma[[y as usize, x as usize]] as f32;
        let offset = (y as usize / 2) * row_stride + (x as usize / 2) * 2;
        let v = chroma[offset] as f32 - 128.0;
        let u = chroma[offset + 1] as f32 - 128.0;
        Rgb([
            clamp_u8(yv + 1.402 * v),
            clamp_u8(yv - 0.344 * u - 0.714 * v),
            clamp_u8(yv + 1.772 * u),
        ])
    })
}

/// Decode a frame into an upright RGB image, applying the clockwise rotation
/// recorded in its metadata.
pub fn to_upright_rgb(frame: &Frame) -> RgbImage {
    let rgb = to_rgb(frame);
    match frame.rotation() % 360 {
        90 => imageops::rotate90(&rgb),
        180 => imageops::rotate180(&rgb),
        270 => imageops::rotate270(&rgb),
        0 => rgb,
        other => {
            log::debug!("Unsupported frame rotation {other}, leaving image as captured");
            rgb
        }
    }
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
