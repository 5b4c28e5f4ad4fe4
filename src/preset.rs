use image::{DynamicImage, GrayImage, Luma, RgbImage, RgbaImage};
use imageproc::contrast::{equalize_histogram, stretch_contrast};

/// Fixed solarize threshold: channel values at or above this are inverted.
const SOLARIZE_THRESHOLD: u8 = 128;
/// Fixed posterize depth: number of high bits kept per channel.
const POSTERIZE_BITS: u8 = 4;

/// A named, parameterless image transformation selectable from the UI.
///
/// Presets fall into three disjoint categories: convolution filters
/// (the classic Pillow `ImageFilter` kernels), enhancements (a fixed-factor
/// interpolation against a degenerate image) and per-pixel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Blur,
    Contour,
    Detail,
    EdgeEnhance,
    EdgeEnhanceMore,
    Emboss,
    FindEdges,
    Sharpen,
    Smooth,
    SmoothMore,
    Grayscale,
    Invert,
    Mirror,
    Flip,
    Solarize,
    Posterize,
    Equalize,
    Autocontrast,
    EnhanceBrightness,
    EnhanceContrast,
    EnhanceColor,
    EnhanceSharpness,
}

/// Every preset, in the order the dropdown lists them.
pub const ALL_PRESETS: [Preset; 22] = [
    Preset::Blur,
    Preset::Contour,
    Preset::Detail,
    Preset::EdgeEnhance,
    Preset::EdgeEnhanceMore,
    Preset::Emboss,
    Preset::FindEdges,
    Preset::Sharpen,
    Preset::Smooth,
    Preset::SmoothMore,
    Preset::Grayscale,
    Preset::Invert,
    Preset::Mirror,
    Preset::Flip,
    Preset::Solarize,
    Preset::Posterize,
    Preset::Equalize,
    Preset::Autocontrast,
    Preset::EnhanceBrightness,
    Preset::EnhanceContrast,
    Preset::EnhanceColor,
    Preset::EnhanceSharpness,
];

impl Preset {
    pub fn name(&self) -> &'static str {
        match self {
            Preset::Blur => "Blur",
            Preset::Contour => "Contour",
            Preset::Detail => "Detail",
            Preset::EdgeEnhance => "Edge Enhance",
            Preset::EdgeEnhanceMore => "Edge Enhance More",
            Preset::Emboss => "Emboss",
            Preset::FindEdges => "Find Edges",
            Preset::Sharpen => "Sharpen",
            Preset::Smooth => "Smooth",
            Preset::SmoothMore => "Smooth More",
            Preset::Grayscale => "Grayscale",
            Preset::Invert => "Invert",
            Preset::Mirror => "Mirror",
            Preset::Flip => "Flip",
            Preset::Solarize => "Solarize",
            Preset::Posterize => "Posterize",
            Preset::Equalize => "Equalize",
            Preset::Autocontrast => "Autocontrast",
            Preset::EnhanceBrightness => "Enhance Brightness",
            Preset::EnhanceContrast => "Enhance Contrast",
            Preset::EnhanceColor => "Enhance Color",
            Preset::EnhanceSharpness => "Enhance Sharpness",
        }
    }

    pub fn from_name(name: &str) -> Option<Preset> {
        ALL_PRESETS.iter().copied().find(|p| p.name() == name)
    }

    /// Applies this preset to `img`, returning a new image of the same
    /// dimensions. The input is never mutated.
    pub fn apply(&self, img: &DynamicImage) -> DynamicImage {
        match self {
            Preset::Blur => convolve(img, &BLUR),
            Preset::Contour => convolve(img, &CONTOUR),
            Preset::Detail => convolve(img, &DETAIL),
            Preset::EdgeEnhance => convolve(img, &EDGE_ENHANCE),
            Preset::EdgeEnhanceMore => convolve(img, &EDGE_ENHANCE_MORE),
            Preset::Emboss => convolve(img, &EMBOSS),
            Preset::FindEdges => convolve(img, &FIND_EDGES),
            Preset::Sharpen => convolve(img, &SHARPEN),
            Preset::Smooth => convolve(img, &SMOOTH),
            Preset::SmoothMore => convolve(img, &SMOOTH_MORE),
            Preset::Grayscale => DynamicImage::ImageLuma8(img.to_luma8()),
            Preset::Invert => invert(img),
            Preset::Mirror => img.fliph(),
            Preset::Flip => img.flipv(),
            Preset::Solarize => map_channels(img, |v| {
                if v >= SOLARIZE_THRESHOLD {
                    255 - v
                } else {
                    v
                }
            }),
            Preset::Posterize => {
                let mask = !(0xffu8 >> POSTERIZE_BITS);
                map_channels(img, |v| v & mask)
            }
            Preset::Equalize => per_channel(img, |plane| equalize_histogram(plane)),
            Preset::Autocontrast => per_channel(img, autocontrast_plane),
            Preset::EnhanceBrightness => enhance(img, Degenerate::Black, 1.5),
            Preset::EnhanceContrast => enhance(img, Degenerate::MeanGray, 1.5),
            Preset::EnhanceColor => enhance(img, Degenerate::Desaturated, 1.5),
            Preset::EnhanceSharpness => enhance(img, Degenerate::Smoothed, 2.0),
        }
    }
}

/// Resolves `name` and applies the matching preset. An unrecognized name
/// returns the input unchanged rather than failing.
pub fn apply_preset(img: &DynamicImage, name: &str) -> DynamicImage {
    match Preset::from_name(name) {
        Some(preset) => preset.apply(img),
        None => img.clone(),
    }
}

// ---------------------------------------------------------------------------
//  Convolution filters
// ---------------------------------------------------------------------------

/// A square convolution kernel with the divisor/offset convention used by
/// Pillow's built-in filters: `out = sum / scale + offset`, clamped to u8.
struct Kernel {
    size: usize,
    weights: &'static [i32],
    scale: f32,
    offset: f32,
}

const BLUR: Kernel = Kernel {
    size: 5,
    weights: &[
        1, 1, 1, 1, 1,
        1, 0, 0, 0, 1,
        1, 0, 0, 0, 1,
        1, 0, 0, 0, 1,
        1, 1, 1, 1, 1,
    ],
    scale: 16.0,
    offset: 0.0,
};

const CONTOUR: Kernel = Kernel {
    size: 3,
    weights: &[-1, -1, -1, -1, 8, -1, -1, -1, -1],
    scale: 1.0,
    offset: 255.0,
};

const DETAIL: Kernel = Kernel {
    size: 3,
    weights: &[0, -1, 0, -1, 10, -1, 0, -1, 0],
    scale: 6.0,
    offset: 0.0,
};

const EDGE_ENHANCE: Kernel = Kernel {
    size: 3,
    weights: &[-1, -1, -1, -1, 10, -1, -1, -1, -1],
    scale: 2.0,
    offset: 0.0,
};

const EDGE_ENHANCE_MORE: Kernel = Kernel {
    size: 3,
    weights: &[-1, -1, -1, -1, 9, -1, -1, -1, -1],
    scale: 1.0,
    offset: 0.0,
};

const EMBOSS: Kernel = Kernel {
    size: 3,
    weights: &[-1, 0, 0, 0, 1, 0, 0, 0, 0],
    scale: 1.0,
    offset: 128.0,
};

const FIND_EDGES: Kernel = Kernel {
    size: 3,
    weights: &[-1, -1, -1, -1, 8, -1, -1, -1, -1],
    scale: 1.0,
    offset: 0.0,
};

const SHARPEN: Kernel = Kernel {
    size: 3,
    weights: &[-2, -2, -2, -2, 32, -2, -2, -2, -2],
    scale: 16.0,
    offset: 0.0,
};

const SMOOTH: Kernel = Kernel {
    size: 3,
    weights: &[1, 1, 1, 1, 5, 1, 1, 1, 1],
    scale: 13.0,
    offset: 0.0,
};

const SMOOTH_MORE: Kernel = Kernel {
    size: 5,
    weights: &[
        1, 1,  1, 1, 1,
        1, 5,  5, 5, 1,
        1, 5, 44, 5, 1,
        1, 5,  5, 5, 1,
        1, 1,  1, 1, 1,
    ],
    scale: 100.0,
    offset: 0.0,
};

/// Applies `kernel` to the RGB channels, sampling out-of-bounds pixels by
/// clamping to the nearest edge. Alpha is carried through untouched.
fn convolve(img: &DynamicImage, kernel: &Kernel) -> DynamicImage {
    let src = img.to_rgba8();
    let (w, h) = (src.width(), src.height());
    let radius = (kernel.size / 2) as i64;
    let mut out = RgbaImage::new(w, h);

    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 3];
            for ky in 0..kernel.size {
                for kx in 0..kernel.size {
                    let sx = (x as i64 + kx as i64 - radius).clamp(0, w as i64 - 1) as u32;
                    let sy = (y as i64 + ky as i64 - radius).clamp(0, h as i64 - 1) as u32;
                    let weight = kernel.weights[ky * kernel.size + kx] as f32;
                    let p = src.get_pixel(sx, sy);
                    acc[0] += p[0] as f32 * weight;
                    acc[1] += p[1] as f32 * weight;
                    acc[2] += p[2] as f32 * weight;
                }
            }
            let alpha = src.get_pixel(x, y)[3];
            out.put_pixel(
                x,
                y,
                image::Rgba([
                    clamp_u8(acc[0] / kernel.scale + kernel.offset),
                    clamp_u8(acc[1] / kernel.scale + kernel.offset),
                    clamp_u8(acc[2] / kernel.scale + kernel.offset),
                    alpha,
                ]),
            );
        }
    }
    DynamicImage::ImageRgba8(out)
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

// ---------------------------------------------------------------------------
//  Enhancements
// ---------------------------------------------------------------------------

/// The reference image an enhancement interpolates away from.
enum Degenerate {
    /// All black: scaling away from it adjusts brightness.
    Black,
    /// Uniform gray at the image's mean luminance: adjusts contrast.
    MeanGray,
    /// Per-pixel luminance: adjusts color saturation.
    Desaturated,
    /// Smoothed copy of the input: adjusts sharpness.
    Smoothed,
}

/// The degenerate image, resolved against a concrete input.
enum Reference {
    Flat([f32; 3]),
    PerPixelLuma,
    Image(RgbaImage),
}

/// `out = degenerate + factor * (input - degenerate)`, per RGB channel.
/// A factor of 1.0 reproduces the input exactly.
fn enhance(img: &DynamicImage, degenerate: Degenerate, factor: f32) -> DynamicImage {
    let src = img.to_rgba8();
    let (w, h) = (src.width(), src.height());

    let reference = match degenerate {
        Degenerate::Black => Reference::Flat([0.0; 3]),
        Degenerate::MeanGray => Reference::Flat([mean_luminance(&src); 3]),
        Degenerate::Desaturated => Reference::PerPixelLuma,
        Degenerate::Smoothed => Reference::Image(convolve(img, &SMOOTH).to_rgba8()),
    };

    let mut out = RgbaImage::new(w, h);
    for (x, y, p) in src.enumerate_pixels() {
        let base: [f32; 3] = match &reference {
            Reference::Flat(v) => *v,
            Reference::PerPixelLuma => [luminance(p[0], p[1], p[2]); 3],
            Reference::Image(s) => {
                let s = s.get_pixel(x, y);
                [s[0] as f32, s[1] as f32, s[2] as f32]
            }
        };
        out.put_pixel(
            x,
            y,
            image::Rgba([
                clamp_u8(base[0] + factor * (p[0] as f32 - base[0])),
                clamp_u8(base[1] + factor * (p[1] as f32 - base[1])),
                clamp_u8(base[2] + factor * (p[2] as f32 - base[2])),
                p[3],
            ]),
        );
    }
    DynamicImage::ImageRgba8(out)
}

/// Rec. 601 luminance, the weighting Pillow uses for its "L" mode.
fn luminance(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

fn mean_luminance(img: &RgbaImage) -> f32 {
    let count = (img.width() as u64 * img.height() as u64).max(1);
    let sum: f64 = img
        .pixels()
        .map(|p| luminance(p[0], p[1], p[2]) as f64)
        .sum();
    (sum / count as f64) as f32
}

// ---------------------------------------------------------------------------
//  Pixel operations
// ---------------------------------------------------------------------------

/// Channel inversion. Coerces to RGB first, so any alpha channel is dropped.
fn invert(img: &DynamicImage) -> DynamicImage {
    let rgb = img.to_rgb8();
    let (w, h) = (rgb.width(), rgb.height());
    let mut out = RgbImage::new(w, h);
    for (x, y, p) in rgb.enumerate_pixels() {
        out.put_pixel(x, y, image::Rgb([255 - p[0], 255 - p[1], 255 - p[2]]));
    }
    DynamicImage::ImageRgb8(out)
}

/// Applies `f` to every RGB channel value, leaving alpha untouched.
fn map_channels(img: &DynamicImage, f: impl Fn(u8) -> u8) -> DynamicImage {
    let src = img.to_rgba8();
    let (w, h) = (src.width(), src.height());
    let mut out = RgbaImage::new(w, h);
    for (x, y, p) in src.enumerate_pixels() {
        out.put_pixel(x, y, image::Rgba([f(p[0]), f(p[1]), f(p[2]), p[3]]));
    }
    DynamicImage::ImageRgba8(out)
}

/// Splits the RGB channels into gray planes, runs `f` over each and
/// reassembles. Used for histogram ops that imageproc defines on GrayImage.
fn per_channel(img: &DynamicImage, f: impl Fn(&GrayImage) -> GrayImage) -> DynamicImage {
    let src = img.to_rgba8();
    let (w, h) = (src.width(), src.height());

    let planes: Vec<GrayImage> = (0..3)
        .map(|c| GrayImage::from_fn(w, h, |x, y| Luma([src.get_pixel(x, y)[c]])))
        .collect();
    let mapped: Vec<GrayImage> = planes.iter().map(&f).collect();

    let mut out = RgbaImage::new(w, h);
    for (x, y, p) in src.enumerate_pixels() {
        out.put_pixel(
            x,
            y,
            image::Rgba([
                mapped[0].get_pixel(x, y)[0],
                mapped[1].get_pixel(x, y)[0],
                mapped[2].get_pixel(x, y)[0],
                p[3],
            ]),
        );
    }
    DynamicImage::ImageRgba8(out)
}

/// Linear stretch of one channel plane to the full 0..=255 range.
/// A flat plane (single value) is returned unchanged.
fn autocontrast_plane(plane: &GrayImage) -> GrayImage {
    let mut lo = 255u8;
    let mut hi = 0u8;
    for p in plane.pixels() {
        lo = lo.min(p[0]);
        hi = hi.max(p[0]);
    }
    if lo >= hi {
        return plane.clone();
    }
    stretch_contrast(plane, lo, hi, 0, 255)
}
