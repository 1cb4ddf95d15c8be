//! Colour selection for highlighted usages.
//!
//! Every distinct `tool/field` key gets one colour for the lifetime of a
//! [`ColorCache`]. Colours are generated lazily on first use, either as a
//! random bright HSV colour (the default) or by cycling a fixed palette of
//! 30 visually distinct colours.
//!
//! Runs of characters carrying several usages are shaded with the
//! channel-wise mean of the individual colours ([`mean_color`]).

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// An 8-bit RGB triple.
pub type Rgb = (u8, u8, u8);

/// Opacity applied to every shaded run.
const OPACITY_SHADE: f64 = 0.3;

/// 30 distinct colours, cycled in order by palette-mode caches.
pub const DISTINCT_COLORS_30: [Rgb; 30] = [
    (128, 128, 128),
    (85, 107, 47),
    (139, 69, 19),
    (34, 139, 34),
    (72, 61, 139),
    (184, 134, 11),
    (0, 139, 139),
    (0, 0, 128),
    (154, 205, 50),
    (127, 0, 127),
    (143, 188, 143),
    (176, 48, 96),
    (255, 0, 0),
    (255, 140, 0),
    (255, 255, 0),
    (124, 252, 0),
    (138, 43, 226),
    (0, 255, 127),
    (233, 150, 122),
    (220, 20, 60),
    (0, 255, 255),
    (0, 0, 255),
    (255, 0, 255),
    (240, 230, 140),
    (100, 149, 237),
    (221, 160, 221),
    (144, 238, 144),
    (255, 20, 147),
    (123, 104, 238),
    (135, 206, 250),
];

#[derive(Debug, Clone)]
enum ColorSource {
    Random(StdRng),
    Palette { next: usize },
}

/// Key → colour cache, preserving first-use order for the legend.
#[derive(Debug, Clone)]
pub struct ColorCache {
    order: Vec<(String, Rgb)>,
    index: HashMap<String, usize>,
    source: ColorSource,
}

impl ColorCache {
    /// Random HSV colours from an entropy-seeded generator.
    pub fn new() -> Self {
        Self::with_source(ColorSource::Random(StdRng::from_entropy()))
    }

    /// Random HSV colours from a fixed seed (reproducible renders).
    pub fn seeded(seed: u64) -> Self {
        Self::with_source(ColorSource::Random(StdRng::seed_from_u64(seed)))
    }

    /// Cycle through [`DISTINCT_COLORS_30`], wrapping after 30 keys.
    pub fn with_palette() -> Self {
        Self::with_source(ColorSource::Palette { next: 0 })
    }

    fn with_source(source: ColorSource) -> Self {
        Self {
            order: Vec::new(),
            index: HashMap::new(),
            source,
        }
    }

    /// Colour for `key`, generating and caching one on first use.
    pub fn color_for(&mut self, key: &str) -> Rgb {
        if let Some(&i) = self.index.get(key) {
            return self.order[i].1;
        }
        let color = match &mut self.source {
            ColorSource::Random(rng) => random_color(rng),
            ColorSource::Palette { next } => {
                let color = DISTINCT_COLORS_30[*next % DISTINCT_COLORS_30.len()];
                *next += 1;
                color
            }
        };
        self.index.insert(key.to_string(), self.order.len());
        self.order.push((key.to_string(), color));
        color
    }

    pub fn get(&self, key: &str) -> Option<Rgb> {
        self.index.get(key).map(|&i| self.order[i].1)
    }

    /// Every cached key and colour, in first-use order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Rgb)> {
        self.order.iter().map(|(k, c)| (k.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for ColorCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Random hue, saturation in `[0.9, 1.0]`, brightness 0.9.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Rgb {
    let hue: f64 = rng.gen();
    let sat = 0.9 + rng.gen::<f64>() * 0.1;
    let (r, g, b) = hsv_to_rgb(hue, sat, 0.9);
    ((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

/// HSV → RGB with all components in `[0, 1]`.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (v, v, v);
    }
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Channel-wise integer mean. A single colour is returned unchanged.
pub fn mean_color(colors: &[Rgb]) -> Rgb {
    match colors {
        [] => (0, 0, 0),
        [only] => *only,
        _ => {
            let n = colors.len() as u32;
            let (r, g, b) = colors.iter().fold((0u32, 0u32, 0u32), |acc, c| {
                (acc.0 + c.0 as u32, acc.1 + c.1 as u32, acc.2 + c.2 as u32)
            });
            ((r / n) as u8, (g / n) as u8, (b / n) as u8)
        }
    }
}

/// CSS colour for a shaded run: `rgba(r,g,b,0.3)`.
pub fn html_color(rgb: Rgb) -> String {
    format!("rgba({},{},{},{})", rgb.0, rgb.1, rgb.2, OPACITY_SHADE)
}
