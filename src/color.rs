use std::ops::{ Add, Sub, Mul };

use crate::feq;
use crate::consts::MAX_CHANNEL;

/// A color.
///
/// Represented with red-green-blue (RGB) values on the 8-bit scale: each
/// channel nominally ranges from 0.0 to 255.0 inclusive. Intermediate shading
/// results may leave that range; `clamp` brings them back before they reach
/// the image.
///
/// # Examples
///
/// Construct the color red:
///
/// ```
/// # use raycaster::color::Color;
/// let red = Color::red();
/// assert_eq!(red, Color::rgb(255.0, 0.0, 0.0));
/// ```
///
/// Blend several colors:
///
/// ```
/// # use raycaster::color::Color;
/// let blend = Color::average(&[Color::green(), Color::blue()]);
/// assert_eq!(blend, Color::rgb(0.0, 127.5, 127.5));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialOrd)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Colors are compared component-wise, accounting for floating point error.
impl PartialEq for Color {
    fn eq(&self, other: &Color) -> bool {
        feq(self.r, other.r) &&
            feq(self.g, other.g) &&
            feq(self.b, other.b)
    }
}

/// Conversion from a slice to a `Color`.
///
/// Takes the first three elements of the slice as `r`, `g` and `b`. Missing
/// elements default to `0.0`.
impl From<&[f64]> for Color {
    fn from(v: &[f64]) -> Color {
        match v.len() {
            0 => Default::default(),
            1 => Color { r: v[0], ..Default::default() },
            2 => Color { r: v[0], g: v[1], ..Default::default() },
            _ => Color { r: v[0], g: v[1], b: v[2] }
        }
    }
}

impl Color {
    /// Creates a color with red, green and blue values.
    pub fn rgb(r: f64, g: f64, b: f64) -> Color {
        Color { r, g, b }
    }

    pub fn black() -> Color {
        Color { r: 0.0, g: 0.0, b: 0.0 }
    }

    pub fn white() -> Color {
        Color { r: MAX_CHANNEL, g: MAX_CHANNEL, b: MAX_CHANNEL }
    }

    pub fn red() -> Color {
        Color { r: MAX_CHANNEL, g: 0.0, b: 0.0 }
    }

    pub fn green() -> Color {
        Color { r: 0.0, g: MAX_CHANNEL, b: 0.0 }
    }

    pub fn blue() -> Color {
        Color { r: 0.0, g: 0.0, b: MAX_CHANNEL }
    }

    /// Averages any number of colors. The average of no colors is black.
    pub fn average(colors: &[Color]) -> Color {
        if colors.is_empty() {
            return Color::black();
        }

        let sum = colors.iter().fold(Color::black(), |acc, c| acc + *c);
        sum * (1.0 / colors.len() as f64)
    }

    /// Clamps every channel to `[0, 255]`.
    pub fn clamp(&self) -> Color {
        Color {
            r: self.r.clamp(0.0, MAX_CHANNEL),
            g: self.g.clamp(0.0, MAX_CHANNEL),
            b: self.b.clamp(0.0, MAX_CHANNEL),
        }
    }

    /// Converts to 8-bit channels, rounding half up after clamping.
    ///
    /// ```
    /// # use raycaster::color::Color;
    /// assert_eq!(Color::rgb(12.5, 300.0, -4.0).to_rgb8(), [13, 255, 0]);
    /// ```
    pub fn to_rgb8(&self) -> [u8; 3] {
        let c = self.clamp();
        [
            (c.r + 0.5) as u8,
            (c.g + 0.5) as u8,
            (c.b + 0.5) as u8,
        ]
    }

    /// Relative luminance on the same 0-255 scale, for grayscale output.
    pub fn luminance(&self) -> f64 {
        0.299 * self.r + 0.587 * self.g + 0.114 * self.b
    }
}

impl Add<Color> for Color {
    type Output = Color;

    fn add(self, other: Color) -> Self::Output {
        Color {
            r: self.r + other.r,
            g: self.g + other.g,
            b: self.b + other.b,
        }
    }
}

impl Sub<Color> for Color {
    type Output = Color;

    fn sub(self, other: Color) -> Self::Output {
        Color {
            r: self.r - other.r,
            g: self.g - other.g,
            b: self.b - other.b,
        }
    }
}

/// Multiplies a color by a scalar.
impl Mul<f64> for Color {
    type Output = Color;

    fn mul(self, other: f64) -> Self::Output {
        Color {
            r: self.r * other,
            g: self.g * other,
            b: self.b * other,
        }
    }
}

/// Multiplies a scalar by a color.
impl Mul<Color> for f64 {
    type Output = Color;

    fn mul(self, other: Color) -> Self::Output {
        other * self
    }
}

#[test]
fn add_colors() {
    let sky = Color::rgb(135.0, 206.0, 235.0);
    let glow = Color::rgb(60.0, 20.0, 0.0);

    assert_eq!(sky + glow, Color::rgb(195.0, 226.0, 235.0));
    assert_eq!((sky + glow + glow).clamp(), Color::rgb(255.0, 246.0, 235.0));
}

#[test]
fn subtract_colors() {
    let white = Color::white();
    let cyan = Color::rgb(0.0, 255.0, 255.0);

    assert_eq!(white - cyan, Color::red());
}

#[test]
fn multiply_colors() {
    let c1 = Color::rgb(20.0, 30.0, 40.0);
    let c2 = Color { r: 40.0, g: 60.0, b: 80.0 };

    assert_eq!(c1 * 2.0, c2);
    assert_eq!(2.0 * c1, c2);
}

#[test]
fn average_four_colors() {
    let colors = [
        Color::rgb(0.0, 0.0, 0.0),
        Color::rgb(100.0, 0.0, 0.0),
        Color::rgb(0.0, 200.0, 0.0),
        Color::rgb(100.0, 200.0, 40.0),
    ];

    assert_eq!(Color::average(&colors), Color::rgb(50.0, 100.0, 10.0));
    assert_eq!(Color::average(&[]), Color::black());
}

#[test]
fn clamp_color() {
    let c = Color::rgb(-10.0, 128.0, 1000.0).clamp();
    assert_eq!(c, Color::rgb(0.0, 128.0, 255.0));
}
