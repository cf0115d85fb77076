use std::io;
use std::io::Write;
use std::fs::File;
use std::path::Path;

use crate::color::Color;
use crate::error::RenderError;

/// Maximum line length of a plain PPM/PGM file.
const PPM_LINE_WIDTH: usize = 70;

/// How pixels are stored when a canvas is saved.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Three 8-bit channels per pixel (plain PPM, `P3`).
    Rgb,

    /// One 8-bit luminance channel per pixel (plain PGM, `P2`).
    Grayscale,
}

impl Default for PixelFormat {
    fn default() -> PixelFormat {
        PixelFormat::Rgb
    }
}

/// A canvas for drawing pixels.
///
/// The camera writes the shaded color of every pixel into a `Canvas`. Once
/// the render finishes, the canvas can be saved to an image file.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Canvas {
    /// The width of the canvas, in pixels.
    pub width: usize,

    /// The height of the canvas, in pixels.
    pub height: usize,

    /// The pixels of the canvas, stored row by row.
    pixels: Vec<Color>,
}

impl Canvas {
    /// Creates a black canvas with specified width and height.
    pub fn new(width: usize, height: usize) -> Canvas {
        Canvas {
            width,
            height,
            pixels: vec![Color::black(); width * height]
        }
    }

    /// Writes a color to a location on the `Canvas`.
    ///
    /// `x` is the column and `y` the row, both zero-indexed from the top
    /// left corner.
    ///
    /// # Examples
    ///
    /// ```
    /// # use raycaster::color::Color;
    /// # use raycaster::canvas::Canvas;
    /// let purple = Color::rgb(255.0, 0.0, 255.0);
    /// let mut canvas = Canvas::new(8, 8);
    /// canvas.write_pixel(4, 2, purple).unwrap();
    /// assert_eq!(canvas.read_pixel(4, 2).unwrap(), purple);
    /// assert!(canvas.write_pixel(8, 0, purple).is_err());
    /// ```
    pub fn write_pixel(&mut self, x: usize, y: usize, pixel: Color)
        -> Result<(), RenderError> {
        if x >= self.width || y >= self.height {
            return Err(RenderError::PixelOutOfBounds {
                x, y, width: self.width, height: self.height
            });
        }

        self.pixels[(y * self.width) + x] = pixel;
        Ok(())
    }

    /// Reads a color from a location on the `Canvas`, or `None` if the
    /// location is out of bounds.
    pub fn read_pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None
        }

        Some(self.pixels[(y * self.width) + x])
    }

    /// Saves the canvas to a plain PPM (or PGM, for grayscale) file.
    pub fn save(&self, path: &Path, format: PixelFormat) -> io::Result<()> {
        let mut out = io::BufWriter::new(File::create(path)?);
        self.write_to(&mut out, format)?;
        out.flush()
    }

    /// Writes the canvas in plain PPM/PGM format.
    ///
    /// Lines are kept within 70 columns; a value that would cross the limit
    /// starts a new line.
    pub fn write_to<W: Write>(&self, out: &mut W, format: PixelFormat)
        -> io::Result<()> {
        // Header: magic number, dimensions and maximum channel value.
        let magic = match format {
            PixelFormat::Rgb => "P3",
            PixelFormat::Grayscale => "P2",
        };
        writeln!(out, "{}", magic)?;
        writeln!(out, "{} {}", self.width, self.height)?;
        writeln!(out, "255")?;

        let mut col = 0;
        for pixel in self.pixels.iter() {
            let channels = match format {
                PixelFormat::Rgb => pixel.to_rgb8().to_vec(),
                PixelFormat::Grayscale => {
                    let l = pixel.luminance();
                    vec![Color::rgb(l, l, l).to_rgb8()[0]]
                },
            };

            for value in channels {
                let token = value.to_string();
                if col > 0 && col + 1 + token.len() > PPM_LINE_WIDTH {
                    writeln!(out)?;
                    col = 0;
                }

                if col > 0 {
                    write!(out, " ")?;
                    col += 1;
                }

                write!(out, "{}", token)?;
                col += token.len();
            }
        }

        // Terminate the file with a newline.
        writeln!(out)?;
        Ok(())
    }
}

#[test]
fn new_canvas_is_black() {
    let c = Canvas::new(10, 20);
    assert_eq!(c.width, 10);
    assert_eq!(c.height, 20);
    assert_eq!(c.read_pixel(9, 19), Some(Color::black()));
    assert_eq!(c.read_pixel(10, 0), None);
}

#[test]
fn out_of_bounds_write_is_reported() {
    let mut c = Canvas::new(2, 2);
    match c.write_pixel(1, 2, Color::white()) {
        Err(RenderError::PixelOutOfBounds { x: 1, y: 2, width: 2, height: 2 }) => (),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn ppm_header_and_pixels() {
    let mut c = Canvas::new(3, 2);
    c.write_pixel(0, 0, Color::rgb(255.0, 0.0, 0.0)).unwrap();
    c.write_pixel(1, 0, Color::rgb(0.0, 127.6, 0.0)).unwrap();
    c.write_pixel(2, 1, Color::rgb(-5.0, 0.0, 300.0)).unwrap();

    let mut out = Vec::new();
    c.write_to(&mut out, PixelFormat::Rgb).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "P3");
    assert_eq!(lines[1], "3 2");
    assert_eq!(lines[2], "255");
    assert_eq!(lines[3], "255 0 0 0 128 0 0 0 0 0 0 0 0 0 0 0 0 255");
    assert!(text.ends_with('\n'));
}

#[test]
fn ppm_lines_stay_short() {
    let mut c = Canvas::new(10, 2);
    for y in 0..2 {
        for x in 0..10 {
            c.write_pixel(x, y, Color::rgb(255.0, 204.0, 153.0)).unwrap();
        }
    }

    let mut out = Vec::new();
    c.write_to(&mut out, PixelFormat::Rgb).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.lines().all(|l| l.len() <= 70));
    let values: usize = text.lines().skip(3).map(|l| l.split(' ').count()).sum();
    assert_eq!(values, 60);
}

#[test]
fn pgm_uses_luminance() {
    let mut c = Canvas::new(2, 1);
    c.write_pixel(0, 0, Color::white()).unwrap();

    let mut out = Vec::new();
    c.write_to(&mut out, PixelFormat::Grayscale).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "P2");
    assert_eq!(lines[3], "255 0");
}
