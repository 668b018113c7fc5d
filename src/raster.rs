// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Writing rendered bands to disk.  The encoder is a plain trait so the
//! workers never care which file format they are producing, and tests
//! can swap in one that fails.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::jpeg::JPEGEncoder;
use image::pnm::{PNMEncoder, PNMSubtype, SampleEncoding};
use image::ColorType;

/// Writes an 8-bit RGB raster to `path`.
pub trait RasterEncoder: Send + Sync {
    /// `pixels` holds `width * height` RGB triples, row-major.
    fn write(&self, path: &Path, width: u32, height: u32, pixels: &[u8]) -> io::Result<()>;
}

/// Binary PPM, the format the renderer has always produced.
#[derive(Copy, Clone, Debug, Default)]
pub struct PnmRaster;

impl RasterEncoder for PnmRaster {
    fn write(&self, path: &Path, width: u32, height: u32, pixels: &[u8]) -> io::Result<()> {
        let output = File::create(path)?;
        let mut encoder =
            PNMEncoder::new(output).with_subtype(PNMSubtype::Pixmap(SampleEncoding::Binary));
        encoder.encode(pixels, width, height, ColorType::RGB(8))
    }
}

/// Baseline JPEG.
#[derive(Copy, Clone, Debug)]
pub struct JpegRaster {
    quality: u8,
}

impl JpegRaster {
    /// A JPEG writer at the given quality, 1 to 100.
    pub fn new(quality: u8) -> Self {
        JpegRaster { quality }
    }
}

impl Default for JpegRaster {
    fn default() -> Self {
        JpegRaster::new(90)
    }
}

impl RasterEncoder for JpegRaster {
    fn write(&self, path: &Path, width: u32, height: u32, pixels: &[u8]) -> io::Result<()> {
        let mut output = File::create(path)?;
        let mut encoder = JPEGEncoder::new_with_quality(&mut output, self.quality);
        encoder.encode(pixels, width, height, ColorType::RGB(8))
    }
}

/// The output file formats the CLI can ask for.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Format {
    /// Binary PPM.
    Ppm,
    /// JPEG.
    Jpeg,
}

impl Format {
    /// File extension for artifacts of this format.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Ppm => "ppm",
            Format::Jpeg => "jpg",
        }
    }

    /// An encoder producing this format.
    pub fn encoder(self) -> Box<dyn RasterEncoder> {
        match self {
            Format::Ppm => Box::new(PnmRaster),
            Format::Jpeg => Box::new(JpegRaster::default()),
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ppm" | "pnm" => Ok(Format::Ppm),
            "jpeg" | "jpg" => Ok(Format::Jpeg),
            other => Err(format!("unknown image format '{}'", other)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Format::Ppm => "ppm",
            Format::Jpeg => "jpeg",
        })
    }
}

const STEM: &str = "out-mandelbrot";

/// Decides where each artifact lands.
#[derive(Clone, Debug)]
pub struct ArtifactNamer {
    dir: PathBuf,
    extension: &'static str,
    single: bool,
}

impl ArtifactNamer {
    /// Artifacts go to `dir`.  `single` marks a plan with only one unit,
    /// whose output is the whole image and gets the combined name.
    pub fn new<P: AsRef<Path>>(dir: P, format: Format, single: bool) -> Self {
        ArtifactNamer {
            dir: dir.as_ref().to_path_buf(),
            extension: format.extension(),
            single,
        }
    }

    /// Path of the artifact for a whole unit.
    pub fn unit(&self, unit: usize) -> PathBuf {
        if self.single {
            self.dir.join(format!("{}.{}", STEM, self.extension))
        } else {
            self.dir.join(format!("{}-{}.{}", STEM, unit, self.extension))
        }
    }

    /// Path of the artifact for one sub-pass of a unit.  A single-unit
    /// plan has a single sub-pass, which is the whole image.
    pub fn sub_pass(&self, unit: usize, pass: usize) -> PathBuf {
        if self.single {
            return self.unit(unit);
        }
        self.dir
            .join(format!("{}-{}-{}.{}", STEM, unit, pass, self.extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn artifacts_are_named_by_unit_and_pass() {
        let namer = ArtifactNamer::new("/tmp/out", Format::Ppm, false);
        assert_eq!(namer.unit(3), PathBuf::from("/tmp/out/out-mandelbrot-3.ppm"));
        assert_eq!(namer.sub_pass(3, 1), PathBuf::from("/tmp/out/out-mandelbrot-3-1.ppm"));
    }

    #[test]
    fn single_unit_gets_the_combined_name() {
        let namer = ArtifactNamer::new("out", Format::Jpeg, true);
        assert_eq!(namer.unit(0), PathBuf::from("out/out-mandelbrot.jpg"));
        assert_eq!(namer.sub_pass(0, 0), PathBuf::from("out/out-mandelbrot.jpg"));
    }

    #[test]
    fn formats_parse_loosely() {
        assert_eq!("PPM".parse::<Format>(), Ok(Format::Ppm));
        assert_eq!("jpg".parse::<Format>(), Ok(Format::Jpeg));
        assert!("gif".parse::<Format>().is_err());
    }

    #[test]
    fn ppm_has_a_p6_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("band.ppm");
        let pixels = vec![7u8; 4 * 2 * 3];
        PnmRaster.write(&path, 4, 2, &pixels).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"P6"));
        assert!(bytes.ends_with(&pixels));
    }

    #[test]
    fn jpeg_has_a_soi_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("band.jpg");
        JpegRaster::default()
            .write(&path, 8, 8, &vec![128u8; 8 * 8 * 3])
            .unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("band.ppm");
        assert!(PnmRaster.write(&path, 1, 1, &[0, 0, 0]).is_err());
    }
}
