//! RGBA color values.
//!
//! Less colors keep their channels as floating point so that chained color
//! functions do not accumulate rounding error; channels are rounded and
//! clamped only when the color is written out.
//!
//! ## Supported Input Formats
//!
//! - **Hex**: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`
//! - **Named**: the CSS color keywords plus `transparent`
//!
//! Functional notations (`rgb()`, `hsl()`, ...) are built-in functions and
//! live in [`crate::functions::color`].

use phf::phf_map;
use std::fmt;

/// Error returned when color parsing fails.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorParseError {
    /// Human-readable description of the parsing error.
    pub message: String,
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ColorParseError {}

/// An RGBA color.
///
/// # Examples
///
/// ```
/// use lcss::types::Color;
///
/// let red = Color::parse("#f00").unwrap();
/// assert_eq!(red.r, 255.0);
/// assert_eq!(red.to_css(false), "#f00");
///
/// let computed = Color::rgb(255.0, 0.0, 0.0);
/// assert_eq!(computed.to_css(false), "#ff0000");
/// ```
#[derive(Clone, Debug)]
pub struct Color {
    /// Red channel (0-255, unclamped until output).
    pub r: f64,
    /// Green channel (0-255, unclamped until output).
    pub g: f64,
    /// Blue channel (0-255, unclamped until output).
    pub b: f64,
    /// Alpha (0.0 = transparent, 1.0 = opaque).
    pub alpha: f64,
    /// The text this color was written as, reused on output while unchanged.
    pub original: Option<String>,
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.channels() == other.channels() && self.alpha == other.alpha
    }
}

impl Default for Color {
    fn default() -> Self {
        Self {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            alpha: 1.0,
            original: None,
        }
    }
}

impl Color {
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self {
            r,
            g,
            b,
            ..Default::default()
        }
    }

    pub fn rgba(r: f64, g: f64, b: f64, alpha: f64) -> Self {
        Self {
            r,
            g,
            b,
            alpha,
            original: None,
        }
    }

    pub fn white() -> Self {
        Self::rgb(255.0, 255.0, 255.0)
    }

    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    /// Returns a copy that has forgotten its authored spelling.
    pub fn computed(&self) -> Self {
        Self {
            original: None,
            ..self.clone()
        }
    }

    pub fn with_alpha(&self, alpha: f64) -> Self {
        Self::rgba(self.r, self.g, self.b, alpha)
    }

    pub fn channels(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }

    /// Relative luminance (ITU-R BT.709), between 0.0 and 1.0.
    pub fn luma(&self) -> f64 {
        let lin = |c: f64| {
            let c = c / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        0.2126 * lin(self.r) + 0.7152 * lin(self.g) + 0.0722 * lin(self.b)
    }

    /// Luminance without gamma correction.
    pub fn luminance(&self) -> f64 {
        (0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b) / 255.0
    }

    /// Parses a hex color or a color keyword.
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ColorParseError {
                message: "empty color string".to_string(),
            });
        }

        let mut color = if let Some(hex) = input.strip_prefix('#') {
            Self::parse_hex(hex)?
        } else {
            Self::from_keyword(input).ok_or_else(|| ColorParseError {
                message: format!("unknown color name: {}", input),
            })?
        };
        color.original = Some(input.to_string());
        Ok(color)
    }

    /// Looks up a CSS color keyword (case-insensitive).
    pub fn from_keyword(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower == "transparent" {
            return Some(Self::rgba(0.0, 0.0, 0.0, 0.0));
        }
        NAMED_COLORS
            .get(lower.as_str())
            .map(|[r, g, b]| Self::rgb(*r as f64, *g as f64, *b as f64))
    }

    pub fn is_keyword(name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        lower == "transparent" || NAMED_COLORS.contains_key(lower.as_str())
    }

    fn parse_hex(hex: &str) -> Result<Self, ColorParseError> {
        let chars: Vec<char> = hex.to_ascii_lowercase().chars().collect();

        match chars.len() {
            3 | 4 => {
                let mut c = [0.0; 4];
                for (i, ch) in chars.iter().enumerate() {
                    c[i] = (Self::parse_hex_digit(*ch)? * 17) as f64;
                }
                let alpha = if chars.len() == 4 { c[3] / 255.0 } else { 1.0 };
                Ok(Self::rgba(c[0], c[1], c[2], alpha))
            }
            6 | 8 => {
                let mut c = [0.0; 4];
                for i in 0..chars.len() / 2 {
                    c[i] = Self::parse_hex_pair(chars[i * 2], chars[i * 2 + 1])? as f64;
                }
                let alpha = if chars.len() == 8 { c[3] / 255.0 } else { 1.0 };
                Ok(Self::rgba(c[0], c[1], c[2], alpha))
            }
            _ => Err(ColorParseError {
                message: format!("invalid hex color length: {}", chars.len()),
            }),
        }
    }

    fn parse_hex_digit(c: char) -> Result<u8, ColorParseError> {
        match c {
            '0'..='9' => Ok(c as u8 - b'0'),
            'a'..='f' => Ok(c as u8 - b'a' + 10),
            _ => Err(ColorParseError {
                message: format!("invalid hex digit: {}", c),
            }),
        }
    }

    fn parse_hex_pair(c1: char, c2: char) -> Result<u8, ColorParseError> {
        let high = Self::parse_hex_digit(c1)?;
        let low = Self::parse_hex_digit(c2)?;
        Ok(high * 16 + low)
    }

    /// Hue in degrees, saturation and lightness in 0..=1.
    pub fn to_hsl(&self) -> (f64, f64, f64) {
        let r = self.r / 255.0;
        let g = self.g / 255.0;
        let b = self.b / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;

        if max == min {
            return (0.0, 0.0, l);
        }

        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        (h * 60.0, s, l)
    }

    /// Hue in degrees, saturation and value in 0..=1.
    pub fn to_hsv(&self) -> (f64, f64, f64) {
        let r = self.r / 255.0;
        let g = self.g / 255.0;
        let b = self.b / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let d = max - min;
        let s = if max == 0.0 { 0.0 } else { d / max };
        if max == min {
            return (0.0, s, max);
        }
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        (h * 60.0, s, max)
    }

    /// Builds a color from hue (degrees), saturation and lightness (0..=1).
    pub fn from_hsl(h: f64, s: f64, l: f64, alpha: f64) -> Self {
        let h = (h % 360.0 + 360.0) % 360.0 / 360.0;
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);

        let (r, g, b) = if s == 0.0 {
            (l, l, l)
        } else {
            let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
            let p = 2.0 * l - q;
            (
                Self::hue_to_rgb(p, q, h + 1.0 / 3.0),
                Self::hue_to_rgb(p, q, h),
                Self::hue_to_rgb(p, q, h - 1.0 / 3.0),
            )
        };

        Self::rgba(r * 255.0, g * 255.0, b * 255.0, alpha)
    }

    /// Builds a color from hue (degrees), saturation and value (0..=1).
    pub fn from_hsv(h: f64, s: f64, v: f64, alpha: f64) -> Self {
        let h = (h % 360.0 + 360.0) % 360.0;
        let i = ((h / 60.0).floor() as usize) % 6;
        let f = h / 60.0 - (h / 60.0).floor();
        let vs = [v, v * (1.0 - s), v * (1.0 - f * s), v * (1.0 - (1.0 - f) * s)];
        let perm = [[0, 3, 1], [2, 0, 1], [1, 0, 3], [1, 2, 0], [3, 1, 0], [0, 1, 2]];
        let [ri, gi, bi] = perm[i];
        Self::rgba(vs[ri] * 255.0, vs[gi] * 255.0, vs[bi] * 255.0, alpha)
    }

    fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }

        if t * 6.0 < 1.0 {
            return p + (q - p) * t * 6.0;
        }
        if t * 2.0 < 1.0 {
            return q;
        }
        if t * 3.0 < 2.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }

    /// Channels rounded and clamped for output.
    pub fn rounded(&self) -> [u8; 3] {
        let c = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        [c(self.r), c(self.g), c(self.b)]
    }

    /// `#rrggbb` form of the rounded channels.
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.rounded();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    /// `#aarrggbb` form used by `argb()`.
    pub fn to_argb(&self) -> String {
        let [r, g, b] = self.rounded();
        let a = (self.alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}{:02x}", a, r, g, b)
    }

    /// Writes the color the way it appears in CSS output.
    pub fn to_css(&self, compress: bool) -> String {
        if let Some(original) = &self.original {
            return original.clone();
        }

        let alpha = self.alpha.clamp(0.0, 1.0);
        if alpha < 1.0 {
            let [r, g, b] = self.rounded();
            let sep = if compress { "," } else { ", " };
            return format!(
                "rgba({r}{sep}{g}{sep}{b}{sep}{})",
                super::dimension::format_number(alpha, compress)
            );
        }

        let hex = self.to_hex();
        if compress {
            let bytes = hex.as_bytes();
            if bytes[1] == bytes[2] && bytes[3] == bytes[4] && bytes[5] == bytes[6] {
                return format!(
                    "#{}{}{}",
                    bytes[1] as char, bytes[3] as char, bytes[5] as char
                );
            }
        }
        hex
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css(false))
    }
}

/// CSS color keywords.
static NAMED_COLORS: phf::Map<&'static str, [u8; 3]> = phf_map! {
    "aliceblue" => [240, 248, 255],
    "antiquewhite" => [250, 235, 215],
    "aqua" => [0, 255, 255],
    "aquamarine" => [127, 255, 212],
    "azure" => [240, 255, 255],
    "beige" => [245, 245, 220],
    "bisque" => [255, 228, 196],
    "black" => [0, 0, 0],
    "blanchedalmond" => [255, 235, 205],
    "blue" => [0, 0, 255],
    "blueviolet" => [138, 43, 226],
    "brown" => [165, 42, 42],
    "burlywood" => [222, 184, 135],
    "cadetblue" => [95, 158, 160],
    "chartreuse" => [127, 255, 0],
    "chocolate" => [210, 105, 30],
    "coral" => [255, 127, 80],
    "cornflowerblue" => [100, 149, 237],
    "cornsilk" => [255, 248, 220],
    "crimson" => [220, 20, 60],
    "cyan" => [0, 255, 255],
    "darkblue" => [0, 0, 139],
    "darkcyan" => [0, 139, 139],
    "darkgoldenrod" => [184, 134, 11],
    "darkgray" => [169, 169, 169],
    "darkgrey" => [169, 169, 169],
    "darkgreen" => [0, 100, 0],
    "darkkhaki" => [189, 183, 107],
    "darkmagenta" => [139, 0, 139],
    "darkolivegreen" => [85, 107, 47],
    "darkorange" => [255, 140, 0],
    "darkorchid" => [153, 50, 204],
    "darkred" => [139, 0, 0],
    "darksalmon" => [233, 150, 122],
    "darkseagreen" => [143, 188, 143],
    "darkslateblue" => [72, 61, 139],
    "darkslategray" => [47, 79, 79],
    "darkslategrey" => [47, 79, 79],
    "darkturquoise" => [0, 206, 209],
    "darkviolet" => [148, 0, 211],
    "deeppink" => [255, 20, 147],
    "deepskyblue" => [0, 191, 255],
    "dimgray" => [105, 105, 105],
    "dimgrey" => [105, 105, 105],
    "dodgerblue" => [30, 144, 255],
    "firebrick" => [178, 34, 34],
    "floralwhite" => [255, 250, 240],
    "forestgreen" => [34, 139, 34],
    "fuchsia" => [255, 0, 255],
    "gainsboro" => [220, 220, 220],
    "ghostwhite" => [248, 248, 255],
    "gold" => [255, 215, 0],
    "goldenrod" => [218, 165, 32],
    "gray" => [128, 128, 128],
    "grey" => [128, 128, 128],
    "green" => [0, 128, 0],
    "greenyellow" => [173, 255, 47],
    "honeydew" => [240, 255, 240],
    "hotpink" => [255, 105, 180],
    "indianred" => [205, 92, 92],
    "indigo" => [75, 0, 130],
    "ivory" => [255, 255, 240],
    "khaki" => [240, 230, 140],
    "lavender" => [230, 230, 250],
    "lavenderblush" => [255, 240, 245],
    "lawngreen" => [124, 252, 0],
    "lemonchiffon" => [255, 250, 205],
    "lightblue" => [173, 216, 230],
    "lightcoral" => [240, 128, 128],
    "lightcyan" => [224, 255, 255],
    "lightgoldenrodyellow" => [250, 250, 210],
    "lightgray" => [211, 211, 211],
    "lightgrey" => [211, 211, 211],
    "lightgreen" => [144, 238, 144],
    "lightpink" => [255, 182, 193],
    "lightsalmon" => [255, 160, 122],
    "lightseagreen" => [32, 178, 170],
    "lightskyblue" => [135, 206, 250],
    "lightslategray" => [119, 136, 153],
    "lightslategrey" => [119, 136, 153],
    "lightsteelblue" => [176, 196, 222],
    "lightyellow" => [255, 255, 224],
    "lime" => [0, 255, 0],
    "limegreen" => [50, 205, 50],
    "linen" => [250, 240, 230],
    "magenta" => [255, 0, 255],
    "maroon" => [128, 0, 0],
    "mediumaquamarine" => [102, 205, 170],
    "mediumblue" => [0, 0, 205],
    "mediumorchid" => [186, 85, 211],
    "mediumpurple" => [147, 112, 219],
    "mediumseagreen" => [60, 179, 113],
    "mediumslateblue" => [123, 104, 238],
    "mediumspringgreen" => [0, 250, 154],
    "mediumturquoise" => [72, 209, 204],
    "mediumvioletred" => [199, 21, 133],
    "midnightblue" => [25, 25, 112],
    "mintcream" => [245, 255, 250],
    "mistyrose" => [255, 228, 225],
    "moccasin" => [255, 228, 181],
    "navajowhite" => [255, 222, 173],
    "navy" => [0, 0, 128],
    "oldlace" => [253, 245, 230],
    "olive" => [128, 128, 0],
    "olivedrab" => [107, 142, 35],
    "orange" => [255, 165, 0],
    "orangered" => [255, 69, 0],
    "orchid" => [218, 112, 214],
    "palegoldenrod" => [238, 232, 170],
    "palegreen" => [152, 251, 152],
    "paleturquoise" => [175, 238, 238],
    "palevioletred" => [219, 112, 147],
    "papayawhip" => [255, 239, 213],
    "peachpuff" => [255, 218, 185],
    "peru" => [205, 133, 63],
    "pink" => [255, 192, 203],
    "plum" => [221, 160, 221],
    "powderblue" => [176, 224, 230],
    "purple" => [128, 0, 128],
    "rebeccapurple" => [102, 51, 153],
    "red" => [255, 0, 0],
    "rosybrown" => [188, 143, 143],
    "royalblue" => [65, 105, 225],
    "saddlebrown" => [139, 69, 19],
    "salmon" => [250, 128, 114],
    "sandybrown" => [244, 164, 96],
    "seagreen" => [46, 139, 87],
    "seashell" => [255, 245, 238],
    "sienna" => [160, 82, 45],
    "silver" => [192, 192, 192],
    "skyblue" => [135, 206, 235],
    "slateblue" => [106, 90, 205],
    "slategray" => [112, 128, 144],
    "slategrey" => [112, 128, 144],
    "snow" => [255, 250, 250],
    "springgreen" => [0, 255, 127],
    "steelblue" => [70, 130, 180],
    "tan" => [210, 180, 140],
    "teal" => [0, 128, 128],
    "thistle" => [216, 191, 216],
    "tomato" => [255, 99, 71],
    "turquoise" => [64, 224, 208],
    "violet" => [238, 130, 238],
    "wheat" => [245, 222, 179],
    "white" => [255, 255, 255],
    "whitesmoke" => [245, 245, 245],
    "yellow" => [255, 255, 0],
    "yellowgreen" => [154, 205, 50],
};

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== PARSING ====================

    #[test]
    fn test_hex_3_digit() {
        assert_eq!(Color::parse("#f00").unwrap(), Color::rgb(255.0, 0.0, 0.0));
        assert_eq!(
            Color::parse("#abc").unwrap(),
            Color::rgb(170.0, 187.0, 204.0)
        );
    }

    #[test]
    fn test_hex_4_and_8_digit_alpha() {
        let color = Color::parse("#f008").unwrap();
        assert!((color.alpha - 136.0 / 255.0).abs() < 1e-9);
        let color = Color::parse("#ff000080").unwrap();
        assert!((color.alpha - 128.0 / 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_hex_case_insensitive_keeps_spelling() {
        let color = Color::parse("#FFF").unwrap();
        assert_eq!(color, Color::white());
        assert_eq!(color.to_css(false), "#FFF");
    }

    #[test]
    fn test_named_colors() {
        assert_eq!(Color::parse("coral").unwrap(), Color::rgb(255.0, 127.0, 80.0));
        assert_eq!(Color::from_keyword("RED"), Some(Color::rgb(255.0, 0.0, 0.0)));
        assert_eq!(Color::from_keyword("transparent").map(|c| c.alpha), Some(0.0));
        assert!(Color::parse("notacolor").is_err());
        assert!(Color::parse("").is_err());
        assert!(Color::parse("#12345").is_err());
    }

    // ==================== OUTPUT ====================

    #[test]
    fn test_computed_output() {
        assert_eq!(Color::rgb(17.0, 34.0, 51.0).to_css(false), "#112233");
        assert_eq!(Color::rgb(17.0, 34.0, 51.0).to_css(true), "#123");
        assert_eq!(Color::rgb(17.0, 34.0, 52.0).to_css(true), "#112234");
        assert_eq!(
            Color::rgba(255.0, 0.0, 0.0, 0.5).to_css(false),
            "rgba(255, 0, 0, 0.5)"
        );
        assert_eq!(
            Color::rgba(255.0, 0.0, 0.0, 0.5).to_css(true),
            "rgba(255,0,0,.5)"
        );
    }

    #[test]
    fn test_channels_clamp_on_output() {
        assert_eq!(Color::rgb(300.0, -5.0, 127.6).to_css(false), "#ff0080");
    }

    // ==================== HSL / HSV ====================

    #[test]
    fn test_hsl_roundtrip() {
        let original = Color::rgb(100.0, 150.0, 200.0);
        let (h, s, l) = original.to_hsl();
        let roundtrip = Color::from_hsl(h, s, l, 1.0);
        assert_eq!(original.rounded(), roundtrip.rounded());
    }

    #[test]
    fn test_hsl_grayscale() {
        let (h, s, l) = Color::rgb(128.0, 128.0, 128.0).to_hsl();
        assert_eq!(h, 0.0);
        assert_eq!(s, 0.0);
        assert!((l - 128.0 / 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_hsv_roundtrip() {
        let original = Color::rgb(10.0, 200.0, 90.0);
        let (h, s, v) = original.to_hsv();
        assert_eq!(Color::from_hsv(h, s, v, 1.0).rounded(), original.rounded());
    }

    #[test]
    fn test_luma() {
        assert!((Color::white().luma() - 1.0).abs() < 1e-9);
        assert_eq!(Color::black().luma(), 0.0);
    }
}
