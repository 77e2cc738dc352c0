use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{AudiogramError, AudiogramResult};
use serde::de::Error as _;

/// Straight (non-premultiplied) RGBA8 color parsed from a hex string.
///
/// Accepts `#RRGGBB` and `#RRGGBBAA`, case-insensitive, leading `#` optional. Serializes back
/// to lowercase hex with the alpha suffix only when not fully opaque.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Color = Color::from_rgb8(255, 255, 255);
    /// Opaque black.
    pub const BLACK: Color = Color::from_rgb8(0, 0, 0);

    /// Construct an opaque color from RGB channels.
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Construct a color from straight RGBA channels.
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a hex color string.
    pub fn parse_hex(s: &str) -> AudiogramResult<Self> {
        let t = s.trim();
        let t = t.strip_prefix('#').unwrap_or(t);
        let channel = |at: usize| -> AudiogramResult<u8> {
            u8::from_str_radix(&t[at..at + 2], 16)
                .map_err(|_| AudiogramError::validation(format!("invalid hex color '{s}'")))
        };
        if !t.is_ascii() {
            return Err(AudiogramError::validation(format!(
                "invalid hex color '{s}'"
            )));
        }
        match t.len() {
            6 => Ok(Self {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: 255,
            }),
            8 => Ok(Self {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: channel(6)?,
            }),
            _ => Err(AudiogramError::validation(format!(
                "hex color '{s}' must have 6 or 8 hex digits"
            ))),
        }
    }

    /// Render back to a hex string (`#rrggbb`, or `#rrggbbaa` when translucent).
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Scale the alpha channel by `factor` in `[0,1]`.
    pub fn with_alpha_scaled(self, factor: f64) -> Self {
        let f = factor.clamp(0.0, 1.0);
        Self {
            a: ((self.a as f64) * f).round() as u8,
            ..self
        }
    }

    /// Convert to premultiplied RGBA8.
    pub fn to_premul(self) -> Rgba8Premul {
        Rgba8Premul::from_straight_rgba(self.r, self.g, self.b, self.a)
    }
}

impl serde::Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Color::parse_hex(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_six_digit_hex_case_insensitive() {
        assert_eq!(Color::parse_hex("#6366f1").unwrap(), Color::from_rgb8(0x63, 0x66, 0xf1));
        assert_eq!(Color::parse_hex("6366F1").unwrap(), Color::from_rgb8(0x63, 0x66, 0xf1));
        assert_eq!(Color::parse_hex("#FFFFFF").unwrap(), Color::WHITE);
    }

    #[test]
    fn parses_eight_digit_hex_with_alpha() {
        let c = Color::parse_hex("#00000040").unwrap();
        assert_eq!(c, Color::from_rgba8(0, 0, 0, 0x40));
    }

    #[test]
    fn rejects_junk() {
        assert!(Color::parse_hex("#fff").is_err());
        assert!(Color::parse_hex("#gggggg").is_err());
        assert!(Color::parse_hex("").is_err());
        assert!(Color::parse_hex("#12345").is_err());
        assert!(Color::parse_hex("#ffffff0").is_err());
    }

    #[test]
    fn serde_round_trips_hex_strings() {
        let c: Color = serde_json::from_str("\"#0a0A0a\"").unwrap();
        assert_eq!(c, Color::from_rgb8(0x0a, 0x0a, 0x0a));
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"#0a0a0a\"");

        let t: Color = serde_json::from_str("\"#ffffff40\"").unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"#ffffff40\"");

        assert!(serde_json::from_str::<Color>("\"nope\"").is_err());
    }

    #[test]
    fn alpha_scaling_clamps() {
        let c = Color::WHITE.with_alpha_scaled(0.25);
        assert_eq!(c.a, 64);
        assert_eq!(Color::WHITE.with_alpha_scaled(2.0).a, 255);
        assert_eq!(Color::WHITE.with_alpha_scaled(-1.0).a, 0);
    }

    #[test]
    fn premul_conversion_multiplies_channels() {
        let p = Color::from_rgba8(255, 128, 0, 128).to_premul();
        assert_eq!((p.r, p.g, p.b, p.a), (128, 64, 0, 128));
    }
}
