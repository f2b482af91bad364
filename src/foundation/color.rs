use crate::foundation::core::Rgba8Premul;

/// Straight-alpha color with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(..)`, `rgba(..)` or `transparent`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("transparent") {
            return Ok(Self::rgba(0.0, 0.0, 0.0, 0.0));
        }
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = s.to_ascii_lowercase();
        if let Some(body) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
        {
            return parse_rgb_fn(body);
        }
        Err(format!("unsupported color \"{s}\""))
    }

    /// Parse, falling back to `fallback` for malformed input.
    pub fn parse_or(s: &str, fallback: Color) -> Self {
        match Self::parse(s) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(color = s, error = %e, "falling back to default color");
                fallback
            }
        }
    }

    /// Multiply alpha by `opacity` (clamped to `0..=1`).
    pub fn with_alpha_mul(self, opacity: f64) -> Self {
        let o = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Self {
            a: (self.a * o).clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn to_straight_u8(self) -> [u8; 4] {
        [to_u8(self.r), to_u8(self.g), to_u8(self.b), to_u8(self.a)]
    }

    pub fn to_rgba8_premul(self) -> Rgba8Premul {
        let [r, g, b, a] = self.to_straight_u8();
        Rgba8Premul::from_straight_rgba(r, g, b, a)
    }
}

fn to_u8(x: f64) -> u8 {
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn parse_hex(s: &str) -> Result<Color, String> {
    fn nibble(c: u8) -> Result<u8, String> {
        (c as char)
            .to_digit(16)
            .map(|v| v as u8)
            .ok_or_else(|| format!("invalid hex digit '{}'", c as char))
    }
    fn byte(pair: &[u8]) -> Result<u8, String> {
        Ok(nibble(pair[0])? * 16 + nibble(pair[1])?)
    }

    let b = s.as_bytes();
    let (r, g, bl, a) = match b.len() {
        3 | 4 => {
            let r = nibble(b[0])? * 17;
            let g = nibble(b[1])? * 17;
            let bl = nibble(b[2])? * 17;
            let a = if b.len() == 4 { nibble(b[3])? * 17 } else { 255 };
            (r, g, bl, a)
        }
        6 | 8 => {
            let r = byte(&b[0..2])?;
            let g = byte(&b[2..4])?;
            let bl = byte(&b[4..6])?;
            let a = if b.len() == 8 { byte(&b[6..8])? } else { 255 };
            (r, g, bl, a)
        }
        _ => {
            return Err("hex color must be #RGB, #RGBA, #RRGGBB or #RRGGBBAA".to_owned());
        }
    };

    Ok(Color::rgba(
        f64::from(r) / 255.0,
        f64::from(g) / 255.0,
        f64::from(bl) / 255.0,
        f64::from(a) / 255.0,
    ))
}

fn parse_rgb_fn(body: &str) -> Result<Color, String> {
    let body = body
        .strip_suffix(')')
        .ok_or_else(|| "missing closing parenthesis".to_owned())?;
    let parts = body
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>();
    if parts.len() != 3 && parts.len() != 4 {
        return Err("rgb() takes 3 or 4 components".to_owned());
    }

    let channel = |p: &str| -> Result<f64, String> {
        if let Some(pct) = p.strip_suffix('%') {
            let v: f64 = pct.parse().map_err(|_| format!("invalid channel \"{p}\""))?;
            return Ok((v / 100.0).clamp(0.0, 1.0));
        }
        let v: f64 = p.parse().map_err(|_| format!("invalid channel \"{p}\""))?;
        Ok((v / 255.0).clamp(0.0, 1.0))
    };
    let alpha = |p: &str| -> Result<f64, String> {
        if let Some(pct) = p.strip_suffix('%') {
            let v: f64 = pct.parse().map_err(|_| format!("invalid alpha \"{p}\""))?;
            return Ok((v / 100.0).clamp(0.0, 1.0));
        }
        let v: f64 = p.parse().map_err(|_| format!("invalid alpha \"{p}\""))?;
        Ok(v.clamp(0.0, 1.0))
    };

    let a = match parts.get(3) {
        Some(p) => alpha(p)?,
        None => 1.0,
    };
    Ok(Color::rgba(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        a,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/color.rs"]
mod tests;
