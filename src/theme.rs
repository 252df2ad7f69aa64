//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::Palette;

/// Number of fruit colours; matches the largest supported fruit set.
pub const FRUIT_COLORS: usize = 6;

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const ONEDARK_FRUIT: [Color; FRUIT_COLORS] = [
    rgb(0x98C379), // green
    rgb(0xE5C07B), // yellow
    rgb(0xE06C75), // red
    rgb(0x61AFEF), // blue
    rgb(0xC678DD), // magenta
    rgb(0x56B6C2), // cyan
];

const HIGH_CONTRAST_FRUIT: [Color; FRUIT_COLORS] = [
    rgb(0x00FF00),
    rgb(0xFFFF00),
    rgb(0xFF0000),
    rgb(0x0088FF),
    rgb(0xFF00FF),
    rgb(0x00FFFF),
];

// Avoids leaning on red/green alone.
const COLORBLIND_FRUIT: [Color; FRUIT_COLORS] = [
    rgb(0x0077BB),
    rgb(0xEE7733),
    rgb(0x009988),
    rgb(0xCC3311),
    rgb(0xEE3377),
    rgb(0xBBBB00),
];

/// Fruit palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Fruit colours by fruit index.
    pub fruit: [Color; FRUIT_COLORS],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, moves).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Locked power-ups and hints.
    pub inactive_fg: Color,
    /// Cursor cell background.
    pub selected_bg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// One Dark values from onedark.theme.
    pub const fn onedark_default() -> Self {
        Self {
            fruit: ONEDARK_FRUIT,
            bg: rgb(0x31353F),
            div_line: rgb(0x3F444F),
            main_fg: rgb(0xABB2BF),
            title: rgb(0xE5C07B),
            inactive_fg: rgb(0x5C6370),
            selected_bg: rgb(0x4B5263),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file is missing.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override fruit colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => self.fruit = HIGH_CONTRAST_FRUIT,
            Palette::Colorblind => self.fruit = COLORBLIND_FRUIT,
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let base = Self::onedark_default();
        // Keys match onedark.theme.
        Self {
            fruit: [
                get("mem_box").or_else(|| get("cpu_start")).unwrap_or(base.fruit[0]),
                get("title").or_else(|| get("cpu_mid")).unwrap_or(base.fruit[1]),
                get("cpu_end").or_else(|| get("temp_end")).unwrap_or(base.fruit[2]),
                get("cpu_box").unwrap_or(base.fruit[3]),
                get("net_box").unwrap_or(base.fruit[4]),
                get("hi_fg").or_else(|| get("proc_misc")).unwrap_or(base.fruit[5]),
            ],
            bg: get("meter_bg").unwrap_or(base.bg),
            div_line: get("div_line").unwrap_or(base.div_line),
            main_fg: get("main_fg").unwrap_or(base.main_fg),
            title: get("title").unwrap_or(base.title),
            inactive_fg: get("inactive_fg").unwrap_or(base.inactive_fg),
            selected_bg: get("selected_bg").unwrap_or(base.selected_bg),
        }
    }

    /// Colour of fruit `index`.
    #[inline]
    pub fn fruit_color(&self, index: usize) -> Color {
        self.fruit[index % FRUIT_COLORS]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(eq) = rest.find('=') {
            let value = rest[eq + 1..]
                .trim()
                .trim_matches('"')
                .trim_matches('\'')
                .to_string();
            if !value.is_empty() {
                map.insert(key.to_string(), value);
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GG0000").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_theme_file_overrides_fruit() {
        let map = parse_theme_file("theme[cpu_box]='#010203'\ntheme[main_fg]=\"#FFF\"");
        let theme = Theme::from_map(&map);
        assert_eq!(theme.fruit[3], Color::Rgb(1, 2, 3));
        assert_eq!(theme.main_fg, Color::Rgb(255, 255, 255));
        assert_eq!(theme.fruit[0], ONEDARK_FRUIT[0]);
    }

    #[test]
    fn test_palette_swaps_fruit_colours() {
        let mut theme = Theme::default();
        theme.apply_palette(Palette::Colorblind);
        assert_eq!(theme.fruit_color(0), rgb(0x0077BB));
        assert_eq!(theme.fruit_color(FRUIT_COLORS), theme.fruit_color(0));
    }
}
