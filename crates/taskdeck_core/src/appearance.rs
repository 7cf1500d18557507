//! Colour and font values plus the aggregation rules for inherited
//! appearance.
//!
//! # Responsibility
//! - Define the `Rgba` and `FontSpec` wire shapes.
//! - Mix several colours or fonts into one representative value.
//!
//! # Invariants
//! - Mixing an empty input yields `None`, never a fabricated default.
//! - Colour mixing averages each channel over the inputs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Families preferred when font mixing has to break a frequency tie.
const FAMILY_PRIORITY: &[&str] = &["Helvetica", "Arial", "Times New Roman", "Courier New"];

/// RGBA colour with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Rgba {
    pub fn opaque(red: u8, green: u8, blue: u8) -> Rgba {
        Rgba {
            red,
            green,
            blue,
            alpha: 255,
        }
    }
}

/// Font weight bucket used by majority-vote mixing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    Light,
    Normal,
    Bold,
}

/// Toolkit-independent font description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub point_size: u32,
    pub weight: FontWeight,
    pub italic: bool,
    pub underline: bool,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, point_size: u32) -> FontSpec {
        FontSpec {
            family: family.into(),
            point_size,
            weight: FontWeight::Normal,
            italic: false,
            underline: false,
        }
    }
}

/// Averages each channel over the given colours.
pub fn mix_colors(colors: &[Rgba]) -> Option<Rgba> {
    if colors.is_empty() {
        return None;
    }
    let count = colors.len() as u32;
    let channel = |pick: fn(&Rgba) -> u8| {
        (colors.iter().map(|color| pick(color) as u32).sum::<u32>() / count) as u8
    };
    Some(Rgba {
        red: channel(|c| c.red),
        green: channel(|c| c.green),
        blue: channel(|c| c.blue),
        alpha: channel(|c| c.alpha),
    })
}

/// Mixes fonts componentwise.
///
/// Point size is the arithmetic mean, the family is the most frequent one
/// (ties broken by the fixed priority list, then alphabetically), weight is
/// decided by majority with `Normal` winning ties, italic is set when any
/// input is italic, underline likewise.
pub fn mix_fonts(fonts: &[FontSpec]) -> Option<FontSpec> {
    if fonts.is_empty() {
        return None;
    }
    let point_size =
        (fonts.iter().map(|font| font.point_size).sum::<u32>() / fonts.len() as u32).max(1);
    Some(FontSpec {
        family: modal_family(fonts),
        point_size,
        weight: majority_weight(fonts),
        italic: fonts.iter().any(|font| font.italic),
        underline: fonts.iter().any(|font| font.underline),
    })
}

fn modal_family(fonts: &[FontSpec]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for font in fonts {
        *counts.entry(font.family.as_str()).or_default() += 1;
    }
    let best_count = counts.values().copied().max().unwrap_or(0);
    let mut tied: Vec<&str> = counts
        .into_iter()
        .filter(|(_, count)| *count == best_count)
        .map(|(family, _)| family)
        .collect();
    tied.sort_unstable();
    for preferred in FAMILY_PRIORITY {
        if tied.contains(preferred) {
            return (*preferred).to_string();
        }
    }
    tied.first().map(|family| (*family).to_string()).unwrap_or_default()
}

fn majority_weight(fonts: &[FontSpec]) -> FontWeight {
    let mut bold = 0usize;
    let mut light = 0usize;
    let mut normal = 0usize;
    for font in fonts {
        match font.weight {
            FontWeight::Bold => bold += 1,
            FontWeight::Light => light += 1,
            FontWeight::Normal => normal += 1,
        }
    }
    if bold > light && bold > normal {
        FontWeight::Bold
    } else if light > bold && light > normal {
        FontWeight::Light
    } else {
        FontWeight::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::{mix_colors, mix_fonts, FontSpec, FontWeight, Rgba};

    #[test]
    fn mix_colors_averages_channels() {
        let mixed = mix_colors(&[Rgba::opaque(0, 0, 0), Rgba::opaque(200, 100, 50)]).unwrap();
        assert_eq!(mixed, Rgba::opaque(100, 50, 25));
    }

    #[test]
    fn mix_of_nothing_is_none() {
        assert_eq!(mix_colors(&[]), None);
        assert_eq!(mix_fonts(&[]), None);
    }

    #[test]
    fn font_mixing_is_componentwise() {
        let mut bold = FontSpec::new("Helvetica", 10);
        bold.weight = FontWeight::Bold;
        bold.italic = true;
        let plain = FontSpec::new("Courier New", 14);
        let other = FontSpec::new("Helvetica", 12);

        let mixed = mix_fonts(&[bold, plain, other]).unwrap();
        assert_eq!(mixed.family, "Helvetica");
        assert_eq!(mixed.point_size, 12);
        assert_eq!(mixed.weight, FontWeight::Normal);
        assert!(mixed.italic);
        assert!(!mixed.underline);
    }
}
