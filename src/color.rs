use palette::Srgb;
use plotters::style::RGBColor;

// ---------------------------------------------------------------------------
// Categorical palette
// ---------------------------------------------------------------------------

/// The ten "tab10" category colours, in their conventional order.
pub const TAB10: [Srgb<u8>; 10] = [
    Srgb::new(0x1f, 0x77, 0xb4),
    Srgb::new(0xff, 0x7f, 0x0e),
    Srgb::new(0x2c, 0xa0, 0x2c),
    Srgb::new(0xd6, 0x27, 0x28),
    Srgb::new(0x94, 0x67, 0xbd),
    Srgb::new(0x8c, 0x56, 0x4b),
    Srgb::new(0xe3, 0x77, 0xc2),
    Srgb::new(0x7f, 0x7f, 0x7f),
    Srgb::new(0xbc, 0xbd, 0x22),
    Srgb::new(0x17, 0xbe, 0xcf),
];

/// Colour of the `index`-th population, wrapping around the palette.
pub fn population_color(index: usize) -> RGBColor {
    to_rgb(TAB10[index % TAB10.len()])
}

fn to_rgb(c: Srgb<u8>) -> RGBColor {
    RGBColor(c.red, c.green, c.blue)
}

// ---------------------------------------------------------------------------
// ColorMap: population label → colour
// ---------------------------------------------------------------------------

/// Assigns palette colours to population labels in the order given.
#[derive(Debug, Clone)]
pub struct ColorMap {
    entries: Vec<(String, RGBColor)>,
}

impl ColorMap {
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let entries = labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| (label.to_string(), population_color(i)))
            .collect();
        ColorMap { entries }
    }

    /// Legend entries (label → colour) in population order.
    pub fn legend_entries(&self) -> &[(String, RGBColor)] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colors_are_distinct() {
        for i in 0..TAB10.len() {
            for j in (i + 1)..TAB10.len() {
                assert_ne!(TAB10[i], TAB10[j]);
            }
        }
    }

    #[test]
    fn colors_wrap_after_ten_populations() {
        assert_eq!(population_color(0), RGBColor(0x1f, 0x77, 0xb4));
        assert_eq!(population_color(10), population_color(0));
        assert_eq!(population_color(13), population_color(3));
    }

    #[test]
    fn color_map_follows_insertion_order() {
        let map = ColorMap::new(["D", "A", "C"]);
        let entries = map.legend_entries();
        let labels: Vec<&str> = entries.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, ["D", "A", "C"]);
        assert_eq!(entries[0].1, population_color(0));
        assert_eq!(entries[2].1, population_color(2));
    }
}
