//! Colormaps for peak-map shading.
//!
//! Each palette is an evenly-spaced anchor table interpolated linearly per
//! channel. The color at `t = 0` doubles as the tile background, so empty
//! regions and the weakest signal share the bottom of the ramp.

use std::fmt;
use std::str::FromStr;

/// Palette applied to aggregated intensities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colormap {
    /// Blue through cyan and yellow to dark red; the traditional peak-map ramp
    #[default]
    Jet,
    /// Black through red and yellow to white
    Hot,
    /// Black through deep red and orange to pale yellow
    Fire,
    /// Perceptually uniform purple-green-yellow
    Viridis,
    /// Perceptually uniform blue-magenta-yellow
    Plasma,
    /// Perceptually uniform black-purple-orange-cream
    Inferno,
    /// Perceptually uniform black-purple-rose-cream
    Magma,
}

const JET: [(u8, u8, u8); 9] = [
    (0, 0, 128),
    (0, 0, 255),
    (0, 128, 255),
    (0, 255, 255),
    (128, 255, 128),
    (255, 255, 0),
    (255, 128, 0),
    (255, 0, 0),
    (128, 0, 0),
];

const HOT: [(u8, u8, u8); 5] = [
    (0, 0, 0),
    (175, 0, 0),
    (255, 90, 0),
    (255, 255, 4),
    (255, 255, 255),
];

const FIRE: [(u8, u8, u8); 5] = [
    (0, 0, 0),
    (120, 5, 1),
    (211, 66, 0),
    (255, 168, 40),
    (255, 255, 224),
];

const VIRIDIS: [(u8, u8, u8); 9] = [
    (68, 1, 84),
    (71, 44, 122),
    (59, 81, 139),
    (44, 113, 142),
    (33, 144, 141),
    (39, 173, 129),
    (92, 200, 99),
    (170, 220, 50),
    (253, 231, 37),
];

const PLASMA: [(u8, u8, u8); 5] = [
    (13, 8, 135),
    (126, 3, 168),
    (204, 71, 120),
    (248, 149, 64),
    (240, 249, 33),
];

const INFERNO: [(u8, u8, u8); 5] = [
    (0, 0, 4),
    (87, 16, 110),
    (188, 55, 84),
    (249, 142, 9),
    (252, 255, 164),
];

const MAGMA: [(u8, u8, u8); 5] = [
    (0, 0, 4),
    (81, 18, 124),
    (183, 55, 121),
    (254, 141, 97),
    (252, 253, 191),
];

impl Colormap {
    /// Every available palette, in display order
    pub const ALL: [Colormap; 7] = [
        Colormap::Jet,
        Colormap::Hot,
        Colormap::Fire,
        Colormap::Viridis,
        Colormap::Plasma,
        Colormap::Inferno,
        Colormap::Magma,
    ];

    /// Canonical lowercase name, as accepted by [`FromStr`]
    pub fn name(&self) -> &'static str {
        match self {
            Colormap::Jet => "jet",
            Colormap::Hot => "hot",
            Colormap::Fire => "fire",
            Colormap::Viridis => "viridis",
            Colormap::Plasma => "plasma",
            Colormap::Inferno => "inferno",
            Colormap::Magma => "magma",
        }
    }

    fn anchors(&self) -> &'static [(u8, u8, u8)] {
        match self {
            Colormap::Jet => &JET,
            Colormap::Hot => &HOT,
            Colormap::Fire => &FIRE,
            Colormap::Viridis => &VIRIDIS,
            Colormap::Plasma => &PLASMA,
            Colormap::Inferno => &INFERNO,
            Colormap::Magma => &MAGMA,
        }
    }

    /// Sample the ramp at `t`, clamped to [0, 1]; non-finite `t` maps to 0
    pub fn sample(&self, t: f64) -> [u8; 3] {
        let anchors = self.anchors();
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };

        let segments = (anchors.len() - 1) as f64;
        let x = t * segments;
        let i = x.floor() as usize;
        if i >= anchors.len() - 1 {
            let (r, g, b) = anchors[anchors.len() - 1];
            return [r, g, b];
        }
        let f = x - i as f64;
        let (r0, g0, b0) = anchors[i];
        let (r1, g1, b1) = anchors[i + 1];
        [
            (r0 as f64 + f * (r1 as f64 - r0 as f64)).round() as u8,
            (g0 as f64 + f * (g1 as f64 - g0 as f64)).round() as u8,
            (b0 as f64 + f * (b1 as f64 - b0 as f64)).round() as u8,
        ]
    }

    /// Background color for tiles rendered with this palette
    pub fn background(&self) -> [u8; 3] {
        self.sample(0.0)
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Colormap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jet" => Ok(Colormap::Jet),
            "hot" => Ok(Colormap::Hot),
            "fire" => Ok(Colormap::Fire),
            "viridis" => Ok(Colormap::Viridis),
            "plasma" => Ok(Colormap::Plasma),
            "inferno" => Ok(Colormap::Inferno),
            "magma" => Ok(Colormap::Magma),
            other => Err(format!(
                "Unknown colormap '{}' (expected one of: jet, hot, fire, viridis, plasma, inferno, magma)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jet_background_is_dark_navy() {
        assert_eq!(Colormap::Jet.background(), [0, 0, 128]);
    }

    #[test]
    fn test_viridis_endpoints() {
        assert_eq!(Colormap::Viridis.sample(0.0), [68, 1, 84]);
        assert_eq!(Colormap::Viridis.sample(1.0), [253, 231, 37]);
    }

    #[test]
    fn test_sample_interpolates_between_anchors() {
        // Halfway through the first hot segment: (0,0,0) -> (175,0,0)
        let mid = Colormap::Hot.sample(0.125);
        assert_eq!(mid, [88, 0, 0]);
    }

    #[test]
    fn test_sample_clamps_and_handles_nan() {
        assert_eq!(Colormap::Jet.sample(-0.5), Colormap::Jet.sample(0.0));
        assert_eq!(Colormap::Jet.sample(1.5), Colormap::Jet.sample(1.0));
        assert_eq!(Colormap::Jet.sample(f64::NAN), Colormap::Jet.sample(0.0));
    }

    #[test]
    fn test_parse_round_trip_all_names() {
        for cmap in Colormap::ALL {
            assert_eq!(cmap.name().parse::<Colormap>().unwrap(), cmap);
        }
        assert_eq!("VIRIDIS".parse::<Colormap>().unwrap(), Colormap::Viridis);
    }

    #[test]
    fn test_parse_unknown_names_the_choices() {
        let err = "turbo".parse::<Colormap>().unwrap_err();
        assert!(err.contains("turbo"));
        assert!(err.contains("jet"));
    }

    #[test]
    fn test_default_is_jet() {
        assert_eq!(Colormap::default(), Colormap::Jet);
    }
}
