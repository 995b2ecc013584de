/// The maximum value of an RGB LED component
pub const MAX_RGB: u8 = 127;

/// How a pad light is displayed.
///
/// The discriminants are the MIDI status bytes the Launchpad X uses when a light is set with a
/// single short message (channel 1, 2 and 3 of note-on, and note-off for "off").
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum LightEffect {
    Off = 0x80,
    /// A straight consistent light
    #[default]
    Static = 0x90,
    /// On->Off->On->Off->...
    Flash = 0x91,
    /// A smooth pulse
    Pulse = 0x92,
}

impl LightEffect {
    pub fn status_byte(self) -> u8 {
        self as u8
    }
}

/// A color from the device palette. The Launchpad X palette has 128 entries; see the
/// "Launchpad X Programmers Reference Manual" for the full table.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PaletteColor {
    pub(crate) id: u8,
}

impl PaletteColor {
    pub const BLACK: PaletteColor = Self { id: 0 };
    pub const DARK_GRAY: PaletteColor = Self { id: 1 };
    pub const LIGHT_GRAY: PaletteColor = Self { id: 2 };
    pub const WHITE: PaletteColor = Self { id: 3 };
    pub const LIGHT_RED: PaletteColor = Self { id: 4 };
    pub const RED: PaletteColor = Self { id: 5 };
    pub const ORANGE: PaletteColor = Self { id: 9 };
    pub const YELLOW: PaletteColor = Self { id: 13 };
    pub const LIME_GREEN: PaletteColor = Self { id: 17 };
    pub const GREEN: PaletteColor = Self { id: 21 };
    pub const SLIGHTLY_LIGHT_GREEN: PaletteColor = Self { id: 29 };
    pub const LIGHT_BLUE: PaletteColor = Self { id: 37 };
    pub const BLUE: PaletteColor = Self { id: 45 };
    pub const PURPLE: PaletteColor = Self { id: 49 };
    pub const MAGENTA: PaletteColor = Self { id: 53 };
    pub const PINK: PaletteColor = Self { id: 57 };
    pub const BROWN: PaletteColor = Self { id: 61 };
    pub const CYAN: PaletteColor = Self { id: 90 };

    /// Named palette entries with their approximate appearance on the device
    const REFERENCE: [(PaletteColor, (u8, u8, u8)); 18] = [
        (Self::BLACK, (0, 0, 0)),
        (Self::DARK_GRAY, (30, 30, 30)),
        (Self::LIGHT_GRAY, (75, 75, 75)),
        (Self::WHITE, (127, 127, 127)),
        (Self::LIGHT_RED, (127, 60, 60)),
        (Self::RED, (127, 0, 0)),
        (Self::ORANGE, (127, 60, 0)),
        (Self::YELLOW, (127, 127, 0)),
        (Self::LIME_GREEN, (70, 127, 0)),
        (Self::GREEN, (0, 127, 0)),
        (Self::SLIGHTLY_LIGHT_GREEN, (0, 127, 70)),
        (Self::LIGHT_BLUE, (0, 80, 127)),
        (Self::BLUE, (0, 0, 127)),
        (Self::PURPLE, (60, 0, 127)),
        (Self::MAGENTA, (127, 0, 127)),
        (Self::PINK, (127, 0, 60)),
        (Self::BROWN, (70, 35, 10)),
        (Self::CYAN, (0, 127, 127)),
    ];

    /// # Panics
    ///
    /// If `id` is above 127.
    pub fn new(id: u8) -> Self {
        let self_ = Self { id };
        assert!(self_.is_valid());
        self_
    }

    pub fn is_valid(&self) -> bool {
        self.id <= 127
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    /// Find the named palette entry closest to an RGB color (squared euclidean distance).
    pub fn approximate(color: RgbColor) -> Self {
        let distance = |(r, g, b): (u8, u8, u8)| {
            let d = |a: u8, b: u8| (a as i32 - b as i32).pow(2);
            d(r, color.r) + d(g, color.g) + d(b, color.b)
        };
        Self::REFERENCE
            .iter()
            .min_by_key(|(_, rgb)| distance(*rgb))
            .map(|(palette, _)| *palette)
            .unwrap_or(Self::WHITE)
    }
}

/// Ids above 127 are clamped to 127. Use [`PaletteColor::new`] to have them rejected.
impl From<u8> for PaletteColor {
    fn from(id: u8) -> Self {
        Self { id: id.min(127) }
    }
}

/// An RGB color. Each component may only go up to [`MAX_RGB`].
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RgbColor {
    r: u8,
    g: u8,
    b: u8,
}

impl RgbColor {
    pub const BLACK: RgbColor = Self { r: 0, g: 0, b: 0 };
    pub const WHITE: RgbColor = Self {
        r: MAX_RGB,
        g: MAX_RGB,
        b: MAX_RGB,
    };

    /// # Panics
    ///
    /// If any component is above [`MAX_RGB`].
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        let self_ = Self { r, g, b };
        assert!(self_.is_valid());
        self_
    }

    /// Build a color from signed components. The sign is dropped and the magnitude capped at
    /// [`MAX_RGB`], so `-20` is stored as `20`.
    pub fn from_signed(r: i8, g: i8, b: i8) -> Self {
        let normalize = |c: i8| c.unsigned_abs().min(MAX_RGB);
        Self {
            r: normalize(r),
            g: normalize(g),
            b: normalize(b),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.r <= MAX_RGB && self.g <= MAX_RGB && self.b <= MAX_RGB
    }

    pub fn red(&self) -> u8 {
        self.r
    }
    pub fn green(&self) -> u8 {
        self.g
    }
    pub fn blue(&self) -> u8 {
        self.b
    }

    /// The complementary color, `MAX_RGB - c` per component
    pub fn inverted(&self) -> Self {
        Self {
            r: MAX_RGB - self.r,
            g: MAX_RGB - self.g,
            b: MAX_RGB - self.b,
        }
    }
}

/// The desired state of one pad light.
///
/// `color` is the palette color used by the flash and pulse effects. When it's unset, the
/// palette entry closest to `rgb` is used instead; see [`Light::palette_color`].
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Light {
    pub effect: LightEffect,
    pub color: Option<PaletteColor>,
    rgb: RgbColor,
    /// While set, the render loop leaves this light alone, so whatever was last written to the
    /// device (or drawn by someone else) stays visible.
    pub display_locked: bool,
}

impl Light {
    pub fn new(effect: LightEffect, rgb: RgbColor) -> Self {
        Self {
            effect,
            rgb,
            ..Self::default()
        }
    }

    pub fn rgb(&self) -> RgbColor {
        self.rgb
    }

    /// Set the RGB value. Negative components are stored as their magnitude.
    pub fn set_rgb(&mut self, r: i8, g: i8, b: i8) {
        self.rgb = RgbColor::from_signed(r, g, b);
    }

    pub fn set_rgb_color(&mut self, rgb: RgbColor) {
        // RgbColor fields are private and every constructor keeps them in range
        self.rgb = rgb;
    }

    pub fn palette_color(&self) -> PaletteColor {
        self.color
            .unwrap_or_else(|| PaletteColor::approximate(self.rgb))
    }

    pub fn toggle_display_lock(&mut self) {
        self.display_locked = !self.display_locked;
    }

    pub fn lock_display(&mut self) {
        self.display_locked = true;
    }

    pub fn unlock_display(&mut self) {
        self.display_locked = false;
    }

    /// Swap the RGB value for its complement
    pub fn invert(&mut self) {
        self.rgb = self.rgb.inverted();
    }

    /// Swap between static and pulsing; other effects are left as they are.
    pub fn toggle_pulse(&mut self) {
        self.effect = match self.effect {
            LightEffect::Static => LightEffect::Pulse,
            LightEffect::Pulse => LightEffect::Static,
            other => other,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_components_are_stored_as_magnitude() {
        let mut light = Light::default();
        light.set_rgb(-20, 64, -128);
        assert_eq!(light.rgb(), RgbColor::new(20, 64, 127));
        // reading never negates anything back
        assert_eq!(light.rgb().red(), 20);
    }

    #[test]
    fn palette_ids_from_u8_are_clamped() {
        assert_eq!(PaletteColor::from(5).id(), 5);
        assert_eq!(PaletteColor::from(127).id(), 127);
        assert_eq!(PaletteColor::from(200).id(), 127);
        assert!(PaletteColor::from(u8::MAX).is_valid());
    }

    #[test]
    fn display_lock_toggles() {
        let mut light = Light::default();
        light.toggle_display_lock();
        assert!(light.display_locked);
        light.toggle_display_lock();
        assert!(!light.display_locked);
        light.lock_display();
        light.lock_display();
        assert!(light.display_locked);
        light.unlock_display();
        assert!(!light.display_locked);
    }

    #[test]
    fn explicit_palette_color_wins_over_approximation() {
        let mut light = Light::new(LightEffect::Pulse, RgbColor::new(127, 0, 0));
        assert_eq!(light.palette_color(), PaletteColor::RED);
        light.color = Some(PaletteColor::CYAN);
        assert_eq!(light.palette_color(), PaletteColor::CYAN);
    }

    #[test]
    fn approximation_picks_nearest_entry() {
        assert_eq!(
            PaletteColor::approximate(RgbColor::new(0, 0, 0)),
            PaletteColor::BLACK
        );
        assert_eq!(
            PaletteColor::approximate(RgbColor::new(120, 120, 5)),
            PaletteColor::YELLOW
        );
        assert_eq!(
            PaletteColor::approximate(RgbColor::new(5, 10, 120)),
            PaletteColor::BLUE
        );
    }

    #[test]
    fn invert_and_pulse_toggle() {
        let mut light = Light::new(LightEffect::Static, RgbColor::new(127, 0, 27));
        light.invert();
        assert_eq!(light.rgb(), RgbColor::new(0, 127, 100));
        light.toggle_pulse();
        assert_eq!(light.effect, LightEffect::Pulse);
        light.toggle_pulse();
        assert_eq!(light.effect, LightEffect::Static);
        light.effect = LightEffect::Off;
        light.toggle_pulse();
        assert_eq!(light.effect, LightEffect::Off);
    }
}
