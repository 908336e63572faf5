/// A colour, expressed in RGB, CMYK or grey colour spaces
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Colour {
    /// DeviceRGB colour; r, g, b, range from 0.0 to 1.0
    RGB { r: f32, g: f32, b: f32 },
    /// DeviceCMYK colour; c, m, y, and k range from 0.0 to 1.0
    CMYK { c: f32, m: f32, y: f32, k: f32 },
    /// DeviceGray colour; g ranges from 0.0 to 1.0
    Grey { g: f32 },
}

impl Colour {
    /// Create a new colour in the RGB space. r, g, and b range from 0.0 to 1.0
    pub fn new_rgb(r: f32, g: f32, b: f32) -> Colour {
        Colour::RGB { r, g, b }
    }

    /// Create a new colour in the RGB space. r, g, and b range from 0 to 255
    pub fn new_rgb_bytes(r: u8, g: u8, b: u8) -> Colour {
        Colour::RGB {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Create a new colour in the CMYK space. c, m, y, and k range from 0.0 to 1.0
    pub fn new_cmyk(c: f32, m: f32, y: f32, k: f32) -> Colour {
        Colour::CMYK { c, m, y, k }
    }

    /// Create a new colour in the Gray space, g ranges from 0.0 to 1.0
    pub fn new_grey(g: f32) -> Colour {
        Colour::Grey { g }
    }

    /// Pick the colour space from the number of components: one is grey, three
    /// are RGB and four are CMYK. Any other count is not a colour.
    pub fn from_components(components: &[f32]) -> Option<Colour> {
        match *components {
            [g] => Some(Colour::Grey { g }),
            [r, g, b] => Some(Colour::RGB { r, g, b }),
            [c, m, y, k] => Some(Colour::CMYK { c, m, y, k }),
            _ => None,
        }
    }

    /// Attach an alpha value, producing a [Paint]
    pub fn with_alpha(self, alpha: f32) -> Paint {
        Paint {
            colour: self,
            alpha: Some(alpha),
        }
    }
}

impl<T: Into<f32>> From<(T, T, T)> for Colour {
    fn from(c: (T, T, T)) -> Self {
        Colour::RGB {
            r: c.0.into(),
            g: c.1.into(),
            b: c.2.into(),
        }
    }
}

impl<T: Into<f32>> From<[T; 3]> for Colour {
    fn from(c: [T; 3]) -> Self {
        let [r, g, b] = c;
        Colour::RGB {
            r: r.into(),
            g: g.into(),
            b: b.into(),
        }
    }
}

impl<T: Into<f32>> From<(T, T, T, T)> for Colour {
    fn from(c: (T, T, T, T)) -> Self {
        Colour::CMYK {
            c: c.0.into(),
            m: c.1.into(),
            y: c.2.into(),
            k: c.3.into(),
        }
    }
}

impl<T: Into<f32>> From<[T; 4]> for Colour {
    fn from(c: [T; 4]) -> Self {
        let [c, m, y, k] = c;
        Colour::CMYK {
            c: c.into(),
            m: m.into(),
            y: y.into(),
            k: k.into(),
        }
    }
}

/// A colour as the layout engine hands it over: components plus an optional alpha.
///
/// Two paints are equal when their colours are equal component by component and
/// their alphas are equal, a missing alpha counting as `1.0`.
#[derive(Copy, Clone, Debug)]
pub struct Paint {
    pub colour: Colour,
    pub alpha: Option<f32>,
}

impl Paint {
    /// The alpha this paint asks for, `1.0` if unspecified
    pub fn alpha(&self) -> f32 {
        self.alpha.unwrap_or(1.0)
    }
}

impl PartialEq for Paint {
    fn eq(&self, other: &Self) -> bool {
        self.colour == other.colour && self.alpha() == other.alpha()
    }
}

impl From<Colour> for Paint {
    fn from(colour: Colour) -> Self {
        Paint {
            colour,
            alpha: None,
        }
    }
}

impl<T: Into<f32>> From<(T, T, T)> for Paint {
    fn from(c: (T, T, T)) -> Self {
        Colour::from(c).into()
    }
}

impl<T: Into<f32>> From<[T; 3]> for Paint {
    fn from(c: [T; 3]) -> Self {
        Colour::from(c).into()
    }
}

/// A list of pre-defined colour constants
pub mod colours {
    use super::*;

    pub const BLACK: Colour = Colour::Grey { g: 0.0 };
    pub const WHITE: Colour = Colour::Grey { g: 1.0 };
    pub const RED: Colour = Colour::RGB {
        r: 1.0,
        g: 0.0,
        b: 0.0,
    };
    pub const GREEN: Colour = Colour::RGB {
        r: 0.0,
        g: 1.0,
        b: 0.0,
    };
    pub const BLUE: Colour = Colour::RGB {
        r: 0.0,
        g: 0.0,
        b: 1.0,
    };
    pub const CYAN: Colour = Colour::CMYK {
        c: 1.0,
        m: 0.0,
        y: 0.0,
        k: 0.0,
    };
}
