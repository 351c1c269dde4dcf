use std::fmt;

/// An RGB colour packed as `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Colour(pub u32);

impl Colour {
    pub const NULL: Colour = Colour(0);
    pub const MAX_RGB: u32 = 0xFF_FFFF;

    pub fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Colour((red as u32) << 16 | (green as u32) << 8 | blue as u32)
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}
