/// Linear RGB colour, each channel in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Colour3 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Colour3 {
    pub const RED: Colour3 = Colour3::new(1.0, 0.0, 0.0);
    pub const BLUE: Colour3 = Colour3::new(0.0, 0.0, 1.0);
    pub const WHITE: Colour3 = Colour3::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn grey(v: f32) -> Self {
        Self::new(v, v, v)
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[f32; 3]> for Colour3 {
    fn from([r, g, b]: [f32; 3]) -> Self {
        Self::new(r, g, b)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub(crate) usize);

/// Flat diffuse material. Several meshes may share one.
#[derive(Clone, Debug, PartialEq)]
pub struct StandardMaterial {
    pub name: String,
    pub diffuse: Colour3,
}

impl StandardMaterial {
    pub fn new(name: impl Into<String>, diffuse: Colour3) -> Self {
        Self {
            name: name.into(),
            diffuse,
        }
    }
}
