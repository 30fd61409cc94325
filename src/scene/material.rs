//! Physically based bubble material and the scene's material table

/// Shading coefficients shared by every bubble
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalMaterial {
    pub roughness: f32,
    pub metalness: f32,
    /// Strength of the thin-film layer, 0..1
    pub iridescence: f32,
    /// Refractive index of the thin film
    pub iridescence_ior: f32,
    /// Film thickness range in nanometers; the upper bound is used when no
    /// thickness texture is present
    pub iridescence_thickness_range: [f32; 2],
    pub transmission: f32,
    /// Refractive index of the base dielectric
    pub ior: f32,
    /// Volume thickness used to bend transmitted rays
    pub thickness: f32,
}

impl Default for PhysicalMaterial {
    fn default() -> Self {
        Self {
            roughness: 1.0,
            metalness: 0.0,
            iridescence: 0.0,
            iridescence_ior: 1.3,
            iridescence_thickness_range: [100.0, 400.0],
            transmission: 0.0,
            ior: 1.5,
            thickness: 0.0,
        }
    }
}

impl PhysicalMaterial {
    /// Clear, fully transmissive and fully iridescent soap film
    pub fn bubble() -> Self {
        Self {
            roughness: 0.0,
            metalness: 0.0,
            iridescence: 1.0,
            iridescence_ior: 1.0,
            iridescence_thickness_range: [100.0, 800.0],
            transmission: 1.0,
            ior: 1.5,
            thickness: 0.5,
        }
    }

    /// Film thickness in nanometers used for shading
    pub fn film_thickness(&self) -> f32 {
        self.iridescence_thickness_range[1]
    }
}

/// Handle into a [`MaterialTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(usize);

impl MaterialId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Owned storage for materials; instances refer to entries by id
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    materials: Vec<PhysicalMaterial>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, material: PhysicalMaterial) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn get(&self, id: MaterialId) -> Option<&PhysicalMaterial> {
        self.materials.get(id.0)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut PhysicalMaterial> {
        self.materials.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
