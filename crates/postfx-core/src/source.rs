use glam::{Vec2, Vec3, Vec4};

use crate::raster::Image;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Produces the live frame the first pass reads.
pub trait FrameSource {
    /// Advance camera / interaction state to `elapsed` seconds.
    fn update(&mut self, _elapsed: f32) {}

    /// Fill `target` (already sized to the chain's buffers) with the current
    /// frame.
    fn render(&mut self, target: &mut Image);
}

/// Receives the chain's final image once per run.
pub trait DisplaySurface {
    fn present(&mut self, image: &Image);
}

// ---------------------------------------------------------------------------
// SolidColor
// ---------------------------------------------------------------------------

/// Uniform colour frame.
#[derive(Debug, Clone, Copy)]
pub struct SolidColor(pub Vec4);

impl FrameSource for SolidColor {
    fn render(&mut self, target: &mut Image) {
        target.fill(self.0);
    }
}

// ---------------------------------------------------------------------------
// ProceduralScene
// ---------------------------------------------------------------------------

pub const LIGHT_POSITION: Vec3 = Vec3::new(0.25, 3.0, -2.25);
pub const LIGHT_INTENSITY: f32 = 3.0;
pub const EXPOSURE: f32 = 1.5;
pub const FOV_Y_DEGREES: f32 = 75.0;
pub const ORBIT_SPEED: f32 = 0.15;
pub const AMBIENT: f32 = 0.08;
pub const ALBEDO: Vec3 = Vec3::new(0.8, 0.55, 0.35);
pub const SKY_TOP: Vec3 = Vec3::new(0.25, 0.35, 0.55);
pub const SKY_BOTTOM: Vec3 = Vec3::new(0.05, 0.05, 0.08);

/// Orbiting look-at camera, starting at (4, 1, -4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl Camera {
    pub fn orbit(elapsed: f32) -> Self {
        let start = Vec2::new(4.0, -4.0);
        let angle = start.y.atan2(start.x) + elapsed * ORBIT_SPEED;
        let radius = start.length();
        let eye = Vec3::new(radius * angle.cos(), 1.0, radius * angle.sin());
        let forward = (-eye).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);
        Self { eye, forward, right, up }
    }

    /// World-space ray direction through normalised device coordinates
    /// (`ndc.y` up).
    pub fn ray(&self, ndc: Vec2, aspect: f32) -> Vec3 {
        let tan_half = (FOV_Y_DEGREES.to_radians() * 0.5).tan();
        (self.forward + self.right * ndc.x * tan_half * aspect + self.up * ndc.y * tan_half).normalize()
    }
}

/// Reinhard tone mapping with exposure.
pub fn reinhard(c: Vec3, exposure: f32) -> Vec3 {
    let c = c * exposure;
    c / (Vec3::ONE + c)
}

/// CPU render of the demo scene: a lit unit sphere in front of a sky
/// gradient, seen from an orbiting camera. Output is linear.
#[derive(Debug, Clone)]
pub struct ProceduralScene {
    camera: Camera,
}

impl Default for ProceduralScene {
    fn default() -> Self {
        Self {
            camera: Camera::orbit(0.0),
        }
    }
}

impl ProceduralScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Linear colour seen along `dir` from the camera.
    pub fn shade(&self, dir: Vec3) -> Vec3 {
        let eye = self.camera.eye;
        // unit sphere at the origin
        let b = eye.dot(dir);
        let c = eye.length_squared() - 1.0;
        let disc = b * b - c;
        if disc >= 0.0 {
            let t = -b - disc.sqrt();
            if t > 0.0 {
                let n = (eye + dir * t).normalize();
                let l = LIGHT_POSITION.normalize();
                let diffuse = n.dot(l).max(0.0) * LIGHT_INTENSITY;
                return reinhard(ALBEDO * (diffuse + AMBIENT), EXPOSURE);
            }
        }
        let h = dir.y * 0.5 + 0.5;
        reinhard(SKY_BOTTOM.lerp(SKY_TOP, h), EXPOSURE)
    }
}

impl FrameSource for ProceduralScene {
    fn update(&mut self, elapsed: f32) {
        self.camera = Camera::orbit(elapsed);
    }

    fn render(&mut self, target: &mut Image) {
        let (w, h) = target.size();
        let aspect = w as f32 / h as f32;
        for y in 0..h {
            for x in 0..w {
                let ndc = Vec2::new(
                    (x as f32 + 0.5) / w as f32 * 2.0 - 1.0,
                    1.0 - (y as f32 + 0.5) / h as f32 * 2.0,
                );
                let color = self.shade(self.camera.ray(ndc, aspect));
                target.put(x, y, color.extend(1.0));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ImageSurface
// ---------------------------------------------------------------------------

/// Keeps the most recently presented frame.
#[derive(Debug, Default)]
pub struct ImageSurface {
    frame: Option<Image>,
    presented: u64,
}

impl ImageSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> Option<&Image> {
        self.frame.as_ref()
    }

    pub fn into_frame(self) -> Option<Image> {
        self.frame
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl DisplaySurface for ImageSurface {
    fn present(&mut self, image: &Image) {
        match &mut self.frame {
            Some(frame) if frame.size() == image.size() => frame.clone_from(image),
            slot => *slot = Some(image.clone()),
        }
        self.presented += 1;
    }
}
