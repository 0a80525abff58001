//! Cinematic camera policy
//!
//! Orbits the camera around a fixed centre on a slow Lissajous-like path.

use crate::camera::Camera;
use crate::config::CinematicConfig;
use instant::Instant;
use meshlod_core::{Point3f, Vector3f};

#[derive(Debug, Clone)]
pub struct CinematicView {
    enabled: bool,
    center: Point3f,
    offset: Vector3f,
    speed: f32,
    /// Started on the first cinematic frame and never reset
    clock: Option<Instant>,
}

impl CinematicView {
    pub fn new(config: &CinematicConfig) -> Self {
        Self {
            enabled: false,
            center: Point3f::origin(),
            offset: Vector3f::from(config.offset),
            speed: config.speed,
            clock: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn center(&self) -> Point3f {
        self.center
    }

    /// Toggle the policy and fix the centre it orbits. Turning it off leaves
    /// the camera where the last frame put it.
    pub fn set_enabled(&mut self, enabled: bool, center: Point3f) {
        self.enabled = enabled;
        self.center = center;
    }

    /// Camera position at `time` seconds
    pub fn position_at(&self, time: f32) -> Point3f {
        let c = self.center;
        let o = self.offset;
        Point3f::new(
            c.x + o.x * (time * self.speed).sin(),
            c.y + o.y * (time * 0.05).cos(),
            c.z + (o.z * (time * 0.1).cos()) * (time * self.speed).cos(),
        )
    }

    /// Seconds on the cinematic clock, rounded to hundredths
    pub fn elapsed(&mut self) -> f32 {
        let start = *self.clock.get_or_insert_with(Instant::now);
        round_hundredths(start.elapsed().as_secs_f32())
    }

    /// Move `camera` for the current frame. Returns whether it moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        if !self.enabled {
            return false;
        }
        let time = self.elapsed();
        self.apply_at(camera, time)
    }

    /// Move `camera` as at `time` seconds. Returns whether it moved.
    pub fn apply_at(&self, camera: &mut Camera, time: f32) -> bool {
        if !self.enabled {
            return false;
        }
        camera.position = self.position_at(round_hundredths(time));
        camera.look_at(self.center);
        true
    }
}

fn round_hundredths(t: f32) -> f32 {
    (t * 100.0).round() / 100.0
}
