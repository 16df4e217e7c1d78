//! Water droplets leaking from damaged pipes
//!
//! Purely visual: particles never collide and never affect gameplay.

use glam::Vec2;
use rand::Rng;

use crate::consts::PARTICLE_GRAVITY;

/// Number of droplet sprite variants
pub const DROPLET_VARIANTS: u8 = 4;

#[derive(Debug, Clone)]
pub struct Particle {
    /// Centre position
    pub pos: Vec2,
    pub vel: Vec2,
    /// Seconds left to live
    pub life: f32,
    /// Which droplet sprite to draw
    pub variant: u8,
}

impl Particle {
    /// Spawn a droplet with a random drift, fall speed and lifetime
    pub fn spawn(pos: Vec2, rng: &mut impl Rng) -> Self {
        Self {
            pos,
            vel: Vec2::new(rng.random_range(-30.0..=30.0), rng.random_range(50.0..=150.0)),
            life: rng.random_range(0.5..=1.5),
            variant: rng.random_range(0..DROPLET_VARIANTS),
        }
    }

    /// Returns false once the droplet has expired
    pub fn update(&mut self, dt: f32) -> bool {
        self.life -= dt;
        if self.life <= 0.0 {
            return false;
        }
        self.vel.y += PARTICLE_GRAVITY * dt;
        self.pos += self.vel * dt;
        true
    }
}

/// Advance every particle and drop the expired ones
pub fn update_particles(particles: &mut Vec<Particle>, dt: f32) {
    particles.retain_mut(|p| p.update(dt));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_spawn_ranges() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..200 {
            let p = Particle::spawn(Vec2::ZERO, &mut rng);
            assert!((-30.0..=30.0).contains(&p.vel.x));
            assert!((50.0..=150.0).contains(&p.vel.y));
            assert!((0.5..=1.5).contains(&p.life));
            assert!(p.variant < DROPLET_VARIANTS);
        }
    }

    #[test]
    fn test_particles_fall_and_expire() {
        let mut particles = vec![Particle {
            pos: Vec2::ZERO,
            vel: Vec2::new(0.0, 100.0),
            life: 0.5,
            variant: 0,
        }];
        update_particles(&mut particles, 0.25);
        assert_eq!(particles.len(), 1);
        assert!((particles[0].vel.y - 225.0).abs() < 1e-3);
        assert!(particles[0].pos.y > 0.0);
        update_particles(&mut particles, 0.25);
        assert!(particles.is_empty());
    }
}
