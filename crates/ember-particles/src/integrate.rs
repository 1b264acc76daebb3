//! Per-particle physics step

use crate::particle::Particle;

/// Advance `p` by `dt` seconds under `gravity`. Returns false once the
/// particle's lifetime has run out.
///
/// One explicit step regardless of `dt`. Friction is a linear decay clamped at
/// zero, so an oversized delta stops a particle instead of reversing it.
pub fn integrate(p: &mut Particle, dt: f32, gravity: f32) -> bool {
    p.velocity_y += gravity * dt;

    let decay = (1.0 - p.friction * dt).max(0.0);
    p.velocity_x *= decay;
    p.velocity_y *= decay;

    p.x += p.velocity_x * dt;
    p.y += p.velocity_y * dt;

    p.angle += p.angular_velocity * dt;
    p.scale = (p.scale + p.zoom * dt).max(0.0);
    p.color.a = (p.color.a + p.fade * dt).clamp(0.0, 1.0);

    p.time_to_live -= dt;
    p.is_alive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moving(vx: f32, vy: f32) -> Particle {
        Particle {
            velocity_x: vx,
            velocity_y: vy,
            time_to_live: f32::INFINITY,
            ..Particle::dead()
        }
    }

    #[test]
    fn inertial_motion_without_friction_or_gravity() {
        let mut p = moving(3.0, -2.0);
        let dt = 1.0 / 60.0;
        for _ in 0..120 {
            assert!(integrate(&mut p, dt, 0.0));
        }
        assert_eq!(p.velocity_x, 3.0);
        assert_eq!(p.velocity_y, -2.0);
        let elapsed = 120.0 * dt;
        assert!((p.x - 3.0 * elapsed).abs() < 1e-4);
        assert!((p.y + 2.0 * elapsed).abs() < 1e-4);
    }

    #[test]
    fn gravity_accelerates_downward_axis() {
        let mut p = moving(0.0, 0.0);
        integrate(&mut p, 0.5, 10.0);
        assert!((p.velocity_y - 5.0).abs() < 1e-6);
        assert!((p.y - 2.5).abs() < 1e-6);
        assert_eq!(p.velocity_x, 0.0);
    }

    #[test]
    fn friction_never_flips_velocity() {
        let mut p = Particle {
            friction: 4.0,
            ..moving(10.0, -10.0)
        };
        integrate(&mut p, 1.0, 0.0);
        assert_eq!(p.velocity_x, 0.0);
        assert_eq!(p.velocity_y, 0.0);

        let mut q = Particle {
            friction: 0.5,
            ..moving(10.0, 0.0)
        };
        integrate(&mut q, 0.5, 0.0);
        assert!((q.velocity_x - 7.5).abs() < 1e-6);
    }

    #[test]
    fn rotation_and_zoom() {
        let mut p = Particle {
            angular_velocity: std::f32::consts::PI,
            zoom: -0.75,
            ..moving(0.0, 0.0)
        };
        integrate(&mut p, 0.5, 0.0);
        assert!((p.angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!((p.scale - 0.625).abs() < 1e-6);

        integrate(&mut p, 2.0, 0.0);
        assert_eq!(p.scale, 0.0);
        assert!(p.is_alive());
    }

    #[test]
    fn fade_clamps_at_zero() {
        let mut p = Particle {
            fade: -1.0,
            ..moving(0.0, 0.0)
        };
        assert_eq!(p.color.a, 1.0);
        for _ in 0..10 {
            integrate(&mut p, 0.1, 0.0);
        }
        assert_eq!(p.color.a, 0.0);

        integrate(&mut p, 0.1, 0.0);
        assert_eq!(p.color.a, 0.0);
    }

    #[test]
    fn fade_clamps_at_one() {
        let mut p = Particle {
            fade: 2.0,
            ..moving(0.0, 0.0)
        };
        p.color.a = 0.5;
        integrate(&mut p, 1.0, 0.0);
        assert_eq!(p.color.a, 1.0);
    }

    #[test]
    fn dies_when_lifetime_runs_out() {
        let mut p = Particle {
            time_to_live: 0.3,
            ..Particle::dead()
        };
        assert!(integrate(&mut p, 0.1, 0.0));
        assert!(integrate(&mut p, 0.1, 0.0));
        assert!(!integrate(&mut p, 0.15, 0.0));
    }
}
