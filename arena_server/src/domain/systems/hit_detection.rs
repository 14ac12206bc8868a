use crate::domain::entities::{Player, Vec3};
use crate::domain::tuning::ArenaTuning;

/// Closest player struck by a shot and the ray distance to the entry point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit<'a> {
    pub player: &'a Player,
    pub t: f64,
}

/// Resolves a shooting ray against every other player's hit sphere.
///
/// `direction` is expected to be unit length. Candidates behind the shooter are ignored,
/// and the lowest non-negative entry distance wins; equal distances keep scan order.
pub fn resolve<'a>(
    shooter_name: &str,
    origin: Vec3,
    direction: Vec3,
    candidates: &'a [Player],
    tuning: &ArenaTuning,
) -> Option<Hit<'a>> {
    let radius_sq = tuning.player_radius * tuning.player_radius;
    let mut best: Option<Hit<'a>> = None;

    for candidate in candidates {
        if candidate.name == shooter_name {
            continue;
        }

        let center = tuning.sphere_center(candidate.x, candidate.y, candidate.base_y);
        let oc = center - origin;
        let tca = oc.dot(direction);
        if tca < 0.0 {
            continue;
        }

        // Squared distance from the sphere centre to the ray.
        let d2 = oc.length_squared() - tca * tca;
        if d2 > radius_sq {
            continue;
        }

        let thc = (radius_sq - d2).sqrt();
        let t_hit = tca - thc;
        if t_hit >= 0.0 && best.is_none_or(|hit| t_hit < hit.t) {
            best = Some(Hit {
                player: candidate,
                t: t_hit,
            });
        }
    }

    best
}
