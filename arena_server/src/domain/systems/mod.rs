// Pure arena rules: grid movement and shooting-ray resolution.

pub mod hit_detection;
pub mod movement;
