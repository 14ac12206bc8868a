use crate::domain::entities::Player;
use crate::domain::tuning::ArenaTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }
}

// The two movement protocols clients may use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveCommand {
    Step(Direction),
    Place { x: f64, y: f64, base_y: Option<f64> },
}

// Resulting cell and terrain height after a move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub base_y: Option<f64>,
}

pub fn apply_move(current: &Player, command: MoveCommand, tuning: &ArenaTuning) -> Placement {
    match command {
        MoveCommand::Step(direction) => step(current, direction, tuning),
        MoveCommand::Place { x, y, base_y } => Placement {
            x: place_axis(x, tuning),
            y: place_axis(y, tuning),
            // Absolute placements always carry a height; missing means flat floor.
            base_y: Some(base_y.filter(|v| v.is_finite()).unwrap_or(0.0)),
        },
    }
}

// "up" is towards row 0.
fn step(current: &Player, direction: Direction, tuning: &ArenaTuning) -> Placement {
    let (dx, dy) = match direction {
        Direction::Up => (0, -1),
        Direction::Down => (0, 1),
        Direction::Left => (-1, 0),
        Direction::Right => (1, 0),
    };

    Placement {
        x: tuning.clamp_cell(tuning.clamp_cell(current.x).saturating_add(dx)),
        y: tuning.clamp_cell(tuning.clamp_cell(current.y).saturating_add(dy)),
        base_y: current.base_y,
    }
}

fn place_axis(value: f64, tuning: &ArenaTuning) -> i32 {
    // Float-to-int casts saturate, so huge inputs land on the grid edge.
    let rounded = value.round() as i64;
    rounded.clamp(0, i64::from(tuning.max_cell())) as i32
}
