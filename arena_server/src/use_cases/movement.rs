// Applies a validated move to a stored player record.

use crate::domain::entities::Player;
use crate::domain::errors::GameError;
use crate::domain::ports::{Clock, PlayerPatch, PlayerStore};
use crate::domain::systems::movement::{self, MoveCommand};
use crate::domain::tuning::ArenaTuning;

#[derive(Clone)]
pub struct MovementProcessor<S, C> {
    pub store: S,
    pub clock: C,
    pub tuning: ArenaTuning,
}

impl<S, C> MovementProcessor<S, C>
where
    S: PlayerStore,
    C: Clock,
{
    // Moves `name` and returns the stored record; writes nothing for unknown players.
    pub async fn apply_move(&self, name: &str, command: MoveCommand) -> Result<Player, GameError> {
        validate_command(command)?;

        let current = self
            .store
            .get(name)
            .await
            .map_err(GameError::StoreUnavailable)?
            .ok_or_else(|| GameError::PlayerNotFound(name.to_string()))?;

        let placement = movement::apply_move(&current, command, &self.tuning);
        let patch = PlayerPatch::Position {
            x: placement.x,
            y: placement.y,
            base_y: placement.base_y,
            at: self.clock.now_epoch_millis(),
        };

        // The record can vanish between read and write; that is still a missing player.
        self.store
            .update(name, patch)
            .await
            .map_err(GameError::StoreUnavailable)?
            .ok_or_else(|| GameError::PlayerNotFound(name.to_string()))
    }
}

fn validate_command(command: MoveCommand) -> Result<(), GameError> {
    match command {
        MoveCommand::Step(_) => Ok(()),
        MoveCommand::Place { x, y, .. } if x.is_finite() && y.is_finite() => Ok(()),
        MoveCommand::Place { .. } => Err(GameError::MalformedPayload(
            "x and y must be finite numbers".to_string(),
        )),
    }
}
