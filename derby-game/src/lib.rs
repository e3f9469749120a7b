//! Derby Game Engine
//!
//! Platform-agnostic core of a horse-racing betting game: seeded rosters,
//! odds and pace models, tick-driven races, wagering and session control.
//! Real-time scheduling lives behind the `async` feature.

pub mod clock;
pub mod constants;
pub mod horse;
pub mod numbers;
pub mod odds;
pub mod player;
pub mod program;
pub mod race;
pub mod rng;
#[cfg(feature = "async")]
pub mod scheduler;
pub mod session;

use anyhow::Context;

// Re-export commonly used types
pub use clock::{SIM_SECONDS_PER_TICK, TICK_PERIOD, format_running_time};
pub use horse::{
    Horse, HorseColor, HorseId, HorseTemplate, Roster, RosterError, RosterTemplate,
    random_condition,
};
pub use odds::{
    compute_win_odds, random_variance_factor, sample_horse_speed_kph, speed_coef_from_condition,
    win_odds,
};
pub use player::{BetError, Player, PlayerError, Settlement, place_bet, settle_program};
pub use program::{
    Program, ProgramError, RaceHorseEntry, build_program, build_program_list, distance_for_lap,
    pick_horses,
};
pub use race::tick;
pub use rng::{CountingRng, RngBundle};
#[cfg(feature = "async")]
pub use scheduler::{RaceScheduler, SharedSession};
pub use session::{RaceSession, TickOutcome};

/// Source of the horse template a roster is rolled from.
pub trait RosterLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the horse template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be read or parsed.
    fn load_roster_template(&self) -> Result<RosterTemplate, Self::Error>;
}

/// Persistence of player records between sessions.
pub trait PlayerStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a player record under its name.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save_player(&self, player: &Player) -> Result<(), Self::Error>;

    /// Load a player record by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read.
    fn load_player(&self, name: &str) -> Result<Option<Player>, Self::Error>;

    /// Delete a player record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be removed.
    fn delete_player(&self, name: &str) -> Result<(), Self::Error>;
}

/// Serves the template bundled with the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticRosterLoader;

impl RosterLoader for StaticRosterLoader {
    type Error = std::convert::Infallible;

    fn load_roster_template(&self) -> Result<RosterTemplate, Self::Error> {
        Ok(RosterTemplate::load_from_static())
    }
}

/// Main entry point tying a roster source to player storage.
pub struct GameEngine<L, S>
where
    L: RosterLoader,
    S: PlayerStorage,
{
    roster_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: RosterLoader,
    S: PlayerStorage,
{
    pub const fn new(roster_loader: L, storage: S) -> Self {
        Self {
            roster_loader,
            storage,
        }
    }

    /// Start a session with programs ready to bet on.
    ///
    /// A stored player with the same name keeps their balance; otherwise a
    /// fresh player is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, the template or stored player
    /// cannot be loaded, or the roster cannot fill a program.
    pub fn create_session(&self, player_name: &str, seed: u64) -> anyhow::Result<RaceSession> {
        let fresh = Player::new(player_name)?;
        let player = self
            .storage
            .load_player(&fresh.name)
            .context("loading stored player")?
            .unwrap_or(fresh);
        let template = self
            .roster_loader
            .load_roster_template()
            .context("loading roster template")?;

        let mut session = RaceSession::new(player, &template, seed)?;
        session.generate_programs()?;
        Ok(session)
    }

    /// Save a player record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    pub fn save_player(&self, player: &Player) -> Result<(), S::Error> {
        self.storage.save_player(player)
    }

    /// Load a player record.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored record cannot be read.
    pub fn load_player(&self, name: &str) -> Result<Option<Player>, S::Error> {
        self.storage.load_player(name.trim())
    }

    /// Delete a player record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be removed.
    pub fn delete_player(&self, name: &str) -> Result<(), S::Error> {
        self.storage.delete_player(name.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use constants::{DEFAULT_BALANCE_CENTS, LAPS};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl RosterLoader for FixtureLoader {
        type Error = Infallible;

        fn load_roster_template(&self) -> Result<RosterTemplate, Self::Error> {
            let horses = (1..=12)
                .map(|id| HorseTemplate {
                    id,
                    name: format!("Fixture {id}"),
                    color: HorseColor::default(),
                })
                .collect();
            Ok(RosterTemplate { horses })
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStorage {
        players: Rc<RefCell<HashMap<String, Player>>>,
    }

    impl PlayerStorage for MemoryStorage {
        type Error = Infallible;

        fn save_player(&self, player: &Player) -> Result<(), Self::Error> {
            self.players
                .borrow_mut()
                .insert(player.name.clone(), player.clone());
            Ok(())
        }

        fn load_player(&self, name: &str) -> Result<Option<Player>, Self::Error> {
            Ok(self.players.borrow().get(name).cloned())
        }

        fn delete_player(&self, name: &str) -> Result<(), Self::Error> {
            self.players.borrow_mut().remove(name);
            Ok(())
        }
    }

    #[test]
    fn engine_creates_session_with_programs() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::default());
        let session = engine.create_session("  Ada ", 0xABCD).unwrap();
        assert_eq!(session.player().name, "Ada");
        assert_eq!(session.player().balance_cents, DEFAULT_BALANCE_CENTS);
        assert_eq!(session.roster().len(), 12);
        assert_eq!(session.programs().len(), LAPS as usize);
        assert_eq!(session.current_program().map(|p| p.lap), Some(1));
    }

    #[test]
    fn stored_players_keep_their_balance() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::default());
        let mut session = engine.create_session("Ada", 1).unwrap();
        session.with_player_mut(|player| player.balance_cents = 4_200);
        engine.save_player(session.player()).unwrap();

        let resumed = engine.create_session("Ada", 2).unwrap();
        assert_eq!(resumed.player().balance_cents, 4_200);
        assert_eq!(
            engine.load_player(" Ada").unwrap().map(|p| p.balance_cents),
            Some(4_200)
        );

        engine.delete_player("Ada").unwrap();
        assert!(engine.load_player("Ada").unwrap().is_none());
    }

    #[test]
    fn empty_names_are_rejected() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::default());
        let err = engine.create_session("   ", 1).unwrap_err();
        assert!(err.downcast_ref::<PlayerError>().is_some());
    }

    #[test]
    fn static_loader_serves_bundled_horses() {
        let template = StaticRosterLoader.load_roster_template().unwrap();
        assert_eq!(template.horses.len(), 20);
    }
}
