use std::sync::Arc;

use shared::{domain::Mode, protocol::DryRunOptions};
use tracing::{info, warn};

use crate::{
    process::ProcessClient,
    store::{Store, Transition},
    sync::fetch_roster,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    MissingIdentity,
    MissingProcess,
    NotInRoster,
    CheckFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Verified,
    Redirected(RedirectReason),
}

impl GuardOutcome {
    pub fn is_verified(self) -> bool {
        self == GuardOutcome::Verified
    }
}

/// Confirms the local player is still registered with the game process and
/// sends the client back to the landing view when it is not.
pub struct SessionGuard {
    store: Arc<Store>,
    client: Arc<dyn ProcessClient>,
}

impl SessionGuard {
    pub fn new(store: Arc<Store>, client: Arc<dyn ProcessClient>) -> Self {
        Self { store, client }
    }

    pub async fn check(&self) -> GuardOutcome {
        let (player_id, process) = self
            .store
            .read(|state| {
                (
                    state
                        .current_player
                        .as_ref()
                        .map(|player| player.id.clone())
                        .filter(|id| !id.is_empty()),
                    state.process().cloned(),
                )
            })
            .await;

        let Some(player_id) = player_id else {
            info!("guard: no player id, redirecting to landing");
            return self.redirect(RedirectReason::MissingIdentity).await;
        };
        let Some(process) = process else {
            info!(player_id = %player_id, "guard: no game process, redirecting to landing");
            return self.redirect(RedirectReason::MissingProcess).await;
        };

        let roster = fetch_roster(
            self.client.as_ref(),
            &process,
            &DryRunOptions::owned_by(player_id.as_str()),
        )
        .await;

        match roster {
            Ok(Some(records)) if records.iter().any(|r| r.player_id() == player_id.as_str()) => {
                GuardOutcome::Verified
            }
            Ok(_) => {
                info!(player_id = %player_id, process = %process, "guard: player not registered, redirecting to landing");
                self.redirect(RedirectReason::NotInRoster).await
            }
            Err(err) => {
                warn!(player_id = %player_id, process = %process, "guard: registration check failed: {err:#}");
                self.redirect(RedirectReason::CheckFailed).await
            }
        }
    }

    async fn redirect(&self, reason: RedirectReason) -> GuardOutcome {
        self.store.apply(Transition::ModeChanged(Mode::Landing)).await;
        GuardOutcome::Redirected(reason)
    }
}

#[cfg(test)]
#[path = "tests/guard_tests.rs"]
mod tests;
