use crate::GAME_HARD_CAP_SECS;
use crate::ID;
use crate::Unique;
use crate::PRESENCE_TTL_SECS;
use crate::duel::Command;
use crate::duel::Game;
use crate::duel::Reject;
use crate::gateway::Gateway;
use crate::gateway::Repository;
use crate::live::LiveCommand;
use crate::rooms::PresenceStore;
use crate::server::Emitter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tokio_postgres::Client;

/// Reconciler over both variants. The warning memo is a best-effort
/// in-process dedup; the game row's `warned_at` and the idempotency log
/// are what actually bound duplicates across instances.
pub struct Reconciler {
    gateway: Arc<Gateway>,
    reader: Arc<Client>,
    emitter: Arc<Emitter>,
    warned: Mutex<HashMap<ID<Game>, SystemTime>>,
    hard_cap: Duration,
}

impl Reconciler {
    pub fn new(gateway: Arc<Gateway>, reader: Arc<Client>, emitter: Arc<Emitter>) -> Self {
        Self {
            gateway,
            reader,
            emitter,
            warned: Mutex::new(HashMap::new()),
            hard_cap: Duration::from_secs(crate::env_u64("GAME_HARD_CAP_SECS", GAME_HARD_CAP_SECS)),
        }
    }

    /// Forfeit duel sessions whose turn clock ran out. Returns how many
    /// flipped.
    pub async fn sweep_deadlines(&self) -> usize {
        let scan = match self.reader.expired_games().await {
            Ok(scan) => scan,
            Err(e) => return unavailable("deadline scan", e),
        };
        let mut forfeited = 0;
        for (game, deadline) in scan {
            match self.gateway.execute(Command::Expire { game, deadline }).await {
                Ok(outcome) if !outcome.already_processed => {
                    self.emitter.emit(&outcome.effects).await;
                    forfeited += 1;
                    log::info!("[reconciler] game {} forfeited on turn timeout", game);
                }
                Ok(_) => {}
                // the player acted between scan and lock; nothing to do
                Err(Reject::WrongPhase) | Err(Reject::Validation(_)) => {}
                Err(e) => log::warn!("[reconciler] expire {} failed: {}", game, e),
            }
        }
        forfeited
    }

    /// Deadline warnings inside the window, spaced by the cooldown.
    pub async fn sweep_warnings(&self) -> usize {
        let window = Duration::from_secs(crate::env_u64(
            "DEADLINE_WARNING_WINDOW_SECS",
            crate::DEADLINE_WARNING_WINDOW_SECS,
        ));
        let cooldown = Duration::from_secs(crate::env_u64(
            "DEADLINE_WARNING_COOLDOWN_SECS",
            crate::DEADLINE_WARNING_COOLDOWN_SECS,
        ));
        let scan = match self.reader.warnable_games(window.as_secs_f64()).await {
            Ok(scan) => scan,
            Err(e) => return unavailable("warning scan", e),
        };
        let now = SystemTime::now();
        // memo TTL must outlast the turn deadline or entries could churn
        self.prune_memo(now, self.gateway.knobs().turn_deadline + cooldown)
            .await;
        let mut notified = 0;
        for (game, deadline) in scan {
            if let Some(last) = self.warned.lock().await.get(&game) {
                if now.duration_since(*last).unwrap_or_default() < cooldown {
                    continue;
                }
            }
            match self.gateway.execute(Command::Warn { game, deadline }).await {
                Ok(outcome) if !outcome.already_processed => {
                    self.emitter.emit(&outcome.effects).await;
                    self.warned.lock().await.insert(game, now);
                    notified += 1;
                }
                Ok(_) => {}
                Err(Reject::Validation(_)) | Err(Reject::WrongPhase) => {
                    // another instance warned first, or the turn advanced;
                    // memoize so this tick stops retrying
                    self.warned.lock().await.insert(game, now);
                }
                Err(e) => log::warn!("[reconciler] warn {} failed: {}", game, e),
            }
        }
        notified
    }

    /// Hard cap: sessions that have been alive for a week lose whoever is
    /// closest to spelling the word.
    pub async fn sweep_stalled(&self) -> usize {
        let scan = match self.reader.stalled_games(self.hard_cap.as_secs_f64()).await {
            Ok(scan) => scan,
            Err(e) => return unavailable("stall scan", e),
        };
        let mut forfeited = 0;
        for (game, created) in scan {
            match self.gateway.execute(Command::Stall { game, created }).await {
                Ok(outcome) if !outcome.already_processed => {
                    self.emitter.emit(&outcome.effects).await;
                    forfeited += 1;
                    log::info!("[reconciler] game {} forfeited at the hard cap", game);
                }
                Ok(_) => {}
                Err(Reject::WrongPhase) | Err(Reject::Validation(_)) => {}
                Err(e) => log::warn!("[reconciler] stall {} failed: {}", game, e),
            }
        }
        forfeited
    }

    /// Live variant: 60-second turn clocks and reconnect windows.
    pub async fn sweep_live(&self) -> usize {
        let mut advanced = 0;
        match self.reader.expired_sessions().await {
            Ok(scan) => {
                for (session, deadline) in scan {
                    match self
                        .gateway
                        .execute_live(LiveCommand::Expire { session, deadline })
                        .await
                    {
                        Ok(outcome) if !outcome.already_processed => {
                            self.emitter.emit_live(&outcome.effects).await;
                            advanced += 1;
                        }
                        Ok(_) => {}
                        Err(Reject::WrongPhase) | Err(Reject::Validation(_)) => {}
                        Err(e) => log::warn!("[reconciler] live expire {} failed: {}", session, e),
                    }
                }
            }
            Err(e) => {
                unavailable("live deadline scan", e);
            }
        }
        match self.reader.paused_sessions().await {
            Ok(paused) => {
                for session in paused {
                    let id = session.id();
                    for slot in session.slots() {
                        if slot.out() || slot.connected {
                            continue;
                        }
                        let Some(since) = slot.disconnected_since() else {
                            continue;
                        };
                        match self
                            .gateway
                            .execute_live(LiveCommand::ReconnectTimeout {
                                session: id,
                                player: slot.player,
                                since,
                            })
                            .await
                        {
                            Ok(outcome) if !outcome.already_processed => {
                                self.emitter.emit_live(&outcome.effects).await;
                                advanced += 1;
                                log::info!(
                                    "[reconciler] live {} dropped {} on disconnect timeout",
                                    id,
                                    slot.player
                                );
                            }
                            Ok(_) => {}
                            Err(Reject::WrongPhase) | Err(Reject::Validation(_)) => {}
                            Err(e) => {
                                log::warn!("[reconciler] live rcto {} failed: {}", id, e)
                            }
                        }
                    }
                }
            }
            Err(e) => {
                unavailable("paused scan", e);
            }
        }
        advanced
    }

    /// Terminal-session purge, room TTLs, stale presence.
    pub async fn cleanup(&self) -> u64 {
        let deleted = match self.reader.purge_sessions(self.hard_cap.as_secs_f64()).await {
            Ok(deleted) => deleted,
            Err(e) => {
                unavailable("session purge", e);
                0
            }
        };
        self.emitter.fabric().prune().await;
        if let Err(e) = self
            .reader
            .demote_stale_presence(crate::env_u64("PRESENCE_TTL_SECS", PRESENCE_TTL_SECS) as f64)
            .await
        {
            log::warn!("[reconciler] presence demotion failed: {}", e);
        }
        deleted
    }

    /// One full pass; partial progress commits session by session, so a
    /// slow tick just spills work to the next one.
    pub async fn tick(&self) {
        let forfeited = self.sweep_deadlines().await;
        let notified = self.sweep_warnings().await;
        let stalled = self.sweep_stalled().await;
        let live = self.sweep_live().await;
        if forfeited + notified + stalled + live > 0 {
            log::info!(
                "[reconciler] tick: {} forfeits, {} warnings, {} stalls, {} live",
                forfeited,
                notified,
                stalled,
                live
            );
        }
    }

    /// In-process loop for the live variant; the async variant is driven
    /// by the external scheduler through the cron endpoints.
    pub fn spawn(self: Arc<Self>, every: Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                self.tick().await;
            }
        });
    }

    async fn prune_memo(&self, now: SystemTime, ttl: Duration) {
        self.warned
            .lock()
            .await
            .retain(|_, at| now.duration_since(*at).unwrap_or_default() < ttl);
    }
}

fn unavailable(what: &str, e: Reject) -> usize {
    log::warn!("[reconciler] {} unavailable: {}", what, e);
    0
}
