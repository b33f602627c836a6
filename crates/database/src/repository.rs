//! Narrow, typed query functions for each platform entity.
//!
//! Every function declares its own empty/zero-affected policy at the call
//! site and runs through the shared statement-execution core; multi-step
//! operations (trades, shop purchases, game reports) go through
//! [`Db::transaction`] so they commit or roll back as a unit.

use crate::codec;
use crate::connection::Db;
use crate::error::DbError;
use crate::query::{execute_on, fetch_rows_on, OnEmpty, OnZeroAffected, Param};
use chrono::{DateTime, Utc};
use configuration::TableSettings;
use core_types::{
    add_trade_pins, remove_trade_pins, BadgeCounts, ChallengeWave, PinCollection, TradePin,
};
use serde::Serialize;
use sqlx::{FromRow, MySqlConnection};

const USER_MISSING: &str = "Could not find the user.";
const TRADE_MISSING: &str = "Could not find the trade.";

/// High-level, application-specific interface to the database. Holds the
/// pool handle and the configured table names; cloning shares both.
#[derive(Debug, Clone)]
pub struct Repository {
    db: Db,
    tables: TableSettings,
}

#[derive(Debug, Clone, FromRow)]
pub struct CredentialsRow {
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserProfile {
    pub username: String,
    pub active_avatar: String,
    pub tokens: u32,
    pub token_doubler: u32,
    pub coins: u32,
    pub trade_credits: u32,
    pub points: u32,
}

#[derive(Debug, Clone, FromRow)]
struct CollectionRow {
    brawlers: String,
    avatars: String,
    wild_card_pins: String,
}

/// A player's collection with every text column materialized.
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub pins: PinCollection,
    pub avatars: Vec<String>,
    pub wild_card_pins: Vec<u32>,
}

#[derive(Debug, Clone, FromRow)]
struct PinsRow {
    brawlers: String,
}

#[derive(Debug, Clone, FromRow)]
struct SessionRow {
    username: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct TradeRow {
    pub trade_id: u64,
    pub creator: String,
    pub offer: String,
    pub request: String,
    pub trade_credits: u32,
    pub expiration: DateTime<Utc>,
    pub status: String,
}

/// A trade with its pin list columns materialized.
#[derive(Debug, Clone, Serialize)]
pub struct Trade {
    pub trade_id: u64,
    pub creator: String,
    pub offer: Vec<TradePin>,
    pub request: Vec<TradePin>,
    pub trade_credits: u32,
    pub expiration: DateTime<Utc>,
    pub status: String,
}

impl Trade {
    fn from_row(row: TradeRow) -> Result<Trade, DbError> {
        Ok(Trade {
            trade_id: row.trade_id,
            creator: row.creator,
            offer: codec::parse_trade_pins(&row.offer)?,
            request: codec::parse_trade_pins(&row.request)?,
            trade_credits: row.trade_credits,
            expiration: row.expiration,
            status: row.status,
        })
    }
}

/// What an acceptor walks away with after a completed trade.
#[derive(Debug, Clone, Serialize)]
pub struct TradeReceipt {
    pub trade_id: u64,
    pub creator: String,
    pub gained: Vec<TradePin>,
    pub given: Vec<TradePin>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub best_score: u32,
}

#[derive(Debug, Clone, FromRow)]
struct BadgesRow {
    badges: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ChallengeRow {
    pub challenge_id: u64,
    pub owner: String,
    pub title: String,
    pub waves: String,
}

/// A challenge with its wave list column materialized.
#[derive(Debug, Clone, Serialize)]
pub struct Challenge {
    pub challenge_id: u64,
    pub owner: String,
    pub title: String,
    pub waves: Vec<ChallengeWave>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Cosmetic {
    pub name: String,
    pub cost: u32,
}

fn single<T>(rows: Vec<T>, missing: &'static str) -> Result<T, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::EmptyResults(missing.to_string()))
}

/// Loads one player's pin collection on a borrowed transaction connection,
/// locking the row for the remainder of the transaction.
async fn load_pins_for_update(
    conn: &mut MySqlConnection,
    sql: &str,
    username: &str,
) -> Result<PinCollection, DbError> {
    let rows: Vec<PinsRow> = fetch_rows_on(
        &mut *conn,
        sql,
        vec![Param::from(username)],
        OnEmpty::Fail(USER_MISSING),
    )
    .await?;
    let row = single(rows, USER_MISSING)?;
    codec::parse_pin_collection(&row.brawlers)
}

impl Repository {
    pub fn new(db: Db, tables: TableSettings) -> Self {
        Self { db, tables }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    // ----------------------------------------------------------------- users

    /// Creates a new account. A taken username surfaces as the driver's
    /// duplicate-key error and classifies to 401.
    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO {} (username, password_hash, active_avatar, brawlers, avatars, wild_card_pins, badges) \
             VALUES (?, ?, 'default', '{{}}', '[]', '[]', '{{}}')",
            self.tables.users
        );
        self.db
            .execute(
                &sql,
                vec![Param::from(username), Param::from(password_hash)],
                OnZeroAffected::Fail("The account could not be created."),
            )
            .await?;
        Ok(())
    }

    pub async fn get_credentials(&self, username: &str) -> Result<CredentialsRow, DbError> {
        let sql = format!(
            "SELECT username, password_hash FROM {} WHERE username = ?",
            self.tables.users
        );
        let rows = self
            .db
            .fetch_rows(&sql, vec![Param::from(username)], OnEmpty::Fail(USER_MISSING))
            .await?;
        single(rows, USER_MISSING)
    }

    pub async fn get_profile(&self, username: &str) -> Result<UserProfile, DbError> {
        let sql = format!(
            "SELECT username, active_avatar, tokens, token_doubler, coins, trade_credits, points \
             FROM {} WHERE username = ?",
            self.tables.users
        );
        let rows = self
            .db
            .fetch_rows(&sql, vec![Param::from(username)], OnEmpty::Fail(USER_MISSING))
            .await?;
        single(rows, USER_MISSING)
    }

    pub async fn set_active_avatar(&self, username: &str, avatar: &str) -> Result<(), DbError> {
        let sql = format!(
            "UPDATE {} SET active_avatar = ? WHERE username = ?",
            self.tables.users
        );
        self.db
            .execute(
                &sql,
                vec![Param::from(avatar), Param::from(username)],
                OnZeroAffected::Fail("The avatar could not be set."),
            )
            .await?;
        Ok(())
    }

    pub async fn get_collection(&self, username: &str) -> Result<Collection, DbError> {
        let sql = format!(
            "SELECT brawlers, avatars, wild_card_pins FROM {} WHERE username = ?",
            self.tables.users
        );
        let rows: Vec<CollectionRow> = self
            .db
            .fetch_rows(&sql, vec![Param::from(username)], OnEmpty::Fail(USER_MISSING))
            .await?;
        let row = single(rows, USER_MISSING)?;
        Ok(Collection {
            pins: codec::parse_pin_collection(&row.brawlers)?,
            avatars: codec::parse_string_list(&row.avatars)?,
            wild_card_pins: codec::parse_number_list(&row.wild_card_pins)?,
        })
    }

    /// Grants reward pins (brawl box drops, challenge rewards) through a
    /// locked read-modify-write of the collection column.
    pub async fn add_reward_pins(&self, username: &str, pins: Vec<TradePin>) -> Result<(), DbError> {
        let select = format!(
            "SELECT brawlers FROM {} WHERE username = ? FOR UPDATE",
            self.tables.users
        );
        let update = format!(
            "UPDATE {} SET brawlers = ? WHERE username = ?",
            self.tables.users
        );
        let username = username.to_string();
        self.db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut collection = load_pins_for_update(conn, &select, &username).await?;
                    add_trade_pins(&mut collection, &pins);
                    let serialized = codec::serialize_pin_collection(&collection)?;
                    execute_on(
                        &mut *conn,
                        &update,
                        vec![Param::from(serialized), Param::from(username)],
                        OnZeroAffected::Fail("The collection could not be updated."),
                    )
                    .await?;
                    Ok(())
                })
            })
            .await
    }

    pub async fn get_badges(&self, username: &str) -> Result<BadgeCounts, DbError> {
        let sql = format!(
            "SELECT badges FROM {} WHERE username = ?",
            self.tables.users
        );
        let rows: Vec<BadgesRow> = self
            .db
            .fetch_rows(&sql, vec![Param::from(username)], OnEmpty::Fail(USER_MISSING))
            .await?;
        let row = single(rows, USER_MISSING)?;
        codec::parse_badge_counts(&row.badges)
    }

    // -------------------------------------------------------------- sessions

    pub async fn create_session(&self, username: &str, token: &str) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO {} (token, username, created_at) VALUES (?, ?, NOW())",
            self.tables.sessions
        );
        self.db
            .execute(
                &sql,
                vec![Param::from(token), Param::from(username)],
                OnZeroAffected::Fail("The session could not be saved."),
            )
            .await?;
        Ok(())
    }

    /// Resolves a bearer token to a username. An unknown token is a valid
    /// outcome here; the caller turns `None` into its 401.
    pub async fn resolve_session(&self, token: &str) -> Result<Option<String>, DbError> {
        let sql = format!(
            "SELECT username FROM {} WHERE token = ?",
            self.tables.sessions
        );
        let rows: Vec<SessionRow> = self
            .db
            .fetch_rows(&sql, vec![Param::from(token)], OnEmpty::Allow)
            .await?;
        Ok(rows.into_iter().next().map(|row| row.username))
    }

    /// Logout is idempotent: deleting an already-deleted session is fine.
    pub async fn delete_session(&self, token: &str) -> Result<(), DbError> {
        let sql = format!("DELETE FROM {} WHERE token = ?", self.tables.sessions);
        self.db
            .execute(&sql, vec![Param::from(token)], OnZeroAffected::Allow)
            .await?;
        Ok(())
    }

    // ---------------------------------------------------------------- trades

    /// Opens a trade. The offered pins are escrowed immediately: they are
    /// removed from the creator's collection in the same transaction that
    /// inserts the trade row, so a failed insert returns them untouched.
    pub async fn create_trade(
        &self,
        creator: &str,
        offer: Vec<TradePin>,
        request: Vec<TradePin>,
        trade_credits: u32,
        duration_hours: u32,
    ) -> Result<u64, DbError> {
        let select = format!(
            "SELECT brawlers FROM {} WHERE username = ? FOR UPDATE",
            self.tables.users
        );
        let update_pins = format!(
            "UPDATE {} SET brawlers = ? WHERE username = ?",
            self.tables.users
        );
        let charge_credits = format!(
            "UPDATE {} SET trade_credits = trade_credits - ? WHERE username = ? AND trade_credits >= ?",
            self.tables.users
        );
        let insert = format!(
            "INSERT INTO {} (creator, offer, request, trade_credits, expiration, status) \
             VALUES (?, ?, ?, ?, NOW() + INTERVAL ? HOUR, 'Open')",
            self.tables.trades
        );
        let creator = creator.to_string();
        self.db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut collection = load_pins_for_update(conn, &select, &creator).await?;
                    if !remove_trade_pins(&mut collection, &offer) {
                        return Err(DbError::NoUpdate(
                            "You do not have the pins offered in this trade.".to_string(),
                        ));
                    }
                    let serialized = codec::serialize_pin_collection(&collection)?;
                    execute_on(
                        &mut *conn,
                        &update_pins,
                        vec![Param::from(serialized), Param::from(creator.clone())],
                        OnZeroAffected::Fail("The collection could not be updated."),
                    )
                    .await?;
                    execute_on(
                        &mut *conn,
                        &charge_credits,
                        vec![
                            Param::from(trade_credits),
                            Param::from(creator.clone()),
                            Param::from(trade_credits),
                        ],
                        OnZeroAffected::Fail("You cannot afford to open this trade."),
                    )
                    .await?;
                    let inserted = execute_on(
                        &mut *conn,
                        &insert,
                        vec![
                            Param::from(creator),
                            Param::from(codec::serialize_trade_pins(&offer)?),
                            Param::from(codec::serialize_trade_pins(&request)?),
                            Param::from(trade_credits),
                            Param::from(duration_hours),
                        ],
                        OnZeroAffected::Fail("The trade could not be created."),
                    )
                    .await?;
                    Ok(inserted.last_insert_id)
                })
            })
            .await
    }

    pub async fn get_trade(&self, trade_id: u64) -> Result<Trade, DbError> {
        let sql = format!(
            "SELECT trade_id, creator, offer, request, trade_credits, expiration, status \
             FROM {} WHERE trade_id = ?",
            self.tables.trades
        );
        let rows: Vec<TradeRow> = self
            .db
            .fetch_rows(&sql, vec![Param::from(trade_id)], OnEmpty::Fail(TRADE_MISSING))
            .await?;
        Trade::from_row(single(rows, TRADE_MISSING)?)
    }

    /// Lists trades still open for acceptance. An empty market is valid.
    pub async fn list_open_trades(&self) -> Result<Vec<Trade>, DbError> {
        let sql = format!(
            "SELECT trade_id, creator, offer, request, trade_credits, expiration, status \
             FROM {} WHERE status = 'Open' AND expiration > NOW() ORDER BY expiration ASC",
            self.tables.trades
        );
        let rows: Vec<TradeRow> = self.db.fetch_rows(&sql, vec![], OnEmpty::Allow).await?;
        rows.into_iter().map(Trade::from_row).collect()
    }

    /// Accepts an open trade: the acceptor hands over the requested pins,
    /// receives the offered ones, and the creator is paid the requested
    /// pins in the same transaction. Any failure (missing pins, closed
    /// trade, driver error) rolls everything back.
    pub async fn accept_trade(&self, trade_id: u64, acceptor: &str) -> Result<TradeReceipt, DbError> {
        let select_trade = format!(
            "SELECT trade_id, creator, offer, request, trade_credits, expiration, status \
             FROM {} WHERE trade_id = ? AND status = 'Open' AND expiration > NOW() FOR UPDATE",
            self.tables.trades
        );
        let select_pins = format!(
            "SELECT brawlers FROM {} WHERE username = ? FOR UPDATE",
            self.tables.users
        );
        let update_pins = format!(
            "UPDATE {} SET brawlers = ? WHERE username = ?",
            self.tables.users
        );
        let close = format!(
            "UPDATE {} SET status = 'Accepted', acceptor = ? WHERE trade_id = ? AND status = 'Open'",
            self.tables.trades
        );
        let acceptor = acceptor.to_string();
        self.db
            .transaction(move |conn| {
                Box::pin(async move {
                    let rows: Vec<TradeRow> = fetch_rows_on(
                        &mut *conn,
                        &select_trade,
                        vec![Param::from(trade_id)],
                        OnEmpty::Fail(TRADE_MISSING),
                    )
                    .await?;
                    let trade = single(rows, TRADE_MISSING)?;
                    if trade.creator == acceptor {
                        return Err(DbError::NoUpdate(
                            "You cannot accept your own trade.".to_string(),
                        ));
                    }
                    let offer = codec::parse_trade_pins(&trade.offer)?;
                    let request = codec::parse_trade_pins(&trade.request)?;

                    // The acceptor pays the requested pins and pockets the
                    // offered ones; the offered pins were escrowed when the
                    // trade was opened.
                    let mut acceptor_pins =
                        load_pins_for_update(conn, &select_pins, &acceptor).await?;
                    if !remove_trade_pins(&mut acceptor_pins, &request) {
                        return Err(DbError::NoUpdate(
                            "You do not have the pins requested in this trade.".to_string(),
                        ));
                    }
                    add_trade_pins(&mut acceptor_pins, &offer);
                    let serialized = codec::serialize_pin_collection(&acceptor_pins)?;
                    execute_on(
                        &mut *conn,
                        &update_pins,
                        vec![Param::from(serialized), Param::from(acceptor.clone())],
                        OnZeroAffected::Fail("The collection could not be updated."),
                    )
                    .await?;

                    let mut creator_pins =
                        load_pins_for_update(conn, &select_pins, &trade.creator).await?;
                    add_trade_pins(&mut creator_pins, &request);
                    let serialized = codec::serialize_pin_collection(&creator_pins)?;
                    execute_on(
                        &mut *conn,
                        &update_pins,
                        vec![Param::from(serialized), Param::from(trade.creator.clone())],
                        OnZeroAffected::Fail("The collection could not be updated."),
                    )
                    .await?;

                    execute_on(
                        &mut *conn,
                        &close,
                        vec![Param::from(acceptor), Param::from(trade_id)],
                        OnZeroAffected::Fail("The trade is no longer available."),
                    )
                    .await?;

                    Ok(TradeReceipt {
                        trade_id,
                        creator: trade.creator,
                        gained: offer,
                        given: request,
                    })
                })
            })
            .await
    }

    /// Closes one's own open trade and returns the escrowed pins. Unlike
    /// expiry sweeping, this is a must-exist delete: closing a trade that
    /// is not yours or not open is an error the caller needs to see.
    pub async fn close_trade(&self, trade_id: u64, creator: &str) -> Result<(), DbError> {
        let select_trade = format!(
            "SELECT trade_id, creator, offer, request, trade_credits, expiration, status \
             FROM {} WHERE trade_id = ? AND creator = ? AND status = 'Open' FOR UPDATE",
            self.tables.trades
        );
        let select_pins = format!(
            "SELECT brawlers FROM {} WHERE username = ? FOR UPDATE",
            self.tables.users
        );
        let update_pins = format!(
            "UPDATE {} SET brawlers = ? WHERE username = ?",
            self.tables.users
        );
        let delete = format!(
            "DELETE FROM {} WHERE trade_id = ? AND status = 'Open'",
            self.tables.trades
        );
        let creator = creator.to_string();
        self.db
            .transaction(move |conn| {
                Box::pin(async move {
                    let rows: Vec<TradeRow> = fetch_rows_on(
                        &mut *conn,
                        &select_trade,
                        vec![Param::from(trade_id), Param::from(creator.clone())],
                        OnEmpty::Fail(TRADE_MISSING),
                    )
                    .await?;
                    let trade = single(rows, TRADE_MISSING)?;
                    let offer = codec::parse_trade_pins(&trade.offer)?;

                    let mut collection =
                        load_pins_for_update(conn, &select_pins, &creator).await?;
                    add_trade_pins(&mut collection, &offer);
                    let serialized = codec::serialize_pin_collection(&collection)?;
                    execute_on(
                        &mut *conn,
                        &update_pins,
                        vec![Param::from(serialized), Param::from(creator)],
                        OnZeroAffected::Fail("The collection could not be updated."),
                    )
                    .await?;

                    execute_on(
                        &mut *conn,
                        &delete,
                        vec![Param::from(trade_id)],
                        OnZeroAffected::Fail("The trade could not be closed."),
                    )
                    .await?;
                    Ok(())
                })
            })
            .await
    }

    /// Sweeps expired trades. Idempotent by design: a sweep that finds
    /// nothing to delete affected zero rows and that is fine.
    pub async fn delete_expired_trades(&self) -> Result<u64, DbError> {
        let sql = format!(
            "DELETE FROM {} WHERE status = 'Open' AND expiration <= NOW()",
            self.tables.trades
        );
        let mutation = self.db.execute(&sql, vec![], OnZeroAffected::Allow).await?;
        Ok(mutation.rows_affected)
    }

    // ------------------------------------------------------------ mini-games

    /// Records a finished game and credits the earned points in one
    /// transaction: a report without its points (or vice versa) must never
    /// be observable.
    pub async fn save_game_report(
        &self,
        username: &str,
        gamemode: &str,
        score: u32,
        points: u32,
    ) -> Result<u64, DbError> {
        let insert = format!(
            "INSERT INTO {} (username, gamemode, score, played_at) VALUES (?, ?, ?, NOW())",
            self.tables.game_reports
        );
        let credit = format!(
            "UPDATE {} SET points = points + ? WHERE username = ?",
            self.tables.users
        );
        let username = username.to_string();
        let gamemode = gamemode.to_string();
        self.db
            .transaction(move |conn| {
                Box::pin(async move {
                    let inserted = execute_on(
                        &mut *conn,
                        &insert,
                        vec![
                            Param::from(username.clone()),
                            Param::from(gamemode),
                            Param::from(score),
                        ],
                        OnZeroAffected::Fail("The game report could not be saved."),
                    )
                    .await?;
                    execute_on(
                        &mut *conn,
                        &credit,
                        vec![Param::from(points), Param::from(username)],
                        OnZeroAffected::Fail(USER_MISSING),
                    )
                    .await?;
                    Ok(inserted.last_insert_id)
                })
            })
            .await
    }

    pub async fn get_leaderboard(
        &self,
        gamemode: &str,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, DbError> {
        let sql = format!(
            "SELECT username, MAX(score) AS best_score FROM {} WHERE gamemode = ? \
             GROUP BY username ORDER BY best_score DESC LIMIT ?",
            self.tables.game_reports
        );
        self.db
            .fetch_rows(
                &sql,
                vec![Param::from(gamemode), Param::from(limit)],
                OnEmpty::Allow,
            )
            .await
    }

    // ------------------------------------------------------------ challenges

    pub async fn get_challenge(&self, challenge_id: u64) -> Result<Challenge, DbError> {
        let sql = format!(
            "SELECT challenge_id, owner, title, waves FROM {} WHERE challenge_id = ?",
            self.tables.challenges
        );
        let rows: Vec<ChallengeRow> = self
            .db
            .fetch_rows(
                &sql,
                vec![Param::from(challenge_id)],
                OnEmpty::Fail("Could not find the challenge."),
            )
            .await?;
        let row = single(rows, "Could not find the challenge.")?;
        Ok(Challenge {
            challenge_id: row.challenge_id,
            owner: row.owner,
            title: row.title,
            waves: codec::parse_challenge_waves(&row.waves)?,
        })
    }

    pub async fn create_challenge(
        &self,
        owner: &str,
        title: &str,
        waves: &[ChallengeWave],
    ) -> Result<u64, DbError> {
        let sql = format!(
            "INSERT INTO {} (owner, title, waves) VALUES (?, ?, ?)",
            self.tables.challenges
        );
        let mutation = self
            .db
            .execute(
                &sql,
                vec![
                    Param::from(owner),
                    Param::from(title),
                    Param::from(codec::serialize_challenge_waves(waves)?),
                ],
                OnZeroAffected::Fail("The challenge could not be created."),
            )
            .await?;
        Ok(mutation.last_insert_id)
    }

    // ---------------------------------------------------------------- shop

    pub async fn list_cosmetics(&self) -> Result<Vec<Cosmetic>, DbError> {
        let sql = format!("SELECT name, cost FROM {} ORDER BY cost ASC", self.tables.cosmetics);
        self.db.fetch_rows(&sql, vec![], OnEmpty::Allow).await
    }

    /// Buys a cosmetic: the guarded coin deduction and the unlock land
    /// together or not at all. The `coins >= cost` guard makes "cannot
    /// afford" visible as a zero-affected update.
    pub async fn purchase_cosmetic(&self, username: &str, name: &str) -> Result<(), DbError> {
        let select_cost = format!(
            "SELECT name, cost FROM {} WHERE name = ? FOR UPDATE",
            self.tables.cosmetics
        );
        let charge = format!(
            "UPDATE {} SET coins = coins - ? WHERE username = ? AND coins >= ?",
            self.tables.users
        );
        let select_avatars = format!(
            "SELECT avatars FROM {} WHERE username = ? FOR UPDATE",
            self.tables.users
        );
        let unlock = format!(
            "UPDATE {} SET avatars = ? WHERE username = ?",
            self.tables.users
        );
        let username = username.to_string();
        let name = name.to_string();
        self.db
            .transaction(move |conn| {
                Box::pin(async move {
                    let rows: Vec<Cosmetic> = fetch_rows_on(
                        &mut *conn,
                        &select_cost,
                        vec![Param::from(name.clone())],
                        OnEmpty::Fail("Could not find this item in the shop."),
                    )
                    .await?;
                    let cosmetic = single(rows, "Could not find this item in the shop.")?;

                    let avatar_rows: Vec<AvatarsRow> = fetch_rows_on(
                        &mut *conn,
                        &select_avatars,
                        vec![Param::from(username.clone())],
                        OnEmpty::Fail(USER_MISSING),
                    )
                    .await?;
                    let avatars_row = single(avatar_rows, USER_MISSING)?;
                    let mut avatars = codec::parse_string_list(&avatars_row.avatars)?;
                    if avatars.contains(&name) {
                        return Err(DbError::NoUpdate("You already own this item.".to_string()));
                    }

                    execute_on(
                        &mut *conn,
                        &charge,
                        vec![
                            Param::from(cosmetic.cost),
                            Param::from(username.clone()),
                            Param::from(cosmetic.cost),
                        ],
                        OnZeroAffected::Fail("You cannot afford this item!"),
                    )
                    .await?;

                    avatars.push(name);
                    let serialized = serde_json::to_string(&avatars)
                        .map_err(|_| DbError::MalformedData("String list"))?;
                    execute_on(
                        &mut *conn,
                        &unlock,
                        vec![Param::from(serialized), Param::from(username)],
                        OnZeroAffected::Fail("The purchase could not be saved."),
                    )
                    .await?;
                    Ok(())
                })
            })
            .await
    }
}

#[derive(Debug, Clone, FromRow)]
struct AvatarsRow {
    avatars: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_reports_the_call_sites_message() {
        let err = single(Vec::<CredentialsRow>::new(), USER_MISSING).unwrap_err();
        assert!(matches!(err, DbError::EmptyResults(msg) if msg == USER_MISSING));
    }

    #[test]
    fn trade_materialization_rejects_malformed_pin_columns() {
        let row = TradeRow {
            trade_id: 1,
            creator: "frank".to_string(),
            offer: "not json".to_string(),
            request: "[]".to_string(),
            trade_credits: 0,
            expiration: Utc::now(),
            status: "Open".to_string(),
        };
        assert!(matches!(
            Trade::from_row(row),
            Err(DbError::MalformedData("Trade pins"))
        ));
    }
}
