//! Repository integration tests against a real MySQL server.
//!
//! Gated the same way as the statement-level tests: they run only when
//! `BRAWLHUB_TEST_DB` is set and are a no-op otherwise. Each test owns a
//! distinct username so the tests can run concurrently against one schema.

use configuration::TableSettings;
use core_types::TradePin;
use database::{Db, DbError, OnZeroAffected, Param, PoolState, Repository};

async fn test_repo() -> Option<(Db, Repository, TableSettings)> {
    if std::env::var("BRAWLHUB_TEST_DB").is_err() {
        return None;
    }
    let settings = configuration::load_settings().expect("test settings should load");
    let db = Db::connect(&settings.database)
        .await
        .expect("test database should be reachable");
    assert_eq!(db.state(), PoolState::Ready);

    let tables = settings.tables;
    let schema = [
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             username VARCHAR(32) PRIMARY KEY, \
             password_hash VARCHAR(128) NOT NULL, \
             active_avatar VARCHAR(64) NOT NULL, \
             brawlers TEXT NOT NULL, \
             avatars TEXT NOT NULL, \
             wild_card_pins TEXT NOT NULL, \
             badges TEXT NOT NULL, \
             tokens INT UNSIGNED NOT NULL DEFAULT 0, \
             token_doubler INT UNSIGNED NOT NULL DEFAULT 0, \
             coins INT UNSIGNED NOT NULL DEFAULT 0, \
             trade_credits INT UNSIGNED NOT NULL DEFAULT 0, \
             points INT UNSIGNED NOT NULL DEFAULT 0) ENGINE=InnoDB",
            tables.users
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             token VARCHAR(64) PRIMARY KEY, \
             username VARCHAR(32) NOT NULL, \
             created_at TIMESTAMP NOT NULL) ENGINE=InnoDB",
            tables.sessions
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             trade_id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY, \
             creator VARCHAR(32) NOT NULL, \
             acceptor VARCHAR(32) NULL, \
             offer TEXT NOT NULL, \
             request TEXT NOT NULL, \
             trade_credits INT UNSIGNED NOT NULL, \
             expiration TIMESTAMP NOT NULL, \
             status VARCHAR(16) NOT NULL) ENGINE=InnoDB",
            tables.trades
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             name VARCHAR(64) PRIMARY KEY, \
             cost INT UNSIGNED NOT NULL) ENGINE=InnoDB",
            tables.cosmetics
        ),
    ];
    for ddl in &schema {
        db.execute(ddl, vec![], OnZeroAffected::Allow)
            .await
            .expect("schema");
    }

    let repo = Repository::new(db.clone(), tables.clone());
    Some((db, repo, tables))
}

/// Removes every row a test user may have left behind in a previous run.
async fn wipe_user(db: &Db, tables: &TableSettings, username: &str) {
    let cleanup = [
        format!("DELETE FROM {} WHERE username = ?", tables.users),
        format!("DELETE FROM {} WHERE username = ?", tables.sessions),
        format!("DELETE FROM {} WHERE creator = ?", tables.trades),
    ];
    for sql in &cleanup {
        db.execute(sql, vec![Param::from(username)], OnZeroAffected::Allow)
            .await
            .expect("cleanup");
    }
}

#[tokio::test]
async fn account_and_session_lifecycle() {
    let Some((db, repo, tables)) = test_repo().await else { return };
    wipe_user(&db, &tables, "session-tester").await;

    repo.create_user("session-tester", "hash-one")
        .await
        .expect("fresh signup");

    // A taken username surfaces as the classified duplicate response.
    let taken = repo.create_user("session-tester", "hash-two").await.unwrap_err();
    assert_eq!(
        taken.classify(),
        (401, "Username (or something else) already exists.".to_string())
    );

    let credentials = repo.get_credentials("session-tester").await.expect("credentials");
    assert_eq!(credentials.username, "session-tester");
    assert_eq!(credentials.password_hash, "hash-one");

    let unknown = repo.get_credentials("no-such-user").await.unwrap_err();
    assert!(matches!(unknown, DbError::EmptyResults(_)));

    repo.create_session("session-tester", "session-tester-token")
        .await
        .expect("session insert");
    assert_eq!(
        repo.resolve_session("session-tester-token").await.expect("lookup").as_deref(),
        Some("session-tester")
    );

    // Logout is idempotent; a second delete affects nothing and succeeds.
    repo.delete_session("session-tester-token").await.expect("first delete");
    repo.delete_session("session-tester-token").await.expect("second delete");
    assert_eq!(repo.resolve_session("session-tester-token").await.expect("lookup"), None);
}

#[tokio::test]
async fn reward_pins_land_in_the_collection_and_expired_trades_get_swept() {
    let Some((db, repo, tables)) = test_repo().await else { return };
    wipe_user(&db, &tables, "sweep-tester").await;
    repo.create_user("sweep-tester", "hash").await.expect("signup");

    let drops = vec![TradePin {
        brawler: "bull".to_string(),
        pin: "angry".to_string(),
        amount: 2,
    }];
    repo.add_reward_pins("sweep-tester", drops.clone())
        .await
        .expect("reward grant");
    let collection = repo.get_collection("sweep-tester").await.expect("collection");
    assert_eq!(collection.pins["bull"]["angry"], 2);

    // A zero-hour trade expires the moment it is created.
    let trade_id = repo
        .create_trade("sweep-tester", drops, vec![], 0, 0)
        .await
        .expect("trade insert");
    assert!(trade_id > 0);

    assert!(repo.delete_expired_trades().await.expect("sweep") >= 1);
    let gone = repo.get_trade(trade_id).await.unwrap_err();
    assert!(matches!(gone, DbError::EmptyResults(_)));

    // A sweep that finds nothing affects zero rows and still succeeds.
    assert_eq!(repo.delete_expired_trades().await.expect("idle sweep"), 0);
}

#[tokio::test]
async fn purchases_charge_the_locked_price_exactly_once() {
    let Some((db, repo, tables)) = test_repo().await else { return };
    wipe_user(&db, &tables, "shop-tester").await;
    repo.create_user("shop-tester", "hash").await.expect("signup");

    let fund = format!("UPDATE {} SET coins = 100 WHERE username = ?", tables.users);
    db.execute(&fund, vec![Param::from("shop-tester")], OnZeroAffected::Allow)
        .await
        .expect("funding");
    let stock = format!(
        "INSERT INTO {} (name, cost) VALUES (?, ?) ON DUPLICATE KEY UPDATE cost = VALUES(cost)",
        tables.cosmetics
    );
    for (name, cost) in [("shop-test-crown", 40u32), ("shop-test-throne", 500u32)] {
        db.execute(
            &stock,
            vec![Param::from(name), Param::from(cost)],
            OnZeroAffected::Allow,
        )
        .await
        .expect("stocking");
    }

    repo.purchase_cosmetic("shop-tester", "shop-test-crown")
        .await
        .expect("purchase");
    let profile = repo.get_profile("shop-tester").await.expect("profile");
    assert_eq!(profile.coins, 60);
    let collection = repo.get_collection("shop-tester").await.expect("collection");
    assert!(collection.avatars.contains(&"shop-test-crown".to_string()));

    let again = repo.purchase_cosmetic("shop-tester", "shop-test-crown").await.unwrap_err();
    assert!(matches!(again, DbError::NoUpdate(msg) if msg == "You already own this item."));

    let broke = repo.purchase_cosmetic("shop-tester", "shop-test-throne").await.unwrap_err();
    assert_eq!(broke.classify(), (500, "You cannot afford this item!".to_string()));

    let missing = repo.purchase_cosmetic("shop-tester", "no-such-item").await.unwrap_err();
    assert_eq!(missing.classify().0, 404);
}
