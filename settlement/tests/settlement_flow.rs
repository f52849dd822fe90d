//! End-to-end settlement flows: hold then finalize over a real ledger,
//! with the in-memory stores and the mock payment gateway.

use settlement::{
    spawn_notification_sink, GeoPoint, MatchQuery, MemoryRoomStore, MemorySettlementStore,
    NotificationInbox, RecordStatus, Room, RoomPriority, RoomStatus, RoomStore, SettlementEngine,
    SettlementStatus,
};
use std::sync::Arc;
use wallet_core::{Config, FundingGuard, Ledger, MockGateway, Money, RoomId, UserId};

struct World {
    ledger: Arc<Ledger>,
    gateway: Arc<MockGateway>,
    rooms: Arc<MemoryRoomStore>,
    engine: SettlementEngine,
    inbox: NotificationInbox,
    _temp: tempfile::TempDir,
}

async fn world() -> World {
    let temp = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp.path().to_path_buf();

    let ledger = Arc::new(Ledger::open(config).await.unwrap());
    let gateway = Arc::new(MockGateway::new());
    let funding = FundingGuard::new(ledger.clone(), gateway.clone());
    let rooms = Arc::new(MemoryRoomStore::new());
    let records = Arc::new(MemorySettlementStore::new());
    let (notifier, inbox) = spawn_notification_sink(256);

    let engine = SettlementEngine::new(ledger.clone(), funding, rooms.clone(), records, notifier);

    World {
        ledger,
        gateway,
        rooms,
        engine,
        inbox,
        _temp: temp,
    }
}

fn airport_room(estimated: i64) -> Room {
    Room {
        room_id: RoomId::new("airport-1"),
        title: "Station to airport".to_string(),
        host: UserId::new("host"),
        participants: vec![UserId::new("g1"), UserId::new("g2")],
        capacity: 4,
        status: RoomStatus::Open,
        priority: RoomPriority::Time,
        departure: GeoPoint {
            lat: 37.5547,
            lng: 126.9706,
        },
        departure_time: chrono::Utc::now() + chrono::Duration::minutes(30),
        estimated_fare: Some(Money::from_minor(estimated)),
        actual_fare: None,
        settlement_status: SettlementStatus::None,
        no_show_user_ids: vec![],
    }
}

async fn open_accounts(w: &World, balance: i64) {
    for user in ["host", "g1", "g2"] {
        let user = UserId::new(user);
        w.ledger.open_account(user.clone(), Money::ZERO).await.unwrap();
        w.ledger
            .mutate(wallet_core::Mutation::new(
                user,
                Money::from_minor(balance),
                wallet_core::EntryKind::TopUp,
            ))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn full_flow_fare_over_estimate() {
    let w = world().await;
    open_accounts(&w, 5000).await;
    w.rooms.put(airport_room(9000)).unwrap();

    let room_id = RoomId::new("airport-1");

    // Hold: 9000 over 3 members, 3000 each
    let hold = w.engine.hold(&room_id).await.unwrap();
    hold.require_complete().unwrap();
    assert_eq!(hold.per_head, Money::from_minor(3000));
    for user in ["host", "g1", "g2"] {
        assert_eq!(
            w.ledger.get_balance(&UserId::new(user)).await.unwrap(),
            Money::from_minor(2000)
        );
    }

    let records = w.engine.records_for_room(&room_id).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.status == RecordStatus::Pending));

    // Finalize at 12000: 1000 extra per head
    let fin = w
        .engine
        .finalize(&room_id, Money::from_minor(12_000))
        .await
        .unwrap();
    fin.require_complete().unwrap();
    assert_eq!(fin.delta, Money::from_minor(3000));
    assert_eq!(fin.extra_per_head, Money::from_minor(1000));

    for user in ["host", "g1", "g2"] {
        let user = UserId::new(user);
        assert_eq!(
            w.ledger.get_balance(&user).await.unwrap(),
            Money::from_minor(1000)
        );
        assert!(w.ledger.check_balance_conservation(&user).await.unwrap());
    }

    let room = w.rooms.get(&room_id).unwrap().unwrap();
    assert_eq!(room.settlement_status, SettlementStatus::Settled);
    assert_eq!(room.actual_fare, Some(Money::from_minor(12_000)));

    // Net paid covers the actual fare exactly
    let net: Money = w
        .engine
        .records_for_room(&room_id)
        .unwrap()
        .iter()
        .map(|r| r.net_amount)
        .sum();
    assert_eq!(net, Money::from_minor(12_000));
}

#[tokio::test]
async fn full_flow_fare_under_estimate() {
    let w = world().await;
    open_accounts(&w, 5000).await;
    w.rooms.put(airport_room(9000)).unwrap();

    let room_id = RoomId::new("airport-1");
    w.engine.hold(&room_id).await.unwrap();

    // Finalize at 6000: 1000 back per head
    let fin = w
        .engine
        .finalize(&room_id, Money::from_minor(6000))
        .await
        .unwrap();
    fin.require_complete().unwrap();
    assert_eq!(fin.refund_per_head, Money::from_minor(1000));

    for user in ["host", "g1", "g2"] {
        assert_eq!(
            w.ledger.get_balance(&UserId::new(user)).await.unwrap(),
            Money::from_minor(3000)
        );
    }

    let net: Money = w
        .engine
        .records_for_room(&room_id)
        .unwrap()
        .iter()
        .map(|r| r.net_amount)
        .sum();
    assert_eq!(net, Money::from_minor(6000));
}

#[tokio::test]
async fn refund_rounding_remainder_stays_in_pool() {
    let w = world().await;
    open_accounts(&w, 5000).await;
    w.rooms.put(airport_room(9000)).unwrap();

    let room_id = RoomId::new("airport-1");
    w.engine.hold(&room_id).await.unwrap();

    // 2500 back over 3 members floors to 833; 1 stays in the pool
    let fin = w
        .engine
        .finalize(&room_id, Money::from_minor(6500))
        .await
        .unwrap();
    fin.require_complete().unwrap();
    assert_eq!(fin.refund_per_head, Money::from_minor(833));

    let net: Money = w
        .engine
        .records_for_room(&room_id)
        .unwrap()
        .iter()
        .map(|r| r.net_amount)
        .sum();
    assert_eq!(net, Money::from_minor(6501));
    assert!(net >= Money::from_minor(6500));
}

#[tokio::test]
async fn broke_host_is_auto_funded_through_gateway() {
    let w = world().await;
    w.ledger
        .open_account(UserId::new("host"), Money::ZERO)
        .await
        .unwrap();
    w.ledger
        .open_account(UserId::new("g1"), Money::from_minor(5000))
        .await
        .unwrap();
    w.ledger
        .open_account(UserId::new("g2"), Money::from_minor(5000))
        .await
        .unwrap();

    w.rooms.put(airport_room(9000)).unwrap();
    let room_id = RoomId::new("airport-1");

    let hold = w.engine.hold(&room_id).await.unwrap();
    hold.require_complete().unwrap();

    // Gateway charged exactly the host's deficit
    let payments = w.gateway.payments();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount, Money::from_minor(3000));
    assert_eq!(
        w.ledger.get_balance(&UserId::new("host")).await.unwrap(),
        Money::ZERO
    );

    // Finalize over estimate funds the host again
    let fin = w
        .engine
        .finalize(&room_id, Money::from_minor(12_000))
        .await
        .unwrap();
    fin.require_complete().unwrap();
    assert_eq!(w.gateway.payments().len(), 2);
    assert!(w
        .ledger
        .check_balance_conservation(&UserId::new("host"))
        .await
        .unwrap());
}

#[tokio::test]
async fn replayed_phases_move_no_extra_money() {
    let w = world().await;
    open_accounts(&w, 5000).await;
    w.rooms.put(airport_room(9000)).unwrap();

    let room_id = RoomId::new("airport-1");

    w.engine.hold(&room_id).await.unwrap();
    w.engine.hold(&room_id).await.unwrap();
    w.engine.hold(&room_id).await.unwrap();

    for user in ["host", "g1", "g2"] {
        let user = UserId::new(user);
        assert_eq!(
            w.ledger.get_balance(&user).await.unwrap(),
            Money::from_minor(2000)
        );
        // One top-up plus one deposit entry despite three runs
        assert_eq!(w.ledger.entries_for_user(&user).await.unwrap().len(), 2);
    }
}

#[tokio::test]
async fn members_are_notified_each_phase() {
    let w = world().await;
    open_accounts(&w, 5000).await;
    w.rooms.put(airport_room(9000)).unwrap();

    let room_id = RoomId::new("airport-1");
    w.engine.hold(&room_id).await.unwrap();
    w.engine
        .finalize(&room_id, Money::from_minor(9000))
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    for user in ["host", "g1", "g2"] {
        let messages = w.inbox.for_user(&UserId::new(user));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].title, "Deposit held");
        assert_eq!(messages[1].title, "Room settled");
        assert_eq!(
            messages[0].metadata.get("room_id").map(String::as_str),
            Some("airport-1")
        );
    }
}

#[tokio::test]
async fn matched_room_settles_end_to_end() {
    let w = world().await;
    open_accounts(&w, 5000).await;
    w.rooms.put(airport_room(9000)).unwrap();

    // A rider finds the room near Seoul Station, then the ride settles
    let query = MatchQuery::near(GeoPoint {
        lat: 37.5547,
        lng: 126.9706,
    });
    let matched = settlement::match_rooms(w.rooms.as_ref(), &query).unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].seats_available(), 1);

    let room_id = matched[0].room_id.clone();
    w.engine.hold(&room_id).await.unwrap();
    let fin = w
        .engine
        .finalize(&room_id, Money::from_minor(10_500))
        .await
        .unwrap();
    fin.require_complete().unwrap();
    assert_eq!(fin.extra_per_head, Money::from_minor(500));
}
