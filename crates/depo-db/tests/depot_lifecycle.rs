//! End-to-end depot flows against an in-memory database.

use depo_core::search::{CustomerQuery, HistoryQuery, TireQuery};
use depo_core::{
    HistoryAction, NewCustomer, NewRack, RackStatus, SearchContext, Season, StatusFilter,
    TireAttributes, TireSlot, TireStatus, TreadCondition,
};
use depo_db::{Database, DbConfig, DbError, ErrorKind};

async fn open() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn customer(db: &Database, name: &str) -> i64 {
    db.customers()
        .create(&NewCustomer {
            name: name.to_string(),
            phone: "05551112233".to_string(),
            plate: "34 ABC 123".to_string(),
        })
        .await
        .unwrap()
        .id
}

async fn rack(db: &Database, code: &str) -> i64 {
    db.racks()
        .create(&NewRack {
            code: code.to_string(),
            note: None,
        })
        .await
        .unwrap()
        .id
}

fn tire(customer_id: i64, rack_id: i64) -> TireAttributes {
    TireAttributes {
        customer_id,
        rack_id,
        brand: "Michelin".to_string(),
        size: "225/45 R17".to_string(),
        season: Season::Winter,
        condition: TreadCondition::Good,
        note: None,
        slots: vec![
            TireSlot {
                size: Some("225/45 R17".to_string()),
                production_year: Some("0123".to_string()),
                brand: None,
                season: None,
            },
            TireSlot {
                size: Some("225/45 R17".to_string()),
                production_year: Some("0223".to_string()),
                brand: Some("Pirelli".to_string()),
                season: Some(Season::AllSeason),
            },
        ],
        entry_at: None,
    }
}

async fn rack_status(db: &Database, id: i64) -> RackStatus {
    db.racks().get_by_id(id).await.unwrap().status
}

#[tokio::test]
async fn exit_frees_rack_and_records_history() {
    let db = open().await;
    let c1 = customer(&db, "Ali Veli").await;
    let r1 = rack(&db, "R-1").await;
    assert_eq!(rack_status(&db, r1).await, RackStatus::Empty);

    let t1 = db.tires().create(&tire(c1, r1)).await.unwrap();
    assert_eq!(t1.serial_no, 1);
    assert_eq!(rack_status(&db, r1).await, RackStatus::Full);

    let exited = db.tires().exit(t1.id, None).await.unwrap();
    assert_eq!(exited.status, TireStatus::Exited);
    assert_eq!(rack_status(&db, r1).await, RackStatus::Empty);

    let ctx = SearchContext::local();
    let rows = db.history().search(&HistoryQuery::default(), &ctx).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record.action, HistoryAction::Exit);
    assert_eq!(rows[0].record.old_serial_no(), 1);
    assert_eq!(rows[0].record.new_serial_no(), None);
    assert_eq!(rows[0].record.rack_code, "R-1");
    assert_eq!(rows[0].record.old.slots.len(), 2);
    assert_eq!(rows[0].record.old.slots[0].brand, "Michelin");
    assert_eq!(rows[0].record.old.slots[1].brand, "Pirelli");
}

#[tokio::test]
async fn replace_keeps_old_rack_and_links_serials() {
    let db = open().await;
    let c1 = customer(&db, "Ali Veli").await;
    let r1 = rack(&db, "R-1").await;
    let r2 = rack(&db, "R-2").await;

    let t1 = db.tires().create(&tire(c1, r1)).await.unwrap();
    db.tires().exit(t1.id, None).await.unwrap();

    let t2 = db.tires().create(&tire(c1, r1)).await.unwrap();
    assert_eq!(t2.serial_no, 2);

    let mut summer = tire(c1, r2);
    summer.season = Season::Summer;
    summer.brand = "Lassa".to_string();
    let t3 = db
        .tires()
        .replace(t2.id, &summer, Some("yazlık takıldı".to_string()))
        .await
        .unwrap();

    assert_eq!(t3.serial_no, 3);
    assert_eq!(t3.status, TireStatus::InDepot);
    assert_eq!(db.tires().get(t2.id).await.unwrap().tire.status, TireStatus::Replaced);
    assert_eq!(rack_status(&db, r1).await, RackStatus::Full);
    assert_eq!(rack_status(&db, r2).await, RackStatus::Full);

    let by_serial = HistoryQuery {
        serial_no: Some(3),
        ..HistoryQuery::default()
    };
    let rows = db
        .history()
        .search(&by_serial, &SearchContext::local())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let record = &rows[0].record;
    assert_eq!(record.action, HistoryAction::Replace);
    assert_eq!(record.old_serial_no(), 2);
    assert_eq!(record.new_serial_no(), Some(3));
    assert_eq!(record.rack_code, "R-2");
    assert_eq!(record.note.as_deref(), Some("yazlık takıldı"));
    assert_eq!(db.history().count().await.unwrap(), 2);
}

#[tokio::test]
async fn refused_exit_changes_nothing() {
    let db = open().await;
    let c1 = customer(&db, "Ali Veli").await;
    let r1 = rack(&db, "R-1").await;
    let r2 = rack(&db, "R-2").await;

    let t1 = db.tires().create(&tire(c1, r1)).await.unwrap();
    let t2 = db.tires().replace(t1.id, &tire(c1, r2), None).await.unwrap();
    let before = db.history().count().await.unwrap();

    let err = db.tires().exit(t1.id, None).await.unwrap_err();
    assert!(matches!(err, DbError::InvalidState(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let err = db.tires().replace(t1.id, &tire(c1, r2), None).await.unwrap_err();
    assert!(matches!(err, DbError::InvalidState(_)));

    assert_eq!(db.tires().get(t1.id).await.unwrap().tire.status, TireStatus::Replaced);
    assert_eq!(db.tires().get(t2.id).await.unwrap().tire.status, TireStatus::InDepot);
    assert_eq!(db.history().count().await.unwrap(), before);
    assert_eq!(db.tires().max_serial().await.unwrap(), Some(2));
}

#[tokio::test]
async fn customer_delete_empties_racks() {
    let db = open().await;
    let owner = customer(&db, "Ali Veli").await;
    let other = customer(&db, "Ayşe Kaya").await;
    let a1 = rack(&db, "A-1").await;
    let a2 = rack(&db, "A-2").await;
    let a3 = rack(&db, "A-3").await;

    db.tires().create(&tire(owner, a1)).await.unwrap();
    let second = db.tires().create(&tire(owner, a2)).await.unwrap();
    db.tires().exit(second.id, None).await.unwrap();
    db.tires().create(&tire(owner, a2)).await.unwrap();
    db.tires().create(&tire(other, a3)).await.unwrap();

    let removed = db.customers().delete(owner).await.unwrap();
    assert_eq!(removed, 3);

    assert_eq!(rack_status(&db, a1).await, RackStatus::Empty);
    assert_eq!(rack_status(&db, a2).await, RackStatus::Empty);
    assert_eq!(rack_status(&db, a3).await, RackStatus::Full);
    assert_eq!(db.tires().count().await.unwrap(), 1);
    assert!(db.tires().list_for_customer(owner).await.unwrap().is_empty());

    // History survives with the customer link cleared.
    let rows = db
        .history()
        .search(&HistoryQuery::default(), &SearchContext::local())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record.customer_id, None);
    assert_eq!(rows[0].record.customer_name, "Ali Veli");

    let empty: Vec<i64> = db.racks().list_empty().await.unwrap().iter().map(|r| r.id).collect();
    assert_eq!(empty, vec![a1, a2]);
}

#[tokio::test]
async fn name_search_folds_turkish_letters() {
    let db = open().await;
    let seyma = customer(&db, "Şeyma Öz").await;
    customer(&db, "Mehmet Yılmaz").await;
    let r1 = rack(&db, "B-1").await;
    db.tires().create(&tire(seyma, r1)).await.unwrap();

    let ctx = SearchContext::local();
    for needle in ["şeyma", "SEYMA", "Şeyma Öz", "seyma oz"] {
        let query = CustomerQuery {
            name: Some(needle.to_string()),
            ..CustomerQuery::default()
        };
        let hits = db.customers().search(&query).await.unwrap();
        assert_eq!(hits.len(), 1, "customer search for {needle}");
        assert_eq!(hits[0].customer.name, "Şeyma Öz");
        assert_eq!(hits[0].in_depot, 1);

        let query = TireQuery {
            customer_name: Some(needle.to_string()),
            ..TireQuery::default()
        };
        let hits = db.tires().search(&query, &ctx).await.unwrap();
        assert_eq!(hits.len(), 1, "tire search for {needle}");
    }

    let query = CustomerQuery {
        name: Some("yilmaz".to_string()),
        ..CustomerQuery::default()
    };
    assert_eq!(db.customers().search(&query).await.unwrap().len(), 1);
}

#[tokio::test]
async fn serials_follow_current_maximum() {
    let db = open().await;
    let c1 = customer(&db, "Ali Veli").await;
    let r1 = rack(&db, "R-1").await;

    let mut serials = Vec::new();
    for _ in 0..3 {
        serials.push(db.tires().create(&tire(c1, r1)).await.unwrap().serial_no);
    }
    assert_eq!(serials, vec![1, 2, 3]);

    let middle = db.tires().get_by_serial(2).await.unwrap();
    db.tires().delete(middle.tire.id).await.unwrap();

    let next = db.tires().create(&tire(c1, r1)).await.unwrap();
    assert_eq!(next.serial_no, 4);

    let all = TireQuery {
        status: StatusFilter::All,
        ..TireQuery::default()
    };
    let hits = db.tires().search(&all, &SearchContext::local()).await.unwrap();
    // One row per customer: the newest set.
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].tire.serial_no, 4);
}

#[tokio::test]
async fn used_rack_stays_undeletable() {
    let db = open().await;
    let c1 = customer(&db, "Ali Veli").await;
    let c2 = customer(&db, "Ayşe Kaya").await;
    let r1 = rack(&db, "R-1").await;
    let r2 = rack(&db, "R-2").await;
    let spare = rack(&db, "R-3").await;

    let t1 = db.tires().create(&tire(c1, r1)).await.unwrap();
    db.tires().exit(t1.id, None).await.unwrap();
    db.tires().create(&tire(c2, r2)).await.unwrap();

    let err = db.racks().delete(r1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Neither the tire row nor its customer going away frees the rack.
    db.tires().delete(t1.id).await.unwrap();
    let err = db.racks().delete(r1).await.unwrap_err();
    assert!(matches!(err, DbError::Conflict { .. }));

    db.customers().delete(c2).await.unwrap();
    assert_eq!(rack_status(&db, r2).await, RackStatus::Empty);
    let err = db.racks().delete(r2).await.unwrap_err();
    assert!(matches!(err, DbError::Conflict { .. }));

    db.racks().delete(spare).await.unwrap();
    assert!(matches!(
        db.racks().get_by_id(spare).await,
        Err(DbError::NotFound { .. })
    ));
    assert_eq!(db.racks().list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn replace_into_missing_rack_rolls_back() {
    let db = open().await;
    let c1 = customer(&db, "Ali Veli").await;
    let r1 = rack(&db, "R-1").await;
    let t1 = db.tires().create(&tire(c1, r1)).await.unwrap();
    db.tires().exit(t1.id, None).await.unwrap();
    let t2 = db.tires().create(&tire(c1, r1)).await.unwrap();

    let tires_before = db.tires().count().await.unwrap();
    let history_before = db.history().count().await.unwrap();

    let err = db.tires().replace(t2.id, &tire(c1, 999), None).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Rack"));

    let old = db.tires().get(t2.id).await.unwrap().tire;
    assert_eq!(old.status, TireStatus::InDepot);
    assert_eq!(old.exit_at, None);
    assert_eq!(rack_status(&db, r1).await, RackStatus::Full);
    assert_eq!(db.tires().count().await.unwrap(), tires_before);
    assert_eq!(db.history().count().await.unwrap(), history_before);
    assert_eq!(db.tires().max_serial().await.unwrap(), Some(t2.serial_no));
}

#[tokio::test]
async fn move_to_missing_rack_rolls_back() {
    let db = open().await;
    let c1 = customer(&db, "Ali Veli").await;
    let r1 = rack(&db, "R-1").await;
    let t1 = db.tires().create(&tire(c1, r1)).await.unwrap();

    let mut moved = tire(c1, 999);
    moved.note = Some("yeni not".to_string());
    let err = db.tires().update(t1.id, &moved).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Rack"));

    let stored = db.tires().get(t1.id).await.unwrap();
    assert_eq!(stored.tire.rack_id, r1);
    assert_eq!(stored.tire.note, None);
    assert_eq!(stored.tire.status, TireStatus::InDepot);
    assert_eq!(stored.rack_code, "R-1");
    assert_eq!(rack_status(&db, r1).await, RackStatus::Full);
}
