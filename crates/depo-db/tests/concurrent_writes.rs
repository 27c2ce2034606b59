//! Parallel writers against a file-backed database.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use depo_core::{
    NewCustomer, NewRack, RackStatus, Season, TireAttributes, TireStatus, TreadCondition,
};
use depo_db::{Database, DbConfig, DbError};

/// Database file under the system temp dir, removed with its WAL files.
struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new(name: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "depo-{name}-{}-{nanos}.db",
            std::process::id()
        ));
        TempDb { path }
    }

    async fn open(&self) -> Database {
        Database::new(DbConfig::new(self.path.clone()).max_connections(5))
            .await
            .unwrap()
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

async fn setup(db: &Database) -> (i64, i64) {
    let customer = db
        .customers()
        .create(&NewCustomer {
            name: "Ali Veli".to_string(),
            phone: "05551112233".to_string(),
            plate: "34 ABC 123".to_string(),
        })
        .await
        .unwrap();
    let rack = db
        .racks()
        .create(&NewRack {
            code: "A-1".to_string(),
            note: None,
        })
        .await
        .unwrap();
    (customer.id, rack.id)
}

fn tire(customer_id: i64, rack_id: i64) -> TireAttributes {
    TireAttributes {
        customer_id,
        rack_id,
        brand: "Michelin".to_string(),
        size: "205/55 R16".to_string(),
        season: Season::Winter,
        condition: TreadCondition::Good,
        note: None,
        slots: vec![],
        entry_at: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_creates_get_distinct_serials() {
    let file = TempDb::new("parallel-create");
    let db = file.open().await;
    let (customer_id, rack_id) = setup(&db).await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let tires = db.tires();
            let attrs = tire(customer_id, rack_id);
            tokio::spawn(async move { tires.create(&attrs).await })
        })
        .collect();

    let mut serials = Vec::new();
    for handle in handles {
        let created = handle.await.unwrap().unwrap();
        assert_eq!(created.status, TireStatus::InDepot);
        serials.push(created.serial_no);
    }
    serials.sort_unstable();

    assert_eq!(serials, (1..=20).collect::<Vec<i64>>());
    assert_eq!(db.tires().count().await.unwrap(), 20);
    assert_eq!(db.tires().max_serial().await.unwrap(), Some(20));
    assert_eq!(db.racks().get_by_id(rack_id).await.unwrap().status, RackStatus::Full);

    db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_exits_of_one_tire_succeed_once() {
    let file = TempDb::new("parallel-exit");
    let db = file.open().await;
    let (customer_id, rack_id) = setup(&db).await;
    let id = db.tires().create(&tire(customer_id, rack_id)).await.unwrap().id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tires = db.tires();
            tokio::spawn(async move { tires.exit(id, None).await })
        })
        .collect();

    let mut exited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(tire) => {
                assert_eq!(tire.status, TireStatus::Exited);
                exited += 1;
            }
            Err(err) => assert!(matches!(err, DbError::InvalidState(_)), "{err}"),
        }
    }

    assert_eq!(exited, 1);
    assert_eq!(db.history().count().await.unwrap(), 1);
    assert_eq!(db.racks().get_by_id(rack_id).await.unwrap().status, RackStatus::Empty);

    db.close().await;
}
