use srm::prelude::*;
use srm::qualified_table_name;
use srm_sqlite::SqliteProvider;

#[derive(Entity, Debug, Clone, Default, PartialEq)]
struct Master1 {
    #[srm(schema = "harness")]
    id: i64,
    name: String,
}

#[derive(Entity, Debug, Clone, Default, PartialEq)]
struct Master2 {
    #[srm(schema = "harness")]
    id: i64,
    name: String,
}

#[derive(Entity, Debug, Clone, Default, PartialEq)]
struct Detail {
    #[srm(schema = "harness")]
    id: i64,
    master1: Master1,
    master2: Master2,
    name: String,
    #[srm(precision = "10,2")]
    amount: Decimal,
}

#[derive(Entity, Debug, Clone, Default, PartialEq)]
struct YetAnother {
    #[srm(schema = "harness")]
    id: i64,
    detail: Detail,
    name: String,
    date: Date,
    time: Time,
    timestamp: Timestamp,
    double: f64,
}

#[derive(Entity, Debug, Clone, Default, PartialEq)]
struct Note {
    id: i64,
    #[srm(len = 20)]
    text: String,
    count: i32,
}

fn manager(dir: &tempfile::TempDir) -> Manager<SqliteProvider> {
    let path = dir.path().join("harness.db");
    let config = DatabaseConfig::new()
        .database(path.to_string_lossy())
        .schema("harness");
    Manager::new(config, SqliteProvider::new())
}

struct Fixture {
    a: Master1,
    b: Master1,
    c: Master1,
    x: Master2,
    d1: Detail,
    d2: Detail,
    ya: YetAnother,
}

fn populate(manager: &Manager<SqliteProvider>) -> Fixture {
    manager
        .transactional(|tx| {
            let mut a = Master1 { id: 0, name: "A".to_string() };
            let mut b = Master1 { id: 0, name: "B".to_string() };
            let mut c = Master1 { id: 0, name: "C".to_string() };
            tx.persist(&mut a)?;
            tx.persist(&mut b)?;
            tx.persist(&mut c)?;
            let mut x = Master2 { id: 0, name: "X".to_string() };
            tx.persist(&mut x)?;

            let mut d1 = Detail {
                id: 0,
                master1: a.clone(),
                master2: x.clone(),
                name: "D1".to_string(),
                amount: Decimal::new("12.50"),
            };
            let mut d2 = Detail {
                id: 0,
                master1: b.clone(),
                master2: x.clone(),
                name: "D2".to_string(),
                amount: Decimal::new("0.10"),
            };
            tx.persist(&mut d1)?;
            tx.persist(&mut d2)?;

            let mut ya = YetAnother {
                id: 0,
                detail: d1.clone(),
                name: "Y A".to_string(),
                date: Date(19_000),
                time: Time(3_600_000_000),
                timestamp: Timestamp(1_700_000_000_000_000),
                double: 0.25,
            };
            tx.persist(&mut ya)?;

            Ok(Fixture { a, b, c, x, d1, d2, ya })
        })
        .unwrap()
}

#[test]
fn create_tables_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);

    let created = manager.create_tables(&[YetAnother::descriptor()]).unwrap();
    assert_eq!(
        created,
        vec![
            "harness.master2",
            "harness.master1",
            "harness.detail",
            "harness.yetanother",
        ]
    );
    let again = manager
        .create_tables(&[YetAnother::descriptor(), Master1::descriptor()])
        .unwrap();
    assert!(again.is_empty());
}

#[test]
fn persisted_masters_come_back_once_each() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);
    manager.create_tables(&[YetAnother::descriptor()]).unwrap();
    let fixture = populate(&manager);

    assert_eq!((fixture.a.id, fixture.b.id, fixture.c.id), (1, 2, 3));
    assert_eq!(fixture.x.id, 1);

    let masters = manager
        .transactional(|tx| tx.query::<Master1>("order by o.id", &[]))
        .unwrap();
    assert_eq!(masters, vec![fixture.a, fixture.b, fixture.c]);
}

#[test]
fn query_by_reference_loads_nested_values() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);
    manager.create_tables(&[YetAnother::descriptor()]).unwrap();
    let fixture = populate(&manager);

    manager
        .transactional(|tx| {
            let details = tx.query::<Detail>("where o_master1.id = $1", &[Value::BigInt(1)])?;
            assert_eq!(details, vec![fixture.d1.clone()]);
            assert_eq!(details[0].master1.name, "A");
            assert_eq!(details[0].master2.name, "X");
            assert_eq!(details[0].amount, Decimal::new("12.50"));

            let nested =
                tx.query::<YetAnother>("where o_detail_master1.id = $1", &[Value::BigInt(1)])?;
            assert_eq!(nested, vec![fixture.ya.clone()]);
            assert_eq!(nested[0].detail.master1.name, "A");

            let none = tx.query::<Detail>("where o_master1.id = $1", &[Value::BigInt(3)])?;
            assert!(none.is_empty());
            Ok(())
        })
        .unwrap();
}

#[test]
fn find_update_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);
    manager.create_tables(&[YetAnother::descriptor()]).unwrap();
    let fixture = populate(&manager);

    manager
        .transactional(|tx| {
            assert_eq!(tx.find::<Detail>(fixture.d2.id)?, Some(fixture.d2.clone()));
            assert_eq!(tx.find::<Detail>(99)?, None);

            let mut d2 = fixture.d2.clone();
            d2.name = "D2'".to_string();
            d2.master1 = fixture.c.clone();
            d2.amount = Decimal::new("100.00");
            tx.update(&d2)?;
            assert_eq!(tx.find::<Detail>(d2.id)?, Some(d2.clone()));

            tx.delete(&d2)?;
            assert_eq!(tx.find::<Detail>(d2.id)?, None);
            Ok(())
        })
        .unwrap();
}

#[test]
fn rolled_back_work_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);
    manager.create_tables(&[Master1::descriptor()]).unwrap();

    let err = manager
        .transactional::<(), _>(|tx| {
            let mut a = Master1 { id: 0, name: "A".to_string() };
            tx.persist(&mut a)?;
            Err(Error::Query("abandon".to_string()))
        })
        .unwrap_err();
    assert!(matches!(err, Error::Query(_)));

    let masters = manager
        .transactional(|tx| tx.query::<Master1>("", &[]))
        .unwrap();
    assert!(masters.is_empty());
}

#[test]
fn multi_query_leaves_unmatched_templates_empty() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);
    manager.create_tables(&[YetAnother::descriptor()]).unwrap();
    let fixture = populate(&manager);

    let rows = manager
        .transactional(|tx| {
            tx.query_multi(
                &[
                    Master1::descriptor(),
                    Detail::descriptor(),
                    YetAnother::descriptor(),
                ],
                &left_outer("o2.master1_id = o1.id").left_outer("o3.detail_id = o2.id"),
                "order by o1.id",
                &[],
            )
        })
        .unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get::<Master1>(0).unwrap(), Some(fixture.a.clone()));
    assert_eq!(rows[0].get::<Detail>(1).unwrap(), Some(fixture.d1.clone()));
    assert_eq!(rows[0].get::<YetAnother>(2).unwrap(), Some(fixture.ya.clone()));

    assert_eq!(rows[1].get::<Detail>(1).unwrap(), Some(fixture.d2.clone()));
    assert_eq!(rows[1].get::<YetAnother>(2).unwrap(), None);

    assert_eq!(rows[2].get::<Master1>(0).unwrap(), Some(fixture.c.clone()));
    assert_eq!(rows[2].get::<Detail>(1).unwrap(), None);
    assert_eq!(rows[2].get::<YetAnother>(2).unwrap(), None);

    assert!(rows[0].get::<Detail>(0).is_err());
}

#[test]
fn untagged_entities_use_the_main_database() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);
    assert_eq!(qualified_table_name(Note::descriptor()), "note");
    manager.create_tables(&[Note::descriptor()]).unwrap();

    let found = manager
        .transactional(|tx| {
            let mut note = Note {
                id: 0,
                text: "hello".to_string(),
                count: 3,
            };
            tx.persist(&mut note)?;
            let filter = Filter::new(Expr::col("o.count").ge(2_i32));
            tx.query_where::<Note>(&filter)
        })
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].text, "hello");
}
