use std::cell::Cell;
use std::sync::{Arc, Mutex};

use srm::prelude::*;
use srm::{PreparedStatement, Row};

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
}

type Log = Arc<Mutex<Vec<String>>>;

/// Records every call; raw queries succeed only for tables listed in `existing`.
struct CountingConnection {
    log: Log,
    existing: Vec<String>,
    next_statement: Cell<u64>,
}

impl CountingConnection {
    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

impl Connection for CountingConnection {
    fn begin(&self) -> Result<()> {
        self.record("begin".to_string());
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.record("commit".to_string());
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.record("rollback".to_string());
        Ok(())
    }

    fn prepare(&self, sql: &str) -> Result<PreparedStatement> {
        self.record(format!("prepare {sql}"));
        let id = self.next_statement.get() + 1;
        self.next_statement.set(id);
        Ok(PreparedStatement::new(id, sql, sql.matches('$').count()))
    }

    fn query_prepared(&self, stmt: &PreparedStatement, params: &[Value]) -> Result<Vec<Row>> {
        self.record(format!("query #{} {:?}", stmt.id(), params));
        Ok(Vec::new())
    }

    fn execute_prepared(&self, stmt: &PreparedStatement, params: &[Value]) -> Result<u64> {
        self.record(format!("execute #{} {:?}", stmt.id(), params));
        Ok(1)
    }

    fn query(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
        self.record(format!("raw query {sql}"));
        let found = self
            .existing
            .iter()
            .any(|table| sql == format!("select * from {table} where 1 = 2"));
        if found {
            Ok(Vec::new())
        } else {
            Err(Error::execution(sql, "no such table"))
        }
    }

    fn execute(&self, sql: &str, _params: &[Value]) -> Result<u64> {
        self.record(format!("raw execute {sql}"));
        Ok(0)
    }
}

#[derive(Default)]
struct CountingProvider {
    log: Log,
    existing: Vec<String>,
}

impl ConnectionProvider for CountingProvider {
    type Connection = CountingConnection;

    fn open(&self, _config: &DatabaseConfig) -> Result<CountingConnection> {
        self.log.lock().unwrap().push("open".to_string());
        Ok(CountingConnection {
            log: Arc::clone(&self.log),
            existing: self.existing.clone(),
            next_statement: Cell::new(0),
        })
    }
}

fn manager(existing: &[&str]) -> (Manager<CountingProvider>, Log) {
    let log = Log::default();
    let provider = CountingProvider {
        log: Arc::clone(&log),
        existing: existing.iter().map(|s| s.to_string()).collect(),
    };
    (Manager::new(DatabaseConfig::new(), provider), log)
}

fn entries(log: &Log, prefix: &str) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|e| e.starts_with(prefix))
        .cloned()
        .collect()
}

#[test]
fn same_condition_prepares_once_for_different_values() {
    let (manager, log) = manager(&[]);
    let tx = manager.start_transaction().unwrap();

    tx.query::<Detail>("where o_master1.id = $1", &[Value::BigInt(1)])
        .unwrap();
    tx.query::<Detail>("where o_master1.id = $1", &[Value::BigInt(2)])
        .unwrap();
    assert_eq!(entries(&log, "prepare").len(), 1);
    assert_eq!(entries(&log, "query #1").len(), 2);

    tx.query::<Detail>("where o_master2.id = $1", &[Value::BigInt(2)])
        .unwrap();
    assert_eq!(entries(&log, "prepare").len(), 2);

    let info = tx.debug_info();
    assert_eq!(info.trees, 1);
    assert_eq!(info.statements, 2);
    tx.commit().unwrap();
}

#[test]
fn filters_share_a_statement() {
    let (manager, log) = manager(&[]);
    let tx = manager.start_transaction().unwrap();

    for name in ["A", "B", "C"] {
        let filter = Filter::new(Expr::col("o.name").eq(name)).order_by("o.id", Order::Asc);
        tx.query_where::<Master1>(&filter).unwrap();
    }
    let prepares = entries(&log, "prepare");
    assert_eq!(prepares.len(), 1);
    assert!(prepares[0].ends_with("where o.name = $1 order by o.id asc"));
    tx.commit().unwrap();
}

#[test]
fn persist_allocates_ids_and_reuses_insert() {
    let (manager, log) = manager(&[]);
    let tx = manager.start_transaction().unwrap();

    let mut ids = Vec::new();
    for name in ["A", "B", "C"] {
        let mut master = Master1 {
            id: 0,
            name: name.to_string(),
        };
        tx.persist(&mut master).unwrap();
        ids.push(master.id);
    }
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(
        entries(&log, "prepare"),
        vec!["prepare insert into harness.master1 (id, name) values ($1, $2)".to_string()]
    );
    assert_eq!(entries(&log, "execute").len(), 3);
    tx.commit().unwrap();
}

#[test]
fn sequences_are_shared_across_transactions() {
    let (manager, _log) = manager(&[]);
    let first = manager
        .transactional(|tx| {
            let mut master = Master1::default();
            tx.persist(&mut master)?;
            Ok(master.id)
        })
        .unwrap();
    let second = manager
        .transactional(|tx| {
            let mut master = Master1::default();
            tx.persist(&mut master)?;
            Ok(master.id)
        })
        .unwrap();
    assert_eq!((first, second), (1, 2));
}

#[test]
fn transactional_commits_on_ok_and_rolls_back_on_err() {
    let (manager, log) = manager(&[]);

    manager.transactional(|_tx| Ok(())).unwrap();
    assert_eq!(entries(&log, "commit").len(), 1);

    let err = manager
        .transactional::<(), _>(|_tx| Err(Error::Query("boom".to_string())))
        .unwrap_err();
    assert_eq!(err, Error::Query("boom".to_string()));
    assert_eq!(entries(&log, "commit").len(), 1);
    assert_eq!(entries(&log, "rollback").len(), 1);
}

#[test]
fn dropped_transaction_rolls_back() {
    let (manager, log) = manager(&[]);
    {
        let _tx = manager.start_transaction().unwrap();
    }
    assert_eq!(entries(&log, "rollback"), vec!["rollback".to_string()]);
}

#[test]
fn create_tables_skips_existing_tables() {
    let (manager, log) = manager(&["harness.master1"]);

    let created = manager.create_tables(&[Detail::descriptor()]).unwrap();
    assert_eq!(created, vec!["harness.master2", "harness.detail"]);

    let probes = entries(&log, "raw query");
    assert_eq!(probes.len(), 3);
    let creates = entries(&log, "raw execute");
    assert_eq!(creates.len(), 2);
    assert!(creates[0].starts_with("raw execute create table harness.master2 ("));
    assert!(creates[1].contains("foreign key (master1_id) references harness.master1 (id)"));

    // Probe connection first, then one transaction for the creates.
    let log = log.lock().unwrap();
    assert_eq!(log.iter().filter(|e| *e == "open").count(), 2);
    assert_eq!(log.last().map(String::as_str), Some("commit"));
}

#[test]
fn create_tables_without_missing_tables_opens_no_transaction() {
    let (manager, log) = manager(&["harness.master1"]);
    let created = manager.create_tables(&[Master1::descriptor()]).unwrap();
    assert!(created.is_empty());
    assert!(entries(&log, "begin").is_empty());
}
