use std::collections::BTreeMap;
use std::sync::Arc;

use stackdb_base::{operation, protocol, transaction, Error, Result};
use stackdb_net::LineChannel;
use stackdb_proto::{Kind, Message};
use stackdb_store::{Table, TableRegistry};
use tracing::{info, info_span, warn};

use crate::stack::OperandStack;

/// What the dispatch loop should do after handling one message.
enum Outcome {
    Continue,
    Close,
}

/// Per-connection state machine (§4.5): `AwaitLogin` is represented by
/// `logged_in == false`; `Idle`/`InTxn` by `in_txn`. `held_locks` is the
/// transaction's lock set, keyed by table name so a table touched twice in
/// one transaction is only acquired once.
pub struct Session {
    channel: Box<dyn LineChannel>,
    registry: Arc<TableRegistry>,
    stack: OperandStack,
    logged_in: bool,
    in_txn: bool,
    held_locks: BTreeMap<String, Arc<Table>>,
}

/// Entry point handed to `stackdb_net::Listener::serve` as the
/// `spawn_session` hook. Runs until the peer disconnects or a fatal
/// protocol error closes the connection.
pub fn run_session(channel: Box<dyn LineChannel>, registry: Arc<TableRegistry>) {
    let peer = channel.peer();
    let span = info_span!("session", peer = %peer);
    let _enter = span.enter();
    Session::new(channel, registry).run();
}

impl Session {
    fn new(channel: Box<dyn LineChannel>, registry: Arc<TableRegistry>) -> Self {
        Session {
            channel,
            registry,
            stack: OperandStack::new(),
            logged_in: false,
            in_txn: false,
            held_locks: BTreeMap::new(),
        }
    }

    fn run(&mut self) {
        info!(target: "stackdb", "session started");
        loop {
            let line = match self.channel.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    warn!(target: "stackdb", %err, "read failed, closing session");
                    break;
                }
            };
            match stackdb_proto::decode(&line) {
                Ok(msg) => {
                    if !self.logged_in && msg.kind != Kind::Login {
                        let _ = self.send(&Message::error("first message must be LOGIN"));
                        break;
                    }
                    match self.handle(msg) {
                        Outcome::Continue => {}
                        Outcome::Close => break,
                    }
                }
                Err(err) => {
                    let _ = self.send(&Message::error(err.client_message()));
                    break;
                }
            }
        }
        info!(target: "stackdb", "session ended");
    }

    fn send(&mut self, msg: &Message) -> Result<()> {
        let line = stackdb_proto::encode(msg)?;
        self.channel.write_line(&line)
    }

    /// Runs one message through dispatch and maps the result to a response
    /// plus a continue-or-close decision (§4.6/§7).
    fn handle(&mut self, msg: Message) -> Outcome {
        let is_bye = msg.kind == Kind::Bye;
        match self.dispatch(msg) {
            Ok(response) => {
                let _ = self.send(&response);
                if is_bye {
                    Outcome::Close
                } else {
                    Outcome::Continue
                }
            }
            Err(err) => {
                let err = if self.in_txn { err.promote_in_transaction() } else { err };
                if err.is_fatal() {
                    let _ = self.send(&Message::error(err.client_message()));
                    Outcome::Close
                } else {
                    if matches!(err, Error::Transaction(_)) {
                        self.rollback_all();
                    }
                    let _ = self.send(&Message::failed(err.client_message()));
                    Outcome::Continue
                }
            }
        }
    }

    fn dispatch(&mut self, msg: Message) -> Result<Message> {
        match msg.kind {
            Kind::Login => {
                // No already-logged-in check: a later LOGIN is accepted the
                // same as the first, matching the source's behaviour.
                self.logged_in = true;
                Ok(Message::ok())
            }
            Kind::Begin => {
                if self.in_txn {
                    return Err(transaction("transaction already active"));
                }
                self.in_txn = true;
                Ok(Message::ok())
            }
            Kind::Commit => {
                if !self.in_txn {
                    return Err(operation("no transaction in progress"));
                }
                for table in self.held_locks.values() {
                    table.commit();
                    table.unlock();
                }
                self.held_locks.clear();
                self.in_txn = false;
                Ok(Message::ok())
            }
            Kind::Bye => Ok(Message::ok()),
            Kind::Push => {
                self.stack.push(msg.value().to_string());
                Ok(Message::ok())
            }
            Kind::Pop => {
                self.stack.pop()?;
                Ok(Message::ok())
            }
            Kind::Top => Ok(Message::data(self.stack.top()?.to_string())),
            Kind::Create => {
                self.registry.create(msg.table())?;
                Ok(Message::ok())
            }
            Kind::Get => {
                let table = self.acquire(msg.table())?;
                let result = table.get(msg.key());
                self.release(&table);
                let value = result?;
                self.stack.push(value);
                Ok(Message::ok())
            }
            Kind::Set => {
                let value = self.stack.top()?.to_string();
                let table = self.acquire(msg.table())?;
                table.set(msg.key(), &value);
                self.release(&table);
                Ok(Message::ok())
            }
            Kind::Add | Kind::Sub | Kind::Mul | Kind::Div => self.arith(msg.kind),
            Kind::Ok | Kind::Data | Kind::Failed | Kind::Error => {
                Err(protocol(format!("{} is a response-only message kind", msg.kind.as_str())))
            }
        }
    }

    /// acquire-for-use(t) (§4.5): blocking lock in auto-commit mode,
    /// non-blocking `try_lock` inside a transaction so contention aborts
    /// the transaction rather than risking a deadlock between sessions.
    fn acquire(&mut self, table_name: &str) -> Result<Arc<Table>> {
        let table = self
            .registry
            .find(table_name)
            .ok_or_else(|| operation(format!("no such table: {table_name}")))?;
        if self.in_txn {
            if !self.held_locks.contains_key(table.name()) {
                if !table.try_lock() {
                    return Err(transaction("lock unavailable"));
                }
                self.held_locks.insert(table.name().to_string(), table.clone());
            }
        } else {
            table.lock();
        }
        Ok(table)
    }

    /// In auto-commit mode every op is its own transaction: commit (a
    /// documented no-op for a pure read) and unlock immediately. Inside a
    /// transaction the table stays locked in `held_locks` until COMMIT or a
    /// rollback.
    fn release(&mut self, table: &Arc<Table>) {
        if !self.in_txn {
            table.commit();
            table.unlock();
        }
    }

    fn arith(&mut self, kind: Kind) -> Result<Message> {
        let rhs = self.pop_integer()?;
        let lhs = self.pop_integer()?;
        let result = match kind {
            Kind::Add => lhs.checked_add(rhs),
            Kind::Sub => lhs.checked_sub(rhs),
            Kind::Mul => lhs.checked_mul(rhs),
            Kind::Div => {
                if rhs == 0 {
                    return Err(operation("division by zero"));
                }
                lhs.checked_div(rhs)
            }
            _ => unreachable!("arith dispatched with a non-arithmetic kind"),
        };
        let result = result.ok_or_else(|| operation("arithmetic overflow"))?;
        self.stack.push(result.to_string());
        Ok(Message::ok())
    }

    fn pop_integer(&mut self) -> Result<i64> {
        let raw = self.stack.pop()?;
        raw.parse::<i64>().map_err(|_| operation("non-integer operand"))
    }

    fn rollback_all(&mut self) {
        for table in self.held_locks.values() {
            table.rollback();
            table.unlock();
        }
        self.held_locks.clear();
        self.in_txn = false;
    }
}

impl Drop for Session {
    /// §5's destructor contract: a session that goes away mid-transaction
    /// (connection dropped, fatal protocol error) rolls back and releases
    /// every lock it still held rather than leaving a table stuck.
    fn drop(&mut self) {
        self.rollback_all();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use test_log::test;

    struct MockChannel {
        incoming: VecDeque<String>,
        outgoing: Arc<Mutex<Vec<String>>>,
    }

    impl LineChannel for MockChannel {
        fn read_line(&mut self) -> Result<Option<String>> {
            Ok(self.incoming.pop_front())
        }

        fn write_line(&mut self, line: &str) -> Result<()> {
            self.outgoing.lock().unwrap().push(line.to_string());
            Ok(())
        }

        fn peer(&self) -> String {
            "mock".to_string()
        }
    }

    fn run(registry: &Arc<TableRegistry>, requests: &[&str]) -> Vec<String> {
        let incoming = requests.iter().map(|r| format!("{r}\n")).collect();
        let outgoing = Arc::new(Mutex::new(Vec::new()));
        let channel = MockChannel { incoming, outgoing: outgoing.clone() };
        run_session(Box::new(channel), registry.clone());
        Arc::try_unwrap(outgoing).unwrap().into_inner().unwrap()
    }

    #[test]
    fn first_message_other_than_login_is_fatal() {
        let registry = Arc::new(TableRegistry::new());
        let out = run(&registry, &["PUSH 1"]);
        assert_eq!(out, vec!["ERROR first message must be LOGIN\n"]);
    }

    #[test]
    fn auto_commit_set_then_get_round_trips_through_the_stack() {
        let registry = Arc::new(TableRegistry::new());
        let out = run(
            &registry,
            &["LOGIN alice", "CREATE t", "PUSH 7", "SET t k", "GET t k", "TOP", "BYE"],
        );
        assert_eq!(
            out,
            vec![
                "OK\n".to_string(),
                "OK\n".to_string(),
                "OK\n".to_string(),
                "OK\n".to_string(),
                "OK\n".to_string(),
                "DATA 7\n".to_string(),
                "OK\n".to_string(),
            ]
        );
    }

    #[test]
    fn increment_inside_a_transaction_commits_the_new_value() {
        let registry = Arc::new(TableRegistry::new());
        let out = run(
            &registry,
            &[
                "LOGIN alice",
                "CREATE t",
                "PUSH 5",
                "SET t k",
                "BEGIN",
                "GET t k",
                "PUSH 1",
                "ADD",
                "SET t k",
                "COMMIT",
                "GET t k",
                "TOP",
                "BYE",
            ],
        );
        assert_eq!(out.last().unwrap(), "OK\n");
        assert_eq!(out[out.len() - 2], "DATA 6\n");
        let t = registry.find("t").unwrap();
        t.lock();
        assert_eq!(t.get("k").unwrap(), "6");
        t.unlock();
    }

    #[test]
    fn a_missing_key_inside_a_transaction_rolls_back_and_stays_open() {
        let registry = Arc::new(TableRegistry::new());
        let out = run(
            &registry,
            &["LOGIN alice", "CREATE t", "BEGIN", "GET t nosuch", "COMMIT", "BYE"],
        );
        assert_eq!(out[0], "OK\n");
        assert_eq!(out[1], "OK\n");
        assert_eq!(out[2], "OK\n");
        assert_eq!(out[3], "FAILED key not found: nosuch\n");
        // the transaction was rolled back by the failure, so COMMIT now
        // finds nothing in progress rather than closing the connection
        assert_eq!(out[4], "FAILED no transaction in progress\n");
        assert_eq!(out[5], "OK\n");
        // table lock was released by the rollback, not left stuck
        let t = registry.find("t").unwrap();
        assert!(t.try_lock());
        t.unlock();
    }

    #[test]
    fn a_table_locked_elsewhere_aborts_a_transaction_instead_of_blocking() {
        let registry = Arc::new(TableRegistry::new());
        let t = registry.create("t").unwrap();
        t.lock(); // simulates another session already holding the table
        let out = run(&registry, &["LOGIN alice", "BEGIN", "GET t k"]);
        assert_eq!(out, vec!["OK\n", "OK\n", "FAILED lock unavailable\n"]);
        t.unlock();
    }

    #[test]
    fn duplicate_create_is_fatal_and_closes_the_connection() {
        let registry = Arc::new(TableRegistry::new());
        let out = run(&registry, &["LOGIN alice", "CREATE t", "CREATE t", "BYE"]);
        // the connection closed after the ERROR, so the trailing BYE was
        // never read: only three responses, not four
        assert_eq!(
            out,
            vec![
                "OK\n".to_string(),
                "OK\n".to_string(),
                "ERROR table already exists: t\n".to_string(),
            ]
        );
    }

    #[test]
    fn division_by_zero_is_recoverable_in_auto_commit_mode() {
        let registry = Arc::new(TableRegistry::new());
        let out = run(&registry, &["LOGIN alice", "PUSH 4", "PUSH 0", "DIV", "BYE"]);
        assert_eq!(
            out,
            vec![
                "OK\n".to_string(),
                "OK\n".to_string(),
                "OK\n".to_string(),
                "FAILED division by zero\n".to_string(),
                "OK\n".to_string(),
            ]
        );
    }

    #[test]
    fn division_by_zero_inside_a_transaction_aborts_it() {
        let registry = Arc::new(TableRegistry::new());
        let out = run(
            &registry,
            &["LOGIN alice", "BEGIN", "PUSH 4", "PUSH 0", "DIV", "COMMIT"],
        );
        assert_eq!(out[4], "FAILED division by zero\n");
        assert_eq!(out[5], "FAILED no transaction in progress\n");
    }

    #[test]
    fn a_fatal_protocol_error_closes_the_connection() {
        let registry = Arc::new(TableRegistry::new());
        let out = run(&registry, &["LOGIN alice", "FROBNICATE", "PUSH 1"]);
        assert_eq!(out.len(), 2);
        assert!(out[1].starts_with("ERROR"));
    }

    #[test]
    fn dropping_a_session_mid_transaction_releases_its_locks() {
        let registry = Arc::new(TableRegistry::new());
        // no BYE/COMMIT: the mock channel runs dry after GET, simulating a
        // dropped connection while the transaction still holds `t`.
        let _ = run(
            &registry,
            &["LOGIN alice", "CREATE t", "PUSH 1", "SET t k", "BEGIN", "GET t k"],
        );
        let t = registry.find("t").unwrap();
        assert!(t.try_lock());
        t.unlock();
    }
}
