pub mod memory;
pub mod sink;
pub mod sqlite;

pub use memory::InMemoryHazardStore;
pub use sink::EventSink;
pub use sqlite::SqliteHazardStore;

pub(crate) fn now_s() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
