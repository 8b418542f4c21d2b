pub mod terminal;

/// Status of a single snapshot comparison.
pub enum SnapshotStatus {
    Pass,
    Fail(String),
    New,
    Error(String),
}
