pub mod slots;

pub use slots::{MemorySlots, Slot, SlotStore, SqliteSlots};
