pub mod event;

pub use event::{ChangeEvent, ChangePayload, RowData, TableRef, TriggerRef, TriggerResponse};
