/// Backend capability trait and the per-push handle record.
pub mod backend;
/// Per-frame push/trigger protocol.
pub mod bridge;
/// C ABI of the native plugin.
pub mod ffi;
