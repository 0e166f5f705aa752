//! Per-stage drivers for the out-of-order engine, called from
//! [`super::engine::O3Engine::tick`] in reverse pipeline order.

pub mod dispatch;
pub mod issue;
pub mod register_read_execute;
pub mod rename;
pub mod retire;
pub mod squash;
pub mod writeback;
