//! Trait seams over the three cloud sub-APIs, plus their SDK-backed
//! implementations. The traits are synchronous so pipeline stages stay
//! testable with plain in-memory fakes; the AWS implementations bridge into
//! the async SDK from a multi-thread Tokio runtime.

pub mod functions;
pub mod notifications;
pub mod roles;

pub(crate) fn wait_for<F: std::future::Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
