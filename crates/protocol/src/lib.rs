//! # AgentOS Protocol
//!
//! Primitives shared by every AgentOS core crate:
//!
//! - [`CoreError`]: the single error type raised by domain code, tagged with an
//!   [`ErrorDomain`] and an [`ErrorCode`] and carrying retry hints
//! - Event publishing and subscription capabilities ([`EventPublisher`],
//!   [`EventSubscriber`]) plus adapters that never let a failing sink or
//!   listener escape into the caller
//! - Cursor pagination ([`CursorPagination`], [`paginate_by_key`])

pub mod error;
pub mod events;
pub mod pagination;

pub use error::{CoreError, CoreResult, ErrorCode, ErrorDomain, ErrorEnvelope};
pub use events::{
    subscribe_json, CompositePublisher, EventHandler, EventPublisher, EventSubscriber,
    FunctionPublisher, FunctionPublisherOptions, InvalidPayloadHandler, Listeners, LocalEventBus,
    PublishErrorHandler, RawPublishFn, Unsubscribe,
};
pub use pagination::{
    paginate_by_key, CursorPagination, CursorPaginationResult, PageDirection, DEFAULT_PAGE_LIMIT,
};
