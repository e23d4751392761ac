//! HTTP interaction layer: wire execution, the transport policies shared by
//! every call, and the typed forum API.

pub mod api;
pub mod executor;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod transport;

pub use api::{ForumApi, LOGOUT_PATH, PROFILE_PATH, PageQuery};
pub use executor::{HttpExecutor, HttpRequest, HttpResponse, ReqwestExecutor};
pub use transport::{Transport, UnauthorizedEvent};
