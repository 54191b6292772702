/// Middleware module
///
/// Route guard the host application wraps around its own protected
/// routes.

mod protected;

pub use protected::Protected;
