mod request_log;
mod scoped_timer;

pub use request_log::*;
pub use scoped_timer::*;
