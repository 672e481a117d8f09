//! chromiumoxide によるブラウザドライバ

mod driver;
mod session;
pub mod stealth;

pub use driver::ChromiumDriver;
pub use session::ChromiumSession;
