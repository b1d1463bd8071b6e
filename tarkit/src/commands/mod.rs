mod create;
mod extract;
mod list;

pub use create::run as create;
pub use extract::run as extract;
pub use list::run as list;
