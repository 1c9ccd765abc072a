pub mod grep;
pub mod list;
pub mod sum;

pub use grep::run as grep;
pub use list::run as list;
pub use sum::run as sum;
