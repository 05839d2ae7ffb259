pub mod document;
pub mod history;
pub mod queue;
pub mod torrent;

pub use document::*;
pub use history::*;
pub use queue::*;
pub use torrent::*;
