pub mod reader;
pub mod writer;

pub use self::reader::{EntryData, TarFileReader};
pub use self::writer::TarFileWriter;
