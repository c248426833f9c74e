pub mod band;
pub mod collection;
pub mod error;
pub mod intake;
pub mod record;
pub mod risk;
pub mod score;
pub mod status;

pub use band::*;
pub use collection::*;
pub use error::{CollectionError, RecordError};
pub use intake::*;
pub use record::*;
pub use risk::*;
pub use score::*;
pub use status::*;
