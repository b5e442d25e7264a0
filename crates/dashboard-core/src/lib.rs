pub mod endpoint;
pub mod error;
pub mod ticker;
pub mod traits;
pub mod types;

pub use endpoint::*;
pub use error::*;
pub use ticker::*;
pub use traits::*;
pub use types::*;
