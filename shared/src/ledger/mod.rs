//! Pure ledger algorithms shared by the server and the browser helper
//!
//! Nothing in here touches the database. The backend services load rows,
//! hand them to these functions, and persist whatever comes back.

pub mod edit;
pub mod fefo;
pub mod low_stock;
pub mod posting;
pub mod rebuild;

pub use edit::*;
pub use fefo::*;
pub use low_stock::*;
pub use posting::*;
pub use rebuild::*;
