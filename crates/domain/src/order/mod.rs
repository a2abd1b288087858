//! Orders: assembly from reserved lines, the stored model, and the read path.

mod assembler;
mod model;
mod query;
mod status;

pub use assembler::{OrderAssembler, ReservedLine};
pub use model::{Order, OrderItem};
pub use query::{MAX_PAGE_SIZE, OrderQuery, PageMeta, PageRequest};
pub use status::OrderStatus;
