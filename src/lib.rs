//! Distributed-memory SOR solver for dense linear systems `A ⋅ x = b`

mod error;
mod events;
mod params;
mod partition;
mod solver;
mod system;
mod transport;

pub use crate::error::*;
pub use crate::events::*;
pub use crate::params::*;
pub use crate::partition::*;
pub use crate::solver::*;
pub use crate::system::*;
pub use crate::transport::*;
