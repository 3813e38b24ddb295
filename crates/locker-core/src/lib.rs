#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::similar_names)]

pub mod auth;
pub mod constants;
pub mod models;
pub mod sharing;
pub mod sync;

pub use crate::auth::*;
pub use crate::constants::*;
pub use crate::models::*;
pub use crate::sync::*;
