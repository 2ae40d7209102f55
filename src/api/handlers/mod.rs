//! Route handlers for the gated site.

pub mod health;
pub mod logout;
pub mod protected;
pub mod redirect;
