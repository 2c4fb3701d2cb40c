pub mod chats;
pub mod emotions;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod pagination;
pub mod routes;
pub mod shares;
pub mod state;
pub mod users;
