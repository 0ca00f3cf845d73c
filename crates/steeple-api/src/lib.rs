pub mod error;
pub mod leaderboard;
pub mod rewards;
pub mod routes;
pub mod state;
pub mod users;

pub use routes::router;
pub use state::{AppState, AppStateInner};
