pub mod health;
pub mod maintenance;
pub mod search;
pub mod session;
pub mod tiebreak;
pub mod validation;
