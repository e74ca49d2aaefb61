pub mod countdown;
pub mod payment;
pub mod penalty;
pub mod settlement;
pub mod standing;
