//! Exit policies: take-profit ladder, trailing stop, fixed stop loss

mod ladder;
mod stop_loss;
mod trailing_stop;

pub use ladder::{LadderPolicy, LadderRung, ParsedLadder};
pub use stop_loss::{is_stop_loss_triggered, stop_loss_floor};
pub use trailing_stop::TrailingStopTracker;
