pub mod header;
pub mod next_prayer;
pub mod other_times;
pub mod prayers;
pub mod statusbar;
