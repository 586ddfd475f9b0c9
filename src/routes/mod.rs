pub mod messages;
pub mod rtc;
pub mod wsroute;
