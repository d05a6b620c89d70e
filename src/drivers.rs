pub mod fan_port;
pub mod sg30_panel;
