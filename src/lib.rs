pub mod app;
pub mod audio;
pub mod blend;
pub mod capability;
pub mod color;
pub mod config;
pub mod effect_config;
pub mod effects;
pub mod gpu;
pub mod lissajous;
pub mod modulation;
pub mod pipeline;
pub mod preset;
pub mod sim;
pub mod transform_order;
